//! Coursera 测验自动解答器
//!
//! 附着到已开启调试端口的浏览器，提取页面上的测验题目，
//! 调用 Gemini generateContent 解答，再把答案写回页面。
//!
//! # 架构分层
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ 编排层 orchestrator                  │  状态机 / 命令循环
//! ├─────────────────────────────────────┤
//! │ 流程层 workflow                      │  结果合并 / 重解 / 导出
//! ├─────────────────────────────────────┤
//! │ 业务能力层 services                  │  提取器 / Gemini 客户端 / 注入器
//! ├─────────────────────────────────────┤
//! │ 基础设施层 infrastructure / browser  │  JS 执行器 / CDP 连接
//! └─────────────────────────────────────┘
//! ```
//!
//! 上层只依赖下层；`AnswerProvider` 和 `OutcomeSink` 是编排层
//! 对外部世界的两个缝，测试时替换成脚本化实现。

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::{Config, SolveStrategy};
pub use error::SolveError;
pub use orchestrator::{App, CommandAck, CommandTrigger, RunReport, RunState, SolverCommand};
