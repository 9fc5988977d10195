//! 编排层
//!
//! 驱动一次解答的完整流程：等容器 → 提取 → 解答 → 写回页面。
//! 下层能力（提取器、解答服务、注入器）都不认识彼此，只有这一层
//! 知道它们的先后顺序和失败处置。

pub mod app;
pub mod solver_run;
pub mod trigger;

pub use app::App;
pub use solver_run::{resolve_batch, resolve_sequential, run_solver, RunReport, RunState};
pub use trigger::{command_channel, CommandAck, CommandTrigger, SolverCommand};
