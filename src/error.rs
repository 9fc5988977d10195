//! 错误类型定义
//!
//! 对应整条解题流水线的失败分类：
//! - 凭证缺失 → 当前运行直接失败，不做部分重试
//! - 容器等待超时 → 运行以 Failed 结束，不尝试部分提取
//! - 传输失败 / 端点拒绝 / 安全拦截 / 空回答 → 转为单题的 errored 结果
//! - 批量响应解析失败 → 整批题目统一 errored
//!
//! 单个题块缺少题干或选项不算错误，提取时记日志跳过即可。

use thiserror::Error;

/// 解题流程错误
#[derive(Debug, Error)]
pub enum SolveError {
    /// API Key 未配置（运行级失败）
    #[error("API Key 未配置，请先在配置中填写 GEMINI_API_KEY")]
    CredentialMissing,

    /// 等待测验容器超时（运行级失败）
    #[error("等待测验容器超时（{timeout_ms} ms 内未出现）")]
    ContainerTimeout { timeout_ms: u64 },

    /// 网络层请求失败
    #[error("请求发送失败: {0}")]
    Transport(String),

    /// 端点返回了错误负载
    #[error("端点返回错误: {0}")]
    EndpointRejection(String),

    /// 请求被安全过滤器拦截
    #[error("请求被安全过滤器拦截")]
    SafetyBlocked,

    /// 端点成功返回但没有任何文本
    #[error("模型未返回任何回答")]
    EmptyAnswer,

    /// 批量模式响应不是合法的结构化数据
    #[error("批量响应解析失败: {0}")]
    ResponseParse(String),

    /// 选择器配置名不存在
    #[error("未知的选择器配置: {0}")]
    UnknownProfile(String),

    /// 会话中不存在该题目
    #[error("会话中不存在题目 #{0}")]
    UnknownQuestion(usize),

    /// 重解前置条件不满足（题目当前不是 resolved 状态）
    #[error("题目 #{0} 尚未成功解答，无法重解")]
    NotResolved(usize),
}
