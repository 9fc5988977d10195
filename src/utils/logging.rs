//! 日志工具

use std::fs::OpenOptions;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::EnvFilter;

/// 初始化终端日志
///
/// 日志级别由 RUST_LOG 控制，默认 info。重复调用不报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 在运行日志文件里追加一条带时间戳的运行分隔头
pub fn init_log_file(path: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("无法打开日志文件: {}", path))?;
    writeln!(
        file,
        "\n========== 运行开始 {} ==========",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
    .with_context(|| format!("写入日志文件失败: {}", path))?;
    Ok(())
}

/// 截断长文本，日志里避免整段刷屏
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
