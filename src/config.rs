//! 程序配置
//!
//! 配置在每次运行开始时读入，运行中不再隐式读取。
//! 加载顺序：默认值 → solver.toml（可选）→ 环境变量。

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// 解题策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveStrategy {
    /// 每道题一次请求，按间隔排队
    Sequential,
    /// 整页题目一次请求
    Batch,
}

impl SolveStrategy {
    /// 从字符串解析策略（环境变量用）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(SolveStrategy::Sequential),
            "batch" => Some(SolveStrategy::Batch),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标页面 URL（为空则附着到已打开的页面）
    pub target_url: Option<String>,
    /// 选择器配置名
    pub selector_profile: String,
    /// 解题策略
    pub strategy: SolveStrategy,
    /// 输出日志文件
    pub output_log_file: String,
    // --- Gemini 配置 ---
    pub api_key: String,
    pub model_name: String,
    /// 顺序模式下两次请求之间的间隔（毫秒）
    pub request_interval_ms: u64,
    /// 等待测验容器出现的超时（毫秒）
    pub container_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: None,
            selector_profile: "coursera".to_string(),
            strategy: SolveStrategy::Sequential,
            output_log_file: "solver_run.txt".to_string(),
            api_key: String::new(),
            model_name: "gemini-2.0-flash-lite".to_string(),
            request_interval_ms: 2500,
            container_timeout_ms: 120_000,
        }
    }
}

/// solver.toml 的可选字段（缺省字段落回默认值）
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    browser_debug_port: Option<u16>,
    target_url: Option<String>,
    selector_profile: Option<String>,
    strategy: Option<SolveStrategy>,
    output_log_file: Option<String>,
    api_key: Option<String>,
    model_name: Option<String>,
    request_interval_ms: Option<u64>,
    container_timeout_ms: Option<u64>,
}

impl Config {
    /// 加载配置：默认值 → solver.toml → 环境变量
    pub fn load(config_path: &str) -> Result<Self> {
        let mut config = Self::default();

        if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("无法读取配置文件: {}", config_path))?;
            let file: ConfigFile = toml::from_str(&content)
                .with_context(|| format!("无法解析配置文件: {}", config_path))?;
            config.apply_file(file);
            info!("已加载配置文件: {}", config_path);
        }

        config.apply_env();
        Ok(config)
    }

    /// 仅从环境变量加载（测试和最小化部署用）
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.browser_debug_port {
            self.browser_debug_port = v;
        }
        if file.target_url.is_some() {
            self.target_url = file.target_url;
        }
        if let Some(v) = file.selector_profile {
            self.selector_profile = v;
        }
        if let Some(v) = file.strategy {
            self.strategy = v;
        }
        if let Some(v) = file.output_log_file {
            self.output_log_file = v;
        }
        if let Some(v) = file.api_key {
            self.api_key = v;
        }
        if let Some(v) = file.model_name {
            self.model_name = v;
        }
        if let Some(v) = file.request_interval_ms {
            self.request_interval_ms = v;
        }
        if let Some(v) = file.container_timeout_ms {
            self.container_timeout_ms = v;
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parsed("BROWSER_DEBUG_PORT") {
            self.browser_debug_port = v;
        }
        if let Ok(v) = std::env::var("TARGET_URL") {
            self.target_url = Some(v);
        }
        if let Ok(v) = std::env::var("SELECTOR_PROFILE") {
            self.selector_profile = v;
        }
        if let Some(v) = std::env::var("SOLVE_STRATEGY")
            .ok()
            .and_then(|s| SolveStrategy::parse(&s))
        {
            self.strategy = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        if let Ok(v) = std::env::var("GEMINI_API_KEY") {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var("GEMINI_MODEL") {
            self.model_name = v;
        }
        if let Some(v) = env_parsed("REQUEST_INTERVAL_MS") {
            self.request_interval_ms = v;
        }
        if let Some(v) = env_parsed("CONTAINER_TIMEOUT_MS") {
            self.container_timeout_ms = v;
        }
    }

    /// API Key 是否已配置
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
