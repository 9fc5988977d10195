//! 结果注入器 - 业务能力层
//!
//! 把一道题的解答结果写回页面的注入点。注入的容器带结果标记 class，
//! 提取器重扫时据此跳过已处理的题块。样式只做最低限度的可读性。

use anyhow::Result;
use tracing::warn;

use crate::infrastructure::JsExecutor;
use crate::models::question::{AnswerResult, AnswerStatus};
use crate::models::selectors::SelectorProfile;

const STYLE_PENDING: &str =
    "margin-top:8px; padding:8px; border-radius:4px; font-size:14px; color:#666; background:#f0f0f0;";
const STYLE_RESOLVED: &str =
    "margin-top:8px; padding:8px; border-radius:4px; font-size:14px; color:darkgreen; background:#e6fffa; border:1px solid green;";
const STYLE_ERRORED: &str =
    "margin-top:8px; padding:8px; border-radius:4px; font-size:14px; color:red; background:#ffe6e6; border:1px solid red;";

/// 结果注入器
pub struct ResultPresenter {
    profile: &'static SelectorProfile,
}

impl ResultPresenter {
    pub fn new(profile: &'static SelectorProfile) -> Self {
        Self { profile }
    }

    /// 把结果写入第 block_index 个题块的注入点
    ///
    /// 容器不存在则创建（带结果标记 class），存在则原地更新。
    /// 返回是否成功定位到注入点。
    pub async fn inject(
        &self,
        executor: &JsExecutor,
        block_index: usize,
        result: &AnswerResult,
    ) -> Result<bool> {
        let (text, style) = render_text(result);
        let script = self.inject_script(block_index, &text, style);
        let injected: bool = executor.eval_as(script).await?;
        if !injected {
            warn!("题块 #{} 未找到注入点，结果无法展示", block_index + 1);
        }
        Ok(injected)
    }

    fn inject_script(&self, block_index: usize, text: &str, style: &str) -> String {
        // 字符串一律经过 JSON 转义再嵌入脚本
        let block_sel = quote(self.profile.quiz_block);
        let target_sel = quote(self.profile.injection_point);
        let marker = quote(self.profile.result_marker);
        let text = quote(text);
        let style = quote(style);

        format!(
            r#"
            (() => {{
                const blocks = document.querySelectorAll({block_sel});
                const block = blocks[{block_index}];
                if (!block) return false;
                const target = block.querySelector({target_sel});
                if (!target) return false;

                let ui = target.querySelector("." + {marker});
                if (!ui) {{
                    ui = document.createElement("div");
                    ui.className = {marker};
                    target.appendChild(ui);
                }}
                ui.textContent = {text};
                ui.style.cssText = {style};
                return true;
            }})()
            "#
        )
    }
}

/// 按结果状态生成展示文本和样式
fn render_text(result: &AnswerResult) -> (String, &'static str) {
    match result.status {
        AnswerStatus::Pending => ("Solving...".to_string(), STYLE_PENDING),
        AnswerStatus::Resolved => {
            let value = result
                .value
                .as_ref()
                .map(|v| v.display())
                .unwrap_or_default();
            (format!("Answer: {}", value), STYLE_RESOLVED)
        }
        AnswerStatus::Errored => {
            let message = result.error_message.as_deref().unwrap_or("unknown error");
            (format!("Error: {}", message), STYLE_ERRORED)
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// 结果展示的接收端
///
/// 编排层只往接收端发布结果，不关心展示细节。展示是尽力而为：
/// 失败在实现内部记日志，不打断解答流程。
#[allow(async_fn_in_trait)]
pub trait OutcomeSink {
    async fn publish(&self, block_index: usize, result: &AnswerResult);
}

/// 把结果发布到页面注入点的接收端
pub struct PageSink<'a> {
    pub executor: &'a JsExecutor,
    pub presenter: &'a ResultPresenter,
}

impl OutcomeSink for PageSink<'_> {
    async fn publish(&self, block_index: usize, result: &AnswerResult) {
        if let Err(e) = self.presenter.inject(self.executor, block_index, result).await {
            warn!("结果注入失败（题块 #{}）: {}", block_index + 1, e);
        }
    }
}

/// 丢弃一切输出的接收端（测试用）
pub struct NullSink;

impl OutcomeSink for NullSink {
    async fn publish(&self, _block_index: usize, _result: &AnswerResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::AnswerValue;
    use crate::models::selectors::COURSERA;

    #[test]
    fn test_render_text_by_status() {
        let pending = AnswerResult::pending(1);
        assert_eq!(render_text(&pending).0, "Solving...");

        let resolved = AnswerResult::resolved(
            1,
            AnswerValue::Multiple(vec!["A".into(), "C".into()]),
        );
        assert_eq!(render_text(&resolved).0, "Answer: A, C");

        let errored = AnswerResult::errored(1, "API key not valid");
        assert_eq!(render_text(&errored).0, "Error: API key not valid");
    }

    #[test]
    fn test_inject_script_escapes_text() {
        let presenter = ResultPresenter::new(&COURSERA);
        let script = presenter.inject_script(0, "he said \"hi\"\nnext", STYLE_PENDING);
        // 引号和换行必须被转义，否则脚本会坏掉
        assert!(script.contains(r#""he said \"hi\"\nnext""#));
        assert!(script.contains("gemini-result-container"));
    }
}
