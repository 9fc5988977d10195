//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"和"等元素"两种能力

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::infrastructure::wait::wait_for;

/// 两次探测容器之间的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / eval_as() 能力
/// - 不认识 QuestionRecord / Session
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 等待任意一个选择器在页面上出现
    ///
    /// 返回命中的选择器；超时返回 None，不报错。
    pub async fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Option<String> {
        let script = probe_script(selectors);
        let script = script.as_str();

        wait_for(
            move || async move {
                match self.eval_as::<Option<String>>(script).await {
                    Ok(hit) => hit,
                    Err(e) => {
                        // 页面导航中途 eval 可能失败，按"未出现"处理继续轮询
                        debug!("探测选择器失败，继续等待: {}", e);
                        None
                    }
                }
            },
            timeout,
            POLL_INTERVAL,
        )
        .await
    }
}

/// 生成探测脚本：返回第一个命中的选择器，都未命中返回 null
fn probe_script(selectors: &[&str]) -> String {
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
        (() => {{
            const selectors = {};
            for (const sel of selectors) {{
                if (document.querySelector(sel)) {{
                    return sel;
                }}
            }}
            return null;
        }})()
        "#,
        list
    )
}
