//! 选择器配置
//!
//! 把页面结构知识收拢成一份静态配置，提取器、注入器都以它为参数。
//! 单选/多选的判定依据 ARIA role 标记，比样式类名稳定。

use crate::error::SolveError;

/// 一套页面的选择器配置
#[derive(Debug, Clone, Copy)]
pub struct SelectorProfile {
    /// 配置名
    pub name: &'static str,
    /// 测验主容器的候选选择器（命中任意一个即可开始提取）
    pub quiz_containers: &'static [&'static str],
    /// 单个题块
    pub quiz_block: &'static str,
    /// 题干文本节点
    pub question_text: &'static str,
    /// 选项容器
    pub answers_container: &'static str,
    /// 单选组标记
    pub radio_group: &'static str,
    /// 单选项文本
    pub radio_item_text: &'static str,
    /// 多选组标记
    pub checkbox_group: &'static str,
    /// 多选项文本
    pub checkbox_item_text: &'static str,
    /// 结果注入点（题块内）
    pub injection_point: &'static str,
    /// 已注入结果的标记 class（重扫幂等判断用）
    pub result_marker: &'static str,
}

/// Coursera 测验页
pub const COURSERA: SelectorProfile = SelectorProfile {
    name: "coursera",
    quiz_containers: &[".css-1h9exxh", ".css-1q19euh", ".css-k546vy"],
    quiz_block: ".css-1erl2aq",
    question_text: ".css-gri5r8 .css-ybrhvy .css-g2bbpm",
    answers_container: ".css-1tfphom .css-ybrhvy",
    radio_group: "div[role=radiogroup]",
    radio_item_text: ".css-1f00xev .css-g2bbpm",
    checkbox_group: "div[role=group]",
    checkbox_item_text: ".css-2si5p7 .css-g2bbpm",
    injection_point: ".css-gri5r8",
    result_marker: "gemini-result-container",
};

/// 按名称查找选择器配置
pub fn profile_by_name(name: &str) -> Result<&'static SelectorProfile, SolveError> {
    match name {
        "coursera" => Ok(&COURSERA),
        other => Err(SolveError::UnknownProfile(other.to_string())),
    }
}
