//! 题目与答案的数据模型

use serde::{Deserialize, Serialize};

/// 题目类型，由选项容器里的分组标记推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// 单选（radiogroup 标记）
    #[serde(rename = "radio")]
    SingleChoice,
    /// 多选（group 标记）
    #[serde(rename = "checkbox")]
    MultipleChoice,
    /// 无法识别
    Unknown,
}

impl QuestionKind {
    /// 展示用名称（复制导出时用）
    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "Single Choice",
            QuestionKind::MultipleChoice => "Multiple Choice",
            QuestionKind::Unknown => "Unknown",
        }
    }

    /// 从导出文本的类型行解析
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Single Choice" => QuestionKind::SingleChoice,
            "Multiple Choice" => QuestionKind::MultipleChoice,
            _ => QuestionKind::Unknown,
        }
    }
}

/// 从页面上原样采集的一个题块，尚未清洗
///
/// JS 侧只负责采集，清洗、分类、跳过都在 Rust 侧完成，方便测试。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuizBlock {
    /// 题块在文档中的位置（0 起）
    pub block_index: usize,
    /// 题干原始文本（未找到则为 None）
    pub question: Option<String>,
    /// 分组标记推断出的类型
    pub kind: QuestionKind,
    /// 选项原始文本，按文档顺序
    #[serde(default)]
    pub options: Vec<String>,
    /// 注入点上是否已有结果标记
    #[serde(default)]
    pub answered: bool,
}

/// 一次提取产出的结构化题目记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    /// 在本批已产出记录中的位置（1 起）；被跳过的题块不占用 id
    pub id: usize,
    /// 题块在文档中的位置（0 起），仅用于定位注入点
    pub block_index: usize,
    /// 清洗后的题干（空白折叠、两端去空）
    pub text: String,
    /// 清洗后的选项，文档顺序，不含空串
    pub options: Vec<String>,
    /// 题目类型
    pub kind: QuestionKind,
}

/// 答案值：单选一个选项，多选一组选项（保持顺序）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    /// 展示 / 避答提示用的扁平文本
    pub fn display(&self) -> String {
        match self {
            AnswerValue::Single(s) => s.clone(),
            AnswerValue::Multiple(items) => items.join(", "),
        }
    }
}

/// 答案状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    Pending,
    Resolved,
    Errored,
}

/// 一道题的解答结果
#[derive(Debug, Clone)]
pub struct AnswerResult {
    /// 对应 QuestionRecord.id
    pub question_id: usize,
    pub status: AnswerStatus,
    /// status = Resolved 时存在
    pub value: Option<AnswerValue>,
    /// status = Errored 时存在
    pub error_message: Option<String>,
}

impl AnswerResult {
    /// 等待解答
    pub fn pending(question_id: usize) -> Self {
        Self {
            question_id,
            status: AnswerStatus::Pending,
            value: None,
            error_message: None,
        }
    }

    /// 解答成功
    pub fn resolved(question_id: usize, value: AnswerValue) -> Self {
        Self {
            question_id,
            status: AnswerStatus::Resolved,
            value: Some(value),
            error_message: None,
        }
    }

    /// 解答失败
    pub fn errored(question_id: usize, message: impl Into<String>) -> Self {
        Self {
            question_id,
            status: AnswerStatus::Errored,
            value: None,
            error_message: Some(message.into()),
        }
    }
}
