//! Gemini 解答客户端 - 业务能力层
//!
//! 直接对接 generativelanguage 的原生 REST 接口：
//! - POST `models/{model}:generateContent?key={key}` 生成回答
//! - GET  `models/{model}?key={key}` 在使用前校验凭证和模型名
//!
//! 解码参数固定（temperature 0、topP 0.9、topK 40），保证可复现；
//! 安全过滤用中等档位。所有失败都在本层转成 errored 结果或
//! 批量失败描述，不往上抛。

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SolveError;
use crate::models::question::{AnswerResult, AnswerValue, QuestionKind, QuestionRecord};
use crate::services::answer_provider::{AnswerProvider, BatchOutcome, ParsedAnswer};

/// generativelanguage 的默认端点
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// 顺序模式单题回答的输出上限
const SINGLE_MAX_OUTPUT_TOKENS: u32 = 250;
/// 批量模式整页回答的输出上限
const BATCH_MAX_OUTPUT_TOKENS: u32 = 8192;

// ========== 请求 / 响应报文 ==========

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn safety_settings() -> Vec<SafetySetting> {
    vec![
        SafetySetting {
            category: "HARM_CATEGORY_HARASSMENT",
            threshold: "BLOCK_MEDIUM_AND_ABOVE",
        },
        SafetySetting {
            category: "HARM_CATEGORY_HATE_SPEECH",
            threshold: "BLOCK_LOW_AND_ABOVE",
        },
    ]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<serde_json::Value>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    display_name: Option<String>,
    error: Option<ApiErrorBody>,
}

// ========== 客户端 ==========

/// Gemini 解答客户端
///
/// 职责：
/// - 构建顺序 / 批量两种提示词
/// - 调用生成端点并解析回答
/// - 把传输失败、端点错误、安全拦截、空回答都转成结果值
/// - 不出现 Session，不关心流程顺序
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// 指定端点地址（测试用）
    pub fn with_base_url(config: &Config, base_url: impl Into<String>) -> Self {
        let mut client = Self::new(config);
        client.base_url = base_url.into();
        client
    }

    /// 使用前校验凭证与模型名，返回模型展示名
    pub async fn validate_model(&self) -> Result<String, SolveError> {
        if !self.has_credential() {
            return Err(SolveError::CredentialMissing);
        }

        let url = format!(
            "{}/models/{}?key={}",
            self.base_url, self.model_name, self.api_key
        );
        let info: ModelInfo = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?;

        if let Some(err) = info.error {
            return Err(SolveError::EndpointRejection(err.message));
        }

        let name = info.display_name.unwrap_or_else(|| self.model_name.clone());
        debug!("模型校验通过: {}", name);
        Ok(name)
    }

    /// 调用生成端点，返回首个候选的文本
    async fn generate(
        &self,
        contents: Vec<Content>,
        max_output_tokens: u32,
    ) -> Result<String, SolveError> {
        if !self.has_credential() {
            return Err(SolveError::CredentialMissing);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_name, self.api_key
        );
        let request = GenerateRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens,
                top_p: 0.9,
                top_k: 40,
            },
            safety_settings: safety_settings(),
        };

        let payload: GenerateResponse = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?;

        if let Some(err) = payload.error {
            return Err(SolveError::EndpointRejection(err.message));
        }

        let blocked = payload.prompt_feedback.is_some();
        let text = payload
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .map(|p| p.text);

        match text {
            Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
            _ if blocked => Err(SolveError::SafetyBlocked),
            _ => Err(SolveError::EmptyAnswer),
        }
    }
}

impl AnswerProvider for GeminiClient {
    fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn solve_single(
        &self,
        record: &QuestionRecord,
        avoid: Option<&AnswerValue>,
    ) -> AnswerResult {
        debug!(
            "顺序解答题目 #{} ({:?}, {} 个选项)",
            record.id,
            record.kind,
            record.options.len()
        );

        let contents = build_single_contents(record, avoid);
        match self.generate(contents, SINGLE_MAX_OUTPUT_TOKENS).await {
            Ok(text) => AnswerResult::resolved(record.id, value_from_text(record.kind, &text)),
            Err(e) => {
                warn!("题目 #{} 解答失败: {}", record.id, e);
                AnswerResult::errored(record.id, e.to_string())
            }
        }
    }

    async fn solve_batch(&self, records: &[QuestionRecord]) -> BatchOutcome {
        debug!("批量解答 {} 道题目", records.len());

        let contents = build_batch_contents(records);
        match self.generate(contents, BATCH_MAX_OUTPUT_TOKENS).await {
            Ok(text) => match parse_batch_response(&text, records.len()) {
                Ok(parsed) => BatchOutcome::Parsed(parsed),
                Err(e) => {
                    warn!("批量响应解析失败: {}", e);
                    BatchOutcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                warn!("批量请求失败: {}", e);
                BatchOutcome::Failed(e.to_string())
            }
        }
    }
}

// ========== 提示词构建 ==========

/// 构建顺序模式的两段式请求内容（指令 + 题目）
fn build_single_contents(record: &QuestionRecord, avoid: Option<&AnswerValue>) -> Vec<Content> {
    let options_list = record
        .options
        .iter()
        .map(|o| format!("\"{}\"", o))
        .collect::<Vec<_>>()
        .join(", ");

    let mut instruction = format!(
        "You are a question answering AI. Your job is to read and analyze the question's \
         requirements and give the correct answer(s). DON'T add any further explanation. \
         The answer(s) MUST be in the following list of options only: {}.",
        options_list
    );
    if let Some(previous) = avoid {
        instruction.push_str(&format!(
            "\nHere is the previous answer which I find unreasonable, MUST RECONSIDER \
             before giving the next answer(s): \"{}\".",
            previous.display()
        ));
    }

    let mut question = format!("Question: \"{}\"", record.text);
    match record.kind {
        QuestionKind::SingleChoice => question.push_str(" (Single choice, choose only 1)."),
        QuestionKind::MultipleChoice => {
            question.push_str(" (Multiple choice, separate by comma).")
        }
        QuestionKind::Unknown => {}
    }

    vec![
        Content {
            role: "user".to_string(),
            parts: vec![Part { text: instruction }],
        },
        Content {
            role: "user".to_string(),
            parts: vec![Part { text: question }],
        },
    ]
}

/// 构建批量模式的两段式请求内容（指令 + 题目数组）
fn build_batch_contents(records: &[QuestionRecord]) -> Vec<Content> {
    let instruction = r#"You are an exam solver. I will provide a JSON array of questions. Your task is to analyze each question and select the correct option(s) from the provided "options" list.
Requirements:
1. Return ONLY a valid JSON array. No Markdown formatting (like ```json), no explanations.
2. The output JSON must strictly follow this structure:
[
    { "index": <number>, "correct_option": "<string>" },
    { "index": <number>, "correct_option": ["<string>", "<string>"] }
]
3. For "radio" type, "correct_option" is a single string.
4. For "checkbox" type, "correct_option" is an array of strings.
5. The content of "correct_option" must MATCH EXACTLY with one of the provided options."#;

    let questions: Vec<_> = records
        .iter()
        .map(|r| {
            json!({
                "index": r.id,
                "question": r.text,
                "type": r.kind,
                "options": r.options,
            })
        })
        .collect();
    let data = format!(
        "Here is the data:\n{}",
        serde_json::to_string_pretty(&questions).unwrap_or_default()
    );

    vec![
        Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: instruction.to_string(),
            }],
        },
        Content {
            role: "user".to_string(),
            parts: vec![Part { text: data }],
        },
    ]
}

// ========== 响应解析 ==========

/// 顺序模式：把回答文本转成答案值
///
/// 多选题的回答按提示词约定是逗号分隔的列表。
fn value_from_text(kind: QuestionKind, text: &str) -> AnswerValue {
    match kind {
        QuestionKind::MultipleChoice => {
            let items: Vec<String> = text
                .split(',')
                .map(|s| s.trim().trim_matches('"').to_string())
                .filter(|s| !s.is_empty())
                .collect();
            AnswerValue::Multiple(items)
        }
        _ => AnswerValue::Single(text.trim().trim_matches('"').to_string()),
    }
}

/// 去掉模型可能加上的代码围栏
fn strip_code_fences(text: &str) -> String {
    if let Ok(re) = Regex::new(r"```(?:json)?") {
        re.replace_all(text, "").trim().to_string()
    } else {
        text.trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct BatchEntry {
    index: usize,
    correct_option: CorrectOption,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorrectOption {
    One(String),
    Many(Vec<String>),
}

impl From<CorrectOption> for AnswerValue {
    fn from(value: CorrectOption) -> Self {
        match value {
            CorrectOption::One(s) => AnswerValue::Single(s),
            CorrectOption::Many(items) => AnswerValue::Multiple(items),
        }
    }
}

/// 批量模式：把响应文本解析成按批内位置对齐的答案列表
///
/// 超出批范围的 index 直接忽略；解析失败是整批失败。
fn parse_batch_response(text: &str, batch_len: usize) -> Result<Vec<ParsedAnswer>, SolveError> {
    let cleaned = strip_code_fences(text);
    let entries: Vec<BatchEntry> =
        serde_json::from_str(&cleaned).map_err(|e| SolveError::ResponseParse(e.to_string()))?;

    let mut parsed = Vec::new();
    for entry in entries {
        if entry.index == 0 || entry.index > batch_len {
            debug!("忽略超出批范围的答案 index={}", entry.index);
            continue;
        }
        parsed.push(ParsedAnswer {
            index: entry.index,
            value: entry.correct_option.into(),
        });
    }
    Ok(parsed)
}
