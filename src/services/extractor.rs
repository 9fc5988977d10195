//! 题目提取器 - 业务能力层
//!
//! 只负责"把页面题块变成结构化记录"的能力，不关心流程。
//!
//! 采集和清洗分两步：JS 侧只把题块原样搬下来（RawQuizBlock），
//! 清洗、分类、跳过、编号全部在 Rust 侧完成。提取是全量遍历、
//! 永不抛错：有问题的题块记日志跳过，不影响同批其他题目。

use anyhow::Result;
use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::infrastructure::JsExecutor;
use crate::models::question::{QuestionKind, QuestionRecord, RawQuizBlock};
use crate::models::selectors::SelectorProfile;

/// 题目提取器
///
/// 职责：
/// - 按选择器配置采集页面上的全部题块
/// - 清洗题干与选项文本（空白折叠、去空）
/// - 跳过缺题干、无选项、已注入结果的题块
/// - 给产出的记录编 1 起连续 id（被跳过的题块不占用 id）
pub struct Extractor {
    profile: &'static SelectorProfile,
    whitespace: Regex,
}

impl Extractor {
    /// 创建新的提取器
    pub fn new(profile: &'static SelectorProfile) -> Result<Self> {
        Ok(Self {
            profile,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// 提取页面上的全部题目记录
    pub async fn extract(&self, executor: &JsExecutor) -> Result<Vec<QuestionRecord>> {
        let raw_blocks = self.scrape_raw_blocks(executor).await?;
        info!("页面上找到 {} 个题块", raw_blocks.len());
        Ok(self.build_records(raw_blocks))
    }

    /// 采集原始题块（JS 侧）
    async fn scrape_raw_blocks(&self, executor: &JsExecutor) -> Result<Vec<RawQuizBlock>> {
        let script = self.harvest_script();
        let blocks: Vec<RawQuizBlock> = executor.eval_as(script).await?;
        Ok(blocks)
    }

    /// 把原始题块清洗成结构化记录（纯函数，可直接测试）
    pub fn build_records(&self, raw_blocks: Vec<RawQuizBlock>) -> Vec<QuestionRecord> {
        let mut records = Vec::new();

        for raw in raw_blocks {
            let block_no = raw.block_index + 1;

            // 1. 题干：清洗后为空则跳过
            let text = raw
                .question
                .as_deref()
                .map(|q| self.normalize(q))
                .unwrap_or_default();
            if text.is_empty() {
                warn!("跳过题块 #{}: 未找到题干", block_no);
                continue;
            }

            // 2. 选项：清洗、去空、保持文档顺序
            let options: Vec<String> = raw
                .options
                .iter()
                .map(|o| self.normalize(o))
                .filter(|o| !o.is_empty())
                .collect();
            if options.is_empty() {
                warn!("跳过题块 #{}: 没有可用选项或类型无法识别", block_no);
                continue;
            }

            // 3. 幂等保护：注入点已有结果标记的题块不再处理
            if raw.answered {
                info!("跳过题块 #{}: 已有解答结果", block_no);
                continue;
            }

            let id = records.len() + 1;
            debug!(
                "题块 #{} → 记录 #{} ({:?}, {} 个选项)",
                block_no,
                id,
                raw.kind,
                options.len()
            );
            records.push(QuestionRecord {
                id,
                block_index: raw.block_index,
                text,
                options,
                kind: raw.kind,
            });
        }

        info!("提取完成: 产出 {} 条题目记录", records.len());
        records
    }

    /// 空白折叠 + 去两端空白
    fn normalize(&self, raw: &str) -> String {
        self.whitespace.replace_all(raw, " ").trim().to_string()
    }

    /// 生成采集脚本
    ///
    /// 选项只按命中的分组标记对应的 item 选择器收集，
    /// 未识别的分组不收集选项（后续自然被跳过）。
    fn harvest_script(&self) -> String {
        let sel = json!({
            "quizBlock": self.profile.quiz_block,
            "questionText": self.profile.question_text,
            "answersContainer": self.profile.answers_container,
            "radioGroup": self.profile.radio_group,
            "radioItemText": self.profile.radio_item_text,
            "checkboxGroup": self.profile.checkbox_group,
            "checkboxItemText": self.profile.checkbox_item_text,
            "injectionPoint": self.profile.injection_point,
            "resultMarker": self.profile.result_marker,
        });

        format!(
            r#"
            (() => {{
                const SEL = {};
                const blocks = Array.from(document.querySelectorAll(SEL.quizBlock));
                return blocks.map((block, index) => {{
                    const questionEl = block.querySelector(SEL.questionText);
                    const answers = block.querySelector(SEL.answersContainer);

                    let kind = "unknown";
                    let itemSel = null;
                    if (answers && answers.querySelector(SEL.radioGroup)) {{
                        kind = "radio";
                        itemSel = SEL.radioItemText;
                    }} else if (answers && answers.querySelector(SEL.checkboxGroup)) {{
                        kind = "checkbox";
                        itemSel = SEL.checkboxItemText;
                    }}

                    const options = [];
                    if (answers && itemSel) {{
                        answers.querySelectorAll(itemSel).forEach((el) => {{
                            options.push(el.textContent || "");
                        }});
                    }}

                    const target = block.querySelector(SEL.injectionPoint);
                    const answered = !!(target && target.querySelector("." + SEL.resultMarker));

                    return {{
                        blockIndex: index,
                        question: questionEl ? questionEl.textContent : null,
                        kind: kind,
                        options: options,
                        answered: answered,
                    }};
                }});
            }})()
            "#,
            sel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::selectors::COURSERA;

    fn extractor() -> Extractor {
        Extractor::new(&COURSERA).unwrap()
    }

    fn raw(
        block_index: usize,
        question: Option<&str>,
        kind: QuestionKind,
        options: &[&str],
        answered: bool,
    ) -> RawQuizBlock {
        RawQuizBlock {
            block_index,
            question: question.map(String::from),
            kind,
            options: options.iter().map(|s| s.to_string()).collect(),
            answered,
        }
    }

    #[test]
    fn test_well_formed_block_produces_one_record() {
        let records = extractor().build_records(vec![raw(
            0,
            Some("  What  is\n the answer? "),
            QuestionKind::SingleChoice,
            &["  Option A ", "Option\tB", ""],
            false,
        )]);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.id, 1);
        assert_eq!(r.text, "What is the answer?");
        // 顺序保持、空串被丢弃
        assert_eq!(r.options, vec!["Option A", "Option B"]);
        assert_eq!(r.kind, QuestionKind::SingleChoice);
    }

    #[test]
    fn test_block_without_options_is_skipped() {
        let records = extractor().build_records(vec![
            raw(0, Some("No options here"), QuestionKind::Unknown, &[], false),
            // 全空白选项等同于无选项
            raw(
                1,
                Some("Blank options"),
                QuestionKind::SingleChoice,
                &["  ", "\n"],
                false,
            ),
        ]);
        assert!(records.is_empty());
    }

    #[test]
    fn test_block_without_question_text_is_skipped() {
        let records = extractor().build_records(vec![
            raw(0, None, QuestionKind::SingleChoice, &["A"], false),
            raw(1, Some("   "), QuestionKind::SingleChoice, &["A"], false),
        ]);
        assert!(records.is_empty());
    }

    #[test]
    fn test_answered_block_is_skipped_and_consumes_no_id() {
        let records = extractor().build_records(vec![
            raw(0, Some("Q1"), QuestionKind::SingleChoice, &["A", "B"], true),
            raw(1, Some("Q2"), QuestionKind::MultipleChoice, &["C", "D"], false),
        ]);

        // 已答题块被跳过，后面的记录从 1 开始编号
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].block_index, 1);
        assert_eq!(records[0].text, "Q2");
    }

    #[test]
    fn test_rescan_of_fully_answered_page_yields_nothing() {
        let records = extractor().build_records(vec![
            raw(0, Some("Q1"), QuestionKind::SingleChoice, &["A"], true),
            raw(1, Some("Q2"), QuestionKind::SingleChoice, &["B"], true),
        ]);
        assert!(records.is_empty());
    }

    #[test]
    fn test_ids_are_contiguous_across_skips() {
        let records = extractor().build_records(vec![
            raw(0, Some("Q1"), QuestionKind::SingleChoice, &["A"], false),
            raw(1, None, QuestionKind::Unknown, &[], false),
            raw(2, Some("Q3"), QuestionKind::MultipleChoice, &["B", "C"], false),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!((records[0].id, records[0].block_index), (1, 0));
        assert_eq!((records[1].id, records[1].block_index), (2, 2));
    }

    #[test]
    fn test_harvest_script_embeds_profile_selectors() {
        let script = extractor().harvest_script();
        assert!(script.contains(COURSERA.quiz_block));
        assert!(script.contains(COURSERA.radio_group));
        assert!(script.contains(COURSERA.result_marker));
    }
}
