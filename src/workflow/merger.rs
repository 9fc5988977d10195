//! 结果合并器 - 流程层
//!
//! 把解答服务的产出落回会话：
//! - 顺序模式逐条写入
//! - 批量模式按批内位置对齐写入；解析失败时整批统一置错
//! - 重解：把当前答案标记为被拒，带着它重新请求并覆盖旧结果
//! - 复制导出：把一道题渲染成纯文本，且可以解析回来（不依赖解答状态）

use anyhow::Result;
use tracing::{info, warn};

use crate::error::SolveError;
use crate::models::question::{AnswerResult, AnswerStatus, AnswerValue, QuestionKind};
use crate::models::session::ResolutionSession;
use crate::services::answer_provider::{AnswerProvider, BatchOutcome};

/// 写入一条顺序模式的结果
pub fn apply_single(session: &mut ResolutionSession, result: AnswerResult) {
    match result.status {
        AnswerStatus::Resolved => info!(
            "题目 #{} ✓ 解答: {}",
            result.question_id,
            result.value.as_ref().map(|v| v.display()).unwrap_or_default()
        ),
        AnswerStatus::Errored => warn!(
            "题目 #{} ✗ 失败: {}",
            result.question_id,
            result.error_message.as_deref().unwrap_or("unknown")
        ),
        AnswerStatus::Pending => {}
    }
    session.set_result(result);
}

/// 把批量模式的整体结果落到会话上
///
/// - 整批失败：每条记录拿到同一条 errored 结果，没有部分成功
/// - 解析成功：按批内位置（= 记录 id）对齐写入；响应里缺席的题目
///   维持 pending，由调用方在日志里看到
pub fn apply_batch(session: &mut ResolutionSession, outcome: BatchOutcome) {
    match outcome {
        BatchOutcome::Failed(message) => {
            warn!("批量解答失败，整批置错: {}", message);
            let ids: Vec<usize> = session.records().iter().map(|r| r.id).collect();
            for id in ids {
                session.set_result(AnswerResult::errored(id, message.clone()));
            }
        }
        BatchOutcome::Parsed(answers) => {
            for answer in answers {
                // index 与记录 id 同一套编号（1 起、被跳过的题块不占号）
                let Some(record) = session.record(answer.index) else {
                    continue;
                };
                if !value_matches_options(&answer.value, &record.options) {
                    // 不精确匹配不拒收，只留痕
                    warn!(
                        "题目 #{} 的答案 [{}] 不在选项列表中",
                        record.id,
                        answer.value.display()
                    );
                }
                info!("题目 #{} ✓ 解答: {}", answer.index, answer.value.display());
                session.set_result(AnswerResult::resolved(answer.index, answer.value));
            }
        }
    }
}

/// 重解一道题：避开当前答案重新请求，成功后覆盖旧结果
///
/// 只有当前状态为 resolved 的题目才能重解；
/// 状态迁移 resolved → pending → resolved | errored。
pub async fn re_resolve<P: AnswerProvider>(
    session: &mut ResolutionSession,
    question_id: usize,
    provider: &P,
) -> Result<AnswerResult, SolveError> {
    let record = session
        .record(question_id)
        .ok_or(SolveError::UnknownQuestion(question_id))?
        .clone();

    let previous = match session.result(question_id) {
        Some(r) if r.status == AnswerStatus::Resolved => r.value.clone(),
        _ => None,
    };
    let Some(previous) = previous else {
        return Err(SolveError::NotResolved(question_id));
    };

    info!(
        "重解题目 #{}，避开旧答案: {}",
        question_id,
        previous.display()
    );
    session.mark_rejected(question_id, previous);
    session.set_result(AnswerResult::pending(question_id));

    let avoid = session.rejected_value(question_id).cloned();
    let result = provider.solve_single(&record, avoid.as_ref()).await;
    session.set_result(result.clone());
    Ok(result)
}

/// 答案值是否逐项精确命中选项列表
fn value_matches_options(value: &AnswerValue, options: &[String]) -> bool {
    match value {
        AnswerValue::Single(s) => options.iter().any(|o| o == s),
        AnswerValue::Multiple(items) => {
            !items.is_empty() && items.iter().all(|i| options.iter().any(|o| o == i))
        }
    }
}

// ========== 复制 / 导出 ==========

/// 导出解析出来的题目
#[derive(Debug, PartialEq, Eq)]
pub struct ExportedQuestion {
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
}

/// 把一道题渲染成纯文本（与解答状态无关）
pub fn render_export(session: &ResolutionSession, question_id: usize) -> Result<String, SolveError> {
    let record = session
        .record(question_id)
        .ok_or(SolveError::UnknownQuestion(question_id))?;

    let mut out = format!("Question {}: {}\n", record.id, record.text);
    out.push_str(&format!("Type: {}\n", record.kind.label()));
    out.push_str("Options:\n");
    for option in &record.options {
        out.push_str(&format!("[ ] {}\n", option));
    }
    Ok(out)
}

/// 解析导出文本，还原题干、类型与选项（导出的逆操作）
pub fn parse_export(text: &str) -> Option<ExportedQuestion> {
    let mut lines = text.lines();

    let header = lines.next()?;
    let (_, question) = header.strip_prefix("Question ")?.split_once(": ")?;
    let kind = QuestionKind::from_label(lines.next()?.strip_prefix("Type: ")?);
    if lines.next()? != "Options:" {
        return None;
    }

    let options: Vec<String> = lines
        .filter_map(|l| l.strip_prefix("[ ] "))
        .map(String::from)
        .collect();

    Some(ExportedQuestion {
        text: question.to_string(),
        kind,
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionRecord;
    use crate::services::answer_provider::ParsedAnswer;

    fn record(id: usize, kind: QuestionKind, options: &[&str]) -> QuestionRecord {
        QuestionRecord {
            id,
            block_index: id - 1,
            text: format!("Question {}?", id),
            options: options.iter().map(|s| s.to_string()).collect(),
            kind,
        }
    }

    fn two_question_session() -> ResolutionSession {
        ResolutionSession::new(vec![
            record(1, QuestionKind::SingleChoice, &["A", "B", "C"]),
            record(2, QuestionKind::MultipleChoice, &["A", "B", "C"]),
        ])
    }

    #[test]
    fn test_apply_batch_matches_by_index() {
        let mut session = two_question_session();
        apply_batch(
            &mut session,
            BatchOutcome::Parsed(vec![
                ParsedAnswer {
                    index: 1,
                    value: AnswerValue::Single("B".into()),
                },
                ParsedAnswer {
                    index: 2,
                    value: AnswerValue::Multiple(vec!["A".into(), "C".into()]),
                },
            ]),
        );

        assert_eq!(
            session.result(1).unwrap().value,
            Some(AnswerValue::Single("B".into()))
        );
        assert_eq!(
            session.result(2).unwrap().value,
            Some(AnswerValue::Multiple(vec!["A".into(), "C".into()]))
        );
    }

    #[test]
    fn test_apply_batch_failure_errors_every_record() {
        let mut session = two_question_session();
        apply_batch(
            &mut session,
            BatchOutcome::Failed("批量响应解析失败: not json".into()),
        );

        for id in [1, 2] {
            let result = session.result(id).unwrap();
            assert_eq!(result.status, AnswerStatus::Errored);
            assert_eq!(
                result.error_message.as_deref(),
                Some("批量响应解析失败: not json")
            );
        }
        let (_, errored, pending) = session.status_counts();
        assert_eq!(errored, 2);
        assert_eq!(pending, 0);
    }

    #[test]
    fn test_value_matches_options() {
        let options: Vec<String> = vec!["A".into(), "B".into()];
        assert!(value_matches_options(
            &AnswerValue::Single("A".into()),
            &options
        ));
        assert!(!value_matches_options(
            &AnswerValue::Single("a".into()),
            &options
        ));
        assert!(value_matches_options(
            &AnswerValue::Multiple(vec!["A".into(), "B".into()]),
            &options
        ));
        assert!(!value_matches_options(
            &AnswerValue::Multiple(vec!["A".into(), "D".into()]),
            &options
        ));
        assert!(!value_matches_options(&AnswerValue::Multiple(vec![]), &options));
    }

    /// 脚本化的解答服务：记录收到的避答值，返回固定答案
    struct ScriptedProvider {
        answer: String,
        seen_avoid: std::sync::Mutex<Option<String>>,
    }

    impl AnswerProvider for ScriptedProvider {
        fn has_credential(&self) -> bool {
            true
        }

        async fn solve_single(
            &self,
            record: &QuestionRecord,
            avoid: Option<&AnswerValue>,
        ) -> AnswerResult {
            *self.seen_avoid.lock().unwrap() = avoid.map(|v| v.display());
            AnswerResult::resolved(record.id, AnswerValue::Single(self.answer.clone()))
        }

        async fn solve_batch(&self, _records: &[QuestionRecord]) -> BatchOutcome {
            BatchOutcome::Failed("not used".into())
        }
    }

    #[tokio::test]
    async fn test_re_resolve_avoids_previous_and_overwrites() {
        let mut session = two_question_session();
        session.set_result(AnswerResult::resolved(1, AnswerValue::Single("B".into())));

        let provider = ScriptedProvider {
            answer: "C".into(),
            seen_avoid: std::sync::Mutex::new(None),
        };
        let result = re_resolve(&mut session, 1, &provider).await.unwrap();

        // 请求里带上了被拒的 "B"，旧结果被覆盖
        assert_eq!(provider.seen_avoid.lock().unwrap().as_deref(), Some("B"));
        assert_eq!(result.value, Some(AnswerValue::Single("C".into())));
        assert_eq!(
            session.result(1).unwrap().value,
            Some(AnswerValue::Single("C".into()))
        );
    }

    #[tokio::test]
    async fn test_re_resolve_requires_resolved_state() {
        let mut session = two_question_session();
        let provider = ScriptedProvider {
            answer: "C".into(),
            seen_avoid: std::sync::Mutex::new(None),
        };

        // 没有结果的题目不能重解
        let err = re_resolve(&mut session, 1, &provider).await.unwrap_err();
        assert!(matches!(err, SolveError::NotResolved(1)));

        // errored 的题目同样不能重解
        session.set_result(AnswerResult::errored(1, "boom"));
        let err = re_resolve(&mut session, 1, &provider).await.unwrap_err();
        assert!(matches!(err, SolveError::NotResolved(1)));

        // 不存在的题目
        let err = re_resolve(&mut session, 9, &provider).await.unwrap_err();
        assert!(matches!(err, SolveError::UnknownQuestion(9)));
    }

    #[test]
    fn test_export_round_trip() {
        let session = ResolutionSession::new(vec![record(
            1,
            QuestionKind::MultipleChoice,
            &["First option", "Second: with colon", "Third"],
        )]);

        let text = render_export(&session, 1).unwrap();
        let parsed = parse_export(&text).unwrap();

        assert_eq!(parsed.text, "Question 1?");
        assert_eq!(parsed.kind, QuestionKind::MultipleChoice);
        assert_eq!(
            parsed.options,
            vec!["First option", "Second: with colon", "Third"]
        );
    }

    #[test]
    fn test_export_unknown_question() {
        let session = two_question_session();
        assert!(matches!(
            render_export(&session, 7),
            Err(SolveError::UnknownQuestion(7))
        ));
    }

    #[test]
    fn test_parse_export_rejects_garbage() {
        assert!(parse_export("not an export").is_none());
        assert!(parse_export("Question 1: ok\nType: Single Choice\nNope").is_none());
    }
}
