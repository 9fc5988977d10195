//! 解答会话
//!
//! 一次编排运行独占一个会话：提取出的全部题目、逐步累积的结果、
//! 以及重解时要避开的旧答案。运行结束或页面重载即丢弃，从不持久化。

use std::collections::HashMap;

use chrono::{DateTime, Local};

use crate::models::question::{AnswerResult, AnswerStatus, AnswerValue, QuestionRecord};

/// 一次运行的解答会话
#[derive(Debug)]
pub struct ResolutionSession {
    /// 本次提取产出的全部题目
    records: Vec<QuestionRecord>,
    /// question_id → 结果，增量构建
    results: HashMap<usize, AnswerResult>,
    /// question_id → 调用方标记为不合理的旧答案
    previous_rejected: HashMap<usize, AnswerValue>,
    /// 会话开始时间（日志用）
    started_at: DateTime<Local>,
}

impl ResolutionSession {
    /// 以一批题目记录开启会话
    pub fn new(records: Vec<QuestionRecord>) -> Self {
        Self {
            records,
            results: HashMap::new(),
            previous_rejected: HashMap::new(),
            started_at: Local::now(),
        }
    }

    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// 按 id 查题目
    pub fn record(&self, question_id: usize) -> Option<&QuestionRecord> {
        self.records.iter().find(|r| r.id == question_id)
    }

    /// 按 id 查结果
    pub fn result(&self, question_id: usize) -> Option<&AnswerResult> {
        self.results.get(&question_id)
    }

    /// 写入（或覆盖）一条结果
    pub fn set_result(&mut self, result: AnswerResult) {
        self.results.insert(result.question_id, result);
    }

    /// 题目是否还需要发起解答
    ///
    /// 已有 resolved 结果的题目不再重复请求（除非显式重解）。
    pub fn needs_resolution(&self, question_id: usize) -> bool {
        !matches!(
            self.results.get(&question_id).map(|r| r.status),
            Some(AnswerStatus::Resolved)
        )
    }

    /// 记录被拒的旧答案，供下次请求避开
    pub fn mark_rejected(&mut self, question_id: usize, value: AnswerValue) {
        self.previous_rejected.insert(question_id, value);
    }

    /// 查询该题要避开的旧答案
    pub fn rejected_value(&self, question_id: usize) -> Option<&AnswerValue> {
        self.previous_rejected.get(&question_id)
    }

    /// 统计各状态数量：(resolved, errored, pending)
    pub fn status_counts(&self) -> (usize, usize, usize) {
        let mut resolved = 0;
        let mut errored = 0;
        for r in self.results.values() {
            match r.status {
                AnswerStatus::Resolved => resolved += 1,
                AnswerStatus::Errored => errored += 1,
                AnswerStatus::Pending => {}
            }
        }
        let pending = self.records.len() - resolved - errored;
        (resolved, errored, pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionKind;

    fn record(id: usize) -> QuestionRecord {
        QuestionRecord {
            id,
            block_index: id - 1,
            text: format!("question {}", id),
            options: vec!["A".into(), "B".into()],
            kind: QuestionKind::SingleChoice,
        }
    }

    #[test]
    fn test_needs_resolution_guard() {
        let mut session = ResolutionSession::new(vec![record(1)]);
        assert!(session.needs_resolution(1));

        // pending / errored 的题目仍需要解答
        session.set_result(AnswerResult::pending(1));
        assert!(session.needs_resolution(1));
        session.set_result(AnswerResult::errored(1, "boom"));
        assert!(session.needs_resolution(1));

        // resolved 后不再重复请求
        session.set_result(AnswerResult::resolved(1, AnswerValue::Single("A".into())));
        assert!(!session.needs_resolution(1));
    }

    #[test]
    fn test_status_counts() {
        let mut session = ResolutionSession::new(vec![record(1), record(2), record(3)]);
        session.set_result(AnswerResult::resolved(1, AnswerValue::Single("A".into())));
        session.set_result(AnswerResult::errored(2, "网络错误"));
        assert_eq!(session.status_counts(), (1, 1, 1));
    }

    #[test]
    fn test_rejected_value_lookup() {
        let mut session = ResolutionSession::new(vec![record(1)]);
        assert!(session.rejected_value(1).is_none());
        session.mark_rejected(1, AnswerValue::Single("B".into()));
        assert_eq!(
            session.rejected_value(1),
            Some(&AnswerValue::Single("B".into()))
        );
    }
}
