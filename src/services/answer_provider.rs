//! 解答服务接口
//!
//! 把"把题目变成答案"抽象成一个接口，顺序 / 批量两种模式都走它。
//! 编排层对具体实现保持泛型，测试可以换成脚本化的假服务。
//!
//! 约定：失败永远不越过这个边界往外抛——顺序模式直接给出 errored
//! 结果，批量模式给出整批统一的失败描述，由合并器落到每条记录上。

use crate::models::question::{AnswerResult, AnswerValue, QuestionRecord};

/// 批量模式解析出的一条答案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    /// 批内 1 起位置（与记录 id 同一套编号）
    pub index: usize,
    pub value: AnswerValue,
}

/// 批量模式的整体结果：要么全部解析成功，要么整批失败
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Parsed(Vec<ParsedAnswer>),
    Failed(String),
}

/// 解答服务
#[allow(async_fn_in_trait)]
pub trait AnswerProvider {
    /// 凭证是否就绪（编排层每次调用前检查）
    fn has_credential(&self) -> bool;

    /// 顺序模式：解答一道题
    ///
    /// `avoid` 是调用方标记为不合理的旧答案，提示服务换个答案。
    async fn solve_single(
        &self,
        record: &QuestionRecord,
        avoid: Option<&AnswerValue>,
    ) -> AnswerResult;

    /// 批量模式：一次请求解答整批题目
    async fn solve_batch(&self, records: &[QuestionRecord]) -> BatchOutcome;
}
