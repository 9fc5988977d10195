//! 单次解答运行 - 编排层
//!
//! 一次运行走完整条状态机：
//!
//! ```text
//! Idle → WaitingForContainer → Extracting → Resolving → Done
//!                  │                             │
//!                  └────────── Failed ◄──────────┘
//! ```
//!
//! Done / Failed 是终态；再来一次就是全新的运行和全新的会话。
//! 容器超时、凭证缺失这类整体性失败只会让运行落到 Failed 并写进
//! 运行报告，不会向调用方抛错；单题的失败更是只体现在各自的结果里。

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::config::{Config, SolveStrategy};
use crate::error::SolveError;
use crate::infrastructure::JsExecutor;
use crate::models::question::AnswerResult;
use crate::models::selectors::SelectorProfile;
use crate::models::session::ResolutionSession;
use crate::services::answer_provider::AnswerProvider;
use crate::services::extractor::Extractor;
use crate::services::presenter::OutcomeSink;
use crate::workflow::merger;

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    WaitingForContainer,
    Extracting,
    Resolving,
    Done,
    Failed,
}

/// 一次运行的结果汇总
#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub total: usize,
    pub resolved: usize,
    pub errored: usize,
    pub pending: usize,
    /// 整体性失败的原因（state == Failed 时存在）
    pub failure: Option<String>,
}

impl RunReport {
    fn from_session(state: RunState, session: &ResolutionSession, failure: Option<String>) -> Self {
        let (resolved, errored, pending) = session.status_counts();
        Self {
            state,
            total: session.records().len(),
            resolved,
            errored,
            pending,
            failure,
        }
    }
}

fn transition(state: &mut RunState, next: RunState) {
    info!("运行状态: {:?} → {:?}", state, next);
    *state = next;
}

/// 执行一次完整的解答运行
///
/// 返回运行报告和本次会话；会话留给调用方做重解和复制导出。
pub async fn run_solver<P: AnswerProvider, S: OutcomeSink>(
    executor: &JsExecutor,
    provider: &P,
    sink: &S,
    config: &Config,
    profile: &'static SelectorProfile,
) -> Result<(RunReport, ResolutionSession)> {
    let mut state = RunState::Idle;

    // ========== 等待测验容器 ==========
    transition(&mut state, RunState::WaitingForContainer);
    let timeout = Duration::from_millis(config.container_timeout_ms);
    let hit = executor.wait_for_any(profile.quiz_containers, timeout).await;
    let Some(selector) = hit else {
        let cause = SolveError::ContainerTimeout {
            timeout_ms: config.container_timeout_ms,
        };
        warn!("{}", cause);
        transition(&mut state, RunState::Failed);
        let session = ResolutionSession::new(Vec::new());
        let report = RunReport::from_session(state, &session, Some(cause.to_string()));
        return Ok((report, session));
    };
    info!("✓ 命中测验容器: {}", selector);

    // ========== 提取 ==========
    transition(&mut state, RunState::Extracting);
    let extractor = Extractor::new(profile)?;
    let records = extractor.extract(executor).await?;
    if records.is_empty() {
        // 页面上没有待解的题目，运行直接完成
        info!("没有提取到待解题目，运行结束");
        transition(&mut state, RunState::Done);
        let session = ResolutionSession::new(Vec::new());
        let report = RunReport::from_session(state, &session, None);
        return Ok((report, session));
    }
    info!("提取到 {} 道待解题目", records.len());
    let mut session = ResolutionSession::new(records);

    // ========== 解答 ==========
    transition(&mut state, RunState::Resolving);
    let outcome = match config.strategy {
        SolveStrategy::Sequential => {
            let interval = Duration::from_millis(config.request_interval_ms);
            resolve_sequential(&mut session, provider, sink, interval).await
        }
        SolveStrategy::Batch => resolve_batch(&mut session, provider, sink).await,
    };

    let report = match outcome {
        Ok(()) => {
            transition(&mut state, RunState::Done);
            let (resolved, errored, pending) = session.status_counts();
            info!(
                "运行完成: 共 {} 题，成功 {}，失败 {}，未答 {}",
                session.records().len(),
                resolved,
                errored,
                pending
            );
            RunReport::from_session(state, &session, None)
        }
        Err(cause) => {
            error!("运行中止: {}", cause);
            transition(&mut state, RunState::Failed);
            RunReport::from_session(state, &session, Some(cause.to_string()))
        }
    };
    Ok((report, session))
}

/// 顺序模式：逐题请求，两次请求之间等待固定间隔
///
/// 每次发起请求前都检查凭证，凭证中途失效立即中止整次运行。
/// 已有 resolved 结果的题目直接跳过，重扫同一页面不会重复请求。
pub async fn resolve_sequential<P: AnswerProvider, S: OutcomeSink>(
    session: &mut ResolutionSession,
    provider: &P,
    sink: &S,
    interval: Duration,
) -> Result<(), SolveError> {
    let records = session.records().to_vec();
    let total = records.len();

    for (i, record) in records.iter().enumerate() {
        if !session.needs_resolution(record.id) {
            debug!("题目 #{} 已有解答，跳过", record.id);
            continue;
        }
        if !provider.has_credential() {
            return Err(SolveError::CredentialMissing);
        }

        info!("[{}/{}] 解答题目 #{}", i + 1, total, record.id);
        sink.publish(record.block_index, &AnswerResult::pending(record.id))
            .await;

        let avoid = session.rejected_value(record.id).cloned();
        let result = provider.solve_single(record, avoid.as_ref()).await;
        sink.publish(record.block_index, &result).await;
        merger::apply_single(session, result);

        if i + 1 < total {
            debug!("等待 {} ms 后继续下一题", interval.as_millis());
            tokio::time::sleep(interval).await;
        }
    }
    Ok(())
}

/// 批量模式：整页题目一次请求
///
/// 凭证只在发起前检查一次。响应解析失败时合并器会把整批置错。
pub async fn resolve_batch<P: AnswerProvider, S: OutcomeSink>(
    session: &mut ResolutionSession,
    provider: &P,
    sink: &S,
) -> Result<(), SolveError> {
    if !provider.has_credential() {
        return Err(SolveError::CredentialMissing);
    }

    let records = session.records().to_vec();
    info!("批量解答 {} 道题目", records.len());
    for record in &records {
        sink.publish(record.block_index, &AnswerResult::pending(record.id))
            .await;
    }

    let outcome = provider.solve_batch(&records).await;
    merger::apply_batch(session, outcome);

    for record in &records {
        if let Some(result) = session.result(record.id) {
            sink.publish(record.block_index, result).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;
    use crate::models::question::{AnswerValue, QuestionKind, QuestionRecord};
    use crate::services::answer_provider::{BatchOutcome, ParsedAnswer};
    use crate::services::presenter::NullSink;

    fn record(id: usize) -> QuestionRecord {
        QuestionRecord {
            id,
            block_index: id - 1,
            text: format!("Question {}?", id),
            options: vec!["A".into(), "B".into(), "C".into()],
            kind: QuestionKind::SingleChoice,
        }
    }

    /// 记录每次调用时刻的解答服务
    struct TimedProvider {
        credentialed: bool,
        calls: Mutex<Vec<Instant>>,
    }

    impl TimedProvider {
        fn new() -> Self {
            Self {
                credentialed: true,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl AnswerProvider for TimedProvider {
        fn has_credential(&self) -> bool {
            self.credentialed
        }

        async fn solve_single(
            &self,
            record: &QuestionRecord,
            _avoid: Option<&AnswerValue>,
        ) -> AnswerResult {
            self.calls.lock().unwrap().push(Instant::now());
            AnswerResult::resolved(record.id, AnswerValue::Single("A".into()))
        }

        async fn solve_batch(&self, records: &[QuestionRecord]) -> BatchOutcome {
            self.calls.lock().unwrap().push(Instant::now());
            BatchOutcome::Parsed(
                records
                    .iter()
                    .map(|r| ParsedAnswer {
                        index: r.id,
                        value: AnswerValue::Single("B".into()),
                    })
                    .collect(),
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_paces_requests() {
        let mut session = ResolutionSession::new(vec![record(1), record(2), record(3)]);
        let provider = TimedProvider::new();
        let interval = Duration::from_millis(2500);

        resolve_sequential(&mut session, &provider, &NullSink, interval)
            .await
            .unwrap();

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
        assert_eq!(session.status_counts(), (3, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_skips_resolved_records() {
        let mut session = ResolutionSession::new(vec![record(1), record(2)]);
        session.set_result(AnswerResult::resolved(1, AnswerValue::Single("C".into())));
        let provider = TimedProvider::new();

        resolve_sequential(&mut session, &provider, &NullSink, Duration::from_millis(100))
            .await
            .unwrap();

        // 已解答的题目不再请求，旧结果原样保留
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
        assert_eq!(
            session.result(1).unwrap().value,
            Some(AnswerValue::Single("C".into()))
        );
    }

    #[tokio::test]
    async fn test_sequential_aborts_without_credential() {
        let mut session = ResolutionSession::new(vec![record(1)]);
        let provider = TimedProvider {
            credentialed: false,
            calls: Mutex::new(Vec::new()),
        };

        let err = resolve_sequential(
            &mut session,
            &provider,
            &NullSink,
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SolveError::CredentialMissing));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_single_request_resolves_all() {
        let mut session = ResolutionSession::new(vec![record(1), record(2), record(3)]);
        let provider = TimedProvider::new();

        resolve_batch(&mut session, &provider, &NullSink)
            .await
            .unwrap();

        assert_eq!(provider.calls.lock().unwrap().len(), 1);
        assert_eq!(session.status_counts(), (3, 0, 0));
    }

    #[tokio::test]
    async fn test_batch_aborts_without_credential() {
        let mut session = ResolutionSession::new(vec![record(1)]);
        let provider = TimedProvider {
            credentialed: false,
            calls: Mutex::new(Vec::new()),
        };

        let err = resolve_batch(&mut session, &provider, &NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, SolveError::CredentialMissing));
    }
}
