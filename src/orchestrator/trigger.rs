//! 命令触发 - 编排层
//!
//! 外部触发源（CLI、快捷键守护进程等）通过命令通道驱动编排器。
//! 每条命令带一个一次性应答通道：开始类命令在运行启动时就应答，
//! 不等运行结束；复制命令应答里直接携带导出文本。

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};

/// 触发编排器的命令
#[derive(Debug)]
pub enum SolverCommand {
    /// 开始一次完整的解答运行
    StartSolving { ack: oneshot::Sender<CommandAck> },
    /// 重解一道已解答的题目
    ReSolve {
        question_id: usize,
        ack: oneshot::Sender<CommandAck>,
    },
    /// 把一道题导出成纯文本
    CopyQuestion {
        question_id: usize,
        ack: oneshot::Sender<CommandAck>,
    },
}

/// 命令的应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAck {
    /// 运行已启动（不代表已完成）
    Started,
    /// 重解已启动
    ReSolveStarted,
    /// 导出文本
    Copied(String),
    /// 命令被拒绝及原因
    Rejected(String),
}

/// 命令发送端
#[derive(Clone)]
pub struct CommandTrigger {
    tx: mpsc::Sender<SolverCommand>,
}

impl CommandTrigger {
    pub async fn start_solving(&self) -> Result<CommandAck> {
        self.send(|ack| SolverCommand::StartSolving { ack }).await
    }

    pub async fn re_solve(&self, question_id: usize) -> Result<CommandAck> {
        self.send(|ack| SolverCommand::ReSolve { question_id, ack })
            .await
    }

    pub async fn copy_question(&self, question_id: usize) -> Result<CommandAck> {
        self.send(|ack| SolverCommand::CopyQuestion { question_id, ack })
            .await
    }

    async fn send(
        &self,
        build: impl FnOnce(oneshot::Sender<CommandAck>) -> SolverCommand,
    ) -> Result<CommandAck> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(build(ack_tx))
            .await
            .map_err(|_| anyhow!("命令通道已关闭"))?;
        ack_rx.await.map_err(|_| anyhow!("编排器未应答就退出了"))
    }
}

/// 建立命令通道，返回发送端和编排器持有的接收端
pub fn command_channel(buffer: usize) -> (CommandTrigger, mpsc::Receiver<SolverCommand>) {
    let (tx, rx) = mpsc::channel(buffer);
    (CommandTrigger { tx }, rx)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_start_acks_before_run_completes() {
        let (trigger, mut rx) = command_channel(4);
        let run_finished = Arc::new(AtomicBool::new(false));
        let flag = run_finished.clone();

        tokio::spawn(async move {
            if let Some(SolverCommand::StartSolving { ack }) = rx.recv().await {
                // 先应答，再执行耗时的运行
                let _ = ack.send(CommandAck::Started);
                tokio::time::sleep(Duration::from_secs(300)).await;
                flag.store(true, Ordering::SeqCst);
            }
        });

        let ack = trigger.start_solving().await.unwrap();
        assert_eq!(ack, CommandAck::Started);
        assert!(!run_finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_copy_ack_carries_text() {
        let (trigger, mut rx) = command_channel(1);

        tokio::spawn(async move {
            if let Some(SolverCommand::CopyQuestion { question_id, ack }) = rx.recv().await {
                assert_eq!(question_id, 2);
                let _ = ack.send(CommandAck::Copied("Question 2: ...".into()));
            }
        });

        let ack = trigger.copy_question(2).await.unwrap();
        assert_eq!(ack, CommandAck::Copied("Question 2: ...".into()));
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (trigger, rx) = command_channel(1);
        drop(rx);
        assert!(trigger.start_solving().await.is_err());
    }
}
