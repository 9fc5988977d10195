//! 应用入口 - 编排层
//!
//! App 负责把各层资源装配起来：连接浏览器、建 JS 执行器、
//! 建 Gemini 客户端，然后要么跑一次性的 solve_once()，
//! 要么进入 serve() 命令循环等外部触发。
//!
//! 最近一次运行的会话留在 App 里，重解和复制导出都作用在它上面。

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::browser::connection::connect_to_browser_and_page;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::selectors::{profile_by_name, SelectorProfile};
use crate::models::session::ResolutionSession;
use crate::orchestrator::solver_run::{run_solver, RunReport};
use crate::orchestrator::trigger::{CommandAck, SolverCommand};
use crate::services::gemini_client::GeminiClient;
use crate::services::presenter::{OutcomeSink, PageSink, ResultPresenter};
use crate::utils::logging;
use crate::workflow::merger;

/// 装配完成的应用
pub struct App {
    config: Config,
    profile: &'static SelectorProfile,
    client: GeminiClient,
    presenter: ResultPresenter,
    executor: JsExecutor,
    /// 最近一次运行的会话（重解 / 复制导出用）
    session: Option<ResolutionSession>,
    /// 握住连接避免被提前释放
    _browser: Browser,
}

impl App {
    /// 装配应用：校验配置、预检模型、连接浏览器
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        info!(
            "启动: 模型 {}, 策略 {:?}, 选择器配置 {}",
            config.model_name, config.strategy, config.selector_profile
        );

        let profile = profile_by_name(&config.selector_profile)?;
        let client = GeminiClient::new(&config);

        // 凭证已配置时提前验证模型可用性，失败不挡启动
        if config.has_credential() {
            match client.validate_model().await {
                Ok(display_name) => info!("✓ 模型可用: {}", display_name),
                Err(e) => warn!("模型预检失败: {}", e),
            }
        } else {
            warn!("API Key 未配置，解答运行会直接失败");
        }

        let (browser, page) =
            connect_to_browser_and_page(config.browser_debug_port, config.target_url.as_deref())
                .await?;

        Ok(Self {
            presenter: ResultPresenter::new(profile),
            executor: JsExecutor::new(page),
            profile,
            client,
            config,
            session: None,
            _browser: browser,
        })
    }

    /// 跑一次完整的解答运行，会话留存供后续命令使用
    pub async fn solve_once(&mut self) -> Result<RunReport> {
        let sink = PageSink {
            executor: &self.executor,
            presenter: &self.presenter,
        };
        let (report, session) = run_solver(
            &self.executor,
            &self.client,
            &sink,
            &self.config,
            self.profile,
        )
        .await?;
        self.session = Some(session);
        Ok(report)
    }

    /// 进入命令循环，直到所有发送端关闭
    pub async fn serve(&mut self, mut commands: mpsc::Receiver<SolverCommand>) -> Result<()> {
        while let Some(command) = commands.recv().await {
            match command {
                SolverCommand::StartSolving { ack } => {
                    // 先应答"已启动"，再执行运行本身
                    let _ = ack.send(CommandAck::Started);
                    if let Err(e) = self.solve_once().await {
                        error!("解答运行失败: {}", e);
                    }
                }
                SolverCommand::ReSolve { question_id, ack } => {
                    self.handle_re_solve(question_id, ack).await;
                }
                SolverCommand::CopyQuestion { question_id, ack } => {
                    let _ = ack.send(self.handle_copy(question_id));
                }
            }
        }
        info!("命令通道关闭，编排器退出");
        Ok(())
    }

    async fn handle_re_solve(
        &mut self,
        question_id: usize,
        ack: tokio::sync::oneshot::Sender<CommandAck>,
    ) {
        let Some(session) = self.session.as_mut() else {
            let _ = ack.send(CommandAck::Rejected("当前没有可用的解答会话".to_string()));
            return;
        };

        // 前置校验通过才应答"已启动"
        let block_index = match session.record(question_id) {
            Some(record) => record.block_index,
            None => {
                let _ = ack.send(CommandAck::Rejected(format!(
                    "会话中不存在题目 #{}",
                    question_id
                )));
                return;
            }
        };
        let _ = ack.send(CommandAck::ReSolveStarted);

        match merger::re_resolve(session, question_id, &self.client).await {
            Ok(result) => {
                let sink = PageSink {
                    executor: &self.executor,
                    presenter: &self.presenter,
                };
                sink.publish(block_index, &result).await;
            }
            Err(e) => error!("重解题目 #{} 失败: {}", question_id, e),
        }
    }

    fn handle_copy(&self, question_id: usize) -> CommandAck {
        let Some(session) = self.session.as_ref() else {
            return CommandAck::Rejected("当前没有可用的解答会话".to_string());
        };
        match merger::render_export(session, question_id) {
            Ok(text) => {
                info!(
                    "导出题目 #{}: {}",
                    question_id,
                    logging::truncate_text(&text, 80)
                );
                CommandAck::Copied(text)
            }
            Err(e) => CommandAck::Rejected(e.to_string()),
        }
    }
}
