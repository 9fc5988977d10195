use anyhow::Result;
use quiz_gemini_solver::utils::logging;
use quiz_gemini_solver::{App, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::load("solver.toml")?;
    let mut app = App::initialize(config).await?;

    let report = app.solve_once().await?;
    info!(
        "本次运行结束: {:?}，共 {} 题（成功 {} / 失败 {} / 未答 {}）",
        report.state, report.total, report.resolved, report.errored, report.pending
    );
    Ok(())
}
