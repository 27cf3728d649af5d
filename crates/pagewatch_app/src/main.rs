mod app;
mod cli;

use anyhow::Context;
use clap::Parser;
use pagewatch_engine::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    pagewatch_logging::initialize(&cli.log_settings());

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    log::info!(
        "Loaded {} job(s) from {}",
        config.jobs.len(),
        cli.config.display()
    );

    let exits = app::run(config).await?;
    app::check_exits(&exits)
}
