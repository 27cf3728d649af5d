//! Process wiring: one task per job, shared shutdown on Ctrl+C or SIGTERM.
use std::sync::Arc;

use anyhow::Context;
use log::{error, info, warn};
use pagewatch_engine::{
    AppConfig, DocumentFetcher, JobExit, JobRunner, LogRecordSink, RecordSink, ReqwestFetcher,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Start every configured job and wait until all of them have ended.
///
/// Jobs end on a shutdown signal, or on their own when a cycle fails.
pub async fn run(config: AppConfig) -> anyhow::Result<Vec<(String, JobExit)>> {
    if config.jobs.is_empty() {
        warn!("No jobs configured, nothing to do");
        return Ok(Vec::new());
    }

    let fetcher: Arc<dyn DocumentFetcher> =
        Arc::new(ReqwestFetcher::new(config.fetch.clone()).context("building HTTP client")?);
    let sink: Arc<dyn RecordSink> = Arc::new(LogRecordSink);

    let tracker = TaskTracker::new();
    let cancel = CancellationToken::new();
    let mut handles = Vec::with_capacity(config.jobs.len());
    for job in config.jobs {
        let name = job.job.clone();
        let runner = JobRunner::new(job, fetcher.clone(), sink.clone())
            .with_context(|| format!("preparing job {name}"))?;
        handles.push((name, runner.start(&tracker, cancel.child_token())));
    }
    tracker.close();
    info!("Started {} job(s)", handles.len());

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown requested, stopping jobs");
            cancel.cancel();
        }
        _ = tracker.wait() => {
            warn!("Every job has ended on its own");
        }
    }
    tracker.wait().await;

    let mut exits = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(exit) => exits.push((name, exit)),
            Err(err) => error!("[{}] Job task panicked: {}", name, err),
        }
    }
    Ok(exits)
}

/// Fails when any job was terminated by an error.
pub fn check_exits(exits: &[(String, JobExit)]) -> anyhow::Result<()> {
    let failed: Vec<&str> = exits
        .iter()
        .filter_map(|(name, exit)| match exit {
            JobExit::Stopped => None,
            JobExit::Terminated(_) => Some(name.as_str()),
        })
        .collect();
    if failed.is_empty() {
        info!("All jobs stopped cleanly");
        return Ok(());
    }
    anyhow::bail!("job(s) terminated on error: {}", failed.join(", "))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = wait_for_sigterm() => info!("Received SIGTERM"),
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            warn!("Failed to register SIGTERM handler: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
