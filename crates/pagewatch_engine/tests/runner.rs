mod common;

use std::sync::{mpsc, Arc};
use std::time::Duration;

use common::{ids, init_logging, job_config, simple_listing, StaticFetcher};
use pagewatch_engine::{
    ChannelRecordSink, CycleError, FailureKind, FetchError, FetchFailure, JobExit, JobRunner,
    JobState, LogRecordSink,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const TEMPLATE: &str = "https://board.example.com/page/{page}";
const INTERVAL: Duration = Duration::from_secs(60);

fn page_url(page: u32) -> String {
    TEMPLATE.replace("{page}", &page.to_string())
}

#[tokio::test(start_paused = true)]
async fn emits_new_records_each_tick_until_cancelled() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.page(&page_url(1), simple_listing(&["B", "A"]));
    fetcher.page(&page_url(2), simple_listing(&["Z"]));

    let (tx, rx) = mpsc::channel();
    let runner = JobRunner::new(
        job_config(TEMPLATE, &temp.path().join("job.pos")),
        fetcher.clone(),
        Arc::new(ChannelRecordSink::new(tx)),
    )
    .unwrap();

    let tracker = TaskTracker::new();
    let cancel = CancellationToken::new();
    let handle = runner.start(&tracker, cancel.clone());

    // Nothing happens before the first interval elapses.
    tokio::time::sleep(INTERVAL / 2).await;
    assert!(fetcher.requests().is_empty());

    tokio::time::sleep(INTERVAL).await;
    let batch = rx.try_recv().expect("first batch");
    assert_eq!(batch.job, "test_job");
    assert_eq!(ids(&batch.records), vec!["B", "A", "Z"]);

    // A new item arrives; only it is emitted on the next tick.
    fetcher.page(&page_url(1), simple_listing(&["C", "B", "A"]));
    tokio::time::sleep(INTERVAL).await;
    let batch = rx.try_recv().expect("second batch");
    assert_eq!(ids(&batch.records), vec!["C"]);

    // Nothing new: no batch.
    tokio::time::sleep(INTERVAL).await;
    assert!(rx.try_recv().is_err());

    cancel.cancel();
    tracker.close();
    tracker.wait().await;
    assert_eq!(handle.await.unwrap(), JobExit::Stopped);
}

#[tokio::test(start_paused = true)]
async fn fatal_cycle_error_terminates_the_job() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.fail(
        &page_url(1),
        FetchError::Fatal(FetchFailure {
            kind: FailureKind::HttpStatus(404),
            message: "404 Not Found".into(),
        }),
    );

    let runner = JobRunner::new(
        job_config(TEMPLATE, &temp.path().join("job.pos")),
        fetcher.clone(),
        Arc::new(LogRecordSink),
    )
    .unwrap();

    let exit = runner.run(CancellationToken::new()).await;
    assert_eq!(exit.state(), JobState::Terminated);
    assert!(matches!(exit, JobExit::Terminated(CycleError::Fetch { .. })));
    assert_eq!(fetcher.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn retryable_failure_keeps_the_job_polling() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.fail(
        &page_url(1),
        FetchError::Retryable(FetchFailure {
            kind: FailureKind::HttpStatus(503),
            message: "503 Service Unavailable".into(),
        }),
    );

    let (tx, rx) = mpsc::channel();
    let runner = JobRunner::new(
        job_config(TEMPLATE, &temp.path().join("job.pos")),
        fetcher.clone(),
        Arc::new(ChannelRecordSink::new(tx)),
    )
    .unwrap();

    let tracker = TaskTracker::new();
    let cancel = CancellationToken::new();
    let handle = runner.start(&tracker, cancel.clone());

    tokio::time::sleep(INTERVAL * 3 + INTERVAL / 2).await;
    assert_eq!(fetcher.requests().len(), 3);
    assert!(rx.try_recv().is_err());

    // The site recovers.
    fetcher.page(&page_url(1), simple_listing(&["A"]));
    fetcher.page(&page_url(2), simple_listing(&["B"]));
    tokio::time::sleep(INTERVAL).await;
    assert_eq!(ids(&rx.try_recv().unwrap().records), vec!["A", "B"]);

    cancel.cancel();
    assert_eq!(handle.await.unwrap(), JobExit::Stopped);
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_first_tick_stops_immediately() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(StaticFetcher::new());
    let runner = JobRunner::new(
        job_config(TEMPLATE, &temp.path().join("job.pos")),
        fetcher.clone(),
        Arc::new(LogRecordSink),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(runner.run(cancel).await, JobExit::Stopped);
    assert!(fetcher.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropped_receiver_does_not_stop_the_job() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.page(&page_url(1), simple_listing(&["A"]));
    fetcher.page(&page_url(2), simple_listing(&["B"]));

    let (tx, rx) = mpsc::channel();
    drop(rx);
    let runner = JobRunner::new(
        job_config(TEMPLATE, &temp.path().join("job.pos")),
        fetcher.clone(),
        Arc::new(ChannelRecordSink::new(tx)),
    )
    .unwrap();

    let tracker = TaskTracker::new();
    let cancel = CancellationToken::new();
    let handle = runner.start(&tracker, cancel.clone());

    tokio::time::sleep(INTERVAL + INTERVAL / 2).await;
    assert_eq!(fetcher.requests().len(), 2);

    cancel.cancel();
    let exit = handle.await.unwrap();
    assert_eq!(exit, JobExit::Stopped);
    assert_eq!(exit.state(), JobState::Stopped);
}
