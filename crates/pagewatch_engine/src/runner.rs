use std::sync::Arc;
use std::time::Duration;

use pagewatch_logging::{job_error, job_info};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{ConfigError, ScrapeJobConfig};
use crate::cycle::{CycleError, ScrapeCycle};
use crate::fetch::DocumentFetcher;
use crate::sink::RecordSink;
use crate::{JobState, RecordBatch};

/// How a job's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobExit {
    Stopped,
    Terminated(CycleError),
}

impl JobExit {
    pub fn state(&self) -> JobState {
        match self {
            JobExit::Stopped => JobState::Stopped,
            JobExit::Terminated(_) => JobState::Terminated,
        }
    }
}

/// Runs one cycle per poll interval until cancelled or until a cycle fails.
pub struct JobRunner {
    cycle: ScrapeCycle,
    interval: Duration,
    sink: Arc<dyn RecordSink>,
    state: JobState,
}

impl JobRunner {
    pub fn new(
        config: ScrapeJobConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let interval = config.poll_interval();
        Ok(Self {
            cycle: ScrapeCycle::new(config, fetcher)?,
            interval,
            sink,
            state: JobState::Idle,
        })
    }

    pub fn job(&self) -> &str {
        self.cycle.job()
    }

    /// Spawn the job on `tracker`; the host waits on the tracker at shutdown.
    pub fn start(self, tracker: &TaskTracker, cancel: CancellationToken) -> JoinHandle<JobExit> {
        tracker.spawn(self.run(cancel))
    }

    /// The first cycle runs one interval after the call. Cycles never
    /// overlap; a slow cycle delays the next tick instead of bunching ticks.
    pub async fn run(mut self, cancel: CancellationToken) -> JobExit {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.transition(JobState::Running);

        let exit = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break JobExit::Stopped,
                _ = ticker.tick() => {}
            }

            match self.cycle.run(&cancel).await {
                Ok(records) => {
                    if !records.is_empty() {
                        self.sink.emit(RecordBatch {
                            job: self.cycle.job().to_string(),
                            records,
                        });
                    }
                }
                Err(err) => {
                    job_error!(self.cycle.job(), "Cycle failed, stopping job: {}", err);
                    break JobExit::Terminated(err);
                }
            }
        };

        self.transition(exit.state());
        exit
    }

    fn transition(&mut self, next: JobState) {
        job_info!(self.cycle.job(), "Job {} -> {}", self.state, next);
        self.state = next;
    }
}
