use std::sync::mpsc;

use pagewatch_logging::{job_info, job_warn};

use crate::RecordBatch;

/// Downstream consumer of the records a job produces.
pub trait RecordSink: Send + Sync {
    fn emit(&self, batch: RecordBatch);
}

pub struct ChannelRecordSink {
    tx: mpsc::Sender<RecordBatch>,
}

impl ChannelRecordSink {
    pub fn new(tx: mpsc::Sender<RecordBatch>) -> Self {
        Self { tx }
    }
}

impl RecordSink for ChannelRecordSink {
    fn emit(&self, batch: RecordBatch) {
        if let Err(mpsc::SendError(lost)) = self.tx.send(batch) {
            job_warn!(
                lost.job,
                "Receiver gone, dropped {} new records",
                lost.records.len()
            );
        }
    }
}

/// Writes every record to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecordSink;

impl RecordSink for LogRecordSink {
    fn emit(&self, batch: RecordBatch) {
        for record in &batch.records {
            job_info!(batch.job, "New item {:?}: {} <{}>", record.id, record.body, record.url);
        }
    }
}
