//! Bounded-concurrency batch executor.
//!
//! Runs a per-file operation over a batch with a global concurrency cap,
//! a per-file wall-clock timeout, and full error isolation: one file's
//! failure (error, timeout, or panic) never cancels its siblings, and the
//! result always contains one entry per input file in input order.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::error::IngestError;
use crate::types::{FileInput, FileOutcome, FileReport};

/// Which per-batch size limit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Schema,
    Convert,
    Ingest,
}

#[derive(Debug, Clone)]
pub struct BatchLimits {
    pub max_concurrent: usize,
    pub per_file_timeout: Duration,
    pub max_files_schema: usize,
    pub max_files_ingest: usize,
    pub max_files_convert: usize,
}

impl BatchLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.batch_max_concurrent,
            per_file_timeout: config.per_file_timeout(),
            max_files_schema: config.batch_max_files_schema,
            max_files_ingest: config.batch_max_files_ingest,
            max_files_convert: config.batch_max_files_convert,
        }
    }

    fn max_files(&self, kind: OpKind) -> usize {
        match kind {
            OpKind::Schema => self.max_files_schema,
            OpKind::Ingest => self.max_files_ingest,
            OpKind::Convert => self.max_files_convert,
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            per_file_timeout: Duration::from_secs(60),
            max_files_schema: 50,
            max_files_ingest: 20,
            max_files_convert: 20,
        }
    }
}

/// Process-wide gate for per-file work. One instance is constructed at
/// startup and shared by every entrypoint; the semaphore is the only
/// backpressure mechanism in the pipeline.
pub struct BatchExecutor {
    semaphore: Arc<Semaphore>,
    limits: BatchLimits,
}

impl BatchExecutor {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limits.max_concurrent)),
            limits,
        }
    }

    pub fn per_file_timeout(&self) -> Duration {
        self.limits.per_file_timeout
    }

    /// Run `op` over `files` with bounded concurrency.
    ///
    /// Rejects synchronously with `BatchTooLarge` when the batch exceeds the
    /// per-kind limit. Otherwise returns one `FileReport` per input file in
    /// input order; a timed-out file reports `error = "timeout"`, a panicking
    /// or failing operation reports its message, and cancellation marks the
    /// remaining files cancelled. Files are never retried.
    pub async fn run_batch<F, Fut>(
        &self,
        files: Vec<FileInput>,
        kind: OpKind,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<Vec<FileReport>, IngestError>
    where
        F: Fn(FileInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FileOutcome, IngestError>> + Send + 'static,
    {
        let limit = self.limits.max_files(kind);
        if files.len() > limit {
            return Err(IngestError::BatchTooLarge {
                submitted: files.len(),
                limit,
            });
        }

        let op = Arc::new(op);
        let timeout = self.limits.per_file_timeout;
        let mut join = JoinSet::new();

        for (idx, file) in files.into_iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let op = Arc::clone(&op);
            let cancel = cancel.clone();
            let filename = file.name.clone();

            join.spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return (idx, FileReport::failed(filename, "executor shut down")),
                };

                if cancel.is_cancelled() {
                    return (idx, FileReport::failed(filename, "cancelled"));
                }

                let result = tokio::select! {
                    _ = cancel.cancelled() => {
                        return (idx, FileReport::failed(filename, "cancelled"));
                    }
                    res = AssertUnwindSafe(tokio::time::timeout(timeout, op(file)))
                        .catch_unwind() => res,
                };
                drop(permit);

                let report = match result {
                    Ok(Ok(Ok(outcome))) => FileReport::success(filename, outcome),
                    Ok(Ok(Err(IngestError::Validation(report)))) => {
                        FileReport::failed_validation(filename, report)
                    }
                    Ok(Ok(Err(err))) => FileReport::failed(filename, err.to_string()),
                    Ok(Err(_elapsed)) => FileReport::failed(filename, "timeout"),
                    Err(panic) => {
                        let msg = panic_message(panic);
                        warn!(panic = %msg, "per-file operation panicked");
                        FileReport::failed(filename, format!("panic: {msg}"))
                    }
                };
                (idx, report)
            });
        }

        let mut entries: Vec<Option<FileReport>> = (0..join.len()).map(|_| None).collect();
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((idx, report)) => entries[idx] = Some(report),
                // Tasks trap panics themselves; a JoinError here means the
                // runtime aborted the task.
                Err(e) => warn!(error = %e, "batch task aborted"),
            }
        }

        Ok(entries
            .into_iter()
            .flatten()
            .collect())
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
