//! Write serialization: concurrent submissions, one transaction at a time.
//!
//! [`WriteSerializer`] accepts write requests from any number of
//! concurrent tasks and commits them through a single dedicated consumer
//! thread, in exactly the order submissions complete the handoff. The
//! handoff is a bounded channel of depth one, so a slow storage layer
//! throttles submitters instead of letting requests queue without bound.
//!
//! Commit failures are rolled back, logged, and dropped; they are never
//! reported to the submitter, because `submit` has already returned by the
//! time the transaction runs. This is a documented limitation of the write
//! path, not an oversight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::StorageError;
use crate::proto;
use crate::storage::Storage;

/// How often the reporter thread logs the samples-written counter.
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Serializes concurrent write submissions into FIFO storage transactions.
///
/// The only process-wide mutable state on the write path (the handoff slot
/// and the samples-written counter) lives behind this type and is touched
/// only by the consumer protocol; read-path code never sees it.
pub struct WriteSerializer {
    tx: mpsc::Sender<proto::WriteRequest>,
    consumer: thread::JoinHandle<()>,
}

impl WriteSerializer {
    /// Starts the consumer thread over `storage` and the reporter thread.
    ///
    /// The consumer owns the write connection for the life of the
    /// serializer. The reporter wakes on a fixed interval and logs the
    /// number of samples written since its last wakeup, skipping zeros;
    /// the counter is advisory and carries no correctness guarantee.
    #[must_use]
    pub fn spawn(storage: Storage) -> Self {
        // Depth-one handoff: one request may sit in the slot while the
        // consumer works; further submitters park until it is taken.
        let (tx, rx) = mpsc::channel(1);

        let samples_written = Arc::new(AtomicU64::new(0));
        spawn_reporter(Arc::downgrade(&samples_written));

        let consumer = thread::spawn(move || consume(storage, rx, samples_written));

        Self { tx, consumer }
    }

    /// Submits one write request for serialized ingestion.
    ///
    /// Completes as soon as the consumer's handoff slot accepts the
    /// request, before the transaction runs; this is the write path's
    /// backpressure point. Whether the transaction later commits is not
    /// observable here.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriterUnavailable`] if the consumer has
    /// stopped.
    pub async fn submit(&self, request: proto::WriteRequest) -> Result<(), StorageError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| StorageError::WriterUnavailable)
    }

    /// Stops accepting submissions and waits for the consumer to apply
    /// everything already accepted.
    pub fn shutdown(self) {
        drop(self.tx);
        if self.consumer.join().is_err() {
            tracing::error!("write consumer thread panicked");
        }
    }
}

/// Consumer loop: exactly one request, one transaction, at a time.
fn consume(
    mut storage: Storage,
    mut rx: mpsc::Receiver<proto::WriteRequest>,
    samples_written: Arc<AtomicU64>,
) {
    while let Some(request) = rx.blocking_recv() {
        match storage.insert_write_request(&request) {
            Ok(inserted) => {
                samples_written.fetch_add(inserted as u64, Ordering::Relaxed);
            }
            Err(e) => {
                // The request is dropped; the submitter was acknowledged
                // before the transaction ran and cannot be notified.
                tracing::warn!("dropping write request: {e}");
            }
        }
    }
}

/// Reporter loop. Holds only a weak reference so it exits once the
/// serializer and its consumer are gone.
fn spawn_reporter(counter: std::sync::Weak<AtomicU64>) {
    thread::spawn(move || {
        loop {
            thread::sleep(REPORT_INTERVAL);
            let Some(counter) = counter.upgrade() else {
                break;
            };
            let written = counter.swap(0, Ordering::Relaxed);
            if written > 0 {
                tracing::info!(samples = written, "samples written");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::METRIC_NAME_LABEL;
    use crate::storage::SampleRow;
    use crate::translate;

    fn request(name: &str, timestamps: &[i64]) -> proto::WriteRequest {
        proto::WriteRequest {
            timeseries: vec![proto::TimeSeries {
                labels: vec![proto::Label {
                    name: METRIC_NAME_LABEL.to_string(),
                    value: name.to_string(),
                }],
                samples: timestamps
                    .iter()
                    .map(|&timestamp| proto::Sample {
                        value: 1.0,
                        timestamp,
                    })
                    .collect(),
            }],
        }
    }

    fn all_rows(storage: &Storage) -> Vec<SampleRow> {
        let predicate = translate::translate(&proto::Query {
            start_timestamp_ms: 0,
            end_timestamp_ms: i64::MAX,
            matchers: vec![],
        })
        .unwrap();
        storage.query_samples(&predicate).unwrap()
    }

    #[tokio::test]
    async fn test_submit_commits_through_consumer() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("writer.sqlite");

        let writer = WriteSerializer::spawn(Storage::open(&db).unwrap());
        writer.submit(request("cpu_usage", &[1000, 2000])).await.unwrap();
        writer.shutdown();

        let storage = Storage::open(&db).unwrap();
        assert_eq!(all_rows(&storage).len(), 2);
    }

    #[tokio::test]
    async fn test_submit_without_consumer_fails() {
        // A serializer whose consumer is gone must refuse submissions
        // instead of queueing them silently.
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let writer = WriteSerializer {
            tx,
            consumer: thread::spawn(|| {}),
        };

        let err = writer.submit(request("cpu_usage", &[1000])).await.unwrap_err();
        assert!(matches!(err, StorageError::WriterUnavailable));
    }
}
