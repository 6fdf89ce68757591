//! Sync orchestrator: full-replace ingestion of one remote export.
//!
//! `Idle → Connecting → Clearing → Streaming → Flushing → Completed`, with
//! any error ending in `Failed`. Chunks are pulled from the network only
//! after the previous chunk's rows have been queued and any full batch has
//! been written, so memory stays at about one batch plus one chunk.
//!
//! Each batch is its own transaction. A failure mid-stream leaves the
//! batches already flushed in the store.

use std::pin::pin;

use chrono::Local;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::parser::StreamParser;
use super::source::CsvSource;
use super::SyncError;
use crate::config::SyncConfig;
use crate::db::VisitStore;
use crate::models::VisitRecord;

// ═══════════════════════════════════════════════════════════
// States & events
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Connecting,
    Clearing,
    Streaming,
    Flushing,
    Completed,
    Failed,
}

/// Notification emitted while a sync runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    StateChanged { state: SyncState },
    Progress { rows_processed: u64 },
    Log { line: String },
}

/// Receives sync notifications. The pipeline knows nothing about how
/// they are displayed.
pub trait SyncObserver: Send + Sync {
    fn notify(&self, event: SyncEvent);
}

impl<F> SyncObserver for F
where
    F: Fn(SyncEvent) + Send + Sync,
{
    fn notify(&self, event: SyncEvent) {
        self(event)
    }
}

/// Observer that drops every event.
pub struct NoopObserver;

impl SyncObserver for NoopObserver {
    fn notify(&self, _event: SyncEvent) {}
}

/// Forward events into a channel. A closed receiver is ignored.
pub fn channel_observer(tx: mpsc::UnboundedSender<SyncEvent>) -> impl SyncObserver {
    move |event| {
        let _ = tx.send(event);
    }
}

/// Final outcome of a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub logs: Vec<String>,
    /// Records in the store when the sync ended.
    pub record_count: u64,
}

// ═══════════════════════════════════════════════════════════
// Run bookkeeping
// ═══════════════════════════════════════════════════════════

/// Log lines and state transitions of one run.
struct SyncRun<'o> {
    observer: &'o dyn SyncObserver,
    logs: Vec<String>,
    state: SyncState,
}

impl<'o> SyncRun<'o> {
    fn new(observer: &'o dyn SyncObserver) -> Self {
        Self {
            observer,
            logs: Vec::new(),
            state: SyncState::Idle,
        }
    }

    fn transition(&mut self, state: SyncState) {
        tracing::debug!(from = ?self.state, to = ?state, "Sync state change");
        self.state = state;
        self.observer.notify(SyncEvent::StateChanged { state });
    }

    fn log(&mut self, message: impl AsRef<str>) {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message.as_ref());
        self.observer.notify(SyncEvent::Log { line: line.clone() });
        self.logs.push(line);
    }
}

// ═══════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════

/// Drives a sync end to end. `&mut self` on every run keeps at most one
/// sync active per orchestrator.
pub struct SyncOrchestrator {
    config: SyncConfig,
    source: CsvSource,
    state: SyncState,
}

impl SyncOrchestrator {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        let source = CsvSource::new(&config)?;
        Ok(Self {
            config,
            source,
            state: SyncState::Idle,
        })
    }

    /// State reached by the last run (`Idle` before the first).
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Fetch `resource_id` and replace the store contents with it.
    pub async fn sync<S: VisitStore>(
        &mut self,
        store: &mut S,
        resource_id: &str,
        observer: &dyn SyncObserver,
    ) -> SyncReport {
        let mut run = SyncRun::new(observer);
        run.transition(SyncState::Connecting);
        run.log("Connecting to export (stream mode)...");

        let result = match self.source.open(resource_id).await {
            Ok(stream) => self.ingest(store, stream, &mut run).await,
            Err(e) => Err(e),
        };
        self.finish(store, result, run)
    }

    /// Replace the store contents with an already-open chunk stream.
    pub async fn sync_stream<S, B>(
        &mut self,
        store: &mut S,
        stream: impl Stream<Item = Result<B, SyncError>>,
        observer: &dyn SyncObserver,
    ) -> SyncReport
    where
        S: VisitStore,
        B: AsRef<[u8]>,
    {
        let mut run = SyncRun::new(observer);
        run.transition(SyncState::Connecting);
        let result = self.ingest(store, stream, &mut run).await;
        self.finish(store, result, run)
    }

    async fn ingest<S, B>(
        &self,
        store: &mut S,
        stream: impl Stream<Item = Result<B, SyncError>>,
        run: &mut SyncRun<'_>,
    ) -> Result<u64, SyncError>
    where
        S: VisitStore,
        B: AsRef<[u8]>,
    {
        run.transition(SyncState::Clearing);
        store.clear()?;
        run.log("Cleared previous data.");

        run.transition(SyncState::Streaming);
        let batch_size = self.config.batch_size.max(1);
        let mut batch: Vec<VisitRecord> = Vec::with_capacity(batch_size.min(65_536));
        let mut processed = 0u64;
        let mut parser = StreamParser::new();
        let mut stream = pin!(stream);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for record in parser.feed(chunk.as_ref())? {
                self.accept(record, &mut batch, &mut processed, store, run).await?;
            }
        }
        if let Some(record) = parser.finish()? {
            self.accept(record, &mut batch, &mut processed, store, run).await?;
        }

        run.transition(SyncState::Flushing);
        if !batch.is_empty() {
            store.insert_batch(&batch)?;
            tracing::debug!(rows = batch.len(), "Flushed final batch");
            batch.clear();
        }

        let count = store.count()?;
        tracing::info!(processed, stored = count, "Sync stream complete");
        Ok(count)
    }

    async fn accept<S: VisitStore>(
        &self,
        record: VisitRecord,
        batch: &mut Vec<VisitRecord>,
        processed: &mut u64,
        store: &mut S,
        run: &mut SyncRun<'_>,
    ) -> Result<(), SyncError> {
        batch.push(record);
        *processed += 1;

        if batch.len() >= self.config.batch_size.max(1) {
            store.insert_batch(batch.as_slice())?;
            tracing::debug!(rows = batch.len(), total = *processed, "Flushed batch");
            batch.clear();
        }

        let interval = self.config.progress_interval;
        if interval > 0 && *processed % interval == 0 {
            run.observer.notify(SyncEvent::Progress {
                rows_processed: *processed,
            });
            run.log(format!("Processed {} rows...", group_thousands(*processed)));
            // Let other tasks (e.g. a UI) run during very large imports.
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    fn finish<S: VisitStore>(
        &mut self,
        store: &S,
        result: Result<u64, SyncError>,
        mut run: SyncRun<'_>,
    ) -> SyncReport {
        match result {
            Ok(count) => {
                run.log(format!("Done! {} rows in total.", group_thousands(count)));
                run.transition(SyncState::Completed);
                self.state = SyncState::Completed;
                SyncReport {
                    success: true,
                    message: format!("Synced {count} rows."),
                    logs: run.logs,
                    record_count: count,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, state = ?run.state, "Sync failed");
                let message = e.to_string();
                run.transition(SyncState::Failed);
                self.state = SyncState::Failed;
                let mut logs = run.logs;
                logs.push(format!("Error: {message}"));
                SyncReport {
                    success: false,
                    message,
                    logs,
                    record_count: store.count().unwrap_or(0),
                }
            }
        }
    }
}

/// `12345678` → `12,345,678`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures_util::stream;

    use super::*;
    use crate::db::{DatabaseError, SqliteVisitStore};
    use crate::models::Department;

    const HEADER: &str = "ngay_vao_vien,ten_khoa,thanh_tien,ten_bac_sy\n";

    fn orchestrator(batch_size: usize) -> SyncOrchestrator {
        SyncOrchestrator::new(SyncConfig {
            batch_size,
            ..SyncConfig::default()
        })
        .unwrap()
    }

    fn chunks(parts: Vec<String>) -> impl Stream<Item = Result<Vec<u8>, SyncError>> {
        stream::iter(parts.into_iter().map(|p| Ok(p.into_bytes())))
    }

    fn csv(rows: &[(&str, &str, i64)]) -> String {
        let mut out = HEADER.to_string();
        for (date, dept, revenue) in rows {
            out.push_str(&format!("{date},{dept},{revenue},BS. A\n"));
        }
        out
    }

    /// Records every event for inspection.
    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<SyncEvent>>>);

    impl SyncObserver for Recorder {
        fn notify(&self, event: SyncEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Recorder {
        fn states(&self) -> Vec<SyncState> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    SyncEvent::StateChanged { state } => Some(*state),
                    _ => None,
                })
                .collect()
        }

        fn progress(&self) -> Vec<u64> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    SyncEvent::Progress { rows_processed } => Some(*rows_processed),
                    _ => None,
                })
                .collect()
        }
    }

    /// Store that fails on the n-th insert_batch call.
    struct FailingStore {
        inner: SqliteVisitStore,
        fail_on_call: usize,
        calls: usize,
    }

    impl VisitStore for FailingStore {
        fn open(&mut self) -> Result<(), DatabaseError> {
            self.inner.open()
        }
        fn clear(&mut self) -> Result<(), DatabaseError> {
            self.inner.clear()
        }
        fn insert_batch(&mut self, records: &[VisitRecord]) -> Result<usize, DatabaseError> {
            self.calls += 1;
            if self.calls == self.fail_on_call {
                return Err(DatabaseError::MigrationFailed {
                    version: 0,
                    reason: "disk full".into(),
                });
            }
            self.inner.insert_batch(records)
        }
        fn scan_range(
            &self,
            start: Option<i64>,
            end: Option<i64>,
            visit: &mut dyn FnMut(VisitRecord),
        ) -> Result<u64, DatabaseError> {
            self.inner.scan_range(start, end, visit)
        }
        fn count(&self) -> Result<u64, DatabaseError> {
            self.inner.count()
        }
    }

    #[tokio::test]
    async fn successful_sync_walks_every_state() {
        let mut store = SqliteVisitStore::in_memory().unwrap();
        let mut orch = orchestrator(2);
        let recorder = Recorder::default();
        let input = csv(&[
            ("20251014", "Khoa Nội", 100),
            ("20251015", "Khoa Nhi", 200),
            ("20251016", "Khoa CĐHA", 300),
        ]);

        let report = orch
            .sync_stream(&mut store, chunks(vec![input]), &recorder)
            .await;

        assert!(report.success, "{report:?}");
        assert_eq!(report.record_count, 3);
        assert_eq!(report.message, "Synced 3 rows.");
        assert_eq!(
            recorder.states(),
            vec![
                SyncState::Connecting,
                SyncState::Clearing,
                SyncState::Streaming,
                SyncState::Flushing,
                SyncState::Completed,
            ]
        );
        assert_eq!(orch.state(), SyncState::Completed);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn dropped_rows_show_as_count_delta() {
        let mut store = SqliteVisitStore::in_memory().unwrap();
        let mut orch = orchestrator(10);
        let mut input = csv(&[("20251014", "Khoa Nội", 1), ("20251015", "Khoa Nội", 2)]);
        input.push_str("2025101,Khoa Nội,3,BS. A\n"); // bad date
        input.push_str("20251016\n"); // too few columns
        input.push_str("20251017,Khoa Nội,4,BS. A"); // unterminated

        let report = orch
            .sync_stream(&mut store, chunks(vec![input]), &NoopObserver)
            .await;
        assert!(report.success);
        assert_eq!(report.record_count, 3);
    }

    #[tokio::test]
    async fn sync_replaces_previous_dataset() {
        let mut store = SqliteVisitStore::in_memory().unwrap();
        let mut orch = orchestrator(1);

        let first = csv(&[("20251014", "Khoa Nội", 1), ("20251015", "Khoa Nội", 2)]);
        orch.sync_stream(&mut store, chunks(vec![first]), &NoopObserver).await;

        let second = csv(&[("20251101", "Khoa Nhi", 9)]);
        let report = orch
            .sync_stream(&mut store, chunks(vec![second]), &NoopObserver)
            .await;

        assert!(report.success);
        let records = store.query_range(None, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].department, Department::Pediatrics);
        assert_eq!(records[0].revenue, 9);
    }

    #[tokio::test]
    async fn missing_admission_column_fails_after_clear() {
        let mut store = SqliteVisitStore::in_memory().unwrap();
        store
            .insert_batch(&[VisitRecord::new(10, Department::Surgery, 1)])
            .unwrap();
        let mut orch = orchestrator(10);
        let recorder = Recorder::default();

        let report = orch
            .sync_stream(
                &mut store,
                chunks(vec!["ten_khoa,thanh_tien\nKhoa Nội,5\n".into()]),
                &recorder,
            )
            .await;

        assert!(!report.success);
        assert!(report.message.starts_with("Format error"));
        assert!(report.logs.last().unwrap().starts_with("Error: "));
        assert_eq!(recorder.states().last(), Some(&SyncState::Failed));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn unreadable_body_fails() {
        let mut store = SqliteVisitStore::in_memory().unwrap();
        let mut orch = orchestrator(10);
        let body = stream::iter(vec![
            Ok(csv(&[("20251014", "Khoa Nội", 1)]).into_bytes()),
            Err(SyncError::Connection("connection reset".into())),
        ]);

        let report = orch.sync_stream(&mut store, body, &NoopObserver).await;
        assert!(!report.success);
        assert!(report.message.contains("connection reset"));
        assert_eq!(orch.state(), SyncState::Failed);
    }

    #[tokio::test]
    async fn mid_stream_storage_failure_keeps_flushed_batches() {
        let mut store = FailingStore {
            inner: SqliteVisitStore::in_memory().unwrap(),
            fail_on_call: 3,
            calls: 0,
        };
        let mut orch = orchestrator(2);
        let rows: Vec<(String, &str, i64)> = (10..20)
            .map(|d| (format!("202510{d}"), "Khoa Nội", 1))
            .collect();
        let rows: Vec<(&str, &str, i64)> = rows.iter().map(|(d, k, r)| (d.as_str(), *k, *r)).collect();

        let report = orch
            .sync_stream(&mut store, chunks(vec![csv(&rows)]), &NoopObserver)
            .await;

        assert!(!report.success);
        assert!(report.message.starts_with("Storage error"));
        // Two batches of two committed before the third failed
        assert_eq!(store.count().unwrap(), 4);
        assert_eq!(report.record_count, 4);
    }

    #[tokio::test]
    async fn progress_emitted_every_interval() {
        let mut store = SqliteVisitStore::in_memory().unwrap();
        let mut orch = SyncOrchestrator::new(SyncConfig {
            batch_size: 7,
            progress_interval: 10,
            ..SyncConfig::default()
        })
        .unwrap();
        let recorder = Recorder::default();
        let dates: Vec<String> = (0..25).map(|i| format!("202510{:02}", i + 1)).collect();
        let rows: Vec<(&str, &str, i64)> = dates.iter().map(|d| (d.as_str(), "Khoa Nhi", 1)).collect();

        let report = orch
            .sync_stream(&mut store, chunks(vec![csv(&rows)]), &recorder)
            .await;

        assert!(report.success);
        assert_eq!(recorder.progress(), vec![10, 20]);
        assert!(report.logs.iter().any(|l| l.ends_with("Processed 20 rows...")));
        assert_eq!(store.count().unwrap(), 25);
    }

    #[tokio::test]
    async fn channel_observer_receives_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = channel_observer(tx);
        let mut store = SqliteVisitStore::in_memory().unwrap();
        let mut orch = orchestrator(10);

        orch.sync_stream(
            &mut store,
            chunks(vec![csv(&[("20251014", "Khoa Nội", 1)])]),
            &observer,
        )
        .await;

        let mut saw_completed = false;
        while let Ok(event) = rx.try_recv() {
            if event == (SyncEvent::StateChanged { state: SyncState::Completed }) {
                saw_completed = true;
            }
        }
        assert!(saw_completed);
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }
}
