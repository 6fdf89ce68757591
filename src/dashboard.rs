//! Dashboard façade: one visit store, one sync orchestrator.
//!
//! `sync` takes `&mut self`, so a query can never observe a store that
//! is halfway through a replace.

use std::path::Path;

use chrono::Local;
use rand::Rng;
use thiserror::Error;

use crate::analytics::{aggregate_range, merge_kpis, ActualsMode, DashboardReport};
use crate::config::SyncConfig;
use crate::db::{DatabaseError, SqliteVisitStore, SyncRunRecord, VisitStore};
use crate::pipeline::ingest::{SyncError, SyncObserver, SyncOrchestrator, SyncReport};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Sync setup error: {0}")]
    Sync(#[from] SyncError),
}

pub struct Dashboard {
    store: SqliteVisitStore,
    orchestrator: SyncOrchestrator,
}

impl Dashboard {
    /// Open the store file at `path`, running migrations.
    pub fn open(path: &Path, config: SyncConfig) -> Result<Self, DashboardError> {
        Self::with_store(SqliteVisitStore::open_path(path)?, config)
    }

    /// Dashboard over an in-memory store (for testing).
    pub fn in_memory(config: SyncConfig) -> Result<Self, DashboardError> {
        Self::with_store(SqliteVisitStore::in_memory()?, config)
    }

    fn with_store(mut store: SqliteVisitStore, config: SyncConfig) -> Result<Self, DashboardError> {
        store.open()?;
        Ok(Self {
            store,
            orchestrator: SyncOrchestrator::new(config)?,
        })
    }

    pub fn store(&self) -> &SqliteVisitStore {
        &self.store
    }

    /// Replace the store contents with the export of `resource_id`.
    /// The outcome is also appended to the sync run log.
    pub async fn sync(&mut self, resource_id: &str, observer: &dyn SyncObserver) -> SyncReport {
        let started_at = Local::now().to_rfc3339();
        tracing::info!(resource_id, "Sync started");

        let report = self
            .orchestrator
            .sync(&mut self.store, resource_id, observer)
            .await;

        let run = SyncRunRecord {
            resource_id: resource_id.trim().to_string(),
            started_at,
            finished_at: Local::now().to_rfc3339(),
            success: report.success,
            record_count: report.record_count,
            message: report.message.clone(),
        };
        if let Err(e) = self.store.record_sync_run(&run) {
            tracing::warn!(error = %e, "Failed to record sync run");
        }

        tracing::info!(
            success = report.success,
            records = report.record_count,
            "Sync finished"
        );
        report
    }

    /// Build all views for records admitted within `[start, end]`
    /// (epoch milliseconds, either bound optional).
    pub fn query(&self, start: Option<i64>, end: Option<i64>) -> Result<DashboardReport, DashboardError> {
        self.query_with_rng(start, end, &mut rand::thread_rng())
    }

    /// [`Dashboard::query`] with a caller-supplied source for simulated actuals.
    pub fn query_with_rng<R: Rng + ?Sized>(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        rng: &mut R,
    ) -> Result<DashboardReport, DashboardError> {
        let agg = aggregate_range(&self.store, start, end)?;
        let mode = if agg.is_empty() {
            ActualsMode::for_store_count(self.store.count()?)
        } else {
            ActualsMode::Measured
        };
        let kpis = merge_kpis(&agg, mode, rng);
        tracing::debug!(records = agg.records, ?mode, "Dashboard query");
        Ok(DashboardReport::build(agg, kpis, mode))
    }

    pub fn last_sync(&self) -> Result<Option<SyncRunRecord>, DashboardError> {
        Ok(self.store.last_sync_run()?)
    }
}
