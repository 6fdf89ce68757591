//! Visit store: the persisted record collection behind a four-operation
//! contract (open / clear / insert_batch / query_range) plus count.
//!
//! Records are keyed by a monotonic insertion id and indexed on admission
//! instant. Each sync empties the store and repopulates it in batches; every
//! batch is one transaction.

use std::path::Path;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::sqlite::{open_database, open_memory_database, run_migrations};
use super::DatabaseError;
use crate::models::{Department, VisitRecord};

/// Persistent keyed collection of visit records with a time index.
pub trait VisitStore: Send {
    /// Ensure schema and index exist. Safe to call repeatedly.
    fn open(&mut self) -> Result<(), DatabaseError>;

    /// Delete every record.
    fn clear(&mut self) -> Result<(), DatabaseError>;

    /// Insert all records in one transaction: either every record
    /// commits or none does. Returns the number inserted.
    fn insert_batch(&mut self, records: &[VisitRecord]) -> Result<usize, DatabaseError>;

    /// Visit each record whose admission instant lies in `[start, end]`.
    /// Missing bounds are open. Returns the number of records visited.
    fn scan_range(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        visit: &mut dyn FnMut(VisitRecord),
    ) -> Result<u64, DatabaseError>;

    /// Total number of stored records.
    fn count(&self) -> Result<u64, DatabaseError>;

    /// Collect the records of `[start, end]` into memory.
    fn query_range(
        &self,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<VisitRecord>, DatabaseError> {
        let mut records = Vec::new();
        self.scan_range(start, end, &mut |record| records.push(record))?;
        Ok(records)
    }
}

/// Outcome of one sync, kept for status display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunRecord {
    pub resource_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub success: bool,
    pub record_count: u64,
    pub message: String,
}

/// SQLite-backed visit store.
pub struct SqliteVisitStore {
    conn: Connection,
}

impl SqliteVisitStore {
    /// Open (or create) the store file at `path`.
    pub fn open_path(path: &Path) -> Result<Self, DatabaseError> {
        let conn = open_database(path)?;
        tracing::debug!(path = %path.display(), "Visit store opened");
        Ok(Self { conn })
    }

    /// Store backed by an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    pub fn record_sync_run(&self, run: &SyncRunRecord) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO sync_runs (resource_id, started_at, finished_at, success, record_count, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.resource_id,
                run.started_at,
                run.finished_at,
                run.success,
                run.record_count as i64,
                run.message,
            ],
        )?;
        Ok(())
    }

    pub fn last_sync_run(&self) -> Result<Option<SyncRunRecord>, DatabaseError> {
        let run = self
            .conn
            .query_row(
                "SELECT resource_id, started_at, finished_at, success, record_count, message
                 FROM sync_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(SyncRunRecord {
                        resource_id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        success: row.get(3)?,
                        record_count: row.get::<_, i64>(4)?.max(0) as u64,
                        message: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }
}

impl VisitStore for SqliteVisitStore {
    fn open(&mut self) -> Result<(), DatabaseError> {
        run_migrations(&self.conn)
    }

    fn clear(&mut self) -> Result<(), DatabaseError> {
        let removed = self.conn.execute("DELETE FROM visits", [])?;
        tracing::debug!(removed, "Visit store cleared");
        Ok(())
    }

    fn insert_batch(&mut self, records: &[VisitRecord]) -> Result<usize, DatabaseError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO visits (admitted_at, discharged_at, department, revenue, clinician,
                 diagnosis_code, diagnosis_name, service_group, treatment_code, discharge_code,
                 patient_type_code)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.admitted_at,
                    record.discharged_at,
                    record.department.as_str(),
                    record.revenue,
                    record.clinician,
                    record.diagnosis_code,
                    record.diagnosis_name,
                    record.service_group,
                    record.treatment_code,
                    record.discharge_code,
                    record.patient_type_code,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn scan_range(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        visit: &mut dyn FnMut(VisitRecord),
    ) -> Result<u64, DatabaseError> {
        const COLUMNS: &str = "SELECT admitted_at, discharged_at, department, revenue, clinician,
             diagnosis_code, diagnosis_name, service_group, treatment_code, discharge_code,
             patient_type_code FROM visits";

        let (sql, bounds): (String, Vec<i64>) = match (start, end) {
            (Some(s), Some(e)) => (
                format!("{COLUMNS} WHERE admitted_at BETWEEN ?1 AND ?2 ORDER BY admitted_at"),
                vec![s, e],
            ),
            (Some(s), None) => (
                format!("{COLUMNS} WHERE admitted_at >= ?1 ORDER BY admitted_at"),
                vec![s],
            ),
            (None, Some(e)) => (
                format!("{COLUMNS} WHERE admitted_at <= ?1 ORDER BY admitted_at"),
                vec![e],
            ),
            (None, None) => (format!("{COLUMNS} ORDER BY id"), Vec::new()),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(bounds))?;
        let mut visited = 0u64;
        while let Some(row) = rows.next()? {
            let department: String = row.get(2)?;
            visit(VisitRecord {
                admitted_at: row.get(0)?,
                discharged_at: row.get(1)?,
                department: Department::from_str(&department)?,
                revenue: row.get(3)?,
                clinician: row.get(4)?,
                diagnosis_code: row.get(5)?,
                diagnosis_name: row.get(6)?,
                service_group: row.get(7)?,
                treatment_code: row.get(8)?,
                discharge_code: row.get(9)?,
                patient_type_code: row.get(10)?,
            });
            visited += 1;
        }
        Ok(visited)
    }

    fn count(&self) -> Result<u64, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visits", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
