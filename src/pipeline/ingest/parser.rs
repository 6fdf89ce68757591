//! Streaming CSV parser: byte chunks in, visit records out.
//!
//! Chunks are appended to a byte buffer and split on `\n`; the trailing
//! fragment waits for the next chunk. Splitting on bytes keeps multi-byte
//! UTF-8 characters intact across chunk boundaries, since `\n` never
//! occurs inside one.

use super::date::{parse_his_instant, INVALID_INSTANT};
use super::header::ColumnMap;
use super::tokenize::tokenize_line;
use super::SyncError;
use crate::models::VisitRecord;
use crate::taxonomy::map_department;

/// Incremental parser for one export stream.
#[derive(Debug, Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
    columns: Option<ColumnMap>,
    rows_accepted: u64,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records produced so far.
    pub fn rows_accepted(&self) -> u64 {
        self.rows_accepted
    }

    /// Feed one chunk; returns the records completed by it.
    ///
    /// Fails with [`SyncError::Format`] when the header lacks an
    /// admission-date column. Malformed data rows are dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<VisitRecord>, SyncError> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };

        let remainder = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, remainder);

        let mut records = Vec::new();
        for line in complete.split(|b| *b == b'\n') {
            if let Some(record) = self.parse_line(line)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Flush the unterminated last line at end of stream.
    pub fn finish(&mut self) -> Result<Option<VisitRecord>, SyncError> {
        let rest = std::mem::take(&mut self.buffer);
        self.parse_line(&rest)
    }

    fn parse_line(&mut self, raw: &[u8]) -> Result<Option<VisitRecord>, SyncError> {
        let decoded = String::from_utf8_lossy(raw);
        let line = decoded.strip_suffix('\r').unwrap_or(&*decoded);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let Some(columns) = self.columns.as_ref() else {
            // A leading UTF-8 BOM is not part of the first column name.
            let tokens = tokenize_line(line.strip_prefix('\u{feff}').unwrap_or(line));
            let columns = ColumnMap::resolve(&tokens).ok_or_else(|| {
                SyncError::Format("admission date column (NGAY_VAO_VIEN) not found in header".into())
            })?;
            let missing = columns.missing_roles();
            if !missing.is_empty() {
                tracing::info!(?missing, "Optional columns absent from export header");
            }
            self.columns = Some(columns);
            return Ok(None);
        };

        let tokens = tokenize_line(line);
        let record = build_record(columns, &tokens);
        if record.is_some() {
            self.rows_accepted += 1;
        }
        Ok(record)
    }
}

/// Map one tokenized data row; `None` drops the row.
fn build_record(columns: &ColumnMap, tokens: &[String]) -> Option<VisitRecord> {
    // Rows with fewer than half the header's columns are truncated or junk.
    if tokens.len() * 2 < columns.width {
        return None;
    }

    let cell = |index: Option<usize>| -> &str {
        index
            .and_then(|i| tokens.get(i))
            .map(String::as_str)
            .unwrap_or("")
    };

    let admitted_at = parse_his_instant(cell(Some(columns.admission_date)));
    if admitted_at == INVALID_INSTANT {
        return None;
    }

    let discharged_at = columns
        .discharge_date
        .map(|i| parse_his_instant(cell(Some(i))))
        .filter(|instant| *instant != INVALID_INSTANT);

    Some(VisitRecord {
        admitted_at,
        discharged_at,
        department: map_department(cell(columns.department)),
        revenue: parse_revenue(cell(columns.revenue)),
        clinician: cell(columns.clinician).to_string(),
        diagnosis_code: first_diagnosis_code(cell(columns.diagnosis_code)),
        diagnosis_name: cell(columns.diagnosis_name).to_string(),
        service_group: cell(columns.service_group).to_string(),
        treatment_code: cell(columns.treatment_outcome).to_string(),
        discharge_code: cell(columns.discharge_disposition).to_string(),
        patient_type_code: cell(columns.patient_type).to_string(),
    })
}

/// Largest amount accepted for one row. Anything above is corrupt.
pub const MAX_ROW_REVENUE: i64 = 1_000_000_000_000_000;

/// Currency amount as whole units; unparseable, negative or above
/// [`MAX_ROW_REVENUE`] → 0.
pub fn parse_revenue(raw: &str) -> i64 {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(value) => value,
        Err(_) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 && value <= MAX_ROW_REVENUE as f64 => {
                value.trunc() as i64
            }
            _ => 0,
        },
    };
    if (0..=MAX_ROW_REVENUE).contains(&value) {
        value
    } else {
        0
    }
}

/// Several codes may be `;`-separated; only the primary one is kept.
fn first_diagnosis_code(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_string()
}
