use serde::{Deserialize, Serialize};

use super::enums::Department;

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// One ingested export row, normalized.
///
/// Instants are epoch milliseconds of the local wall-clock time written in
/// the export. `admitted_at` is always positive for stored records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub admitted_at: i64,
    pub discharged_at: Option<i64>,
    pub department: Department,
    /// Non-negative currency units.
    pub revenue: i64,
    pub clinician: String,
    pub diagnosis_code: String,
    pub diagnosis_name: String,
    pub service_group: String,
    pub treatment_code: String,
    pub discharge_code: String,
    pub patient_type_code: String,
}

impl VisitRecord {
    /// Minimal record for an admission; all optional fields empty.
    pub fn new(admitted_at: i64, department: Department, revenue: i64) -> Self {
        Self {
            admitted_at,
            discharged_at: None,
            department,
            revenue: revenue.max(0),
            clinician: String::new(),
            diagnosis_code: String::new(),
            diagnosis_name: String::new(),
            service_group: String::new(),
            treatment_code: String::new(),
            discharge_code: String::new(),
            patient_type_code: String::new(),
        }
    }

    /// Days of treatment: whole days between admission and discharge,
    /// rounded up, never less than one. `None` without a discharge.
    pub fn treated_days(&self) -> Option<i64> {
        let discharged = self.discharged_at?;
        let span = (discharged - self.admitted_at).abs();
        let days = (span + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
        Some(days.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treated_days_rounds_up_partial_days() {
        let mut visit = VisitRecord::new(1_000, Department::InternalMedicine, 0);
        visit.discharged_at = Some(1_000 + MILLIS_PER_DAY + 1);
        assert_eq!(visit.treated_days(), Some(2));
    }

    #[test]
    fn same_instant_counts_one_day() {
        let mut visit = VisitRecord::new(5_000, Department::Pediatrics, 0);
        visit.discharged_at = Some(5_000);
        assert_eq!(visit.treated_days(), Some(1));
    }

    #[test]
    fn no_discharge_no_days() {
        let visit = VisitRecord::new(5_000, Department::Pediatrics, 0);
        assert_eq!(visit.treated_days(), None);
    }

    #[test]
    fn negative_revenue_clamped() {
        let visit = VisitRecord::new(5_000, Department::Pediatrics, -20);
        assert_eq!(visit.revenue, 0);
    }
}
