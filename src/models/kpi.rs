use serde::{Deserialize, Serialize};

use super::enums::{Department, ServiceGroup};

/// Which aggregate a plan target is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiMetric {
    /// Center-wide revenue, in millions.
    TotalRevenue,
    /// Center-wide examination count.
    ExamCount,
    /// Center-wide inpatient count.
    InpatientCount,
    /// Center-wide laboratory / imaging count.
    AncillaryCount,
    /// Revenue of the target's own department, in millions.
    DepartmentRevenue,
}

/// Static annual plan target.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiTarget {
    pub department: Department,
    pub name: &'static str,
    pub unit: &'static str,
    pub plan_year: f64,
    pub group: ServiceGroup,
    pub metric: KpiMetric,
}

/// Plan vs. actual for one target. Rebuilt on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiEntry {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub department: Department,
    pub plan_year: f64,
    pub actual: f64,
    pub group: ServiceGroup,
    /// Placeholder value generated while the store is empty.
    pub simulated: bool,
}
