//! Ranked, serializable dashboard views built from an aggregation.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::aggregate::{AggregationResult, CountRevenue, OutcomeAggregate};
use super::kpi::ActualsMode;
use crate::models::{Department, KpiEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentShare {
    pub cases: u64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisStat {
    pub code: String,
    pub name: String,
    pub cases: u64,
    pub revenue: i64,
    pub days_treatment: i64,
    pub dept_distribution: BTreeMap<Department, DepartmentShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianServiceStat {
    pub name: String,
    pub group: String,
    pub count: u64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianStat {
    pub id: String,
    pub name: String,
    pub department: Department,
    pub revenue: i64,
    pub service_count: u64,
    pub details: Vec<ClinicianServiceStat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeKind {
    Treatment,
    Discharge,
    PatientType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeStat {
    pub name: String,
    pub value: u64,
    #[serde(rename = "type")]
    pub kind: OutcomeKind,
    pub dept_distribution: BTreeMap<Department, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStat {
    pub id: String,
    pub name: String,
    pub revenue: i64,
    pub count: u64,
}

/// Everything a dashboard query returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub kpis: Vec<KpiEntry>,
    pub diagnosis_stats: Vec<DiagnosisStat>,
    pub clinician_stats: Vec<ClinicianStat>,
    pub outcome_stats: Vec<OutcomeStat>,
    pub group_stats: Vec<GroupStat>,
    /// Records inside the queried range.
    pub record_count: u64,
    pub actuals_mode: ActualsMode,
}

impl DashboardReport {
    pub fn build(agg: AggregationResult, kpis: Vec<KpiEntry>, actuals_mode: ActualsMode) -> Self {
        let record_count = agg.records;
        Self {
            kpis,
            outcome_stats: outcome_stats(&agg),
            group_stats: group_stats(&agg.service_groups),
            diagnosis_stats: diagnosis_stats(&agg),
            clinician_stats: clinician_stats(&agg),
            record_count,
            actuals_mode,
        }
    }
}

// Ties are broken by key so output order does not depend on hash order.

fn diagnosis_stats(agg: &AggregationResult) -> Vec<DiagnosisStat> {
    let mut stats: Vec<DiagnosisStat> = agg
        .diagnoses
        .iter()
        .map(|(code, diag)| DiagnosisStat {
            code: code.clone(),
            name: if diag.name.is_empty() {
                code.clone()
            } else {
                diag.name.clone()
            },
            cases: diag.count,
            revenue: diag.revenue,
            days_treatment: diag.treated_days,
            dept_distribution: diag
                .by_department
                .iter()
                .map(|(dept, share)| {
                    (
                        *dept,
                        DepartmentShare {
                            cases: share.count,
                            revenue: share.revenue,
                        },
                    )
                })
                .collect(),
        })
        .collect();
    stats.sort_by(|a, b| b.cases.cmp(&a.cases).then_with(|| a.code.cmp(&b.code)));
    stats
}

fn clinician_stats(agg: &AggregationResult) -> Vec<ClinicianStat> {
    let mut stats: Vec<ClinicianStat> = agg
        .clinicians
        .iter()
        .map(|(name, clinician)| {
            let mut details: Vec<ClinicianServiceStat> = clinician
                .by_service_group
                .iter()
                .map(|(group, totals)| ClinicianServiceStat {
                    name: group.clone(),
                    group: group.clone(),
                    count: totals.count,
                    revenue: totals.revenue,
                })
                .collect();
            details.sort_by_key(|d| (Reverse(d.revenue), d.name.clone()));

            ClinicianStat {
                id: name.clone(),
                name: name.clone(),
                department: clinician.department,
                revenue: clinician.revenue,
                service_count: clinician.count,
                details,
            }
        })
        .collect();
    stats.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.id.cmp(&b.id)));
    stats
}

fn outcome_rows<K: Copy + Ord + Hash + Display>(
    table: &HashMap<K, OutcomeAggregate>,
    kind: OutcomeKind,
) -> Vec<OutcomeStat> {
    let mut keys: Vec<&K> = table.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| {
            let row = &table[key];
            OutcomeStat {
                name: key.to_string(),
                value: row.total,
                kind,
                dept_distribution: row.by_department.iter().map(|(d, n)| (*d, *n)).collect(),
            }
        })
        .collect()
}

/// Treatment rows, then discharge rows, then patient-type rows, each in
/// category declaration order.
fn outcome_stats(agg: &AggregationResult) -> Vec<OutcomeStat> {
    let mut stats = outcome_rows(&agg.treatment_results, OutcomeKind::Treatment);
    stats.extend(outcome_rows(&agg.discharge_dispositions, OutcomeKind::Discharge));
    stats.extend(outcome_rows(&agg.patient_types, OutcomeKind::PatientType));
    stats
}

fn group_stats(groups: &HashMap<String, CountRevenue>) -> Vec<GroupStat> {
    let mut ranked: Vec<(&String, &CountRevenue)> = groups.iter().collect();
    ranked.sort_by(|a, b| b.1.revenue.cmp(&a.1.revenue).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (name, totals))| GroupStat {
            id: format!("grp-{index}"),
            name: name.clone(),
            revenue: totals.revenue,
            count: totals.count,
        })
        .collect()
}
