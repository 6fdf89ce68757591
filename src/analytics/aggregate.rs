//! Single-pass aggregation over visit records.
//!
//! Every view is updated from the same record in one fold, so a
//! million-row range is scanned once. Results are plain maps; ranking
//! happens in `report`.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{DatabaseError, VisitStore};
use crate::models::{Department, DischargeDisposition, PatientType, TreatmentResult, VisitRecord};
use crate::taxonomy::{
    is_ancillary_group, is_exam_group, map_discharge_disposition, map_patient_type,
    map_treatment_result,
};

/// Revenue sums saturate instead of overflowing.
fn add_revenue(total: &mut i64, revenue: i64) {
    *total = total.saturating_add(revenue);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountRevenue {
    pub count: u64,
    pub revenue: i64,
}

impl CountRevenue {
    fn add(&mut self, revenue: i64) {
        self.count += 1;
        self.revenue = self.revenue.saturating_add(revenue);
    }

    fn merge(&mut self, other: CountRevenue) {
        self.count += other.count;
        self.revenue = self.revenue.saturating_add(other.revenue);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisAggregate {
    pub count: u64,
    pub revenue: i64,
    pub treated_days: i64,
    /// First non-empty diagnosis name seen, else the code.
    pub name: String,
    pub by_department: HashMap<Department, CountRevenue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianAggregate {
    pub revenue: i64,
    pub count: u64,
    /// Department of the first record seen for this clinician.
    pub department: Department,
    pub by_service_group: HashMap<String, CountRevenue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeAggregate {
    pub total: u64,
    pub by_department: HashMap<Department, u64>,
}

impl OutcomeAggregate {
    fn add(&mut self, department: Department) {
        self.total += 1;
        *self.by_department.entry(department).or_default() += 1;
    }

    fn merge(&mut self, other: OutcomeAggregate) {
        self.total += other.total;
        for (dept, n) in other.by_department {
            *self.by_department.entry(dept).or_default() += n;
        }
    }
}

/// All aggregate views of one record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Records folded in.
    pub records: u64,
    pub department_revenue: HashMap<Department, i64>,
    pub service_groups: HashMap<String, CountRevenue>,
    pub diagnoses: HashMap<String, DiagnosisAggregate>,
    pub clinicians: HashMap<String, ClinicianAggregate>,
    pub treatment_results: HashMap<TreatmentResult, OutcomeAggregate>,
    pub discharge_dispositions: HashMap<DischargeDisposition, OutcomeAggregate>,
    pub patient_types: HashMap<PatientType, OutcomeAggregate>,
    pub total_revenue: i64,
    pub total_exams: u64,
    pub total_inpatients: u64,
    pub total_ancillary: u64,
}

impl AggregationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Fold one record into every view.
    pub fn accumulate(&mut self, visit: &VisitRecord) {
        let dept = visit.department;
        let revenue = visit.revenue;

        self.records += 1;
        self.total_revenue = self.total_revenue.saturating_add(revenue);
        add_revenue(self.department_revenue.entry(dept).or_default(), revenue);

        let group = visit.service_group.as_str();
        if !group.is_empty() {
            self.service_groups.entry(group.to_owned()).or_default().add(revenue);
            if is_ancillary_group(group) {
                self.total_ancillary += 1;
            }
            if is_exam_group(group) {
                self.total_exams += 1;
            }
        }

        if !visit.diagnosis_code.is_empty() {
            let diag = self
                .diagnoses
                .entry(visit.diagnosis_code.clone())
                .or_default();
            if diag.name.is_empty() {
                diag.name = if visit.diagnosis_name.is_empty() {
                    visit.diagnosis_code.clone()
                } else {
                    visit.diagnosis_name.clone()
                };
            }
            diag.count += 1;
            diag.revenue = diag.revenue.saturating_add(revenue);
            if let Some(days) = visit.treated_days() {
                diag.treated_days += days;
            }
            diag.by_department.entry(dept).or_default().add(revenue);
        }

        if !visit.clinician.is_empty() {
            let clinician = self
                .clinicians
                .entry(visit.clinician.clone())
                .or_insert_with(|| ClinicianAggregate {
                    revenue: 0,
                    count: 0,
                    department: dept,
                    by_service_group: HashMap::new(),
                });
            clinician.revenue = clinician.revenue.saturating_add(revenue);
            clinician.count += 1;
            if !group.is_empty() {
                clinician
                    .by_service_group
                    .entry(group.to_owned())
                    .or_default()
                    .add(revenue);
            }
        }

        if !visit.treatment_code.trim().is_empty() {
            self.treatment_results
                .entry(map_treatment_result(&visit.treatment_code))
                .or_default()
                .add(dept);
        }
        if !visit.discharge_code.trim().is_empty() {
            self.discharge_dispositions
                .entry(map_discharge_disposition(&visit.discharge_code))
                .or_default()
                .add(dept);
        }
        if !visit.patient_type_code.trim().is_empty() {
            let patient_type = map_patient_type(&visit.patient_type_code);
            self.patient_types.entry(patient_type).or_default().add(dept);
            if patient_type == PatientType::Inpatient {
                self.total_inpatients += 1;
            }
        }
    }

    /// Combine with the result of a disjoint record set.
    ///
    /// Counts and sums add up. For first-seen attributes (diagnosis name,
    /// clinician department) the value already in `self` is kept.
    pub fn merge(&mut self, other: AggregationResult) {
        self.records += other.records;
        self.total_revenue = self.total_revenue.saturating_add(other.total_revenue);
        self.total_exams += other.total_exams;
        self.total_inpatients += other.total_inpatients;
        self.total_ancillary += other.total_ancillary;

        for (dept, revenue) in other.department_revenue {
            add_revenue(self.department_revenue.entry(dept).or_default(), revenue);
        }
        for (group, stats) in other.service_groups {
            self.service_groups.entry(group).or_default().merge(stats);
        }
        for (code, theirs) in other.diagnoses {
            let ours = self.diagnoses.entry(code).or_default();
            if ours.name.is_empty() {
                ours.name = theirs.name;
            }
            ours.count += theirs.count;
            ours.revenue = ours.revenue.saturating_add(theirs.revenue);
            ours.treated_days += theirs.treated_days;
            for (dept, stats) in theirs.by_department {
                ours.by_department.entry(dept).or_default().merge(stats);
            }
        }
        for (name, theirs) in other.clinicians {
            match self.clinicians.get_mut(&name) {
                Some(ours) => {
                    ours.revenue = ours.revenue.saturating_add(theirs.revenue);
                    ours.count += theirs.count;
                    for (group, stats) in theirs.by_service_group {
                        ours.by_service_group.entry(group).or_default().merge(stats);
                    }
                }
                None => {
                    self.clinicians.insert(name, theirs);
                }
            }
        }
        for (category, stats) in other.treatment_results {
            self.treatment_results.entry(category).or_default().merge(stats);
        }
        for (category, stats) in other.discharge_dispositions {
            self.discharge_dispositions.entry(category).or_default().merge(stats);
        }
        for (category, stats) in other.patient_types {
            self.patient_types.entry(category).or_default().merge(stats);
        }
    }
}

/// Fold an in-memory record set.
pub fn aggregate<'a>(visits: impl IntoIterator<Item = &'a VisitRecord>) -> AggregationResult {
    let mut result = AggregationResult::new();
    for visit in visits {
        result.accumulate(visit);
    }
    result
}

/// Fold the records of `[start, end]` straight from the store.
pub fn aggregate_range<S: VisitStore + ?Sized>(
    store: &S,
    start: Option<i64>,
    end: Option<i64>,
) -> Result<AggregationResult, DatabaseError> {
    let mut result = AggregationResult::new();
    let scanned = store.scan_range(start, end, &mut |visit| result.accumulate(&visit))?;
    tracing::debug!(scanned, ?start, ?end, "Aggregated visit range");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteVisitStore;
    use crate::models::MILLIS_PER_DAY;

    fn visit(day: i64, dept: Department, revenue: i64) -> VisitRecord {
        VisitRecord::new(1_700_000_000_000 + day * MILLIS_PER_DAY, dept, revenue)
    }

    fn sample() -> Vec<VisitRecord> {
        let mut a = visit(0, Department::InternalMedicine, 1_000);
        a.service_group = "Khám bệnh".into();
        a.clinician = "BS. A".into();
        a.diagnosis_code = "J18".into();
        a.diagnosis_name = "Viêm phổi".into();
        a.discharged_at = Some(a.admitted_at + 3 * MILLIS_PER_DAY);
        a.treatment_code = "1".into();
        a.patient_type_code = "2".into();

        let mut b = visit(1, Department::Laboratory, 500);
        b.service_group = "Xét nghiệm".into();
        b.clinician = "BS. A".into();
        b.diagnosis_code = "J18".into();
        b.discharge_code = "chuyển tuyến".into();
        b.patient_type_code = "1".into();

        let mut c = visit(2, Department::CenterWide, 250);
        c.clinician = "BS. B".into();
        c.diagnosis_code = "I10".into();
        c.treatment_code = "tử vong".into();

        vec![a, b, c]
    }

    #[test]
    fn empty_input_gives_empty_views() {
        let result = aggregate(&[]);
        assert!(result.is_empty());
        assert_eq!(result, AggregationResult::default());
    }

    #[test]
    fn totals_and_department_revenue() {
        let result = aggregate(&sample());
        assert_eq!(result.records, 3);
        assert_eq!(result.total_revenue, 1_750);
        assert_eq!(result.department_revenue[&Department::InternalMedicine], 1_000);
        assert_eq!(result.department_revenue[&Department::Laboratory], 500);
        assert_eq!(result.department_revenue[&Department::CenterWide], 250);
    }

    #[test]
    fn service_groups_and_coarse_counters() {
        let result = aggregate(&sample());
        assert_eq!(result.service_groups.len(), 2);
        assert_eq!(
            result.service_groups["Khám bệnh"],
            CountRevenue { count: 1, revenue: 1_000 }
        );
        assert_eq!(result.total_exams, 1);
        assert_eq!(result.total_ancillary, 1);
    }

    #[test]
    fn diagnosis_aggregate() {
        let result = aggregate(&sample());
        let j18 = &result.diagnoses["J18"];
        assert_eq!(j18.count, 2);
        assert_eq!(j18.revenue, 1_500);
        assert_eq!(j18.treated_days, 3);
        assert_eq!(j18.name, "Viêm phổi");
        assert_eq!(j18.by_department[&Department::Laboratory].count, 1);
        // No name column value: falls back to the code
        assert_eq!(result.diagnoses["I10"].name, "I10");
        assert_eq!(result.diagnoses["I10"].treated_days, 0);
    }

    #[test]
    fn clinician_aggregate() {
        let result = aggregate(&sample());
        let a = &result.clinicians["BS. A"];
        assert_eq!(a.count, 2);
        assert_eq!(a.revenue, 1_500);
        assert_eq!(a.department, Department::InternalMedicine);
        assert_eq!(a.by_service_group["Xét nghiệm"].revenue, 500);
        assert!(result.clinicians["BS. B"].by_service_group.is_empty());
    }

    #[test]
    fn outcome_tables() {
        let result = aggregate(&sample());
        assert_eq!(result.treatment_results[&TreatmentResult::Cured].total, 1);
        assert_eq!(
            result.treatment_results[&TreatmentResult::Deceased].by_department[&Department::CenterWide],
            1
        );
        assert_eq!(
            result.discharge_dispositions[&DischargeDisposition::Transferred].total,
            1
        );
        assert_eq!(result.patient_types[&PatientType::Outpatient].total, 1);
        assert_eq!(result.total_inpatients, 1);
    }

    #[test]
    fn revenue_sums_saturate() {
        let mut visits = sample();
        visits[0].revenue = i64::MAX;
        visits[1].department = Department::InternalMedicine;

        let mut result = aggregate(&visits);
        assert_eq!(result.total_revenue, i64::MAX);
        assert_eq!(result.department_revenue[&Department::InternalMedicine], i64::MAX);
        assert_eq!(result.diagnoses["J18"].revenue, i64::MAX);
        assert_eq!(result.clinicians["BS. A"].revenue, i64::MAX);

        result.merge(aggregate(&visits));
        assert_eq!(result.total_revenue, i64::MAX);
        assert_eq!(result.service_groups["Khám bệnh"].revenue, i64::MAX);
    }

    #[test]
    fn merge_of_disjoint_halves_equals_whole() {
        let visits = sample();
        let whole = aggregate(&visits);
        for split in 0..=visits.len() {
            let mut left = aggregate(&visits[..split]);
            left.merge(aggregate(&visits[split..]));
            assert_eq!(left, whole, "split at {split}");
        }
    }

    #[test]
    fn range_aggregation_is_commutative_over_subranges() {
        let mut store = SqliteVisitStore::in_memory().unwrap();
        store.insert_batch(&sample()).unwrap();
        let day1 = 1_700_000_000_000 + MILLIS_PER_DAY;

        let whole = aggregate_range(&store, None, None).unwrap();
        let mut early = aggregate_range(&store, None, Some(day1 - 1)).unwrap();
        let late = aggregate_range(&store, Some(day1), None).unwrap();
        assert_eq!(early.records, 1);
        assert_eq!(late.records, 2);

        early.merge(late);
        assert_eq!(early, whole);
    }
}
