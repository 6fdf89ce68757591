//! Classification decision tables.
//!
//! Each table is an ordered list of (predicate, category) pairs evaluated
//! top to bottom; the first match wins. Several inputs match more than one
//! predicate (e.g. "ngoại khám" hits both examination and surgery), so the
//! order is part of the contract.

use crate::models::{Department, DischargeDisposition, PatientType, TreatmentResult};

/// A single predicate over lower-cased text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// The whole input equals the literal.
    Equals(&'static str),
    /// The input contains the literal.
    Contains(&'static str),
}

impl Predicate {
    pub fn matches(&self, lowered: &str) -> bool {
        match self {
            Self::Equals(s) => lowered == *s,
            Self::Contains(s) => lowered.contains(s),
        }
    }
}

/// Ordered rule: any predicate matching selects the category.
pub type Rule<T> = (&'static [Predicate], T);

/// Evaluate `rules` in order against `raw` (trimmed, lower-cased).
pub fn classify<T: Copy>(rules: &[Rule<T>], raw: &str, fallback: T) -> T {
    let lowered = raw.trim().to_lowercase();
    rules
        .iter()
        .find(|(predicates, _)| predicates.iter().any(|p| p.matches(&lowered)))
        .map(|(_, category)| *category)
        .unwrap_or(fallback)
}

use Predicate::{Contains, Equals};

pub const DEPARTMENT_RULES: &[Rule<Department>] = &[
    (&[Contains("khám")], Department::Examination),
    (&[Contains("nội")], Department::InternalMedicine),
    (&[Contains("ngoại"), Contains("gmhs"), Contains("pt")], Department::Surgery),
    (&[Contains("nhi")], Department::Pediatrics),
    (&[Contains("sản"), Contains("csskss"), Contains("đẻ")], Department::Obstetrics),
    (&[Contains("truyền nhiễm"), Contains("lây")], Department::InfectiousDiseases),
    (&[Contains("cấp cứu"), Contains("hstc"), Contains("hồi sức")], Department::Emergency),
    (&[Contains("yhct"), Contains("phcn"), Contains("đông y")], Department::TraditionalMedicine),
    (
        &[Contains("xét nghiệm"), Contains("huyết học"), Contains("sinh hóa"), Contains("vi sinh")],
        Department::Laboratory,
    ),
    (
        &[Contains("cđha"), Contains("hình ảnh"), Contains("x-quang"), Contains("siêu âm")],
        Department::Imaging,
    ),
];

pub const TREATMENT_RULES: &[Rule<TreatmentResult>] = &[
    (&[Equals("1"), Equals("khỏi")], TreatmentResult::Cured),
    (&[Equals("2"), Equals("đỡ")], TreatmentResult::Improved),
    (&[Equals("3"), Contains("không")], TreatmentResult::Unchanged),
    (&[Equals("4"), Contains("nặng")], TreatmentResult::Worse),
    (&[Equals("5"), Contains("tử")], TreatmentResult::Deceased),
];

pub const DISCHARGE_RULES: &[Rule<DischargeDisposition>] = &[
    (&[Equals("1"), Contains("ra")], DischargeDisposition::Discharged),
    (&[Equals("2"), Contains("chuyển")], DischargeDisposition::Transferred),
    (&[Equals("3"), Contains("trốn")], DischargeDisposition::Absconded),
    (&[Equals("4"), Contains("xin")], DischargeDisposition::LeftOnRequest),
];

pub const PATIENT_TYPE_RULES: &[Rule<PatientType>] = &[
    (&[Equals("1")], PatientType::Outpatient),
    (&[Equals("2")], PatientType::Inpatient),
    (&[Equals("3")], PatientType::HealthCheck),
];

/// Free-text department → category; unmatched text is center-wide.
pub fn map_department(raw: &str) -> Department {
    classify(DEPARTMENT_RULES, raw, Department::CenterWide)
}

pub fn map_treatment_result(code: &str) -> TreatmentResult {
    classify(TREATMENT_RULES, code, TreatmentResult::Other)
}

pub fn map_discharge_disposition(code: &str) -> DischargeDisposition {
    classify(DISCHARGE_RULES, code, DischargeDisposition::Other)
}

pub fn map_patient_type(code: &str) -> PatientType {
    classify(PATIENT_TYPE_RULES, code, PatientType::Other)
}

/// Service-group text counted as an examination.
pub fn is_exam_group(group: &str) -> bool {
    group.to_lowercase().contains("khám")
}

/// Service-group text counted as a laboratory / imaging test.
pub fn is_ancillary_group(group: &str) -> bool {
    let lowered = group.to_lowercase();
    lowered.contains("xét nghiệm") || lowered.contains("cdha")
}
