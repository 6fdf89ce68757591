//! Header resolution: maps export column names to record fields.
//!
//! Column names vary between export templates, so each field role has a
//! small alias list; the first header token matching any alias wins.

/// Record field a column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    AdmissionDate,
    DischargeDate,
    Department,
    Revenue,
    Clinician,
    DiagnosisCode,
    DiagnosisName,
    ServiceGroup,
    TreatmentOutcome,
    DischargeDisposition,
    PatientType,
}

/// Match rule over a lower-cased, trimmed header token.
#[derive(Debug, Clone, Copy)]
enum Alias {
    Exact(&'static str),
    Contains(&'static str),
    ContainsExcept(&'static str, &'static str),
}

impl Alias {
    fn matches(&self, header: &str) -> bool {
        match self {
            Self::Exact(s) => header == *s,
            Self::Contains(s) => header.contains(s),
            Self::ContainsExcept(s, excluded) => header.contains(s) && !header.contains(excluded),
        }
    }
}

const ROLE_ALIASES: &[(ColumnRole, &[Alias])] = &[
    (
        ColumnRole::AdmissionDate,
        &[Alias::Exact("ngay_vao_vien"), Alias::Exact("ngay_vao"), Alias::Exact("ngay_kham")],
    ),
    (
        ColumnRole::DischargeDate,
        &[Alias::Exact("ngay_ra_vien"), Alias::Exact("ngay_ra")],
    ),
    (
        ColumnRole::Department,
        &[Alias::Contains("khoa"), Alias::Contains("ma_khoa")],
    ),
    (
        ColumnRole::Revenue,
        &[Alias::Contains("thanh_tien"), Alias::Contains("tong_tien")],
    ),
    (
        ColumnRole::Clinician,
        &[
            Alias::Exact("bac_sy"),
            Alias::Exact("ten_bac_sy"),
            Alias::Exact("ten_bs"),
            Alias::Contains("ten_nhan_vien"),
        ],
    ),
    (
        ColumnRole::DiagnosisCode,
        &[Alias::Contains("ma_benh"), Alias::Contains("chan_doan")],
    ),
    (
        ColumnRole::DiagnosisName,
        &[Alias::Contains("ten_benh"), Alias::ContainsExcept("chan_doan", "ma")],
    ),
    (
        ColumnRole::ServiceGroup,
        &[Alias::Contains("ten_nhom"), Alias::Contains("nhom")],
    ),
    (
        ColumnRole::TreatmentOutcome,
        &[Alias::Contains("ket_qua"), Alias::Contains("kq_dtri")],
    ),
    (
        ColumnRole::DischargeDisposition,
        &[Alias::Contains("tinh_trang"), Alias::Contains("tt_rv")],
    ),
    (
        ColumnRole::PatientType,
        &[Alias::Exact("ma_loai_kcb"), Alias::Contains("loai_kcb")],
    ),
];

/// Column index per field role, resolved from a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    /// Number of header columns.
    pub width: usize,
    pub admission_date: usize,
    pub discharge_date: Option<usize>,
    pub department: Option<usize>,
    pub revenue: Option<usize>,
    pub clinician: Option<usize>,
    pub diagnosis_code: Option<usize>,
    pub diagnosis_name: Option<usize>,
    pub service_group: Option<usize>,
    pub treatment_outcome: Option<usize>,
    pub discharge_disposition: Option<usize>,
    pub patient_type: Option<usize>,
}

/// Index of the first header that matches any alias of `role`.
pub fn find_column(headers: &[String], role: ColumnRole) -> Option<usize> {
    let aliases = ROLE_ALIASES
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, aliases)| *aliases)?;
    headers
        .iter()
        .position(|header| aliases.iter().any(|alias| alias.matches(header)))
}

impl ColumnMap {
    /// Resolve roles from raw header tokens. Returns `None` when the
    /// admission-date column is missing; every other role is optional.
    pub fn resolve(raw_headers: &[String]) -> Option<Self> {
        let headers: Vec<String> = raw_headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let find = |role| find_column(&headers, role);

        Some(Self {
            width: headers.len(),
            admission_date: find(ColumnRole::AdmissionDate)?,
            discharge_date: find(ColumnRole::DischargeDate),
            department: find(ColumnRole::Department),
            revenue: find(ColumnRole::Revenue),
            clinician: find(ColumnRole::Clinician),
            diagnosis_code: find(ColumnRole::DiagnosisCode),
            diagnosis_name: find(ColumnRole::DiagnosisName),
            service_group: find(ColumnRole::ServiceGroup),
            treatment_outcome: find(ColumnRole::TreatmentOutcome),
            discharge_disposition: find(ColumnRole::DischargeDisposition),
            patient_type: find(ColumnRole::PatientType),
        })
    }

    /// Roles that resolved to no column.
    pub fn missing_roles(&self) -> Vec<ColumnRole> {
        [
            (ColumnRole::DischargeDate, self.discharge_date),
            (ColumnRole::Department, self.department),
            (ColumnRole::Revenue, self.revenue),
            (ColumnRole::Clinician, self.clinician),
            (ColumnRole::DiagnosisCode, self.diagnosis_code),
            (ColumnRole::DiagnosisName, self.diagnosis_name),
            (ColumnRole::ServiceGroup, self.service_group),
            (ColumnRole::TreatmentOutcome, self.treatment_outcome),
            (ColumnRole::DischargeDisposition, self.discharge_disposition),
            (ColumnRole::PatientType, self.patient_type),
        ]
        .into_iter()
        .filter(|(_, index)| index.is_none())
        .map(|(role, _)| role)
        .collect()
    }
}
