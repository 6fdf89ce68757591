use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Macro to generate an enum with a storage code (`as_str` + `FromStr`)
/// and the display label shown in reports.
macro_rules! labeled_enum {
    ($name:ident { $($variant:ident => $code:literal, $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labeled_enum!(Department {
    CenterWide => "center_wide", "Toàn Trung tâm",
    Examination => "examination", "Khoa Khám bệnh",
    InternalMedicine => "internal_medicine", "Khoa Nội",
    Surgery => "surgery", "Khoa Ngoại - PT - GMHS",
    Pediatrics => "pediatrics", "Khoa Nhi",
    Obstetrics => "obstetrics", "Khoa CSSKSS & Phụ sản",
    InfectiousDiseases => "infectious_diseases", "Khoa Truyền nhiễm",
    Emergency => "emergency", "Khoa CC - HSTC - CĐ",
    TraditionalMedicine => "traditional_medicine", "Khoa YHCT - PHCN",
    Laboratory => "laboratory", "Khoa XN - KSNK",
    Imaging => "imaging", "Khoa CĐHA",
});

labeled_enum!(ServiceGroup {
    Examination => "examination", "Khám bệnh",
    InpatientTreatment => "inpatient_treatment", "Điều trị nội trú",
    Paraclinical => "paraclinical", "Cận lâm sàng",
    Procedures => "procedures", "Thủ thuật - Phẫu thuật",
    DrugsSupplies => "drugs_supplies", "Thuốc - Vật tư",
});

labeled_enum!(TreatmentResult {
    Cured => "cured", "Khỏi",
    Improved => "improved", "Đỡ/Giảm",
    Unchanged => "unchanged", "Không đổi",
    Worse => "worse", "Nặng hơn",
    Deceased => "deceased", "Tử vong",
    Other => "other", "Khác",
});

labeled_enum!(DischargeDisposition {
    Discharged => "discharged", "Ra viện",
    Transferred => "transferred", "Chuyển tuyến",
    Absconded => "absconded", "Trốn viện",
    LeftOnRequest => "left_on_request", "Xin về",
    Other => "other", "Khác",
});

labeled_enum!(PatientType {
    Outpatient => "outpatient", "Ngoại trú",
    Inpatient => "inpatient", "Nội trú",
    HealthCheck => "health_check", "Khám sức khỏe",
    Other => "other", "Khác",
});
