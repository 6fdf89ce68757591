//! Annual plan targets and the plan-vs-actual merge.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::aggregate::AggregationResult;
use crate::models::{Department, KpiEntry, KpiMetric, KpiTarget, ServiceGroup};

/// Revenue KPIs are reported in millions of currency units.
pub const REVENUE_UNIT_DIVISOR: f64 = 1_000_000.0;

const MILLION_VND: &str = "Triệu VNĐ";
const VISITS: &str = "Lượt";
const TIMES: &str = "Lần";

const fn department_revenue(department: Department, plan_year: f64, group: ServiceGroup) -> KpiTarget {
    KpiTarget {
        department,
        name: "Doanh thu",
        unit: MILLION_VND,
        plan_year,
        group,
        metric: KpiMetric::DepartmentRevenue,
    }
}

/// 2026 plan. Four center-wide metrics, then one revenue row per department.
pub const PLAN_TARGETS: &[KpiTarget] = &[
    KpiTarget {
        department: Department::CenterWide,
        name: "Tổng Doanh thu",
        unit: MILLION_VND,
        plan_year: 54941.0,
        group: ServiceGroup::Examination,
        metric: KpiMetric::TotalRevenue,
    },
    KpiTarget {
        department: Department::CenterWide,
        name: "Khám bệnh chung",
        unit: VISITS,
        plan_year: 136961.0,
        group: ServiceGroup::Examination,
        metric: KpiMetric::ExamCount,
    },
    KpiTarget {
        department: Department::CenterWide,
        name: "Điều trị nội trú",
        unit: VISITS,
        plan_year: 13906.0,
        group: ServiceGroup::InpatientTreatment,
        metric: KpiMetric::InpatientCount,
    },
    KpiTarget {
        department: Department::CenterWide,
        name: "Xét nghiệm",
        unit: TIMES,
        plan_year: 171780.0,
        group: ServiceGroup::Paraclinical,
        metric: KpiMetric::AncillaryCount,
    },
    department_revenue(Department::Examination, 20606.0, ServiceGroup::Examination),
    department_revenue(Department::InternalMedicine, 8480.0, ServiceGroup::InpatientTreatment),
    department_revenue(Department::Surgery, 6236.0, ServiceGroup::Procedures),
    department_revenue(Department::Pediatrics, 4367.0, ServiceGroup::InpatientTreatment),
    department_revenue(Department::Obstetrics, 2884.0, ServiceGroup::InpatientTreatment),
    department_revenue(Department::InfectiousDiseases, 4316.0, ServiceGroup::InpatientTreatment),
    department_revenue(Department::Emergency, 4213.0, ServiceGroup::InpatientTreatment),
    department_revenue(Department::TraditionalMedicine, 3834.0, ServiceGroup::Examination),
    department_revenue(Department::Laboratory, 6640.0, ServiceGroup::Paraclinical),
    department_revenue(Department::Imaging, 5163.0, ServiceGroup::Paraclinical),
];

/// Where KPI actuals come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActualsMode {
    /// Actuals are computed from stored records.
    Measured,
    /// The store holds no records; zero actuals are replaced by
    /// placeholder values near plan.
    Simulated,
}

impl ActualsMode {
    pub fn for_store_count(count: u64) -> Self {
        if count == 0 {
            Self::Simulated
        } else {
            Self::Measured
        }
    }
}

/// Actual value of a target measured from aggregates.
pub fn measured_actual(target: &KpiTarget, agg: &AggregationResult) -> f64 {
    match target.metric {
        KpiMetric::TotalRevenue => agg.total_revenue as f64 / REVENUE_UNIT_DIVISOR,
        KpiMetric::ExamCount => agg.total_exams as f64,
        KpiMetric::InpatientCount => agg.total_inpatients as f64,
        KpiMetric::AncillaryCount => agg.total_ancillary as f64,
        KpiMetric::DepartmentRevenue => {
            let revenue = agg
                .department_revenue
                .get(&target.department)
                .copied()
                .unwrap_or(0);
            revenue as f64 / REVENUE_UNIT_DIVISOR
        }
    }
}

/// Placeholder actual between roughly 77.5% and 112.5% of plan.
/// Plans under 20 keep one decimal; larger ones are floored.
pub fn simulate_actual<R: Rng + ?Sized>(plan: f64, rng: &mut R) -> f64 {
    let jitter = rng.gen_range(-0.025..0.025);
    let base = rng.gen_range(0.8..1.1);
    let percent = f64::max(0.0, base + jitter);
    if plan < 20.0 {
        (plan * percent * 10.0).round() / 10.0
    } else {
        (plan * percent).floor()
    }
}

/// Join the static plan with actuals. Rebuilt on every query.
pub fn merge_kpis<R: Rng + ?Sized>(
    agg: &AggregationResult,
    mode: ActualsMode,
    rng: &mut R,
) -> Vec<KpiEntry> {
    PLAN_TARGETS
        .iter()
        .enumerate()
        .map(|(index, target)| {
            let mut actual = measured_actual(target, agg);
            let simulated = mode == ActualsMode::Simulated && actual == 0.0;
            if simulated {
                actual = simulate_actual(target.plan_year, rng);
            }
            KpiEntry {
                id: format!("kpi-template-{index}"),
                name: target.name.to_string(),
                unit: target.unit.to_string(),
                department: target.department,
                plan_year: target.plan_year,
                actual,
                group: target.group,
                simulated,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn plan_has_fourteen_targets() {
        assert_eq!(PLAN_TARGETS.len(), 14);
        assert_eq!(
            PLAN_TARGETS
                .iter()
                .filter(|t| t.metric == KpiMetric::DepartmentRevenue)
                .count(),
            10
        );
    }

    #[test]
    fn measured_actuals_from_aggregates() {
        let mut agg = AggregationResult::new();
        agg.records = 3;
        agg.total_revenue = 2_500_000;
        agg.total_exams = 7;
        agg.total_inpatients = 2;
        agg.total_ancillary = 11;
        agg.department_revenue.insert(Department::Imaging, 1_500_000);

        let mut rng = StdRng::seed_from_u64(7);
        let kpis = merge_kpis(&agg, ActualsMode::Measured, &mut rng);

        assert_eq!(kpis[0].actual, 2.5);
        assert_eq!(kpis[1].actual, 7.0);
        assert_eq!(kpis[2].actual, 2.0);
        assert_eq!(kpis[3].actual, 11.0);
        let imaging = kpis
            .iter()
            .find(|k| k.department == Department::Imaging)
            .unwrap();
        assert_eq!(imaging.actual, 1.5);
        assert_eq!(imaging.id, "kpi-template-13");
        // Departments without revenue stay at zero when measured
        let surgery = kpis
            .iter()
            .find(|k| k.department == Department::Surgery)
            .unwrap();
        assert_eq!(surgery.actual, 0.0);
        assert!(kpis.iter().all(|k| !k.simulated));
    }

    #[test]
    fn simulated_mode_flags_every_entry() {
        let mut rng = StdRng::seed_from_u64(42);
        let kpis = merge_kpis(&AggregationResult::new(), ActualsMode::Simulated, &mut rng);
        for kpi in &kpis {
            assert!(kpi.simulated);
            let ratio = kpi.actual / kpi.plan_year;
            assert!((0.77..=1.13).contains(&ratio), "{} ratio {ratio}", kpi.name);
            assert_eq!(kpi.actual, kpi.actual.floor());
        }
    }

    #[test]
    fn simulation_is_deterministic_for_a_seed() {
        let a = merge_kpis(&AggregationResult::new(), ActualsMode::Simulated, &mut StdRng::seed_from_u64(1));
        let b = merge_kpis(&AggregationResult::new(), ActualsMode::Simulated, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn small_plans_keep_one_decimal() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let value = simulate_actual(12.0, &mut rng);
            assert!(value >= 0.0);
            assert!(((value * 10.0).round() - value * 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn mode_depends_on_store_count() {
        assert_eq!(ActualsMode::for_store_count(0), ActualsMode::Simulated);
        assert_eq!(ActualsMode::for_store_count(1), ActualsMode::Measured);
    }
}
