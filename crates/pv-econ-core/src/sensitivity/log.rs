use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::params::ProjectParameters;
use crate::payback::FinancialResult;
use crate::types::Metric;
use crate::PvEconResult;

pub const INPUT_PREFIX: &str = "input";
pub const OUTPUT_PREFIX: &str = "output";

/// Qualified name → raw value. Decimals are kept in their string form.
pub type Snapshot = BTreeMap<String, Value>;

/// Inputs and headline outputs of one completed evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityLogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub inputs: Snapshot,
    pub outputs: Snapshot,
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Snapshot) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(&format!("{prefix}.{k}"), v, out);
            }
        }
        Value::Array(_) => {}
        scalar => {
            out.insert(prefix.to_string(), scalar.clone());
        }
    }
}

fn metric_value(metric: &Metric) -> Value {
    match metric.value() {
        Some(v) => Value::String(v.to_string()),
        None => Value::Null,
    }
}

impl SensitivityLogEntry {
    pub fn capture(params: &ProjectParameters, result: &FinancialResult) -> PvEconResult<Self> {
        Self::capture_at(params, result, Utc::now())
    }

    /// Snapshot the solar, construction and financial groups together with
    /// the NPV/IRR outputs. Unavailable IRRs are logged as null.
    pub fn capture_at(
        params: &ProjectParameters,
        result: &FinancialResult,
        timestamp: DateTime<Utc>,
    ) -> PvEconResult<Self> {
        let mut inputs = Snapshot::new();
        flatten_into(
            &format!("{INPUT_PREFIX}.solar"),
            &serde_json::to_value(&params.solar)?,
            &mut inputs,
        );
        flatten_into(
            &format!("{INPUT_PREFIX}.construction"),
            &serde_json::to_value(&params.construction)?,
            &mut inputs,
        );
        flatten_into(
            &format!("{INPUT_PREFIX}.financial"),
            &serde_json::to_value(&params.financial)?,
            &mut inputs,
        );

        let mut outputs = Snapshot::new();
        outputs.insert(
            format!("{OUTPUT_PREFIX}.static_npv"),
            Value::String(result.static_npv.to_string()),
        );
        outputs.insert(format!("{OUTPUT_PREFIX}.static_irr"), metric_value(&result.static_irr));
        outputs.insert(
            format!("{OUTPUT_PREFIX}.dynamic_npv"),
            Value::String(result.dynamic_npv.to_string()),
        );
        outputs.insert(format!("{OUTPUT_PREFIX}.dynamic_irr"), metric_value(&result.dynamic_irr));

        let project = Some(params.project.name.clone()).filter(|n| !n.is_empty());

        Ok(SensitivityLogEntry {
            timestamp,
            project,
            inputs,
            outputs,
        })
    }
}

/// Ordered run history. Entries can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensitivityLog {
    entries: Vec<SensitivityLogEntry>,
}

impl SensitivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identical runs are kept; every entry counts as a sample.
    pub fn push(&mut self, entry: SensitivityLogEntry) {
        tracing::debug!(entries = self.entries.len() + 1, "sensitivity log entry appended");
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SensitivityLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<SensitivityLogEntry>> for SensitivityLog {
    fn from(entries: Vec<SensitivityLogEntry>) -> Self {
        SensitivityLog { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payback::Payback;
    use rust_decimal_macros::dec;

    fn result() -> FinancialResult {
        FinancialResult {
            nominal_rate: dec!(0.06),
            real_rate: dec!(0.04),
            static_npv: dec!(1234.5),
            static_irr: Metric::Available { value: dec!(0.08) },
            dynamic_npv: dec!(1500),
            dynamic_irr: Metric::Unavailable {
                reason: "no sign change".into(),
            },
            discounted_series_irr: Metric::Available { value: dec!(0.05) },
            payback: Payback::NotWithinHorizon,
            dynamic_payback: Payback::NotWithinHorizon,
        }
    }

    fn params() -> ProjectParameters {
        serde_json::from_value(serde_json::json!({
            "project": { "name": "rooftop" },
            "solar": {
                "city": "Hangzhou",
                "annual_irradiation": 1200, "panel_area": 50,
                "conversion_efficiency": 0.2, "performance_ratio": 0.85,
                "annual_degradation_pct": 1
            },
            "construction": {
                "panel_price_per_m2": 1500, "inverter_price": 20000,
                "installation_cost_per_m2": 300, "design_cost": 10000,
                "decision_cost": 5000, "other_initial_cost": 25000
            },
            "financial": {
                "lifetime_years": 20, "sell_ratio_pct": 40, "sell_price": 0.4,
                "use_price": 0.6, "subsidy": 0.05, "maintenance_cost_per_m2": 5,
                "tax_rate_pct": 10, "depreciation_rate_pct": 5,
                "discount_rate_pct": 6, "inflation_rate_pct": 2
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_capture_flattens_groups() {
        let e = SensitivityLogEntry::capture(&params(), &result()).unwrap();
        assert_eq!(e.inputs["input.solar.panel_area"], Value::String("50".into()));
        assert_eq!(e.inputs["input.solar.city"], Value::String("Hangzhou".into()));
        assert_eq!(e.inputs["input.financial.lifetime_years"], serde_json::json!(20));
        assert!(e.inputs.contains_key("input.construction.design_cost"));
        assert_eq!(e.outputs.len(), 4);
        assert_eq!(e.outputs["output.dynamic_irr"], Value::Null);
        assert_eq!(e.project.as_deref(), Some("rooftop"));
    }

    #[test]
    fn test_push_keeps_duplicates() {
        let e = SensitivityLogEntry::capture(&params(), &result()).unwrap();
        let mut log = SensitivityLog::new();
        log.push(e.clone());
        log.push(e);
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0], log.entries()[1]);
    }
}
