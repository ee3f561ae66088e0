use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::PvEconResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Percentages as stored in parameter documents (5 = 5%). Converted with
/// [`pct_to_rate`] at the point of use.
pub type Percent = Decimal;

/// Allocation share in [0, 1].
pub type Ratio = Decimal;

/// Energy in kWh.
pub type Energy = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Convert a stored percentage into a decimal rate.
pub fn pct_to_rate(pct: Percent) -> Rate {
    pct / dec!(100)
}

/// A derived figure that may legitimately be absent (IRR without a sign
/// change, tornado ranking below the minimum sample size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability<T> {
    Available { value: T },
    Unavailable { reason: String },
}

/// A scalar that may be unavailable.
pub type Metric = Availability<Decimal>;

impl<T> Availability<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Availability::Available { value } => Some(value),
            Availability::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available { .. })
    }

    /// Convert a computation result into an availability field. Recoverable
    /// errors become `Unavailable` and are recorded as a warning; anything
    /// else is propagated.
    pub fn from_result(
        result: PvEconResult<T>,
        label: &str,
        warnings: &mut Vec<String>,
    ) -> PvEconResult<Self> {
        match result {
            Ok(value) => Ok(Availability::Available { value }),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(metric = label, error = %e, "metric unavailable");
                warnings.push(format!("{label} unavailable: {e}"));
                Ok(Availability::Unavailable {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PvEconError;

    #[test]
    fn test_pct_to_rate() {
        assert_eq!(pct_to_rate(dec!(6)), dec!(0.06));
        assert_eq!(pct_to_rate(dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_recoverable_error_becomes_unavailable() {
        let mut warnings = Vec::new();
        let res: PvEconResult<Decimal> = Err(PvEconError::ComputationUnconverged {
            function: "IRR".into(),
            reason: "no sign change".into(),
        });
        let metric = Metric::from_result(res, "static_irr", &mut warnings).unwrap();
        assert!(!metric.is_available());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_fatal_error_propagates() {
        let mut warnings = Vec::new();
        let res: PvEconResult<Decimal> = Err(PvEconError::invalid("x", "bad"));
        assert!(Metric::from_result(res, "x", &mut warnings).is_err());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_availability_serializes_with_status_tag() {
        let m = Metric::Available { value: dec!(0.08) };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["value"], "0.08");
    }
}
