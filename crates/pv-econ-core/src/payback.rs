use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::discounting::{DiscountedCashflowSchedule, ValuationMetrics};
use crate::net_cashflow::NetCashflowSchedule;
use crate::types::{with_metadata, ComputationOutput, Metric, Money, Rate, Years};
use crate::PvEconResult;

/// Where a cumulative cash-flow series first turns non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Payback {
    Reached {
        /// Linearly interpolated fractional year
        year: Years,
        /// First whole year with a non-negative cumulative value
        break_even_year: u32,
    },
    NotWithinHorizon,
}

impl Payback {
    pub fn year(&self) -> Option<Years> {
        match self {
            Payback::Reached { year, .. } => Some(*year),
            Payback::NotWithinHorizon => None,
        }
    }

    pub fn is_reached(&self) -> bool {
        matches!(self, Payback::Reached { .. })
    }
}

/// Find the first `i` with `cum[i-1] < 0 <= cum[i]` and interpolate between
/// the two points. Points must be ordered by year.
pub fn locate_payback(points: &[(u32, Money)]) -> Payback {
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if y0 < Decimal::ZERO && y1 >= Decimal::ZERO {
            // y1 > y0 holds here, so the slope is never zero
            let span = Decimal::from(x1) - Decimal::from(x0);
            let year = Decimal::from(x0) + (-y0) * span / (y1 - y0);
            return Payback::Reached {
                year,
                break_even_year: x1,
            };
        }
    }
    Payback::NotWithinHorizon
}

/// Headline indicators of one project evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    pub nominal_rate: Rate,
    pub real_rate: Rate,
    pub static_npv: Money,
    pub static_irr: Metric,
    pub dynamic_npv: Money,
    pub dynamic_irr: Metric,
    pub discounted_series_irr: Metric,
    pub payback: Payback,
    pub dynamic_payback: Payback,
}

/// Locate nominal and discounted payback and assemble the financial result.
pub fn payback_analysis(
    net: &NetCashflowSchedule,
    discounted: &DiscountedCashflowSchedule,
) -> PvEconResult<ComputationOutput<FinancialResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let payback = locate_payback(&net.cumulative_points());
    let dynamic_payback = locate_payback(&discounted.cumulative_points());

    if !payback.is_reached() {
        warnings.push(format!(
            "Cumulative net cash flow does not turn non-negative within {} years",
            net.rows.len()
        ));
    }
    if !dynamic_payback.is_reached() {
        warnings.push(format!(
            "Cumulative discounted cash flow does not turn non-negative within {} years",
            discounted.rows.len()
        ));
    }

    tracing::debug!(
        payback = ?payback.year(),
        dynamic_payback = ?dynamic_payback.year(),
        "payback located"
    );

    let ValuationMetrics {
        static_npv,
        static_irr,
        dynamic_npv,
        dynamic_irr,
        discounted_series_irr,
    } = discounted.valuation.clone();

    let output = FinancialResult {
        nominal_rate: discounted.nominal_rate,
        real_rate: discounted.real_rate,
        static_npv,
        static_irr,
        dynamic_npv,
        dynamic_irr,
        discounted_series_irr,
        payback,
        dynamic_payback,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Payback by Linear Interpolation on Cumulative Cash Flow",
        &serde_json::json!({
            "horizon_years": net.rows.len(),
            "crossing": "first cum[i-1] < 0 <= cum[i]",
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn points(values: &[Money]) -> Vec<(u32, Money)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32 + 1, *v))
            .collect()
    }

    #[test]
    fn test_interpolates_between_years() {
        let p = locate_payback(&points(&[dec!(-100), dec!(-40), dec!(20), dec!(80)]));
        // 2 + 40 / 60 = 2.666...
        match p {
            Payback::Reached {
                year,
                break_even_year,
            } => {
                assert!((year - dec!(2.6666667)).abs() < dec!(0.000001));
                assert_eq!(break_even_year, 3);
            }
            Payback::NotWithinHorizon => panic!("expected payback"),
        }
    }

    #[test]
    fn test_exact_zero_counts_as_recovered() {
        let p = locate_payback(&points(&[dec!(-50), dec!(0), dec!(50)]));
        assert_eq!(
            p,
            Payback::Reached {
                year: dec!(2),
                break_even_year: 2
            }
        );
    }

    #[test]
    fn test_no_crossing() {
        assert_eq!(
            locate_payback(&points(&[dec!(-100), dec!(-90), dec!(-80)])),
            Payback::NotWithinHorizon
        );
        // Non-negative from the start has no crossing either
        assert_eq!(
            locate_payback(&points(&[dec!(10), dec!(20)])),
            Payback::NotWithinHorizon
        );
        assert_eq!(locate_payback(&[]), Payback::NotWithinHorizon);
    }

    #[test]
    fn test_year_zero_series() {
        let p = locate_payback(&[(0, dec!(-1000)), (1, dec!(-400)), (2, dec!(200))]);
        assert_eq!(p.year(), Some(dec!(1) + dec!(400) / dec!(600)));
    }

    #[test]
    fn test_first_crossing_wins() {
        let p = locate_payback(&points(&[dec!(-10), dec!(10), dec!(-5), dec!(5)]));
        assert_eq!(
            p,
            Payback::Reached {
                year: dec!(1.5),
                break_even_year: 2
            }
        );
    }

    proptest! {
        #[test]
        fn prop_locator_is_idempotent(
            values in proptest::collection::vec(-1_000_000i64..1_000_000, 0..30),
        ) {
            let pts: Vec<(u32, Money)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (i as u32 + 1, Decimal::from(*v)))
                .collect();
            prop_assert_eq!(locate_payback(&pts), locate_payback(&pts));
        }

        #[test]
        fn prop_negative_series_never_pays_back(
            values in proptest::collection::vec(-1_000_000i64..-1, 0..30),
        ) {
            let pts: Vec<(u32, Money)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (i as u32 + 1, Decimal::from(*v)))
                .collect();
            prop_assert_eq!(locate_payback(&pts), Payback::NotWithinHorizon);
        }
    }
}
