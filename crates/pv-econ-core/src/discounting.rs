use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PvEconError;
use crate::net_cashflow::{cumulative, NetCashflowSchedule, NominalSeries};
use crate::params::FinancialParameters;
use crate::time_value::{discount_beyond_range, irr, npv, IRR_GUESS};
use crate::types::{pct_to_rate, with_metadata, ComputationOutput, Metric, Money, Rate};
use crate::PvEconResult;

/// Yearly cash flows that have already been brought to present value.
///
/// Only [`discount_series`] builds one, so summing it is the dynamic NPV and
/// it must never be passed through [`npv`] again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountedSeries(Vec<Money>);

impl DiscountedSeries {
    pub fn as_slice(&self) -> &[Money] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Dynamic NPV: a plain sum, the discounting is already applied.
    pub fn total(&self) -> Money {
        self.0.iter().sum()
    }
}

/// Fisher relation `(1 + nominal) / (1 + inflation) - 1`. Falls back to the
/// nominal rate when `1 + inflation` is zero.
pub fn real_rate(nominal: Rate, inflation: Rate, warnings: &mut Vec<String>) -> Rate {
    let denom = Decimal::ONE + inflation;
    if denom.is_zero() {
        tracing::warn!(%nominal, %inflation, "inflation of -100%; using nominal rate");
        warnings.push(format!(
            "Inflation rate of {inflation} makes the real-rate denominator zero; using nominal rate {nominal}"
        ));
        return nominal;
    }
    (Decimal::ONE + nominal) / denom - Decimal::ONE
}

/// `pv(y) = net(y) / (1 + r)^(y - 1)`: year 1 is taken undiscounted.
pub fn discount_series(series: &NominalSeries, rate: Rate) -> PvEconResult<DiscountedSeries> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return Err(PvEconError::invalid(
            "real_rate",
            format!("Real discount rate must be greater than -100%, got {rate}"),
        ));
    }

    let mut out = Vec::with_capacity(series.len());
    for (i, net) in series.as_slice().iter().enumerate() {
        let pv = match one_plus_r.checked_powi(i as i64) {
            Some(factor) if factor.is_zero() => None,
            Some(factor) => net.checked_div(factor),
            None => discount_beyond_range(*net, one_plus_r, i as u64),
        };
        out.push(pv.ok_or_else(|| PvEconError::DivideByZero {
            context: format!("discount factor for year {}", i + 1),
        })?);
    }
    Ok(DiscountedSeries(out))
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedRow {
    pub year: u32,
    pub net_cashflow: Money,
    pub present_value: Money,
    pub cumulative_present_value: Money,
}

/// NPV and IRR over the nominal and discounted series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationMetrics {
    /// NPV of the nominal series at the nominal discount rate (year 1 at t = 0)
    pub static_npv: Money,
    pub static_irr: Metric,
    /// Sum of the discounted series
    pub dynamic_npv: Money,
    /// Same definition as `static_irr`
    pub dynamic_irr: Metric,
    /// IRR of the discounted series
    pub discounted_series_irr: Metric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountedCashflowSchedule {
    pub nominal_rate: Rate,
    pub real_rate: Rate,
    pub rows: Vec<DiscountedRow>,
    pub valuation: ValuationMetrics,
}

impl DiscountedCashflowSchedule {
    pub fn series(&self) -> DiscountedSeries {
        DiscountedSeries(self.rows.iter().map(|r| r.present_value).collect())
    }

    pub fn cumulative_points(&self) -> Vec<(u32, Money)> {
        self.rows
            .iter()
            .map(|r| (r.year, r.cumulative_present_value))
            .collect()
    }
}

/// NPV/IRR figures for a nominal series and its discounted counterpart.
pub fn valuation_metrics(
    nominal: &NominalSeries,
    discounted: &DiscountedSeries,
    nominal_rate: Rate,
    warnings: &mut Vec<String>,
) -> PvEconResult<ValuationMetrics> {
    let static_npv = npv(nominal_rate, nominal.as_slice())?;
    let static_irr = Metric::from_result(irr(nominal.as_slice(), IRR_GUESS), "static_irr", warnings)?;
    let dynamic_irr = static_irr.clone();
    let discounted_series_irr = Metric::from_result(
        irr(discounted.as_slice(), IRR_GUESS),
        "discounted_series_irr",
        warnings,
    )?;

    Ok(ValuationMetrics {
        static_npv,
        static_irr,
        dynamic_npv: discounted.total(),
        dynamic_irr,
        discounted_series_irr,
    })
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Discount the net cash flow at the real rate and compute NPV/IRR.
pub fn discount_cashflows(
    net: &NetCashflowSchedule,
    financial: &FinancialParameters,
) -> PvEconResult<ComputationOutput<DiscountedCashflowSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let nominal_rate = pct_to_rate(financial.discount_rate_pct);
    let inflation = pct_to_rate(financial.inflation_rate_pct);
    let real = real_rate(nominal_rate, inflation, &mut warnings);

    let nominal = net.series();
    let discounted = discount_series(&nominal, real)?;
    let cumulative_pv = cumulative(discounted.as_slice());

    let rows: Vec<DiscountedRow> = net
        .rows
        .iter()
        .zip(discounted.as_slice())
        .zip(&cumulative_pv)
        .map(|((row, pv), cum)| DiscountedRow {
            year: row.year,
            net_cashflow: row.net_cashflow,
            present_value: *pv,
            cumulative_present_value: *cum,
        })
        .collect();

    let valuation = valuation_metrics(&nominal, &discounted, nominal_rate, &mut warnings)?;

    tracing::debug!(
        %real,
        static_npv = %valuation.static_npv,
        dynamic_npv = %valuation.dynamic_npv,
        "cash flow discounted"
    );

    let output = DiscountedCashflowSchedule {
        nominal_rate,
        real_rate: real,
        rows,
        valuation,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Real-rate Discounting (Fisher), Static/Dynamic NPV and IRR",
        &serde_json::json!({
            "discount_rate_pct": financial.discount_rate_pct.to_string(),
            "inflation_rate_pct": financial.inflation_rate_pct.to_string(),
            "year_one_discounted": false,
        }),
        warnings,
        elapsed,
        output,
    ))
}
