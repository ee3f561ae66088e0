use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cashflow::CashflowSchedule;
use crate::error::PvEconError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::PvEconResult;

/// Undiscounted yearly cash flows, first element = year 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NominalSeries(Vec<Money>);

impl NominalSeries {
    pub fn new(flows: Vec<Money>) -> Self {
        NominalSeries(flows)
    }

    pub fn as_slice(&self) -> &[Money] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Running totals: `out[i] = out[i-1] + values[i]`, starting from zero.
pub fn cumulative(values: &[Money]) -> Vec<Money> {
    values
        .iter()
        .scan(Decimal::ZERO, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetCashflowRow {
    pub year: u32,
    pub total_income: Money,
    pub total_expense: Money,
    /// Income − expense, less the initial investment in year 1
    pub net_cashflow: Money,
    pub cumulative: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCashflowSchedule {
    pub initial_investment: Money,
    pub rows: Vec<NetCashflowRow>,
    /// Cumulative value after the final year
    pub total_net_cashflow: Money,
}

impl NetCashflowSchedule {
    pub fn series(&self) -> NominalSeries {
        NominalSeries::new(self.rows.iter().map(|r| r.net_cashflow).collect())
    }

    pub fn cumulative_points(&self) -> Vec<(u32, Money)> {
        self.rows.iter().map(|r| (r.year, r.cumulative)).collect()
    }
}

/// Combine income and expense into yearly and cumulative net cash flow. The
/// initial investment is charged entirely to year 1.
pub fn net_cashflows(
    schedule: &CashflowSchedule,
    initial_investment: Money,
) -> PvEconResult<ComputationOutput<NetCashflowSchedule>> {
    let start = Instant::now();

    if schedule.income.len() != schedule.expense.len() {
        return Err(PvEconError::invalid(
            "cashflow",
            format!(
                "income has {} years but expense has {}",
                schedule.income.len(),
                schedule.expense.len()
            ),
        ));
    }

    let mut rows = Vec::with_capacity(schedule.income.len());
    let mut running = Decimal::ZERO;

    for (i, (inc, exp)) in schedule.income.iter().zip(&schedule.expense).enumerate() {
        let expected = i as u32 + 1;
        if inc.year != expected || exp.year != expected {
            return Err(PvEconError::invalid(
                "cashflow",
                format!(
                    "year sequence broken at position {i}: income year {}, expense year {}",
                    inc.year, exp.year
                ),
            ));
        }

        let mut net = inc.total_income - exp.total_expense;
        if expected == 1 {
            net -= initial_investment;
        }
        running += net;

        rows.push(NetCashflowRow {
            year: expected,
            total_income: inc.total_income,
            total_expense: exp.total_expense,
            net_cashflow: net,
            cumulative: running,
        });
    }

    tracing::debug!(years = rows.len(), total = %running, "net cash flow computed");

    let output = NetCashflowSchedule {
        initial_investment,
        rows,
        total_net_cashflow: running,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Net Cash Flow (income - expense, investment charged to year 1)",
        &serde_json::json!({
            "initial_investment": initial_investment.to_string(),
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}
