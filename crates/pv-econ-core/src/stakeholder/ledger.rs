use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use super::allocation::{allocate_operating, weighted_investment, AllocatedYear, InvestmentShare};
use super::loan::{build_loan_schedule, LoanSchedule};
use super::rent::{rent_schedule, RentSchedule};
use crate::cashflow::CashflowSchedule;
use crate::error::PvEconError;
use crate::investment::InvestmentBreakdown;
use crate::net_cashflow::cumulative;
use crate::params::{ProjectParameters, RentRole, StakeholderConfig};
use crate::payback::{locate_payback, Payback};
use crate::pipeline::{ResultsDocument, Stage};
use crate::time_value::{irr, npv, IRR_GUESS};
use crate::types::{pct_to_rate, with_metadata, ComputationOutput, Metric, Money};
use crate::PvEconResult;

/// One year of a stakeholder's merged cash flow. Year 0 holds the loan
/// drawdown and the initial contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerYear {
    pub year: u32,
    pub income: Money,
    pub expense: Money,
    pub rent_paid: Money,
    pub rent_received: Money,
    pub loan_payment: Money,
    pub net_cashflow: Money,
    pub cumulative: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderIndicators {
    pub payback: Payback,
    /// Cumulative net cash flow after the final year
    pub total_profit: Money,
    /// NPV at the project's nominal discount rate, year 0 undiscounted
    pub npv: Money,
    pub irr: Metric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeholderLedger {
    pub name: String,
    pub rent_role: RentRole,
    pub initial_contribution: InvestmentShare,
    pub loan_principal: Money,
    pub operating: Vec<AllocatedYear>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan: Option<LoanSchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent: Option<RentSchedule>,
    pub years: Vec<LedgerYear>,
    pub indicators: StakeholderIndicators,
}

/// Build one stakeholder's ledger from the shared investment and cash-flow
/// results.
pub fn build_ledger(
    params: &ProjectParameters,
    config: &StakeholderConfig,
    investment: &InvestmentBreakdown,
    cashflow: &CashflowSchedule,
) -> PvEconResult<ComputationOutput<StakeholderLedger>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    let span = tracing::debug_span!("ledger", stakeholder = %config.name);
    let _guard = span.enter();

    let contribution = weighted_investment(investment, config, &mut warnings);
    let operating = allocate_operating(cashflow, config, &mut warnings);

    let loan = match &config.loan {
        Some(terms) => {
            let out = build_loan_schedule(terms)?;
            warnings.extend(out.warnings);
            Some(out.result)
        }
        None => None,
    };
    let loan_principal = loan.as_ref().map(|l| l.principal).unwrap_or(Decimal::ZERO);

    let rent = match (config.rent_role, &params.rental) {
        (RentRole::None, _) => None,
        (_, Some(terms)) => Some(rent_schedule(terms)?.result),
        (role, None) => {
            warnings.push(format!(
                "Stakeholder '{}' has rent role {role:?} but no rental terms are configured; rent ignored",
                config.name
            ));
            None
        }
    };

    // Union of operating, rent and loan years, plus year 0
    let mut all_years: BTreeSet<u32> = BTreeSet::from([0]);
    all_years.extend(operating.iter().map(|y| y.year));
    if let Some(r) = &rent {
        all_years.extend(r.rows.iter().map(|y| y.year));
    }
    if let Some(l) = &loan {
        all_years.extend(l.periods.iter().map(|p| p.year));
    }

    let mut rows: Vec<LedgerYear> = Vec::with_capacity(all_years.len());
    for year in all_years {
        let row = if year == 0 {
            LedgerYear {
                year,
                income: loan_principal,
                expense: contribution.total,
                rent_paid: Decimal::ZERO,
                rent_received: Decimal::ZERO,
                loan_payment: Decimal::ZERO,
                net_cashflow: loan_principal - contribution.total,
                cumulative: Decimal::ZERO,
            }
        } else {
            let (income, expense) = operating
                .iter()
                .find(|y| y.year == year)
                .map(|y| (y.total_income, y.total_expense))
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            let rent_amount = rent.as_ref().map(|r| r.rent_in(year)).unwrap_or(Decimal::ZERO);
            let (rent_paid, rent_received) = match config.rent_role {
                RentRole::Payer => (rent_amount, Decimal::ZERO),
                RentRole::Recipient => (Decimal::ZERO, rent_amount),
                RentRole::None => (Decimal::ZERO, Decimal::ZERO),
            };
            let loan_payment = loan.as_ref().map(|l| l.payment_in(year)).unwrap_or(Decimal::ZERO);
            LedgerYear {
                year,
                income,
                expense,
                rent_paid,
                rent_received,
                loan_payment,
                net_cashflow: income - expense - rent_paid + rent_received - loan_payment,
                cumulative: Decimal::ZERO,
            }
        };
        rows.push(row);
    }

    let flows: Vec<Money> = rows.iter().map(|r| r.net_cashflow).collect();
    for (row, cum) in rows.iter_mut().zip(cumulative(&flows)) {
        row.cumulative = cum;
    }

    let points: Vec<(u32, Money)> = rows.iter().map(|r| (r.year, r.cumulative)).collect();
    let payback = locate_payback(&points);
    let total_profit = rows.last().map(|r| r.cumulative).unwrap_or(Decimal::ZERO);
    let npv_value = npv(pct_to_rate(params.financial.discount_rate_pct), &flows)?;
    let irr_value = Metric::from_result(irr(&flows, IRR_GUESS), "stakeholder_irr", &mut warnings)?;

    tracing::debug!(
        years = rows.len(),
        %total_profit,
        payback = ?payback.year(),
        "stakeholder ledger built"
    );

    let output = StakeholderLedger {
        name: config.name.clone(),
        rent_role: config.rent_role,
        initial_contribution: contribution,
        loan_principal,
        operating,
        loan,
        rent,
        years: rows,
        indicators: StakeholderIndicators {
            payback,
            total_profit,
            npv: npv_value,
            irr: irr_value,
        },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Stakeholder Allocation (ratio-weighted items, rent, loan; year 0 = loan - contribution)",
        &serde_json::json!({
            "stakeholder": config.name,
            "rent_role": config.rent_role,
            "has_loan": config.loan.is_some(),
            "discount_rate_pct": params.financial.discount_rate_pct.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Build the ledger of the stakeholder called `name` against a results
/// document, which must already hold the investment and cash-flow stages.
pub fn ledger_for(
    params: &ProjectParameters,
    name: &str,
    doc: &ResultsDocument,
) -> PvEconResult<ComputationOutput<StakeholderLedger>> {
    let config = params.stakeholder(name).ok_or_else(|| {
        PvEconError::invalid("stakeholders.name", format!("no stakeholder named '{name}'"))
    })?;
    let missing = |requires: Stage| PvEconError::MissingDependency {
        stage: "stakeholder".into(),
        requires: requires.to_string(),
    };
    let investment = doc.investment.as_ref().ok_or_else(|| missing(Stage::Investment))?;
    let cashflow = doc.cashflow.as_ref().ok_or_else(|| missing(Stage::Cashflow))?;
    build_ledger(params, config, investment, cashflow)
}

/// Ledgers of every configured stakeholder, in configuration order.
pub fn all_ledgers(
    params: &ProjectParameters,
    doc: &ResultsDocument,
) -> PvEconResult<Vec<ComputationOutput<StakeholderLedger>>> {
    params
        .stakeholders
        .iter()
        .map(|s| ledger_for(params, &s.name, doc))
        .collect()
}
