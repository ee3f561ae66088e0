use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PvEconError;
use crate::params::{LoanTerms, RepaymentMethod};
use crate::time_value::pmt;
use crate::types::{pct_to_rate, with_metadata, ComputationOutput, Money, Rate};
use crate::PvEconResult;

/// A single year of the repayment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPeriod {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub payment: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub method: RepaymentMethod,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_years: u32,
    pub periods: Vec<LoanPeriod>,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_payment: Money,
}

impl LoanSchedule {
    /// Payment due in `year`, zero outside the term.
    pub fn payment_in(&self, year: u32) -> Money {
        self.periods
            .iter()
            .find(|p| p.year == year)
            .map(|p| p.payment)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Annuity payment `P·r·(1+r)^n / ((1+r)^n − 1)`.
///
/// A zero rate (or any rate that collapses the denominator) is reported as
/// `DivideByZero`; callers fall back to straight division by `n`.
pub fn annuity_payment(principal: Money, rate: Rate, years: u32) -> PvEconResult<Money> {
    if years == 0 {
        return Err(PvEconError::invalid("loan.term_years", "Term must be at least 1 year"));
    }
    pmt(rate, years, -principal, Decimal::ZERO)
}

/// Build a year-by-year repayment schedule.
pub fn build_loan_schedule(terms: &LoanTerms) -> PvEconResult<ComputationOutput<LoanSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let rate = pct_to_rate(terms.annual_rate_pct);
    let n = terms.term_years;
    let mut periods = Vec::with_capacity(n as usize);

    if terms.principal <= Decimal::ZERO {
        warnings.push("Loan principal is not positive; schedule is all zero".into());
        for year in 1..=n {
            periods.push(LoanPeriod {
                year,
                opening_balance: Decimal::ZERO,
                interest: Decimal::ZERO,
                principal: Decimal::ZERO,
                payment: Decimal::ZERO,
                closing_balance: Decimal::ZERO,
            });
        }
    } else {
        terms.validate()?;
        let principal = terms.principal;

        let installment = match terms.method {
            RepaymentMethod::EqualInstallment => Some(match annuity_payment(principal, rate, n) {
                Ok(p) => p,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(%rate, years = n, "annuity undefined; using straight division");
                    warnings.push(format!("{e}; payment falls back to principal / {n}"));
                    principal / Decimal::from(n)
                }
                Err(e) => return Err(e),
            }),
            RepaymentMethod::EqualPrincipal => None,
        };
        let straight_principal = principal / Decimal::from(n);

        let mut balance = principal;
        for year in 1..=n {
            let opening = balance;
            let final_year = year == n;

            let (interest, repaid, payment) = match installment {
                Some(payment) => {
                    // Final year closes the balance; the payment stays constant
                    let repaid = if final_year { opening } else { payment - opening * rate };
                    (payment - repaid, repaid, payment)
                }
                None => {
                    let interest = opening * rate;
                    let repaid = if final_year {
                        opening
                    } else {
                        straight_principal.min(opening)
                    };
                    (interest, repaid, repaid + interest)
                }
            };

            balance -= repaid;
            periods.push(LoanPeriod {
                year,
                opening_balance: opening,
                interest,
                principal: repaid,
                payment,
                closing_balance: balance,
            });
        }
    }

    let total_interest = periods.iter().map(|p| p.interest).sum();
    let total_principal = periods.iter().map(|p| p.principal).sum();
    let total_payment = periods.iter().map(|p| p.payment).sum();

    tracing::debug!(
        method = ?terms.method,
        years = n,
        %total_interest,
        "loan schedule built"
    );

    let output = LoanSchedule {
        method: terms.method,
        principal: terms.principal.max(Decimal::ZERO),
        annual_rate: rate,
        term_years: n,
        periods,
        total_interest,
        total_principal,
        total_payment,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        match terms.method {
            RepaymentMethod::EqualInstallment => "Loan Amortisation (equal installment / annuity)",
            RepaymentMethod::EqualPrincipal => "Loan Amortisation (equal principal)",
        },
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_rate_pct": terms.annual_rate_pct.to_string(),
            "term_years": n,
        }),
        warnings,
        elapsed,
        output,
    ))
}
