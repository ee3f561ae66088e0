use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use pv_econ_core::params::{LoanTerms, RepaymentMethod};
use pv_econ_core::stakeholder::build_loan_schedule;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    /// Constant annual payment
    EqualInstallment,
    /// Constant principal, declining interest
    EqualPrincipal,
}

impl From<MethodArg> for RepaymentMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::EqualInstallment => RepaymentMethod::EqualInstallment,
            MethodArg::EqualPrincipal => RepaymentMethod::EqualPrincipal,
        }
    }
}

/// Arguments for a loan repayment schedule
#[derive(Args)]
pub struct LoanArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,

    /// Annual interest rate in percent (e.g. 4.9)
    #[arg(long)]
    pub rate_pct: Decimal,

    /// Term in years
    #[arg(long)]
    pub years: u32,

    /// Repayment method
    #[arg(long, value_enum, default_value = "equal-installment")]
    pub method: MethodArg,
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = LoanTerms {
        principal: args.principal,
        annual_rate_pct: args.rate_pct,
        term_years: args.years,
        method: args.method.into(),
    };
    let result = build_loan_schedule(&terms)?;
    Ok(serde_json::to_value(result)?)
}
