//! Per-stakeholder split of investment, income and expense, with rooftop
//! rent and loan repayment merged into an individual cash-flow ledger.

pub mod allocation;
pub mod ledger;
pub mod loan;
pub mod rent;

pub use allocation::{AllocatedItem, AllocatedYear, InvestmentShare};
pub use ledger::{all_ledgers, build_ledger, ledger_for, LedgerYear, StakeholderIndicators, StakeholderLedger};
pub use loan::{annuity_payment, build_loan_schedule, LoanPeriod, LoanSchedule};
pub use rent::{rent_schedule, RentSchedule, RentYear};
