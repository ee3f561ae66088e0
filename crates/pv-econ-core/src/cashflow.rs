use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::generation::generation_profile;
use crate::investment::InvestmentBreakdown;
use crate::params::{FinancialParameters, SolarParameters};
use crate::types::{pct_to_rate, with_metadata, ComputationOutput, Energy, Money};
use crate::PvEconResult;

pub const INCOME_SALE: &str = "sale_income";
pub const INCOME_SELF_USE: &str = "self_use_income";
pub const EXPENSE_MAINTENANCE: &str = "maintenance";
pub const EXPENSE_TAX: &str = "tax";
pub const EXPENSE_DEPRECIATION: &str = "depreciation";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Income of one project year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualIncome {
    pub year: u32,
    pub generation: Energy,
    /// Sold energy × (feed-in price + subsidy)
    pub sale_income: Money,
    /// Self-consumed energy × (grid price − feed-in price)
    pub self_use_income: Money,
    pub total_income: Money,
}

impl AnnualIncome {
    pub fn line_items(&self) -> [(&'static str, Money); 2] {
        [
            (INCOME_SALE, self.sale_income),
            (INCOME_SELF_USE, self.self_use_income),
        ]
    }
}

/// Expense of one project year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualExpense {
    pub year: u32,
    pub maintenance: Money,
    pub tax: Money,
    /// Flat share of the initial investment (straight-line)
    pub depreciation: Money,
    pub total_expense: Money,
}

impl AnnualExpense {
    pub fn line_items(&self) -> [(&'static str, Money); 3] {
        [
            (EXPENSE_MAINTENANCE, self.maintenance),
            (EXPENSE_TAX, self.tax),
            (EXPENSE_DEPRECIATION, self.depreciation),
        ]
    }
}

/// Per-year income and expense, both ordered by year with no gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowSchedule {
    pub income: Vec<AnnualIncome>,
    pub expense: Vec<AnnualExpense>,
    pub total_income: Money,
    pub total_expense: Money,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Project yearly income and expense line items over the lifetime.
pub fn project_cashflows(
    solar: &SolarParameters,
    financial: &FinancialParameters,
    investment: &InvestmentBreakdown,
) -> PvEconResult<ComputationOutput<CashflowSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    financial.validate()?;
    let profile = generation_profile(solar, financial.lifetime_years)?.result;

    let sell_ratio = pct_to_rate(financial.sell_ratio_pct);
    let self_use_ratio = Decimal::ONE - sell_ratio;
    let sale_unit = financial.sell_price + financial.subsidy;
    let self_use_unit = financial.use_price - financial.sell_price;
    if self_use_unit < Decimal::ZERO {
        warnings.push(format!(
            "Grid price ({}) is below feed-in price ({}); self-consumption income is negative",
            financial.use_price, financial.sell_price
        ));
    }

    let tax_rate = pct_to_rate(financial.tax_rate_pct);
    let maintenance = financial.maintenance_cost_per_m2 * solar.panel_area;
    let depreciation = pct_to_rate(financial.depreciation_rate_pct) * investment.total;

    let mut income = Vec::with_capacity(profile.years.len());
    let mut expense = Vec::with_capacity(profile.years.len());

    for gy in &profile.years {
        let sale_income = gy.generation * sell_ratio * sale_unit;
        let self_use_income = gy.generation * self_use_ratio * self_use_unit;
        let total_income = sale_income + self_use_income;

        let tax = tax_rate * total_income;
        let total_expense = maintenance + tax + depreciation;

        income.push(AnnualIncome {
            year: gy.year,
            generation: gy.generation,
            sale_income,
            self_use_income,
            total_income,
        });
        expense.push(AnnualExpense {
            year: gy.year,
            maintenance,
            tax,
            depreciation,
            total_expense,
        });
    }

    let total_income = income.iter().map(|r| r.total_income).sum();
    let total_expense = expense.iter().map(|r| r.total_expense).sum();

    tracing::debug!(
        years = income.len(),
        %total_income,
        %total_expense,
        "income and expense schedule built"
    );

    let output = CashflowSchedule {
        income,
        expense,
        total_income,
        total_expense,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-part Income (feed-in + self-use spread) and Straight-line Expense",
        &serde_json::json!({
            "sell_ratio_pct": financial.sell_ratio_pct.to_string(),
            "tax_rate_pct": financial.tax_rate_pct.to_string(),
            "depreciation_rate_pct": financial.depreciation_rate_pct.to_string(),
            "initial_investment": investment.total.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn solar() -> SolarParameters {
        SolarParameters {
            province: None,
            city: None,
            annual_irradiation: dec!(1200),
            panel_area: dec!(50),
            conversion_efficiency: dec!(0.20),
            performance_ratio: dec!(0.85),
            annual_degradation_pct: dec!(1),
        }
    }

    fn financial() -> FinancialParameters {
        FinancialParameters {
            lifetime_years: 20,
            sell_ratio_pct: dec!(40),
            sell_price: dec!(0.4),
            use_price: dec!(0.6),
            subsidy: dec!(0.05),
            maintenance_cost_per_m2: dec!(5),
            tax_rate_pct: dec!(10),
            depreciation_rate_pct: dec!(5),
            discount_rate_pct: dec!(6),
            inflation_rate_pct: dec!(2),
        }
    }

    fn investment(total: Money) -> InvestmentBreakdown {
        InvestmentBreakdown {
            panels: total,
            inverter: Decimal::ZERO,
            equipment_subtotal: total,
            installation: Decimal::ZERO,
            design: Decimal::ZERO,
            decision: Decimal::ZERO,
            other: Decimal::ZERO,
            total,
        }
    }

    #[test]
    fn test_year_one_income_split() {
        let out = project_cashflows(&solar(), &financial(), &investment(dec!(150000)))
            .unwrap()
            .result;
        let y1 = &out.income[0];
        // 10,098 kWh: 40% × 0.45 = 1,817.64; 60% × 0.20 = 1,211.76
        assert!((y1.sale_income - dec!(1817.64)).abs() < dec!(0.001));
        assert!((y1.self_use_income - dec!(1211.76)).abs() < dec!(0.001));
        assert!((y1.total_income - dec!(3029.40)).abs() < dec!(0.001));
    }

    #[test]
    fn test_year_one_expense() {
        let out = project_cashflows(&solar(), &financial(), &investment(dec!(150000)))
            .unwrap()
            .result;
        let e1 = &out.expense[0];
        assert_eq!(e1.maintenance, dec!(250));
        assert!((e1.tax - dec!(302.94)).abs() < dec!(0.001));
        assert_eq!(e1.depreciation, dec!(7500));
    }

    #[test]
    fn test_depreciation_is_flat() {
        let out = project_cashflows(&solar(), &financial(), &investment(dec!(150000)))
            .unwrap()
            .result;
        assert!(out.expense.iter().all(|e| e.depreciation == dec!(7500)));
    }

    #[test]
    fn test_one_entry_per_year() {
        let out = project_cashflows(&solar(), &financial(), &investment(dec!(150000)))
            .unwrap()
            .result;
        assert_eq!(out.income.len(), 20);
        assert_eq!(out.expense.len(), 20);
        for (i, (inc, exp)) in out.income.iter().zip(&out.expense).enumerate() {
            assert_eq!(inc.year, i as u32 + 1);
            assert_eq!(exp.year, i as u32 + 1);
        }
    }

    #[test]
    fn test_negative_spread_warns() {
        let mut f = financial();
        f.use_price = dec!(0.3);
        let out = project_cashflows(&solar(), &f, &investment(dec!(1000))).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.result.income[0].self_use_income < Decimal::ZERO);
    }

    #[test]
    fn test_line_items_sum_to_totals() {
        let out = project_cashflows(&solar(), &financial(), &investment(dec!(150000)))
            .unwrap()
            .result;
        let inc = &out.income[3];
        let sum: Money = inc.line_items().iter().map(|(_, v)| *v).sum();
        assert_eq!(sum, inc.total_income);
        let exp = &out.expense[3];
        let sum: Money = exp.line_items().iter().map(|(_, v)| *v).sum();
        assert_eq!(sum, exp.total_expense);
    }
}
