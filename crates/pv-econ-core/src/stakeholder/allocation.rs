use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cashflow::CashflowSchedule;
use crate::investment::InvestmentBreakdown;
use crate::params::StakeholderConfig;
use crate::types::{Money, Ratio};

/// Clamp a configured share into [0, 1], recording a warning when it moves.
pub fn clamp_ratio(key: &str, ratio: Ratio, warnings: &mut Vec<String>) -> Ratio {
    let clamped = ratio.max(Decimal::ZERO).min(Decimal::ONE);
    if clamped != ratio {
        tracing::warn!(item = key, %ratio, %clamped, "allocation ratio clamped");
        warnings.push(format!("Ratio for '{key}' of {ratio} clamped to {clamped}"));
    }
    clamped
}

fn ratio_for(map: &BTreeMap<String, Ratio>, key: &str, warnings: &mut Vec<String>) -> Ratio {
    map.get(key)
        .map(|r| clamp_ratio(key, *r, warnings))
        .unwrap_or(Decimal::ZERO)
}

fn warn_unknown_keys(
    map: &BTreeMap<String, Ratio>,
    known: &[&str],
    kind: &str,
    warnings: &mut Vec<String>,
) {
    for key in map.keys() {
        if !known.contains(&key.as_str()) {
            warnings.push(format!("Unknown {kind} item '{key}' in ratio map ignored"));
        }
    }
}

/// One investment line item and the share borne by the stakeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedItem {
    pub item: String,
    pub cost: Money,
    pub ratio: Ratio,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentShare {
    pub items: Vec<AllocatedItem>,
    pub total: Money,
}

/// Ratio-weighted income and expense of one operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedYear {
    pub year: u32,
    pub income_items: BTreeMap<String, Money>,
    pub expense_items: BTreeMap<String, Money>,
    pub total_income: Money,
    pub total_expense: Money,
}

/// Σ cost × ratio over investment line items outside the exclusion set.
pub fn weighted_investment(
    breakdown: &InvestmentBreakdown,
    config: &StakeholderConfig,
    warnings: &mut Vec<String>,
) -> InvestmentShare {
    let line_items = breakdown.line_items();
    let known: Vec<&str> = line_items.iter().map(|(name, _)| *name).collect();
    warn_unknown_keys(&config.investment_ratios, &known, "investment", warnings);

    let items: Vec<AllocatedItem> = line_items
        .into_iter()
        .filter(|(name, _)| !config.excluded_investment_items.contains(*name))
        .map(|(name, cost)| {
            let ratio = ratio_for(&config.investment_ratios, name, warnings);
            AllocatedItem {
                item: name.to_string(),
                cost,
                ratio,
                amount: cost * ratio,
            }
        })
        .collect();
    let total = items.iter().map(|i| i.amount).sum();

    InvestmentShare { items, total }
}

/// Split every operating year's income and expense line items by the
/// stakeholder's ratio maps.
pub fn allocate_operating(
    schedule: &CashflowSchedule,
    config: &StakeholderConfig,
    warnings: &mut Vec<String>,
) -> Vec<AllocatedYear> {
    if let (Some(inc), Some(exp)) = (schedule.income.first(), schedule.expense.first()) {
        let income_keys: Vec<&str> = inc.line_items().iter().map(|(k, _)| *k).collect();
        let expense_keys: Vec<&str> = exp.line_items().iter().map(|(k, _)| *k).collect();
        warn_unknown_keys(&config.income_ratios, &income_keys, "income", warnings);
        warn_unknown_keys(&config.expense_ratios, &expense_keys, "expense", warnings);
    }

    // Clamp warnings are reported once, not once per year
    let mut ratio_warnings = Vec::new();
    schedule
        .income
        .iter()
        .zip(&schedule.expense)
        .enumerate()
        .map(|(i, (inc, exp))| {
            let sink = if i == 0 { &mut *warnings } else { &mut ratio_warnings };
            let income_items: BTreeMap<String, Money> = inc
                .line_items()
                .iter()
                .map(|(k, v)| (k.to_string(), *v * ratio_for(&config.income_ratios, k, sink)))
                .collect();
            let expense_items: BTreeMap<String, Money> = exp
                .line_items()
                .iter()
                .map(|(k, v)| (k.to_string(), *v * ratio_for(&config.expense_ratios, k, sink)))
                .collect();
            AllocatedYear {
                year: inc.year,
                total_income: income_items.values().sum(),
                total_expense: expense_items.values().sum(),
                income_items,
                expense_items,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cashflow::{AnnualExpense, AnnualIncome};
    use rust_decimal_macros::dec;

    fn breakdown() -> InvestmentBreakdown {
        InvestmentBreakdown {
            panels: dec!(75000),
            inverter: dec!(20000),
            equipment_subtotal: dec!(95000),
            installation: dec!(15000),
            design: dec!(10000),
            decision: dec!(5000),
            other: dec!(25000),
            total: dec!(150000),
        }
    }

    fn config(json: serde_json::Value) -> StakeholderConfig {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_aggregates_excluded_by_default() {
        let c = config(serde_json::json!({
            "name": "enterprise",
            "investment_ratios": {
                "panels": 1, "inverter": 1, "equipment_subtotal": 1,
                "installation": 1, "design": 1, "decision": 1, "other": 1, "total": 1
            }
        }));
        let mut w = Vec::new();
        let share = weighted_investment(&breakdown(), &c, &mut w);
        assert_eq!(share.total, dec!(150000));
        assert_eq!(share.items.len(), 6);
        assert!(w.is_empty());
    }

    #[test]
    fn test_partial_ratios_and_missing_keys() {
        let c = config(serde_json::json!({
            "name": "owner",
            "investment_ratios": { "panels": 0.5, "design": 1 }
        }));
        let mut w = Vec::new();
        let share = weighted_investment(&breakdown(), &c, &mut w);
        assert_eq!(share.total, dec!(47500));
    }

    #[test]
    fn test_out_of_range_ratio_clamped() {
        let c = config(serde_json::json!({
            "name": "owner",
            "investment_ratios": { "panels": 1.5, "inverter": -0.2 }
        }));
        let mut w = Vec::new();
        let share = weighted_investment(&breakdown(), &c, &mut w);
        assert_eq!(share.total, dec!(75000));
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn test_unknown_key_warns() {
        let c = config(serde_json::json!({
            "name": "owner",
            "investment_ratios": { "roof": 1 }
        }));
        let mut w = Vec::new();
        weighted_investment(&breakdown(), &c, &mut w);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_operating_split() {
        let schedule = CashflowSchedule {
            income: vec![AnnualIncome {
                year: 1,
                generation: dec!(1000),
                sale_income: dec!(200),
                self_use_income: dec!(100),
                total_income: dec!(300),
            }],
            expense: vec![AnnualExpense {
                year: 1,
                maintenance: dec!(50),
                tax: dec!(30),
                depreciation: dec!(20),
                total_expense: dec!(100),
            }],
            total_income: dec!(300),
            total_expense: dec!(100),
        };
        let c = config(serde_json::json!({
            "name": "enterprise",
            "income_ratios": { "sale_income": 1, "self_use_income": 0.5 },
            "expense_ratios": { "maintenance": 1 }
        }));
        let mut w = Vec::new();
        let years = allocate_operating(&schedule, &c, &mut w);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].total_income, dec!(250));
        assert_eq!(years[0].total_expense, dec!(50));
        assert_eq!(years[0].expense_items["tax"], Decimal::ZERO);
    }
}
