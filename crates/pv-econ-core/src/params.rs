use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::PvEconError;
use crate::investment::AGGREGATE_ITEMS;
use crate::types::{Money, Percent, Ratio};
use crate::PvEconResult;

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// Free-text project identification, carried into logs and outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Physical parameters of the array and its site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Annual irradiation on the panel plane (kWh/m²/yr)
    pub annual_irradiation: Decimal,
    /// Panel area (m²)
    pub panel_area: Decimal,
    /// Panel conversion efficiency (0-1)
    pub conversion_efficiency: Ratio,
    /// System performance ratio (0-1)
    pub performance_ratio: Ratio,
    /// Output lost per year of service (%)
    pub annual_degradation_pct: Percent,
}

/// Up-front construction costs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionParameters {
    pub panel_price_per_m2: Money,
    pub inverter_price: Money,
    pub installation_cost_per_m2: Money,
    pub design_cost: Money,
    pub decision_cost: Money,
    pub other_initial_cost: Money,
}

/// Tariffs, operating costs and discounting assumptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialParameters {
    /// Project horizon in years
    pub lifetime_years: u32,
    /// Share of generation sold to the grid (%)
    pub sell_ratio_pct: Percent,
    /// Feed-in price per kWh sold
    pub sell_price: Money,
    /// Grid purchase price per kWh avoided by self-consumption
    pub use_price: Money,
    /// Subsidy per kWh sold
    pub subsidy: Money,
    /// Annual O&M cost per m² of panel
    pub maintenance_cost_per_m2: Money,
    /// Combined tax rate on income (%)
    pub tax_rate_pct: Percent,
    /// Straight-line depreciation on initial investment (% per year)
    pub depreciation_rate_pct: Percent,
    /// Nominal discount rate (%)
    pub discount_rate_pct: Percent,
    /// Inflation rate (%)
    pub inflation_rate_pct: Percent,
}

/// Rooftop lease terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalTerms {
    /// Rent per m² per year
    pub unit_price: Money,
    /// Leased roof area (m²)
    pub area: Decimal,
    pub lease_years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentMethod {
    /// Constant annual payment (annuity)
    EqualInstallment,
    /// Constant principal, declining interest
    EqualPrincipal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate_pct: Percent,
    pub term_years: u32,
    pub method: RepaymentMethod,
}

/// How a stakeholder takes part in the rooftop lease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentRole {
    #[default]
    None,
    Payer,
    Recipient,
}

fn default_excluded_items() -> BTreeSet<String> {
    AGGREGATE_ITEMS.iter().map(|s| s.to_string()).collect()
}

/// Allocation shares, lease role and financing of one stakeholder.
///
/// Ratio maps are keyed by line-item name; a missing key means a share of 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeholderConfig {
    pub name: String,
    #[serde(default)]
    pub investment_ratios: BTreeMap<String, Ratio>,
    #[serde(default)]
    pub income_ratios: BTreeMap<String, Ratio>,
    #[serde(default)]
    pub expense_ratios: BTreeMap<String, Ratio>,
    #[serde(default = "default_excluded_items")]
    pub excluded_investment_items: BTreeSet<String>,
    #[serde(default)]
    pub rent_role: RentRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan: Option<LoanTerms>,
}

/// The complete parameters document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectParameters {
    #[serde(default)]
    pub project: ProjectInfo,
    pub solar: SolarParameters,
    pub construction: ConstructionParameters,
    pub financial: FinancialParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental: Option<RentalTerms>,
    #[serde(default)]
    pub stakeholders: Vec<StakeholderConfig>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn non_negative(field: &str, value: Decimal) -> PvEconResult<()> {
    if value < Decimal::ZERO {
        return Err(PvEconError::invalid(field, format!("must be non-negative, got {value}")));
    }
    Ok(())
}

fn percent(field: &str, value: Percent) -> PvEconResult<()> {
    if value < Decimal::ZERO || value > dec!(100) {
        return Err(PvEconError::invalid(field, format!("must be within 0-100, got {value}")));
    }
    Ok(())
}

fn fraction(field: &str, value: Ratio) -> PvEconResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(PvEconError::invalid(field, format!("must be within 0-1, got {value}")));
    }
    Ok(())
}

impl SolarParameters {
    pub fn validate(&self) -> PvEconResult<()> {
        non_negative("solar.annual_irradiation", self.annual_irradiation)?;
        non_negative("solar.panel_area", self.panel_area)?;
        fraction("solar.conversion_efficiency", self.conversion_efficiency)?;
        fraction("solar.performance_ratio", self.performance_ratio)?;
        percent("solar.annual_degradation_pct", self.annual_degradation_pct)
    }
}

impl ConstructionParameters {
    pub fn validate(&self) -> PvEconResult<()> {
        non_negative("construction.panel_price_per_m2", self.panel_price_per_m2)?;
        non_negative("construction.inverter_price", self.inverter_price)?;
        non_negative("construction.installation_cost_per_m2", self.installation_cost_per_m2)?;
        non_negative("construction.design_cost", self.design_cost)?;
        non_negative("construction.decision_cost", self.decision_cost)?;
        non_negative("construction.other_initial_cost", self.other_initial_cost)
    }
}

impl FinancialParameters {
    pub fn validate(&self) -> PvEconResult<()> {
        if self.lifetime_years == 0 {
            return Err(PvEconError::invalid(
                "financial.lifetime_years",
                "Project lifetime must be at least 1 year",
            ));
        }
        percent("financial.sell_ratio_pct", self.sell_ratio_pct)?;
        non_negative("financial.sell_price", self.sell_price)?;
        non_negative("financial.use_price", self.use_price)?;
        non_negative("financial.subsidy", self.subsidy)?;
        non_negative("financial.maintenance_cost_per_m2", self.maintenance_cost_per_m2)?;
        percent("financial.tax_rate_pct", self.tax_rate_pct)?;
        percent("financial.depreciation_rate_pct", self.depreciation_rate_pct)?;
        percent("financial.discount_rate_pct", self.discount_rate_pct)?;
        percent("financial.inflation_rate_pct", self.inflation_rate_pct)
    }
}

impl RentalTerms {
    pub fn validate(&self) -> PvEconResult<()> {
        non_negative("rental.unit_price", self.unit_price)?;
        non_negative("rental.area", self.area)
    }
}

impl LoanTerms {
    pub fn validate(&self) -> PvEconResult<()> {
        non_negative("loan.principal", self.principal)?;
        percent("loan.annual_rate_pct", self.annual_rate_pct)?;
        if self.principal > Decimal::ZERO && self.term_years == 0 {
            return Err(PvEconError::invalid(
                "loan.term_years",
                "A loan with positive principal needs a term of at least 1 year",
            ));
        }
        Ok(())
    }
}

impl StakeholderConfig {
    pub fn validate(&self) -> PvEconResult<()> {
        if self.name.trim().is_empty() {
            return Err(PvEconError::invalid("stakeholders.name", "must not be empty"));
        }
        if let Some(loan) = &self.loan {
            loan.validate()?;
        }
        Ok(())
    }
}

impl ProjectParameters {
    /// Check every group against the document invariants.
    pub fn validate(&self) -> PvEconResult<()> {
        self.solar.validate()?;
        self.construction.validate()?;
        self.financial.validate()?;
        if let Some(rental) = &self.rental {
            rental.validate()?;
        }

        let mut seen = BTreeSet::new();
        for s in &self.stakeholders {
            s.validate()?;
            if !seen.insert(s.name.as_str()) {
                return Err(PvEconError::invalid(
                    "stakeholders.name",
                    format!("duplicate stakeholder '{}'", s.name),
                ));
            }
        }
        Ok(())
    }

    pub fn stakeholder(&self, name: &str) -> Option<&StakeholderConfig> {
        self.stakeholders.iter().find(|s| s.name == name)
    }
}
