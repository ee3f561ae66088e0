use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::params::{ConstructionParameters, SolarParameters};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::PvEconResult;

pub const ITEM_PANELS: &str = "panels";
pub const ITEM_INVERTER: &str = "inverter";
pub const ITEM_EQUIPMENT_SUBTOTAL: &str = "equipment_subtotal";
pub const ITEM_INSTALLATION: &str = "installation";
pub const ITEM_DESIGN: &str = "design";
pub const ITEM_DECISION: &str = "decision";
pub const ITEM_OTHER: &str = "other";
pub const ITEM_TOTAL: &str = "total";

/// Line items that are sums of other items.
pub const AGGREGATE_ITEMS: [&str; 2] = [ITEM_EQUIPMENT_SUBTOTAL, ITEM_TOTAL];

/// Initial investment split into cost components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentBreakdown {
    /// Panel price × area
    pub panels: Money,
    pub inverter: Money,
    /// panels + inverter
    pub equipment_subtotal: Money,
    /// Installation cost per m² × area
    pub installation: Money,
    pub design: Money,
    pub decision: Money,
    pub other: Money,
    /// Sum of all non-aggregate components
    pub total: Money,
}

impl InvestmentBreakdown {
    /// Named line items in presentation order, aggregates included.
    pub fn line_items(&self) -> Vec<(&'static str, Money)> {
        vec![
            (ITEM_PANELS, self.panels),
            (ITEM_INVERTER, self.inverter),
            (ITEM_EQUIPMENT_SUBTOTAL, self.equipment_subtotal),
            (ITEM_INSTALLATION, self.installation),
            (ITEM_DESIGN, self.design),
            (ITEM_DECISION, self.decision),
            (ITEM_OTHER, self.other),
            (ITEM_TOTAL, self.total),
        ]
    }
}

/// Compute the initial investment from construction costs and panel area.
pub fn calculate_investment(
    solar: &SolarParameters,
    construction: &ConstructionParameters,
) -> PvEconResult<ComputationOutput<InvestmentBreakdown>> {
    let start = Instant::now();

    solar.validate()?;
    construction.validate()?;

    let area = solar.panel_area;
    let panels = construction.panel_price_per_m2 * area;
    let inverter = construction.inverter_price;
    let equipment_subtotal = panels + inverter;
    let installation = construction.installation_cost_per_m2 * area;
    let design = construction.design_cost;
    let decision = construction.decision_cost;
    let other = construction.other_initial_cost;
    let total = equipment_subtotal + installation + design + decision + other;

    tracing::debug!(%total, %area, "initial investment computed");

    let output = InvestmentBreakdown {
        panels,
        inverter,
        equipment_subtotal,
        installation,
        design,
        decision,
        other,
        total,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Initial Investment (equipment + installation + soft costs)",
        &serde_json::json!({
            "panel_area": area.to_string(),
            "panel_price_per_m2": construction.panel_price_per_m2.to_string(),
            "installation_cost_per_m2": construction.installation_cost_per_m2.to_string(),
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}
