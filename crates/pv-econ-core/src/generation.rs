use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PvEconError;
use crate::params::SolarParameters;
use crate::types::{pct_to_rate, with_metadata, ComputationOutput, Energy};
use crate::PvEconResult;

/// Energy yield of one project year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationYear {
    pub year: u32,
    pub generation: Energy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationProfile {
    /// Un-degraded yield: irradiation × area × efficiency × PR
    pub nameplate_yield: Energy,
    pub years: Vec<GenerationYear>,
    pub total_generation: Energy,
}

fn nameplate_yield(solar: &SolarParameters) -> Energy {
    solar.annual_irradiation * solar.panel_area * solar.conversion_efficiency * solar.performance_ratio
}

fn generation_at(nameplate: Energy, retention: Decimal, year: u32) -> Energy {
    nameplate * retention.powi(year as i64)
}

/// Yield in `year` (1-indexed). Degradation compounds from year 1, so the
/// first year already carries one year of loss.
pub fn annual_generation(solar: &SolarParameters, year: u32) -> PvEconResult<Energy> {
    solar.validate()?;
    if year == 0 {
        return Err(PvEconError::invalid("year", "Project years are 1-indexed"));
    }
    let retention = Decimal::ONE - pct_to_rate(solar.annual_degradation_pct);
    Ok(generation_at(nameplate_yield(solar), retention, year))
}

/// Year-by-year yield over the project lifetime.
pub fn generation_profile(
    solar: &SolarParameters,
    lifetime_years: u32,
) -> PvEconResult<ComputationOutput<GenerationProfile>> {
    let start = Instant::now();

    solar.validate()?;
    if lifetime_years == 0 {
        return Err(PvEconError::invalid(
            "financial.lifetime_years",
            "Project lifetime must be at least 1 year",
        ));
    }

    let nameplate = nameplate_yield(solar);
    let retention = Decimal::ONE - pct_to_rate(solar.annual_degradation_pct);

    let years: Vec<GenerationYear> = (1..=lifetime_years)
        .map(|year| GenerationYear {
            year,
            generation: generation_at(nameplate, retention, year),
        })
        .collect();
    let total_generation = years.iter().map(|y| y.generation).sum();

    tracing::debug!(years = years.len(), %total_generation, "generation profile built");

    let output = GenerationProfile {
        nameplate_yield: nameplate,
        years,
        total_generation,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annual Yield (irradiation x area x efficiency x PR x (1 - d)^y)",
        &serde_json::json!({
            "annual_irradiation": solar.annual_irradiation.to_string(),
            "panel_area": solar.panel_area.to_string(),
            "annual_degradation_pct": solar.annual_degradation_pct.to_string(),
            "lifetime_years": lifetime_years,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}
