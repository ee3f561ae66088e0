use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::params::RentalTerms;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::PvEconResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentYear {
    pub year: u32,
    pub rent: Money,
}

/// Flat rooftop rent over the lease term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentSchedule {
    pub annual_rent: Money,
    pub rows: Vec<RentYear>,
    pub total_rent: Money,
}

impl RentSchedule {
    pub fn rent_in(&self, year: u32) -> Money {
        self.rows
            .iter()
            .find(|r| r.year == year)
            .map(|r| r.rent)
            .unwrap_or(Decimal::ZERO)
    }
}

/// `unit_price × area` for each year of the lease.
pub fn rent_schedule(terms: &RentalTerms) -> PvEconResult<ComputationOutput<RentSchedule>> {
    let start = Instant::now();
    terms.validate()?;

    let annual_rent = terms.unit_price * terms.area;
    let rows: Vec<RentYear> = (1..=terms.lease_years)
        .map(|year| RentYear {
            year,
            rent: annual_rent,
        })
        .collect();
    let total_rent = annual_rent * Decimal::from(terms.lease_years);

    let output = RentSchedule {
        annual_rent,
        rows,
        total_rent,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rooftop Rent (flat unit price x area)",
        &serde_json::json!({
            "unit_price": terms.unit_price.to_string(),
            "area": terms.area.to_string(),
            "lease_years": terms.lease_years,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}
