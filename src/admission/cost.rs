//! Mission pricing
//!
//! Deterministic integer arithmetic only: a given set of parameters always
//! prices the same, and the quote a client computes ahead of time matches
//! what admission charges.

use crate::models::MissionParams;

/// Flat charge for any mission
pub const BASE_COST: u64 = 10;
/// Forecast hours included per +1 credit
pub const HOURS_PER_CREDIT: u32 = 24;
/// Particles included in the base price; each further block adds +1
pub const PARTICLE_BLOCK: u32 = 1000;

/// Price a mission in whole credits.
///
/// base + ceil(forecast_hours / 24) + one credit per full extra
/// 1000-particle block above the first 1000.
///
/// Expects normalized parameters (ensemble default already applied), so
/// call it after validation.
pub fn mission_cost(params: &MissionParams) -> u64 {
    let mut cost = BASE_COST;

    cost += ((params.forecast_hours + HOURS_PER_CREDIT - 1) / HOURS_PER_CREDIT) as u64;

    if params.ensemble_size > PARTICLE_BLOCK {
        cost += ((params.ensemble_size - PARTICLE_BLOCK) / PARTICLE_BLOCK) as u64;
    }

    cost
}
