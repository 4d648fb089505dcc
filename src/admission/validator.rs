//! Submit-parameter validation
//!
//! Runs before anything is priced, locked, or written. Also applies the
//! ensemble-size default, so the cost calculation downstream always sees
//! the real particle count.

use chrono::DateTime;

use crate::models::{AdmissionError, MissionParams};

pub const FORECAST_HOURS_MIN: u32 = 1;
pub const FORECAST_HOURS_MAX: u32 = 168; // 7 days
pub const ENSEMBLE_SIZE_MIN: u32 = 100;
pub const ENSEMBLE_SIZE_MAX: u32 = 10_000;
pub const ENSEMBLE_SIZE_DEFAULT: u32 = 1_000;

/// Validate and normalize submit parameters.
///
/// Returns the parsed last known time as epoch ms. On error nothing has
/// been charged or stored; the request simply never entered admission.
pub fn validate_mission_params(params: &mut MissionParams) -> Result<i64, AdmissionError> {
    // 1. Name is required
    if params.name.trim().is_empty() {
        return Err(AdmissionError::MissingName);
    }

    // 2. Coordinates must be finite and on the globe
    let lat = params.last_known_lat;
    let lon = params.last_known_lon;
    if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat)
        || !(-180.0..=180.0).contains(&lon)
    {
        return Err(AdmissionError::InvalidCoordinates { lat, lon });
    }

    // 3. Last known time must parse as RFC3339
    let start_ms = DateTime::parse_from_rfc3339(&params.last_known_time)
        .map_err(|_| AdmissionError::InvalidTimestamp(params.last_known_time.clone()))?
        .timestamp_millis();

    // 4. Forecast horizon bounds
    if !(FORECAST_HOURS_MIN..=FORECAST_HOURS_MAX).contains(&params.forecast_hours) {
        return Err(AdmissionError::InvalidForecastHours(params.forecast_hours));
    }

    // 5. Ensemble size: default first, then bounds
    if params.ensemble_size == 0 {
        params.ensemble_size = ENSEMBLE_SIZE_DEFAULT;
    }
    if !(ENSEMBLE_SIZE_MIN..=ENSEMBLE_SIZE_MAX).contains(&params.ensemble_size) {
        return Err(AdmissionError::InvalidEnsembleSize(params.ensemble_size));
    }

    Ok(start_ms)
}
