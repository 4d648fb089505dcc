// Error taxonomy for mission admission and the credit ledger
use std::fmt;

use super::mission::{MissionId, MissionStatus};

#[derive(Debug, Clone)]
pub enum AdmissionError {
    // Validation errors
    MissingName,
    InvalidCoordinates { lat: f64, lon: f64 },
    InvalidTimestamp(String),
    InvalidForecastHours(u32),
    InvalidEnsembleSize(u32),

    // Ledger errors
    InsufficientCredits { balance: u64, required: u64 },
    InvalidGrantAmount(i64),

    // Catalog / purchase errors
    PackageNotFound(String),
    PackageInactive(String),
    PaymentNotConfirmed,

    // Mission errors
    MissionNotFound(MissionId),
    InvalidStatusTransition { from: MissionStatus, to: MissionStatus },

    // System errors
    LockTimeout(u64),
    StoreUnavailable(String),
    QueueUnavailable(String),
    Internal(String),
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => write!(f, "Mission name is required"),
            Self::InvalidCoordinates { lat, lon } => {
                write!(f, "Coordinates out of range: lat {}, lon {}", lat, lon)
            }
            Self::InvalidTimestamp(value) => write!(f, "Invalid last known time: {}", value),
            Self::InvalidForecastHours(hours) => {
                write!(f, "Forecast hours {} outside 1..=168", hours)
            }
            Self::InvalidEnsembleSize(size) => {
                write!(f, "Ensemble size {} outside 100..=10000", size)
            }
            Self::InsufficientCredits { balance, required } => {
                write!(f, "insufficient credits: have {}, need {}", balance, required)
            }
            Self::InvalidGrantAmount(amount) => {
                write!(f, "Grant amount {} must be positive", amount)
            }
            Self::PackageNotFound(id) => write!(f, "Credit package {} not found", id),
            Self::PackageInactive(id) => write!(f, "Credit package {} is not available", id),
            Self::PaymentNotConfirmed => write!(f, "Payment has not been confirmed"),
            Self::MissionNotFound(id) => write!(f, "Mission {} not found", id),
            Self::InvalidStatusTransition { from, to } => {
                write!(f, "Invalid status transition: {} -> {}", from, to)
            }
            Self::LockTimeout(owner_id) => {
                write!(f, "Ledger lock timeout for owner {}", owner_id)
            }
            Self::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            Self::QueueUnavailable(msg) => write!(f, "Dispatch queue unavailable: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AdmissionError {}

impl From<anyhow::Error> for AdmissionError {
    fn from(err: anyhow::Error) -> Self {
        AdmissionError::Internal(err.to_string())
    }
}

// Error code and HTTP mapping for API responses
impl AdmissionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingName => "MISSING_NAME",
            Self::InvalidCoordinates { .. } => "INVALID_COORDINATES",
            Self::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            Self::InvalidForecastHours(_) => "INVALID_FORECAST_HOURS",
            Self::InvalidEnsembleSize(_) => "INVALID_ENSEMBLE_SIZE",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::InvalidGrantAmount(_) => "INVALID_GRANT_AMOUNT",
            Self::PackageNotFound(_) => "PACKAGE_NOT_FOUND",
            Self::PackageInactive(_) => "PACKAGE_INACTIVE",
            Self::PaymentNotConfirmed => "PAYMENT_NOT_CONFIRMED",
            Self::MissionNotFound(_) => "MISSION_NOT_FOUND",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::LockTimeout(_) => "LOCK_TIMEOUT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::QueueUnavailable(_) => "QUEUE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The caller may retry the exact same request: nothing was charged
    /// or, for a dispatch failure, the charge was compensated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout(_) | Self::StoreUnavailable(_) | Self::QueueUnavailable(_)
        )
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MissingName
                | Self::InvalidCoordinates { .. }
                | Self::InvalidTimestamp(_)
                | Self::InvalidForecastHours(_)
                | Self::InvalidEnsembleSize(_)
                | Self::InsufficientCredits { .. }
                | Self::InvalidGrantAmount(_)
                | Self::PackageNotFound(_)
                | Self::PackageInactive(_)
                | Self::PaymentNotConfirmed
                | Self::MissionNotFound(_)
                | Self::InvalidStatusTransition { .. }
        )
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingName
            | Self::InvalidCoordinates { .. }
            | Self::InvalidTimestamp(_)
            | Self::InvalidForecastHours(_)
            | Self::InvalidEnsembleSize(_)
            | Self::InvalidGrantAmount(_)
            | Self::PackageInactive(_)
            | Self::PaymentNotConfirmed => 400,
            Self::InsufficientCredits { .. } => 402,
            Self::PackageNotFound(_) | Self::MissionNotFound(_) => 404,
            Self::InvalidStatusTransition { .. } => 409,
            Self::LockTimeout(_) | Self::StoreUnavailable(_) | Self::QueueUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }
}
