//! Boundary errors for the alerting core
//!
//! Geometry functions never fail; these errors are raised where raw input
//! enters the crate (position construction, snapshot loading, engine entry).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Latitude outside [-90, 90] or longitude outside [-180, 180]
    #[error("invalid coordinate: lat={lat}, lng={lng} (lat must be -90..=90, lng must be -180..=180)")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// Heading that is NaN or infinite
    #[error("invalid heading: {0} (must be a finite number of degrees)")]
    InvalidHeading(f64),

    /// Alert configuration that cannot produce consistent decisions
    #[error("invalid alert config: {0}")]
    InvalidConfig(String),

    /// Severity string that is not RED, YELLOW or GREEN
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
