//! Domain models - core types, geometry and errors
//!
//! This module contains the canonical data types used throughout the system:
//! - `Position` / `Heading` - validated coordinates and compass headings
//! - `Bystander` / `EmergencyVehicle` / `SosRecord` - snapshot inputs
//! - `AlertDecision` / `ClearanceReport` - engine outputs
//! - `geo` - great-circle distance, bearing and heading math
//! - `CoreError` - invalid input at the library boundary

pub mod error;
pub mod geo;
pub mod types;

// Re-export commonly used types at module level
pub use error::{CoreError, CoreResult};
pub use types::{
    AlertDecision, Bystander, ClearanceRecommendation, ClearanceReport, Direction, EmergencyVehicle,
    Heading, Position, Priority, Severity, SosRecord, TimedPosition, Urgency, VehicleId, VoiceProfile,
};
