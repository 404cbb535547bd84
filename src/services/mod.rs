//! Services - alerting and ranking logic
//!
//! This module contains the core business logic services:
//! - `alert_engine` - Radius, severity and heading gates plus move direction
//! - `prioritizer` - Control-room clearance ranking
//! - `messages` - Templated bystander messages and the formatter seam
//! - `enrichment` - Time-boxed message rewording with template fallback
//! - `nearby` - Radius lookup of vehicles around a point
//! - `simulator` - Synthetic ambulance approach scenario

pub mod alert_engine;
pub mod enrichment;
pub mod messages;
pub mod nearby;
pub mod prioritizer;
pub mod simulator;

// Re-export commonly used types
pub use alert_engine::{evaluate_alert, evaluate_all_alerts, AlertConfig, AlertEngine, UrgencyBands};
pub use enrichment::enrich;
pub use messages::{MessageFormatter, TemplateFormatter};
pub use nearby::{nearby_vehicles, NearbyVehicle};
pub use prioritizer::rank_clearance;
pub use simulator::ApproachScenario;
