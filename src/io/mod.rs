//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `snapshot` - Bystander/vehicle/SOS snapshot input (JSON)
//! - `egress` - Decision output to file (JSONL format)
//! - `chat` - Chat-completions client for message rewording

pub mod chat;
pub mod egress;
pub mod snapshot;

// Re-export commonly used types
pub use chat::ChatFormatter;
pub use egress::Egress;
pub use snapshot::Snapshot;
