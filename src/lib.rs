//! Ambuclear library
//!
//! Proximity, direction and urgency alerts for bystanders near emergency
//! vehicles, plus clearance ranking for the control room.
//! Exposes modules for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
