//! Synthetic approach scenario
//!
//! Drives one RED ambulance along a straight line toward a bystander parked
//! at the Chennai base location. Each tick produces a fix; the ambulance
//! heading is inferred from its last two fixes, the same way a phone-reported
//! track would be.

use crate::domain::error::{CoreError, CoreResult};
use crate::domain::geo::{destination_point, heading_from_path, normalize_degrees, DEFAULT_MAX_PATH_GAP_MS};
use crate::domain::types::{Bystander, EmergencyVehicle, Heading, Position, Severity, TimedPosition};

/// Chennai base location used by the bundled scenarios
pub const BASE_LAT: f64 = 13.0827;
pub const BASE_LNG: f64 = 80.2707;

pub const SIM_VEHICLE_ID: &str = "SIM-AMB-1";

#[derive(Debug, Clone)]
pub struct ApproachScenario {
    pub bystander: Bystander,
    /// Direction of travel shared by ambulance and bystander
    pub heading: Heading,
    pub start_distance_m: f64,
    pub speed_mps: f64,
    pub tick_secs: f64,
    pub ticks: u32,
    /// Sideways offset of the ambulance lane, positive to the right
    pub lateral_offset_m: f64,
}

impl ApproachScenario {
    /// Scenario around the base location; the ambulance starts
    /// `start_distance_m` behind the bystander.
    pub fn at_base(
        heading_degrees: f64,
        start_distance_m: f64,
        speed_mps: f64,
        tick_secs: f64,
        ticks: u32,
        lateral_offset_m: f64,
    ) -> CoreResult<Self> {
        if !(speed_mps.is_finite() && speed_mps >= 0.0) {
            return Err(CoreError::InvalidConfig(format!("speed_mps must be >= 0, got {speed_mps}")));
        }
        if !(tick_secs.is_finite() && tick_secs > 0.0) {
            return Err(CoreError::InvalidConfig(format!("tick_secs must be > 0, got {tick_secs}")));
        }
        if !(start_distance_m.is_finite() && start_distance_m >= 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "start_distance_m must be >= 0, got {start_distance_m}"
            )));
        }
        if !lateral_offset_m.is_finite() {
            return Err(CoreError::InvalidConfig("lateral_offset_m must be finite".to_string()));
        }

        let heading = Heading::new(heading_degrees)?;
        let bystander = Bystander::new(Position::new(BASE_LAT, BASE_LNG)?).with_heading(heading);

        Ok(Self {
            bystander,
            heading,
            start_distance_m,
            speed_mps,
            tick_secs,
            ticks,
            lateral_offset_m,
        })
    }

    fn start_position(&self) -> Position {
        let h = self.heading.degrees();
        let behind = destination_point(self.bystander.position, self.start_distance_m, normalize_degrees(h + 180.0));
        if self.lateral_offset_m == 0.0 {
            return behind;
        }
        let (offset, side) = if self.lateral_offset_m > 0.0 {
            (self.lateral_offset_m, h + 90.0)
        } else {
            (-self.lateral_offset_m, h - 90.0)
        };
        destination_point(behind, offset, normalize_degrees(side))
    }

    /// All fixes of the run, one per tick, tick 0 at the start position
    pub fn fixes(&self) -> Vec<TimedPosition> {
        let step_m = self.speed_mps * self.tick_secs;
        let step_ms = (self.tick_secs * 1000.0).round() as u64;

        let mut position = self.start_position();
        let mut fixes = Vec::with_capacity(self.ticks as usize);
        for tick in 0..self.ticks {
            fixes.push(TimedPosition { position, timestamp_ms: u64::from(tick) * step_ms });
            position = destination_point(position, step_m, self.heading.degrees());
        }
        fixes
    }

    /// Vehicle snapshot as seen at `tick`, heading inferred from the path so far
    pub fn vehicle_at(&self, fixes: &[TimedPosition], tick: usize) -> Option<EmergencyVehicle> {
        let fix = fixes.get(tick)?;
        let inferred = heading_from_path(&fixes[..=tick], DEFAULT_MAX_PATH_GAP_MS)
            .and_then(|deg| Heading::new(deg).ok());

        let mut vehicle = EmergencyVehicle::new(SIM_VEHICLE_ID, fix.position, Severity::Red);
        vehicle.heading = inferred;
        Some(vehicle)
    }
}
