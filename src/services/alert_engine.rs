//! Proximity alert engine
//!
//! Decides, for one bystander and the current emergency vehicle snapshot,
//! whether a move-aside alert fires, which side to move to and how urgent it
//! is. Every call is a pure function of its arguments.
//!
//! Gating, in order:
//! - severity: only RED vehicles alert
//! - distance: within `radius_meters` (inclusive by default)
//! - direction: headings within `heading_threshold_degrees`, waived when
//!   either heading is unknown
//!
//! The nearest qualifying vehicle triggers. Direction is taken in the
//! vehicle's frame: the bearing from the vehicle to the bystander relative to
//! the vehicle's heading.

use crate::domain::error::{CoreError, CoreResult};
use crate::domain::geo::{bearing_degrees, distance_meters, is_same_direction, normalize_signed};
use crate::domain::types::{AlertDecision, Bystander, Direction, EmergencyVehicle, Urgency};
use crate::services::messages::{TemplateFormatter, DEFAULT_VEHICLE_LABEL};
use tracing::{debug, info};

/// Distance thresholds (meters) for urgency tiers; each is an exclusive upper bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UrgencyBands {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for UrgencyBands {
    fn default() -> Self {
        Self { critical: 100.0, high: 300.0, medium: 500.0 }
    }
}

impl UrgencyBands {
    /// Monotonically non-increasing in distance
    pub fn classify(&self, distance_meters: f64) -> Urgency {
        if distance_meters < self.critical {
            Urgency::Critical
        } else if distance_meters < self.high {
            Urgency::High
        } else if distance_meters < self.medium {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

/// Tunable alert parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertConfig {
    pub radius_meters: f64,
    pub heading_threshold_degrees: f64,
    pub ahead_cone_degrees: f64,
    pub radius_inclusive: bool,
    pub urgency_bands: UrgencyBands,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            radius_meters: 500.0,
            heading_threshold_degrees: 30.0,
            ahead_cone_degrees: 30.0,
            radius_inclusive: true,
            urgency_bands: UrgencyBands::default(),
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "radius_meters must be a positive number, got {}",
                self.radius_meters
            )));
        }
        for (name, value) in [
            ("heading_threshold_degrees", self.heading_threshold_degrees),
            ("ahead_cone_degrees", self.ahead_cone_degrees),
        ] {
            if !(0.0..=180.0).contains(&value) {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must be within 0..=180, got {value}"
                )));
            }
        }
        let b = &self.urgency_bands;
        let ordered = b.critical.is_finite()
            && b.high.is_finite()
            && b.medium.is_finite()
            && 0.0 <= b.critical
            && b.critical <= b.high
            && b.high <= b.medium;
        if !ordered {
            return Err(CoreError::InvalidConfig(format!(
                "urgency bands must satisfy 0 <= critical <= high <= medium, got {}/{}/{}",
                b.critical, b.high, b.medium
            )));
        }
        Ok(())
    }

    #[inline]
    fn within_radius(&self, distance_meters: f64) -> bool {
        if self.radius_inclusive {
            distance_meters <= self.radius_meters
        } else {
            distance_meters < self.radius_meters
        }
    }
}

/// A RED vehicle that passed both gates
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    vehicle: &'a EmergencyVehicle,
    distance: f64,
}

/// Alert engine bound to one validated configuration
#[derive(Debug, Clone)]
pub struct AlertEngine {
    config: AlertConfig,
    templates: TemplateFormatter,
}

impl AlertEngine {
    pub fn new(config: AlertConfig, vehicle_label: &str) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config, templates: TemplateFormatter::new(vehicle_label) })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Single best decision: the nearest qualifying vehicle, or STAY_PUT
    pub fn evaluate(&self, bystander: &Bystander, vehicles: &[EmergencyVehicle]) -> AlertDecision {
        let (candidates, nearest_red) = self.candidates(bystander, vehicles);

        // Exact ties keep the earlier vehicle
        let best = candidates.into_iter().fold(None::<Candidate>, |best, c| match best {
            Some(b) if b.distance <= c.distance => Some(b),
            _ => Some(c),
        });

        match best {
            Some(candidate) => self.fired_decision(bystander, candidate),
            None => {
                debug!(
                    red_vehicles = vehicles.iter().filter(|v| v.severity.is_emergency()).count(),
                    nearest_red_m = ?nearest_red,
                    "alert_not_fired"
                );
                self.quiet_decision(nearest_red)
            }
        }
    }

    /// One decision per qualifying vehicle, nearest first (ties keep input order)
    pub fn evaluate_all(
        &self,
        bystander: &Bystander,
        vehicles: &[EmergencyVehicle],
    ) -> Vec<AlertDecision> {
        let (mut candidates, _) = self.candidates(bystander, vehicles);
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates.into_iter().map(|c| self.fired_decision(bystander, c)).collect()
    }

    /// Collect vehicles passing every gate, plus the nearest RED distance overall
    fn candidates<'a>(
        &self,
        bystander: &Bystander,
        vehicles: &'a [EmergencyVehicle],
    ) -> (Vec<Candidate<'a>>, Option<f64>) {
        let mut candidates = Vec::new();
        let mut nearest_red: Option<f64> = None;

        for vehicle in vehicles.iter().filter(|v| v.severity.is_emergency()) {
            let distance = distance_meters(bystander.position, vehicle.position);
            nearest_red = Some(nearest_red.map_or(distance, |n| n.min(distance)));

            if !self.config.within_radius(distance) {
                debug!(vehicle_id = %vehicle.id, distance_m = %distance, "alert_gate_distance");
                continue;
            }

            if let (Some(own), Some(theirs)) = (bystander.heading, vehicle.heading) {
                if !is_same_direction(
                    own.degrees(),
                    theirs.degrees(),
                    self.config.heading_threshold_degrees,
                ) {
                    debug!(
                        vehicle_id = %vehicle.id,
                        bystander_heading = %own.degrees(),
                        vehicle_heading = %theirs.degrees(),
                        "alert_gate_direction"
                    );
                    continue;
                }
            }

            candidates.push(Candidate { vehicle, distance });
        }

        (candidates, nearest_red)
    }

    fn fired_decision(&self, bystander: &Bystander, candidate: Candidate<'_>) -> AlertDecision {
        let Candidate { vehicle, distance } = candidate;
        let direction = move_direction(vehicle, bystander, distance, self.config.ahead_cone_degrees);
        let urgency = if distance == 0.0 {
            Urgency::Critical
        } else {
            self.config.urgency_bands.classify(distance)
        };

        info!(
            vehicle_id = %vehicle.id,
            distance_m = %distance.round(),
            direction = %direction,
            urgency = %urgency,
            "alert_fired"
        );

        let mut decision = AlertDecision {
            fired: true,
            direction,
            urgency,
            distance_meters: distance,
            message: String::new(),
            vehicle_id: Some(vehicle.id.clone()),
        };
        decision.message = self.templates.render(&decision);
        decision
    }

    fn quiet_decision(&self, nearest_red: Option<f64>) -> AlertDecision {
        let mut decision = AlertDecision {
            fired: false,
            direction: Direction::StayPut,
            urgency: Urgency::Low,
            distance_meters: nearest_red.unwrap_or(f64::INFINITY),
            message: String::new(),
            vehicle_id: None,
        };
        decision.message = self.templates.render(&decision);
        decision
    }
}

/// Side of the vehicle the bystander is on, from the vehicle's point of view.
///
/// Without a vehicle heading there is no frame to compare against, so the
/// bystander is told to clear the lane.
pub fn move_direction(
    vehicle: &EmergencyVehicle,
    bystander: &Bystander,
    distance: f64,
    ahead_cone_degrees: f64,
) -> Direction {
    let Some(heading) = vehicle.heading else {
        return Direction::ClearAhead;
    };

    let bearing_to_bystander = if distance == 0.0 {
        0.0
    } else {
        bearing_degrees(vehicle.position, bystander.position)
    };
    let relative = normalize_signed(bearing_to_bystander - heading.degrees());

    if relative.abs() < ahead_cone_degrees {
        Direction::ClearAhead
    } else if relative > 0.0 {
        Direction::Right
    } else {
        Direction::Left
    }
}

/// Validate `config` and evaluate in one call
pub fn evaluate_alert(
    bystander: &Bystander,
    vehicles: &[EmergencyVehicle],
    config: &AlertConfig,
) -> CoreResult<AlertDecision> {
    let engine = AlertEngine::new(*config, DEFAULT_VEHICLE_LABEL)?;
    Ok(engine.evaluate(bystander, vehicles))
}

/// Validate `config` and return every qualifying decision, nearest first
pub fn evaluate_all_alerts(
    bystander: &Bystander,
    vehicles: &[EmergencyVehicle],
    config: &AlertConfig,
) -> CoreResult<Vec<AlertDecision>> {
    let engine = AlertEngine::new(*config, DEFAULT_VEHICLE_LABEL)?;
    Ok(engine.evaluate_all(bystander, vehicles))
}
