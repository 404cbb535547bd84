//! Bystander-facing message wording
//!
//! The template table is the source of truth for message text. Any other
//! `MessageFormatter` only rewrites wording for a decision that has already
//! been made.

use crate::domain::types::{AlertDecision, Direction, Urgency};
use async_trait::async_trait;

/// Default noun used when the caller does not configure one
pub const DEFAULT_VEHICLE_LABEL: &str = "Ambulance";

/// Turns a finished decision into display/speech text
#[async_trait]
pub trait MessageFormatter: Send + Sync {
    async fn format(&self, decision: &AlertDecision) -> anyhow::Result<String>;
}

/// Render the template for `(urgency, direction)`.
pub fn render_message(
    urgency: Urgency,
    direction: Direction,
    distance_meters: f64,
    vehicle_label: &str,
) -> String {
    let d = rounded_meters(distance_meters);

    match (direction, urgency) {
        (Direction::StayPut, _) => {
            format!("No {} nearby. Drive normally.", vehicle_label.to_lowercase())
        }
        (Direction::ClearAhead, Urgency::Critical) => {
            format!("EMERGENCY! {vehicle_label} {d}m behind you! Move to the side immediately!")
        }
        (Direction::ClearAhead, Urgency::High) => {
            format!("{vehicle_label} approaching {d}m away! Please clear the path!")
        }
        (Direction::ClearAhead, Urgency::Medium | Urgency::Low) => {
            format!("{vehicle_label} {d}m behind you. Prepare to move aside.")
        }
        (Direction::Left | Direction::Right, Urgency::Critical) => {
            format!("EMERGENCY! Move {direction} NOW! {vehicle_label} {d}m away!")
        }
        (Direction::Left | Direction::Right, Urgency::High) => {
            format!("Move {direction}! {vehicle_label} approaching {d}m away!")
        }
        (Direction::Left | Direction::Right, Urgency::Medium | Urgency::Low) => {
            format!("Please move {direction}. {vehicle_label} {d}m away.")
        }
    }
}

#[inline]
fn rounded_meters(distance_meters: f64) -> i64 {
    if distance_meters.is_finite() {
        distance_meters.round() as i64
    } else {
        0
    }
}

/// Deterministic formatter backed by the template table
#[derive(Debug, Clone)]
pub struct TemplateFormatter {
    vehicle_label: String,
}

impl TemplateFormatter {
    pub fn new(vehicle_label: &str) -> Self {
        Self { vehicle_label: vehicle_label.to_string() }
    }

    pub fn render(&self, decision: &AlertDecision) -> String {
        render_message(
            decision.urgency,
            decision.direction,
            decision.distance_meters,
            &self.vehicle_label,
        )
    }
}

impl Default for TemplateFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_VEHICLE_LABEL)
    }
}

#[async_trait]
impl MessageFormatter for TemplateFormatter {
    async fn format(&self, decision: &AlertDecision) -> anyhow::Result<String> {
        Ok(self.render(decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_templates() {
        assert_eq!(
            render_message(Urgency::Critical, Direction::Right, 85.4, "Ambulance"),
            "EMERGENCY! Move RIGHT NOW! Ambulance 85m away!"
        );
        assert_eq!(
            render_message(Urgency::High, Direction::Left, 212.6, "Ambulance"),
            "Move LEFT! Ambulance approaching 213m away!"
        );
        assert_eq!(
            render_message(Urgency::Medium, Direction::Left, 420.0, "Ambulance"),
            "Please move LEFT. Ambulance 420m away."
        );
    }

    #[test]
    fn test_clear_ahead_templates() {
        assert_eq!(
            render_message(Urgency::Critical, Direction::ClearAhead, 50.0, "Fire truck"),
            "EMERGENCY! Fire truck 50m behind you! Move to the side immediately!"
        );
        assert_eq!(
            render_message(Urgency::High, Direction::ClearAhead, 150.0, "Ambulance"),
            "Ambulance approaching 150m away! Please clear the path!"
        );
        assert_eq!(
            render_message(Urgency::Low, Direction::ClearAhead, 500.0, "Ambulance"),
            "Ambulance 500m behind you. Prepare to move aside."
        );
    }

    #[test]
    fn test_stay_put_template_ignores_infinite_distance() {
        assert_eq!(
            render_message(Urgency::Low, Direction::StayPut, f64::INFINITY, "Ambulance"),
            "No ambulance nearby. Drive normally."
        );
    }

    #[test]
    fn test_every_pair_mentions_distance_when_moving() {
        for urgency in Urgency::ALL {
            for direction in [Direction::Left, Direction::Right, Direction::ClearAhead] {
                let message = render_message(urgency, direction, 123.0, "Ambulance");
                assert!(message.contains("123m"), "{urgency}/{direction}: {message}");
            }
        }
    }

    #[tokio::test]
    async fn test_template_formatter_matches_render() {
        let decision = AlertDecision {
            fired: true,
            direction: Direction::Right,
            urgency: Urgency::High,
            distance_meters: 250.0,
            message: String::new(),
            vehicle_id: None,
        };
        let formatter = TemplateFormatter::default();
        assert_eq!(formatter.format(&decision).await.unwrap(), formatter.render(&decision));
    }
}
