//! Radius lookup of emergency vehicles around a point

use crate::domain::geo::distance_meters;
use crate::domain::types::{EmergencyVehicle, Position, Severity};

/// Vehicle with its distance from the lookup origin
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyVehicle<'a> {
    pub vehicle: &'a EmergencyVehicle,
    pub distance_meters: f64,
}

/// Vehicles within `radius_meters` of `origin` whose severity is in
/// `severities` (all severities when empty), nearest first.
pub fn nearby_vehicles<'a>(
    origin: Position,
    vehicles: &'a [EmergencyVehicle],
    radius_meters: f64,
    severities: &[Severity],
) -> Vec<NearbyVehicle<'a>> {
    let mut nearby: Vec<NearbyVehicle<'a>> = vehicles
        .iter()
        .filter(|v| severities.is_empty() || severities.contains(&v.severity))
        .map(|vehicle| NearbyVehicle {
            vehicle,
            distance_meters: distance_meters(origin, vehicle.position),
        })
        .filter(|n| n.distance_meters <= radius_meters)
        .collect();

    nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    nearby
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::destination_point;

    fn origin() -> Position {
        Position::new(13.0827, 80.2707).unwrap()
    }

    fn vehicle(id: &str, distance: f64, severity: Severity) -> EmergencyVehicle {
        EmergencyVehicle::new(id, destination_point(origin(), distance, 45.0), severity)
    }

    #[test]
    fn test_sorted_and_filtered_by_radius() {
        let vehicles = vec![
            vehicle("far", 12_000.0, Severity::Red),
            vehicle("mid", 4_000.0, Severity::Green),
            vehicle("near", 500.0, Severity::Yellow),
        ];

        let found = nearby_vehicles(origin(), &vehicles, 10_000.0, &[]);
        let ids: Vec<_> = found.iter().map(|n| n.vehicle.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(found[0].distance_meters < found[1].distance_meters);
    }

    #[test]
    fn test_severity_filter() {
        let vehicles = vec![
            vehicle("red", 800.0, Severity::Red),
            vehicle("yellow", 300.0, Severity::Yellow),
            vehicle("green", 100.0, Severity::Green),
        ];

        let found = nearby_vehicles(origin(), &vehicles, 1_000.0, &[Severity::Red, Severity::Yellow]);
        let ids: Vec<_> = found.iter().map(|n| n.vehicle.id.as_str()).collect();
        assert_eq!(ids, vec!["yellow", "red"]);
    }

    #[test]
    fn test_empty_when_none_in_range() {
        let vehicles = vec![vehicle("far", 5_000.0, Severity::Red)];
        assert!(nearby_vehicles(origin(), &vehicles, 1_000.0, &[]).is_empty());
    }
}
