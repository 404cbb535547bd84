//! Snapshot input - bystander, vehicles and SOS records read from a JSON file

use crate::domain::types::{Bystander, EmergencyVehicle, SosRecord};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Point-in-time view handed to the alert engine and prioritizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bystander: Bystander,
    #[serde(default)]
    pub vehicles: Vec<EmergencyVehicle>,
    #[serde(default)]
    pub sos: Vec<SosRecord>,
}

impl Snapshot {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Severity;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "bystander": {"lat": 13.0827, "lng": 80.2707, "heading": 90.0},
        "vehicles": [
            {"id": "AMB-1", "position": {"lat": 13.0850, "lng": 80.2750},
             "heading": 270.0, "severity": "RED",
             "destination": {"lat": 13.0604, "lng": 80.2496},
             "destination_name": "General Hospital"},
            {"id": "AMB-2", "position": {"lat": 13.09, "lng": 80.28}, "severity": "yellow"}
        ],
        "sos": [{"id": "sos-1", "ambulance_id": "AMB-1",
                 "position": {"lat": 13.0850, "lng": 80.2750}}]
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let snapshot = Snapshot::from_json(SAMPLE).unwrap();
        assert_eq!(snapshot.bystander.heading.map(|h| h.degrees()), Some(90.0));
        assert_eq!(snapshot.vehicles.len(), 2);
        assert_eq!(snapshot.vehicles[0].severity, Severity::Red);
        assert_eq!(snapshot.vehicles[1].severity, Severity::Yellow);
        assert!(snapshot.vehicles[1].heading.is_none());
        assert_eq!(snapshot.sos[0].subject_id.as_str(), "AMB-1");
        assert!(snapshot.sos[0].active);
    }

    #[test]
    fn test_vehicles_and_sos_optional() {
        let snapshot = Snapshot::from_json(r#"{"bystander": {"lat": 0.0, "lng": 0.0}}"#).unwrap();
        assert!(snapshot.vehicles.is_empty());
        assert!(snapshot.sos.is_empty());
        assert!(snapshot.bystander.heading.is_none());
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let result = Snapshot::from_json(r#"{"bystander": {"lat": 95.0, "lng": 0.0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let snapshot = Snapshot::from_file(file.path()).unwrap();
        assert_eq!(snapshot.vehicles[0].id.as_str(), "AMB-1");
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = Snapshot::from_file("/nonexistent/snapshot.json").unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read snapshot file"));
    }
}
