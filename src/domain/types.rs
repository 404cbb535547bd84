//! Shared types for the alerting core

use crate::domain::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Valid latitude range (degrees)
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range (degrees)
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

/// Geographic position snapshot (WGS-84 degrees)
///
/// Only constructible through [`Position::new`] or deserialization, both of
/// which reject out-of-range coordinates, so every `Position` in the crate is
/// safe to hand to the geometry functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawPosition {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawPosition> for Position {
    type Error = CoreError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::new(raw.lat, raw.lng)
    }
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> CoreResult<Self> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) || !(MIN_LNG..=MAX_LNG).contains(&lng) {
            return Err(CoreError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    /// Build from values already known to be in range (geometry output)
    #[inline]
    pub(crate) fn from_trusted(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Compass heading in degrees clockwise from true north, normalized to [0, 360)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Heading(f64);

impl Heading {
    pub fn new(degrees: f64) -> CoreResult<Self> {
        if !degrees.is_finite() {
            return Err(CoreError::InvalidHeading(degrees));
        }
        let normalized = degrees.rem_euclid(360.0);
        // rem_euclid of a tiny negative value rounds up to exactly 360.0
        Ok(Self(if normalized >= 360.0 { 0.0 } else { normalized }))
    }

    #[inline]
    pub fn degrees(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Heading {
    type Error = CoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Heading::new(value)
    }
}

impl From<Heading> for f64 {
    fn from(heading: Heading) -> Self {
        heading.0
    }
}

/// Newtype wrapper for emergency vehicle IDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Emergency vehicle status as set by its crew
///
/// Only `Red` is an active emergency; `Yellow` and `Green` are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[serde(alias = "red")]
    Red,
    #[serde(alias = "yellow")]
    Yellow,
    #[serde(alias = "green")]
    Green,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Red => "RED",
            Severity::Yellow => "YELLOW",
            Severity::Green => "GREEN",
        }
    }

    #[inline]
    pub fn is_emergency(&self) -> bool {
        *self == Severity::Red
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(Severity::Red),
            "YELLOW" => Ok(Severity::Yellow),
            "GREEN" => Ok(Severity::Green),
            _ => Err(CoreError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Driver or pedestrian who may need to move aside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bystander {
    #[serde(flatten)]
    pub position: Position,
    #[serde(default)]
    pub heading: Option<Heading>,
}

impl Bystander {
    pub fn new(position: Position) -> Self {
        Self { position, heading: None }
    }

    pub fn with_heading(mut self, heading: Heading) -> Self {
        self.heading = Some(heading);
        self
    }
}

/// Emergency vehicle snapshot as reported on one polling tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyVehicle {
    pub id: VehicleId,
    pub position: Position,
    #[serde(default)]
    pub heading: Option<Heading>,
    pub severity: Severity,
    #[serde(default)]
    pub destination: Option<Position>,
    /// Human-readable destination (e.g. hospital name), wording only
    #[serde(default)]
    pub destination_name: Option<String>,
    /// Display label such as a vehicle registration number, wording only
    #[serde(default)]
    pub label: Option<String>,
}

impl EmergencyVehicle {
    pub fn new(id: impl Into<String>, position: Position, severity: Severity) -> Self {
        Self {
            id: VehicleId::new(id),
            position,
            heading: None,
            severity,
            destination: None,
            destination_name: None,
            label: None,
        }
    }

    pub fn with_heading(mut self, heading: Heading) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label for announcements, the id when no label was reported
    pub fn display_name(&self) -> &str {
        self.label.as_deref().filter(|l| !l.trim().is_empty()).unwrap_or(self.id.as_str())
    }

    pub fn with_destination(mut self, destination: Position) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_destination_name(mut self, name: impl Into<String>) -> Self {
        self.destination_name = Some(name.into());
        self
    }

    /// Destination wording: the name when known, otherwise the coordinates
    pub fn destination_text(&self) -> Option<String> {
        match (&self.destination_name, &self.destination) {
            (Some(name), _) => Some(name.clone()),
            (None, Some(pos)) => Some(pos.to_string()),
            (None, None) => None,
        }
    }
}

/// SOS raised by (or on behalf of) an emergency vehicle crew
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosRecord {
    pub id: String,
    #[serde(alias = "ambulance_id")]
    pub subject_id: VehicleId,
    pub position: Position,
    #[serde(default = "default_sos_active")]
    pub active: bool,
}

fn default_sos_active() -> bool {
    true
}

/// Which way the bystander should move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Left,
    Right,
    ClearAhead,
    StayPut,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::ClearAhead => "CLEAR_AHEAD",
            Direction::StayPut => "STAY_PUT",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speech parameters handed to the (external) speech sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceProfile {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Coarse proximity bucket used to pick display and voice intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [Urgency::Critical, Urgency::High, Urgency::Medium, Urgency::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "CRITICAL",
            Urgency::High => "HIGH",
            Urgency::Medium => "MEDIUM",
            Urgency::Low => "LOW",
        }
    }

    /// Index into per-urgency counters (0 = CRITICAL)
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Urgency::Critical => 0,
            Urgency::High => 1,
            Urgency::Medium => 2,
            Urgency::Low => 3,
        }
    }

    /// Faster, higher and louder the closer the vehicle is
    pub fn voice_profile(&self) -> VoiceProfile {
        match self {
            Urgency::Critical => VoiceProfile { rate: 1.3, pitch: 1.2, volume: 1.0 },
            Urgency::High => VoiceProfile { rate: 1.1, pitch: 1.1, volume: 0.9 },
            Urgency::Medium => VoiceProfile { rate: 1.0, pitch: 1.0, volume: 0.8 },
            Urgency::Low => VoiceProfile { rate: 0.9, pitch: 0.9, volume: 0.7 },
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one bystander against the current vehicle snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDecision {
    pub fired: bool,
    pub direction: Direction,
    pub urgency: Urgency,
    /// Distance to the triggering vehicle; when nothing fired, to the nearest
    /// RED vehicle, or infinity (serialized as null) when there is none
    pub distance_meters: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<VehicleId>,
}

/// Control-room clearance priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
        }
    }

    /// Sort key, lowest first
    #[inline]
    pub fn sort_key(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked clearance instruction for the control room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearanceRecommendation {
    pub subject_route: String,
    pub action: String,
    pub reason: String,
    pub priority: Priority,
    pub subject_ids: Vec<VehicleId>,
    /// Registration label of the subject vehicle, or its id
    pub subject_label: String,
}

impl ClearanceRecommendation {
    /// Text for an announcement sink
    pub fn spoken_text(&self) -> String {
        format!("{} priority: {}. {}", self.priority, self.action, self.reason)
    }
}

/// Ranked recommendations plus the counts the control room header shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearanceReport {
    pub recommendations: Vec<ClearanceRecommendation>,
    pub summary: String,
    pub total_emergency: usize,
    /// Active SOS records, whether or not they match a vehicle in the snapshot.
    /// Inactive records are not counted.
    pub total_sos: usize,
}

/// Position fix with its capture time, for heading inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPosition {
    pub position: Position,
    pub timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_rejects_out_of_range() {
        assert!(Position::new(13.0827, 80.2707).is_ok());
        assert!(Position::new(90.0, 180.0).is_ok());
        assert!(Position::new(-90.0, -180.0).is_ok());
        assert_eq!(
            Position::new(90.5, 0.0),
            Err(CoreError::InvalidCoordinate { lat: 90.5, lng: 0.0 })
        );
        assert!(matches!(
            Position::new(0.0, -180.01),
            Err(CoreError::InvalidCoordinate { .. })
        ));
        assert!(Position::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_position_deserialize_validates() {
        let ok: Position = serde_json::from_str(r#"{"lat": 13.08, "lng": 80.27}"#).unwrap();
        assert_eq!(ok.lat(), 13.08);

        let bad = serde_json::from_str::<Position>(r#"{"lat": 120.0, "lng": 80.27}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_heading_normalized() {
        assert_eq!(Heading::new(90.0).unwrap().degrees(), 90.0);
        assert_eq!(Heading::new(360.0).unwrap().degrees(), 0.0);
        assert_eq!(Heading::new(-90.0).unwrap().degrees(), 270.0);
        assert_eq!(Heading::new(725.0).unwrap().degrees(), 5.0);
        assert!(Heading::new(-1e-20).unwrap().degrees() < 360.0);
        assert!(matches!(Heading::new(f64::NAN), Err(CoreError::InvalidHeading(_))));
        assert!(Heading::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("red".parse::<Severity>().unwrap(), Severity::Red);
        assert_eq!("YELLOW".parse::<Severity>().unwrap(), Severity::Yellow);
        assert_eq!(" Green ".parse::<Severity>().unwrap(), Severity::Green);
        assert!(matches!("blue".parse::<Severity>(), Err(CoreError::UnknownSeverity(_))));
    }

    #[test]
    fn test_severity_display_parses_back() {
        for severity in [Severity::Red, Severity::Yellow, Severity::Green] {
            assert_eq!(severity.to_string().parse::<Severity>().unwrap(), severity);
        }
        assert_eq!(Severity::Red.to_string(), "RED");
    }

    #[test]
    fn test_display_name_prefers_label() {
        let pos = Position::new(13.0827, 80.2707).unwrap();
        let vehicle = EmergencyVehicle::new("amb-1", pos, Severity::Red);
        assert_eq!(vehicle.display_name(), "amb-1");
        assert_eq!(vehicle.clone().with_label("  ").display_name(), "amb-1");
        assert_eq!(vehicle.with_label("TN-01-AB-1234").display_name(), "TN-01-AB-1234");
    }

    #[test]
    fn test_vehicle_deserialize_lowercase_severity() {
        let json = r#"{
            "id": "amb-1",
            "position": {"lat": 13.0827, "lng": 80.2750},
            "heading": 90,
            "severity": "red"
        }"#;
        let vehicle: EmergencyVehicle = serde_json::from_str(json).unwrap();
        assert_eq!(vehicle.severity, Severity::Red);
        assert_eq!(vehicle.heading.map(|h| h.degrees()), Some(90.0));
        assert!(vehicle.destination.is_none());
    }

    #[test]
    fn test_sos_accepts_ambulance_id_alias() {
        let json = r#"{
            "id": "sos_1",
            "ambulance_id": "amb-7",
            "position": {"lat": 13.0, "lng": 80.0}
        }"#;
        let sos: SosRecord = serde_json::from_str(json).unwrap();
        assert_eq!(sos.subject_id, VehicleId::new("amb-7"));
        assert!(sos.active);
    }

    #[test]
    fn test_destination_text_prefers_name() {
        let pos = Position::new(13.0827, 80.2707).unwrap();
        let dest = Position::new(13.0604, 80.2496).unwrap();
        let vehicle = EmergencyVehicle::new("a", pos, Severity::Red).with_destination(dest);
        assert_eq!(vehicle.destination_text().as_deref(), Some("13.0604, 80.2496"));

        let named = vehicle.with_destination_name("General Hospital");
        assert_eq!(named.destination_text().as_deref(), Some("General Hospital"));
    }

    #[test]
    fn test_voice_profile_intensity_decreases() {
        let critical = Urgency::Critical.voice_profile();
        let low = Urgency::Low.voice_profile();
        assert!(critical.rate > low.rate);
        assert!(critical.volume > low.volume);
    }

    #[test]
    fn test_decision_serializes_infinite_distance_as_null() {
        let decision = AlertDecision {
            fired: false,
            direction: Direction::StayPut,
            urgency: Urgency::Low,
            distance_meters: f64::INFINITY,
            message: "x".to_string(),
            vehicle_id: None,
        };
        let value = serde_json::to_value(&decision).unwrap();
        assert!(value["distance_meters"].is_null());
        assert_eq!(value["direction"], "STAY_PUT");
        assert!(value.get("vehicle_id").is_none());
    }
}
