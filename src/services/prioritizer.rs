//! Clearance prioritizer for the control room
//!
//! Ranks every RED vehicle in the snapshot:
//! - CRITICAL: an active SOS references the vehicle
//! - HIGH: destination confirmed
//! - MEDIUM: emergency mode on, destination not yet set
//!
//! Recomputed from scratch on every call; SOS records come from the caller.

use crate::domain::types::{
    ClearanceRecommendation, ClearanceReport, EmergencyVehicle, Priority, SosRecord, VehicleId,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// Rank clearance actions, CRITICAL first. Ties keep input order.
pub fn rank_clearance(vehicles: &[EmergencyVehicle], sos_records: &[SosRecord]) -> ClearanceReport {
    let sos_subjects: HashSet<&VehicleId> =
        sos_records.iter().filter(|s| s.active).map(|s| &s.subject_id).collect();
    let total_sos = sos_records.iter().filter(|s| s.active).count();

    let mut recommendations: Vec<ClearanceRecommendation> = vehicles
        .iter()
        .filter(|v| v.severity.is_emergency())
        .map(|v| recommend(v, sos_subjects.contains(&v.id)))
        .collect();

    // sort_by_key is stable
    recommendations.sort_by_key(|r| r.priority.sort_key());

    let total_emergency = recommendations.len();
    let summary = summarize(&recommendations);

    info!(
        total_emergency = %total_emergency,
        total_sos = %total_sos,
        top_priority = ?recommendations.first().map(|r| r.priority),
        "clearance_ranked"
    );

    ClearanceReport { recommendations, summary, total_emergency, total_sos }
}

fn recommend(vehicle: &EmergencyVehicle, has_active_sos: bool) -> ClearanceRecommendation {
    let destination = vehicle.destination_text();
    let subject_route = match &destination {
        Some(dest) => format!("Current → {dest}"),
        None => "Awaiting destination".to_string(),
    };

    let (priority, action, reason) = if has_active_sos {
        (
            Priority::Critical,
            "Clear all traffic immediately".to_string(),
            "Active SOS alert".to_string(),
        )
    } else if let Some(dest) = destination {
        (
            Priority::High,
            format!("Clear route to {dest}"),
            "Active emergency response with confirmed destination".to_string(),
        )
    } else {
        (
            Priority::Medium,
            "Monitor and prepare to clear route".to_string(),
            "Emergency mode active but destination not yet set".to_string(),
        )
    };

    debug!(vehicle_id = %vehicle.id, priority = %priority, "clearance_recommended");

    ClearanceRecommendation {
        subject_route,
        action,
        reason,
        priority,
        subject_ids: vec![vehicle.id.clone()],
        subject_label: vehicle.display_name().to_string(),
    }
}

fn summarize(recommendations: &[ClearanceRecommendation]) -> String {
    let critical = recommendations.iter().filter(|r| r.priority == Priority::Critical).count();
    let high = recommendations.iter().filter(|r| r.priority == Priority::High).count();
    let urgent = critical + high;

    if urgent > 0 {
        let mut parts = Vec::with_capacity(2);
        if critical > 0 {
            parts.push(format!("{critical} CRITICAL"));
        }
        if high > 0 {
            parts.push(format!("{high} HIGH"));
        }
        return format!(
            "{} priority route{} require{} immediate action",
            parts.join(" and "),
            plural(urgent),
            if urgent == 1 { "s" } else { "" }
        );
    }

    match recommendations.len() {
        0 => "No active emergencies - all vehicles operating normally".to_string(),
        n => format!("{n} emergency vehicle{} active - monitor closely", plural(n)),
    }
}

#[inline]
fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
