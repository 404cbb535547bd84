//! Geo-kinematics on a spherical Earth
//!
//! Pure numeric functions with no error states. Inputs are `Position`s,
//! which are range-checked at construction, so nothing here validates.

use crate::domain::types::{Position, TimedPosition};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fixes further apart than this are too stale to infer a heading from
pub const DEFAULT_MAX_PATH_GAP_MS: u64 = 10_000;

/// Great-circle (Haversine) distance in meters. Symmetric in its arguments.
pub fn distance_meters(a: Position, b: Position) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let d_phi = (b.lat() - a.lat()).to_radians();
    let d_lambda = (b.lng() - a.lng()).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push near-antipodal pairs just past 1
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial compass bearing from `from` toward `to`, in [0, 360).
///
/// Identical points have no bearing; `0` is returned for them.
pub fn bearing_degrees(from: Position, to: Position) -> f64 {
    if from == to {
        return 0.0;
    }

    let phi1 = from.lat().to_radians();
    let phi2 = to.lat().to_radians();
    let d_lambda = (to.lng() - from.lng()).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Absolute angular difference between two headings, in [0, 180]
pub fn heading_difference(h1: f64, h2: f64) -> f64 {
    let diff = (h1 - h2).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Headings within `threshold_degrees` of each other count as the same direction
#[inline]
pub fn is_same_direction(h1: f64, h2: f64, threshold_degrees: f64) -> bool {
    heading_difference(h1, h2) <= threshold_degrees
}

/// Map any angle into [0, 360)
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let n = angle.rem_euclid(360.0);
    if n >= 360.0 {
        0.0
    } else {
        n
    }
}

/// Map any angle into (-180, 180]; positive is clockwise (to the right)
pub fn normalize_signed(angle: f64) -> f64 {
    let n = normalize_degrees(angle);
    if n > 180.0 {
        n - 360.0
    } else {
        n
    }
}

/// Point reached by travelling `distance_m` from `origin` along `bearing` degrees
pub fn destination_point(origin: Position, distance_m: f64, bearing: f64) -> Position {
    let phi1 = origin.lat().to_radians();
    let lambda1 = origin.lng().to_radians();
    let theta = bearing.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    let lat = phi2.to_degrees().clamp(-90.0, 90.0);
    // Wrap across the antimeridian back into [-180, 180]
    let lng = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;

    Position::from_trusted(lat, lng)
}

/// Infer a heading from the two most recent fixes.
///
/// Returns `None` with fewer than two fixes, when the fixes are more than
/// `max_gap_ms` apart, or when the position did not change.
pub fn heading_from_path(samples: &[TimedPosition], max_gap_ms: u64) -> Option<f64> {
    let [.., prev, last] = samples else {
        return None;
    };

    if last.timestamp_ms.saturating_sub(prev.timestamp_ms) > max_gap_ms {
        return None;
    }
    if prev.position == last.position {
        return None;
    }

    Some(bearing_degrees(prev.position, last.position))
}
