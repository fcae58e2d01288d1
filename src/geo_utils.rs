//! Geographic utilities for track annotation.
//!
//! Distance is geodesic on the WGS84 ellipsoid, matching the meter
//! thresholds used by POI matching.

use geo::{Distance, Geodesic, Point};

use crate::TrackPoint;

/// Geodesic distance between two GPS points in meters.
///
/// Computed on the WGS84 ellipsoid.
///
/// # Example
/// ```
/// use track_annotator::{geo_utils, TrackPoint};
///
/// let london = TrackPoint::new(51.5074, -0.1278);
/// let paris = TrackPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::geodesic_distance(&london, &paris);
/// assert!((distance - 344_000.0).abs() < 2_000.0); // ~344 km
/// ```
#[inline]
pub fn geodesic_distance(p1: &TrackPoint, p2: &TrackPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Geodesic::distance(point1, point2)
}
