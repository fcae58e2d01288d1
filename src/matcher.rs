//! POI-on-track matching.
//!
//! Determines which named points of interest lie on a recorded track within
//! a distance threshold. A per-dimension bounding envelope rejects POIs far
//! outside the track's extent before any geodesic distance is computed.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::envelope::TrackBounds;
use crate::geo_utils::geodesic_distance;
use crate::{PoiMatchConfig, TrackPoint};

/// Coarse per-point filter applied before the geodesic check, in degrees.
/// Independent of the envelope tolerance in [`PoiMatchConfig`].
const POINT_TOLERANCE_DEGREES: f64 = 0.01;

/// Match named POIs against a track.
///
/// Returns the names of all POIs that lie on the track, or `None` when no POI
/// matched (an empty match set is never returned). An empty track or an empty
/// POI map yields `None` immediately.
///
/// The envelope pre-filter uses `config.box_tolerance_degrees`, a degree-based
/// tolerance deliberately looser than the meter-based final threshold. The
/// degree/meter mismatch is a known approximation and is kept as-is; changing
/// it would change which POIs match.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use track_annotator::{match_pois, PoiMatchConfig, TrackPoint};
///
/// let track = vec![TrackPoint::new(40.0, -116.0)];
/// let mut pois = HashMap::new();
/// pois.insert("Cabin".to_string(), TrackPoint::new(40.0, -116.0));
/// pois.insert("Far".to_string(), TrackPoint::new(41.0, -116.0));
///
/// let matched = match_pois(&track, &pois, &PoiMatchConfig::default()).unwrap();
/// assert!(matched.contains("Cabin"));
/// assert!(!matched.contains("Far"));
/// ```
pub fn match_pois(
    track: &[TrackPoint],
    pois: &HashMap<String, TrackPoint>,
    config: &PoiMatchConfig,
) -> Option<BTreeSet<String>> {
    if track.is_empty() || pois.is_empty() {
        return None;
    }

    // Non-empty track, so bounds always exist
    let bounds = TrackBounds::from_track(track)?;

    let mut matched = BTreeSet::new();
    for (name, point) in pois {
        if !bounds.contains(point, config.box_tolerance_degrees) {
            continue;
        }
        if is_point_on_track(point, track, config.max_distance_meters) {
            matched.insert(name.clone());
        }
    }

    debug!(
        "Matched {}/{} POIs against {} track points",
        matched.len(),
        pois.len(),
        track.len()
    );

    if matched.is_empty() {
        None
    } else {
        Some(matched)
    }
}

/// Check whether a point lies on a track.
///
/// Accepts on the FIRST track point (in traversal order) that is within
/// 0.01 degrees of the point in both dimensions and within
/// `max_distance_meters` geodesic distance. Short-circuits rather than
/// finding the closest track point, so the result can depend on traversal
/// order when several track points would qualify.
pub fn is_point_on_track(
    point: &TrackPoint,
    track: &[TrackPoint],
    max_distance_meters: f64,
) -> bool {
    track.iter().any(|candidate| {
        (point.latitude - candidate.latitude).abs() < POINT_TOLERANCE_DEGREES
            && (point.longitude - candidate.longitude).abs() < POINT_TOLERANCE_DEGREES
            && geodesic_distance(point, candidate) < max_distance_meters
    })
}
