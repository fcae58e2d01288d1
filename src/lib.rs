//! # Track Annotator
//!
//! Geospatial annotation for synced fitness activities.
//!
//! This library provides:
//! - Decoding of encoded summary polylines into GPS tracks
//! - Bounding-envelope pre-filtering per coordinate dimension
//! - Matching named points of interest (POIs) against a recorded track
//! - An activity record with an ordered serialization view
//!
//! ## Features
//!
//! - **`http`** - Enable HTTP collaborators (activity fetching, reverse geocoding)
//! - **`persistence`** - Enable the SQLite activity repository
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use track_annotator::{match_pois, polyline, PoiMatchConfig, TrackPoint};
//!
//! // Decode a summary polyline into a track
//! let track = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//! assert_eq!(track.len(), 3);
//!
//! // Match named POIs against the track
//! let mut pois = HashMap::new();
//! pois.insert("Trailhead".to_string(), TrackPoint::new(38.5, -120.2));
//!
//! if let Some(matched) = match_pois(&track, &pois, &PoiMatchConfig::default()) {
//!     println!("On track: {:?}", matched);
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{AnnotateError, Result};

// Polyline codec (encoded path string -> GPS track)
pub mod polyline;

// Per-dimension bounding envelopes
pub mod envelope;
pub use envelope::{BoundingEnvelope, TrackBounds};

// POI-on-track matching
pub mod matcher;
pub use matcher::{is_point_on_track, match_pois};

// Geographic utilities (geodesic distance)
pub mod geo_utils;

// Activity record and its serialization view
pub mod activity;
pub use activity::{ActivityRecord, Athlete, ACTIVITY_VIEW_KEYS};

// HTTP collaborators: activity source and reverse geocoding
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ActivityFetcher, ReverseGeocoder, SummaryActivity};

// SQLite activity repository
#[cfg(feature = "persistence")]
pub mod persistence;

#[cfg(feature = "persistence")]
pub use persistence::ActivityStore;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
///
/// Values are carried through unchecked; out-of-range coordinates coming from
/// an upstream provider are passed along as-is.
///
/// # Example
/// ```
/// use track_annotator::TrackPoint;
/// let point = TrackPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl TrackPoint {
    /// Create a new track point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A named point of interest location, as supplied by the POI source
/// (typically a `name -> {lat, lon}` mapping in a config file).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoiLocation {
    pub lat: f64,
    pub lon: f64,
}

impl From<PoiLocation> for TrackPoint {
    fn from(poi: PoiLocation) -> Self {
        TrackPoint::new(poi.lat, poi.lon)
    }
}

/// Convert a deserialized `name -> {lat, lon}` POI mapping into matcher
/// input.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use track_annotator::{poi_points, PoiLocation};
///
/// let config: HashMap<String, PoiLocation> =
///     serde_json::from_str(r#"{"Cabin": {"lat": 40.0, "lon": -116.0}}"#).unwrap();
///
/// let pois = poi_points(&config);
/// assert_eq!(pois["Cabin"].latitude, 40.0);
/// ```
pub fn poi_points(pois: &HashMap<String, PoiLocation>) -> HashMap<String, TrackPoint> {
    pois.iter()
        .map(|(name, location)| (name.clone(), TrackPoint::from(*location)))
        .collect()
}

/// Configuration for POI-on-track matching.
#[derive(Debug, Clone)]
pub struct PoiMatchConfig {
    /// Maximum geodesic distance between a POI and a track point for the POI
    /// to count as on-track. Default: 100.0 meters
    pub max_distance_meters: f64,

    /// Tolerance for the bounding-envelope pre-filter, in degrees. This is a
    /// coarse rectangular filter, not a distance bound. Default: 0.01
    pub box_tolerance_degrees: f64,
}

impl Default for PoiMatchConfig {
    fn default() -> Self {
        Self {
            max_distance_meters: 100.0,
            box_tolerance_degrees: 0.01,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
