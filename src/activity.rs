//! Activity records and their serialization view.
//!
//! An [`ActivityRecord`] owns the synced metadata for one activity plus the
//! derived geospatial state: the decoded track, its bounding envelopes, and
//! the matched POI names. The serialization view is an explicit allow-list
//! projection, never reflection over the struct.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::envelope::TrackBounds;
use crate::matcher::match_pois;
use crate::{PoiMatchConfig, TrackPoint};

/// Fixed field list emitted by [`ActivityRecord::to_view`], in order.
///
/// `pois` and `streak` are appended after these, and only when present.
pub const ACTIVITY_VIEW_KEYS: [&str; 14] = [
    "strava_id",
    "athlete_id",
    "name",
    "distance",
    "moving_time",
    "elapsed_time",
    "total_elevation_gain",
    "type",
    "start_date",
    "start_date_local",
    "location_country",
    "summary_polyline",
    "average_heartrate",
    "average_speed",
];

/// The owning athlete, as synced from the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Athlete {
    pub id: i64,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

impl Athlete {
    /// Key-value projection for storage: `id`, `firstname`, `lastname`.
    pub fn to_view(&self) -> Map<String, Value> {
        let mut view = Map::new();
        view.insert("id".into(), Value::from(self.id));
        view.insert("firstname".into(), option_value(self.firstname.clone()));
        view.insert("lastname".into(), option_value(self.lastname.clone()));
        view
    }
}

/// One synced activity with its derived geospatial annotations.
///
/// The track is set once at decode time; the bounding envelopes and matched
/// POIs are derived from it on demand and never stored independently of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub strava_id: i64,
    pub athlete_id: i64,
    pub name: String,
    /// Distance in meters
    pub distance: f64,
    pub moving_time: Duration,
    pub elapsed_time: Duration,
    /// Total elevation gain in meters
    pub total_elevation_gain: f64,
    /// Sport type, e.g. "Run" or "Ride"
    pub activity_type: String,
    pub start_date: DateTime<Utc>,
    pub start_date_local: NaiveDateTime,
    pub location_country: Option<String>,
    /// Encoded summary polyline as received from the provider
    pub summary_polyline: Option<String>,
    pub average_heartrate: Option<f64>,
    /// Average speed in m/s
    pub average_speed: f64,
    /// Decoded track; `None` when no usable polyline was available
    pub track: Option<Vec<TrackPoint>>,
    /// Matched POI names; `None` until a match pass finds at least one
    pub pois: Option<BTreeSet<String>>,
    /// Consecutive-day streak, when the sync pass computes one
    pub streak: Option<u32>,
}

impl ActivityRecord {
    /// Bounding envelopes of the decoded track.
    ///
    /// `None` when there is no track.
    pub fn bounds(&self) -> Option<TrackBounds> {
        self.track.as_deref().and_then(TrackBounds::from_track)
    }

    /// Match the given POIs against the track and store the result.
    ///
    /// The match set is stored only when at least one POI matched; a
    /// no-match pass leaves `pois` untouched. Calling this twice with the
    /// same inputs stores the same set.
    pub fn attach_pois(&mut self, pois: &HashMap<String, TrackPoint>, config: &PoiMatchConfig) {
        let Some(track) = self.track.as_deref() else {
            return;
        };
        if let Some(matched) = match_pois(track, pois, config) {
            self.pois = Some(matched);
        }
    }

    /// Ordered key-value projection for storage.
    ///
    /// Emits exactly [`ACTIVITY_VIEW_KEYS`] in order, rendering durations as
    /// `H:MM:SS` and timestamps as RFC 3339 / ISO strings, then appends
    /// `pois` and `streak` only when present. Fields outside the list (the
    /// decoded track) are never emitted.
    pub fn to_view(&self) -> Map<String, Value> {
        let mut view = Map::new();

        view.insert("strava_id".into(), Value::from(self.strava_id));
        view.insert("athlete_id".into(), Value::from(self.athlete_id));
        view.insert("name".into(), Value::from(self.name.clone()));
        view.insert("distance".into(), Value::from(self.distance));
        view.insert(
            "moving_time".into(),
            Value::from(format_duration(self.moving_time)),
        );
        view.insert(
            "elapsed_time".into(),
            Value::from(format_duration(self.elapsed_time)),
        );
        view.insert(
            "total_elevation_gain".into(),
            Value::from(self.total_elevation_gain),
        );
        view.insert("type".into(), Value::from(self.activity_type.clone()));
        view.insert(
            "start_date".into(),
            Value::from(format_timestamp(&self.start_date)),
        );
        view.insert(
            "start_date_local".into(),
            Value::from(self.start_date_local.to_string()),
        );
        view.insert(
            "location_country".into(),
            option_value(self.location_country.clone()),
        );
        view.insert(
            "summary_polyline".into(),
            option_value(self.summary_polyline.clone()),
        );
        view.insert(
            "average_heartrate".into(),
            option_value(self.average_heartrate),
        );
        view.insert("average_speed".into(), Value::from(self.average_speed));

        if let Some(pois) = &self.pois {
            let names: Vec<Value> = pois.iter().cloned().map(Value::from).collect();
            view.insert("pois".into(), Value::Array(names));
        }
        if let Some(streak) = self.streak {
            view.insert("streak".into(), Value::from(streak));
        }

        view
    }
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS+HH:MM` (space-separated, with
/// offset).
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

/// Render a duration as `H:MM:SS` (hours unpadded).
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

fn option_value<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}
