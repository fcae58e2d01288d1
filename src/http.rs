//! HTTP collaborators: activity source and reverse geocoding.
//!
//! This module provides the two external collaborators around the annotation
//! core:
//! - [`ActivityFetcher`] pulls summary activities from the Strava API
//! - [`ReverseGeocoder`] resolves a start point to a place name, retrying
//!   once after a fixed backoff before propagating the failure
//!
//! Both are thin I/O glue; decode failures inside a fetched summary degrade
//! to "no track" rather than failing the whole record.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AnnotateError, Result};
use crate::{polyline, ActivityRecord, TrackPoint};

const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
const NOMINATIM_BASE: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backoff before the single geocoding retry. Nominatim throttles per-IP and
/// recovers within a minute.
const GEOCODE_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Summary activity as returned by the provider's list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryActivity {
    pub id: i64,
    pub athlete: AthleteRef,
    pub name: String,
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: i64,
    /// Elapsed time in seconds
    pub elapsed_time: i64,
    pub total_elevation_gain: f64,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub start_date: DateTime<Utc>,
    pub start_date_local: DateTime<Utc>,
    pub location_country: Option<String>,
    /// Provider sends an empty array instead of null when unavailable
    pub start_latlng: Option<Vec<f64>>,
    pub map: Option<ActivityMap>,
    pub average_heartrate: Option<f64>,
    pub average_speed: f64,
}

/// Map payload of a summary activity.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityMap {
    pub summary_polyline: Option<String>,
}

/// Reference to the owning athlete.
#[derive(Debug, Clone, Deserialize)]
pub struct AthleteRef {
    pub id: i64,
}

impl SummaryActivity {
    /// Start point of the activity, when the provider supplied one.
    pub fn start_point(&self) -> Option<TrackPoint> {
        match self.start_latlng.as_deref() {
            Some([lat, lon]) => Some(TrackPoint::new(*lat, *lon)),
            _ => None,
        }
    }

    /// Convert into an [`ActivityRecord`], decoding the summary polyline.
    ///
    /// A missing or garbled polyline yields a record without a track; the
    /// decode failure is logged, not propagated.
    pub fn into_record(self) -> ActivityRecord {
        let summary_polyline = self.map.and_then(|m| m.summary_polyline);

        let track = summary_polyline.as_deref().and_then(|encoded| {
            match polyline::decode(encoded) {
                Ok(points) if !points.is_empty() => Some(points),
                Ok(_) => None,
                Err(err) => {
                    warn!("Activity {}: unusable polyline ({}), keeping record without track", self.id, err);
                    None
                }
            }
        });

        ActivityRecord {
            strava_id: self.id,
            athlete_id: self.athlete.id,
            name: self.name,
            distance: self.distance,
            moving_time: chrono::Duration::seconds(self.moving_time),
            elapsed_time: chrono::Duration::seconds(self.elapsed_time),
            total_elevation_gain: self.total_elevation_gain,
            activity_type: self.activity_type,
            start_date: self.start_date,
            start_date_local: self.start_date_local.naive_utc(),
            location_country: self.location_country,
            summary_polyline,
            average_heartrate: self.average_heartrate,
            average_speed: self.average_speed,
            track,
            pois: None,
            streak: None,
        }
    }
}

/// Activity source collaborator over the Strava API.
pub struct ActivityFetcher {
    client: Client,
    auth_header: String,
    base_url: String,
}

impl ActivityFetcher {
    /// Create a fetcher authenticated with the given access token.
    pub fn new(access_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AnnotateError::from)?;

        Ok(Self {
            client,
            auth_header: format!("Bearer {}", access_token),
            base_url: STRAVA_API_BASE.to_string(),
        })
    }

    /// Point the fetcher at a different API base (for tests and proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch one page of the athlete's summary activities.
    pub async fn fetch_activities(&self, page: u32, per_page: u32) -> Result<Vec<SummaryActivity>> {
        let url = format!(
            "{}/athlete/activities?page={}&per_page={}",
            self.base_url, page, per_page
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnnotateError::Http {
                message: format!("activity list request failed for page {}", page),
                status_code: Some(status.as_u16()),
            });
        }

        Ok(response.json::<Vec<SummaryActivity>>().await?)
    }

    /// Fetch every summary activity, paging until the provider runs dry.
    pub async fn fetch_all_activities(&self, per_page: u32) -> Result<Vec<SummaryActivity>> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.fetch_activities(page, per_page).await?;
            let fetched = batch.len() as u32;
            all.extend(batch);

            info!("Fetched page {} ({} activities, {} total)", page, fetched, all.len());

            if fetched < per_page {
                break;
            }
            page += 1;
        }

        Ok(all)
    }
}

/// Reverse-geocoding collaborator (Nominatim-style endpoint).
pub struct ReverseGeocoder {
    client: Client,
    user_agent: String,
    base_url: String,
    retry_backoff: Duration,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: String,
}

impl ReverseGeocoder {
    /// Create a geocoder identifying itself with the given user agent.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AnnotateError::from)?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
            base_url: NOMINATIM_BASE.to_string(),
            retry_backoff: GEOCODE_RETRY_BACKOFF,
        })
    }

    /// Point the geocoder at a different endpoint (for tests and mirrors).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the retry backoff (for tests).
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Resolve a coordinate to a place name.
    ///
    /// Retries once after a fixed backoff, then propagates. This is the only
    /// retry logic in the crate and stays behind this collaborator boundary.
    pub async fn reverse(&self, point: &TrackPoint) -> Result<String> {
        match self.lookup(point).await {
            Ok(name) => Ok(name),
            Err(err) => {
                warn!(
                    "Reverse geocoding ({:.5}, {:.5}) failed: {}; retrying after {:?}",
                    point.latitude, point.longitude, err, self.retry_backoff
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.lookup(point).await.map_err(|err| AnnotateError::Geocode {
                    message: err.to_string(),
                })
            }
        }
    }

    async fn lookup(&self, point: &TrackPoint) -> Result<String> {
        let url = format!(
            "{}/reverse?format=jsonv2&lat={}&lon={}",
            self.base_url, point.latitude, point.longitude
        );

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnnotateError::Http {
                message: "reverse lookup rejected".to_string(),
                status_code: Some(status.as_u16()),
            });
        }

        Ok(response.json::<ReverseResponse>().await?.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_json() -> &'static str {
        r#"{
            "id": 4217001,
            "athlete": {"id": 9001},
            "name": "Morning Run",
            "distance": 10012.5,
            "moving_time": 3272,
            "elapsed_time": 3391,
            "total_elevation_gain": 84.0,
            "type": "Run",
            "start_date": "2024-05-12T06:30:00Z",
            "start_date_local": "2024-05-12T14:30:00Z",
            "location_country": "China",
            "start_latlng": [38.5, -120.2],
            "map": {"summary_polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"},
            "average_heartrate": 152.3,
            "average_speed": 3.06
        }"#
    }

    #[test]
    fn test_parse_summary_activity() {
        let summary: SummaryActivity = serde_json::from_str(summary_json()).unwrap();
        assert_eq!(summary.id, 4_217_001);
        assert_eq!(summary.athlete.id, 9_001);
        assert_eq!(summary.activity_type, "Run");
        assert_eq!(summary.start_point(), Some(TrackPoint::new(38.5, -120.2)));
    }

    #[test]
    fn test_into_record_decodes_track() {
        let summary: SummaryActivity = serde_json::from_str(summary_json()).unwrap();
        let record = summary.into_record();

        assert_eq!(record.strava_id, 4_217_001);
        assert_eq!(record.moving_time.num_seconds(), 3272);
        let track = record.track.unwrap();
        assert_eq!(track.len(), 3);
        assert!((track[0].latitude - 38.5).abs() < 1e-9);
    }

    #[test]
    fn test_into_record_tolerates_garbled_polyline() {
        let mut value: serde_json::Value = serde_json::from_str(summary_json()).unwrap();
        value["map"]["summary_polyline"] = serde_json::json!("not!a!polyline");
        let summary: SummaryActivity = serde_json::from_value(value).unwrap();

        let record = summary.into_record();
        assert!(record.track.is_none());
        // The raw string is still kept for storage
        assert_eq!(record.summary_polyline.as_deref(), Some("not!a!polyline"));
    }

    #[test]
    fn test_into_record_no_map_payload() {
        let mut value: serde_json::Value = serde_json::from_str(summary_json()).unwrap();
        value["map"] = serde_json::Value::Null;
        let summary: SummaryActivity = serde_json::from_value(value).unwrap();

        let record = summary.into_record();
        assert!(record.track.is_none());
        assert!(record.summary_polyline.is_none());
    }
}
