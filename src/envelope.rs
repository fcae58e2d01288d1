//! Per-dimension bounding envelopes for GPS tracks.
//!
//! An envelope tracks the minimum/maximum observed value of one scalar
//! dimension (latitude or longitude). The matcher uses a pair of envelopes as
//! a cheap O(1) pre-filter before running geodesic distance checks against
//! every track point.

use serde::{Deserialize, Serialize};

use crate::TrackPoint;

/// Minimum/maximum range of one scalar dimension.
///
/// An envelope always holds at least one observed value, so `min <= max` by
/// construction. Constructing one from no values yields `None`, which is how
/// "no track, no envelope" is represented.
///
/// # Example
/// ```
/// use track_annotator::BoundingEnvelope;
///
/// let mut env = BoundingEnvelope::of(40.0);
/// env.add(40.5);
/// assert_eq!(env.min(), 40.0);
/// assert_eq!(env.max(), 40.5);
/// assert!(env.contains(40.51, 0.01));
/// assert!(!env.contains(40.52, 0.01));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingEnvelope {
    min: f64,
    max: f64,
}

impl BoundingEnvelope {
    /// Create an envelope collapsed onto a single value.
    pub fn of(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Build an envelope covering every value in the iterator.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut values = values.into_iter();
        let mut envelope = Self::of(values.next()?);
        for value in values {
            envelope.add(value);
        }
        Some(envelope)
    }

    /// Expand the envelope to include `value`.
    ///
    /// Idempotent for values already inside the range.
    pub fn add(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// True iff `value` lies within `[min - tolerance, max + tolerance]`.
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        self.min - tolerance <= value && value <= self.max + tolerance
    }

    /// Smallest observed value.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest observed value.
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// The pair of envelopes (latitude, longitude) spanned by a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackBounds {
    pub lat: BoundingEnvelope,
    pub lon: BoundingEnvelope,
}

impl TrackBounds {
    /// Compute the bounds of a track in a single scan.
    ///
    /// Returns `None` for an empty track.
    pub fn from_track(track: &[TrackPoint]) -> Option<Self> {
        let (first, rest) = track.split_first()?;
        let mut lat = BoundingEnvelope::of(first.latitude);
        let mut lon = BoundingEnvelope::of(first.longitude);

        for point in rest {
            lat.add(point.latitude);
            lon.add(point.longitude);
        }

        Some(Self { lat, lon })
    }

    /// True iff the point falls inside both envelopes at the given tolerance.
    pub fn contains(&self, point: &TrackPoint, tolerance: f64) -> bool {
        self.lat.contains(point.latitude, tolerance)
            && self.lon.contains(point.longitude, tolerance)
    }
}
