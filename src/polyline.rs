//! Polyline codec: encoded path strings to GPS tracks.
//!
//! Decodes the standard signed-value / 5-bit-chunk polyline encoding used by
//! activity providers for summary tracks, at the usual 1e5 precision.
//! Reference: <https://developers.google.com/maps/documentation/utilities/polylinealgorithm>

use crate::error::{AnnotateError, Result};
use crate::TrackPoint;

/// Decimal precision of the encoding (5 digits).
const PRECISION: f64 = 1e5;

/// Decode an encoded polyline into an ordered GPS track.
///
/// An empty input decodes to an empty track; callers treat "nothing decoded"
/// as a non-fatal condition. A stream that cannot be consumed (byte outside
/// the encoding alphabet, truncated chunk sequence, latitude without a
/// longitude) fails with [`AnnotateError::Decode`].
///
/// # Example
/// ```
/// use track_annotator::polyline;
///
/// let track = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(track.len(), 3);
/// assert!((track[0].latitude - 38.5).abs() < 1e-9);
/// assert!((track[0].longitude - -120.2).abs() < 1e-9);
/// ```
pub fn decode(encoded: &str) -> Result<Vec<TrackPoint>> {
    let bytes = encoded.as_bytes();
    let mut track = Vec::new();
    let mut pos = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while pos < bytes.len() {
        let (dlat, next) = decode_signed_value(bytes, pos)?;
        if next >= bytes.len() {
            return Err(AnnotateError::Decode {
                position: next,
                reason: "latitude without matching longitude".to_string(),
            });
        }
        let (dlon, next) = decode_signed_value(bytes, next)?;

        lat += dlat;
        lon += dlon;
        track.push(TrackPoint::new(lat as f64 / PRECISION, lon as f64 / PRECISION));
        pos = next;
    }

    Ok(track)
}

/// Decode one zigzag-encoded value starting at `pos`.
///
/// Returns the decoded value and the position of the next unread byte.
fn decode_signed_value(bytes: &[u8], mut pos: usize) -> Result<(i64, usize)> {
    let mut accumulator: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = match bytes.get(pos) {
            Some(&b) => b,
            None => {
                return Err(AnnotateError::Decode {
                    position: pos,
                    reason: "unexpected end of input inside chunk sequence".to_string(),
                })
            }
        };
        if !(63..=126).contains(&byte) {
            return Err(AnnotateError::Decode {
                position: pos,
                reason: format!("byte 0x{:02x} outside encoding alphabet", byte),
            });
        }
        if shift > 58 {
            return Err(AnnotateError::Decode {
                position: pos,
                reason: "chunk sequence too long".to_string(),
            });
        }

        let chunk = i64::from(byte - 63);
        accumulator |= (chunk & 0x1f) << shift;
        shift += 5;
        pos += 1;

        if chunk & 0x20 == 0 {
            break;
        }
    }

    // Undo the sign inversion applied to negative values at encode time
    let value = if accumulator & 1 != 0 {
        !(accumulator >> 1)
    } else {
        accumulator >> 1
    };

    Ok((value, pos))
}
