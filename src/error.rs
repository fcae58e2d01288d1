//! Unified error handling for the track-annotator library.
//!
//! This module provides a consistent error type for all annotation
//! operations, from polyline decoding through the external collaborators.

use std::fmt;

/// Unified error type for track-annotator operations.
#[derive(Debug, Clone)]
pub enum AnnotateError {
    /// Encoded polyline could not be consumed as a valid stream
    Decode { position: usize, reason: String },
    /// Persistence/storage error
    Persistence { message: String },
    /// HTTP/API error from the activity source
    Http {
        message: String,
        status_code: Option<u16>,
    },
    /// Reverse-geocoding lookup failed (after the one permitted retry)
    Geocode { message: String },
}

impl fmt::Display for AnnotateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotateError::Decode { position, reason } => {
                write!(f, "Polyline decode error at byte {}: {}", position, reason)
            }
            AnnotateError::Persistence { message } => {
                write!(f, "Persistence error: {}", message)
            }
            AnnotateError::Http {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            AnnotateError::Geocode { message } => {
                write!(f, "Reverse geocoding failed: {}", message)
            }
        }
    }
}

impl std::error::Error for AnnotateError {}

/// Result type alias for track-annotator operations.
pub type Result<T> = std::result::Result<T, AnnotateError>;

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for AnnotateError {
    fn from(err: rusqlite::Error) -> Self {
        AnnotateError::Persistence {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AnnotateError {
    fn from(err: reqwest::Error) -> Self {
        AnnotateError::Http {
            message: err.to_string(),
            status_code: err.status().map(|s| s.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = AnnotateError::Decode {
            position: 7,
            reason: "unexpected end of input".to_string(),
        };
        assert!(err.to_string().contains("byte 7"));
        assert!(err.to_string().contains("unexpected end"));
    }

    #[test]
    fn test_http_error_display_with_status() {
        let err = AnnotateError::Http {
            message: "too many requests".to_string(),
            status_code: Some(429),
        };
        assert!(err.to_string().contains("429"));
    }
}
