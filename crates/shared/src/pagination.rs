//! Opaque "since" cursors for polled message streams.
//!
//! A cursor names the last record a client has seen. It encodes the record's
//! creation time and id so that records sharing a timestamp are still
//! strictly ordered.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Invalid cursor format")]
    InvalidFormat,
    #[error("Invalid cursor encoding")]
    InvalidEncoding,
    #[error("Invalid timestamp in cursor")]
    InvalidTimestamp,
    #[error("Invalid ID in cursor")]
    InvalidId,
}

/// Position of a record in a `(created_at, id)` ordered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl StreamCursor {
    pub fn new(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { created_at, id }
    }

    /// Encodes as `base64url(RFC3339|uuid)`.
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}|{}",
            self.created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            self.id
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    pub fn decode(cursor: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|_| CursorError::InvalidEncoding)?;
        let raw = String::from_utf8(bytes).map_err(|_| CursorError::InvalidFormat)?;
        let (ts, id) = raw.split_once('|').ok_or(CursorError::InvalidFormat)?;

        let id = Uuid::parse_str(id).map_err(|_| CursorError::InvalidId)?;
        let created_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| CursorError::InvalidTimestamp)?
            .with_timezone(&Utc);

        Ok(Self { created_at, id })
    }
}

/// Clamps a requested page size into `1..=max`, falling back to `default`.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_cursor_survives_encoding() {
        let at = Utc
            .with_ymd_and_hms(2025, 3, 9, 21, 4, 5)
            .unwrap()
            .with_nanosecond(417_000)
            .unwrap();
        let cursor = StreamCursor::new(at, Uuid::new_v4());

        let decoded = StreamCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_is_url_safe() {
        let encoded = StreamCursor::new(Utc::now(), Uuid::new_v4()).encode();
        assert!(!encoded.contains(['+', '/', '=']));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert_eq!(
            StreamCursor::decode("***"),
            Err(CursorError::InvalidEncoding)
        );
    }

    #[test]
    fn test_decode_rejects_missing_separator() {
        let raw = URL_SAFE_NO_PAD.encode(b"2025-01-01T00:00:00Z");
        assert_eq!(StreamCursor::decode(&raw), Err(CursorError::InvalidFormat));
    }

    #[test]
    fn test_decode_rejects_bad_id() {
        let raw = URL_SAFE_NO_PAD.encode(b"2025-01-01T00:00:00Z|42");
        assert_eq!(StreamCursor::decode(&raw), Err(CursorError::InvalidId));
    }

    #[test]
    fn test_decode_rejects_bad_timestamp() {
        let raw = format!("yesterday|{}", Uuid::nil());
        let encoded = URL_SAFE_NO_PAD.encode(raw.as_bytes());
        assert_eq!(
            StreamCursor::decode(&encoded),
            Err(CursorError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50, 200), 50);
        assert_eq!(clamp_limit(Some(0), 50, 200), 1);
        assert_eq!(clamp_limit(Some(500), 50, 200), 200);
        assert_eq!(clamp_limit(Some(20), 50, 200), 20);
    }
}
