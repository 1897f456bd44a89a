//! Stored response entries and the clock that ages them.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use edge_core::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::CacheError;

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            let current = *now;
            *now = chrono::Duration::from_std(by)
                .ok()
                .and_then(|by| current.checked_add_signed(by))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// A response as held by a response store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Headers in original order.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes, base64 on the wire.
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// Time-to-live in seconds.
    pub ttl_secs: u64,
}

impl CachedResponse {
    /// Capture a response for storage.
    pub fn capture(response: &Response, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: response.headers().to_vec(),
            body: response.body().to_vec(),
            stored_at,
            ttl_secs: ttl.as_secs(),
        }
    }

    /// When the entry stops being served.
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| self.stored_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Check if the entry has expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Get age in seconds.
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.stored_at).num_seconds()).unwrap_or(0)
    }

    /// Rebuild the response to replay.
    pub fn into_response(self) -> Result<Response, CacheError> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| CacheError::Serialization(format!("status {}: {}", self.status, e)))?;
        Ok(Response::from_parts(status, self.headers, self.body))
    }

    /// Encode as JSON for a byte-oriented store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decode from [`CachedResponse::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

mod body_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Response {
        Response::new(StatusCode::OK)
            .with_header("Content-Encoding", "gzip")
            .with_header("Cache-Control", "max-age=300")
            .with_body(vec![0x1f, 0x8b, 0x08, 0x00])
    }

    #[test]
    fn test_expiry_boundary() {
        let clock = ManualClock::default();
        let entry = CachedResponse::capture(&sample(), clock.now(), Duration::from_secs(300));

        assert!(!entry.is_expired(clock.now()));
        clock.advance(Duration::from_secs(299));
        assert!(!entry.is_expired(clock.now()));
        assert_eq!(entry.age_secs(clock.now()), 299);
        clock.advance(Duration::from_secs(1));
        assert!(entry.is_expired(clock.now()));
    }

    #[test]
    fn test_binary_body_survives_json() {
        let entry = CachedResponse::capture(&sample(), Utc::now(), Duration::from_secs(300));
        let bytes = entry.to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("H4sIAA=="));

        let decoded = CachedResponse::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.into_response().unwrap(), sample());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = CachedResponse {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
            stored_at: Utc::now(),
            ttl_secs: u64::MAX,
        };
        assert!(!entry.is_expired(Utc::now()));
    }

    #[test]
    fn test_invalid_status_rejected() {
        let entry = CachedResponse {
            status: 42,
            headers: Vec::new(),
            body: Vec::new(),
            stored_at: Utc::now(),
            ttl_secs: 1,
        };
        assert!(matches!(
            entry.into_response(),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(CachedResponse::from_bytes(b"not json").is_err());
    }
}
