//! Request and response types for the HTTP API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::board::{RegistrySnapshot, ServiceStatus};

// =============================================================================
// Status Types
// =============================================================================

/// Response for `GET /v1/status/{service}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub value: String,
    pub last_update: String,
    pub expire_date: Option<String>,
}

impl From<ServiceStatus> for StatusResponse {
    fn from(status: ServiceStatus) -> Self {
        Self {
            value: status.value,
            last_update: timestamp(status.last_update),
            expire_date: status.expire_at.map(timestamp),
        }
    }
}

/// Response for `GET /v1/services`. `currentService` is -1 when empty.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesResponse {
    pub services: Vec<String>,
    pub current_service: i64,
}

impl From<RegistrySnapshot> for ServicesResponse {
    fn from(snapshot: RegistrySnapshot) -> Self {
        Self {
            services: snapshot.services,
            current_service: snapshot
                .cursor
                .and_then(|cursor| i64::try_from(cursor).ok())
                .unwrap_or(-1),
        }
    }
}

/// Empty JSON object returned by successful mutations.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmptyResponse {}

/// A parsed `PUT /v1/status/{service}` body.
#[derive(Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    pub value: String,
    pub expire: Option<Duration>,
}

impl StatusUpdate {
    /// Reads `value` and `expire` from a JSON body. A body that is not a
    /// JSON object counts as one without a value.
    pub fn from_body(body: &[u8]) -> Result<Self, String> {
        let body: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let Some(Value::String(value)) = body.get("value") else {
            return Err("Value must be a string".to_string());
        };
        Ok(Self {
            value: value.clone(),
            expire: body.get("expire").and_then(parse_expire),
        })
    }
}

/// Interprets `expire` as milliseconds.
///
/// Numbers are truncated to an integer; strings are read up to the first
/// character that is not part of a leading integer (`"1500ms"` is 1500).
/// Negative values expire immediately. Anything else means no expiry.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_expire(raw: &Value) -> Option<Duration> {
    let millis: i64 = match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        })?,
        Value::String(s) => leading_integer(s)?,
        _ => return None,
    };
    Some(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// System Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Seconds since the API started.
    pub uptime: u64,
    pub services: usize,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
