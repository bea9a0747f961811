//! Domain DTOs for the upstream resource API.
//!
//! # Design
//! Defined independently from the mock-server crate; the integration tests
//! catch any schema drift between the two. Every field is optional because
//! the upstream is free to omit any of them.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Request payload for create and full update. Unset fields are sent as
/// JSON `null`, not omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourcePayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

/// A resource as returned by the upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 timestamps and offset-less ones such as
/// `2024-12-14T10:00:00`, which are read as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}

/// Arbitrary key/value mapping sent as the PATCH body.
pub type PartialUpdate = serde_json::Map<String, serde_json::Value>;

/// Flat, ordered field list sent as an `application/x-www-form-urlencoded` body.
pub type FormData = Vec<(String, String)>;

/// Status, headers and decoded body of a raw exchange. Header names are
/// lowercased; repeated headers keep every value in arrival order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FullResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Option<Resource>,
}
