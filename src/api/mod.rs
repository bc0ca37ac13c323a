//! Admin API data model and client abstraction.
//!
//! Every server interaction is a single JSON POST of the form
//! `{ "action": <name>, ...payload }`. [`AdminApi::call`] is that generic
//! pass-through; the typed helpers are default methods layered on top of it,
//! so a test double only needs to implement `call`.
//!
//! Loose server-side values (flags sent as `0`/`1`/`true`, timestamps in
//! several layouts) are normalized here, once, at deserialization.
pub mod http;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use std::fmt::{Display, Formatter};

use crate::error::ApiError;

pub use http::HttpApi;

/// Server-side user identifier; echoed back verbatim in mutation payloads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Num(i64),
    Text(String),
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Num(n) => write!(f, "{n}"),
            UserId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One row of the `getAllUsers` snapshot.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default, deserialize_with = "de_text")]
    pub username: String,
    #[serde(default, deserialize_with = "de_flag")]
    pub premium: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_dev: bool,
    /// `None` when the server sent nothing usable; such a record never
    /// satisfies a date-range filter.
    #[serde(default, deserialize_with = "de_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Option<Vec<UserRecord>>,
}

/// `{ success, error? }` answer to a mutation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MutationResult {
    #[serde(default, deserialize_with = "de_flag")]
    pub success: bool,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub error: Option<String>,
}

impl MutationResult {
    /// Turn `{ success: false }` into [`ApiError::Rejected`].
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                self.error.unwrap_or_else(|| "Unknown error.".to_string()),
            ))
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RevealResult {
    #[serde(default, deserialize_with = "de_flag")]
    pub success: bool,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "de_text")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub action: String,
    #[serde(default, deserialize_with = "de_text")]
    pub details: String,
}

/// Answer to `getLogsAndStats`: per-day signing counts plus the activity log.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LogsAndStats {
    #[serde(default, deserialize_with = "de_flag")]
    pub success: bool,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Kept in server order (`preserve_order`).
    #[serde(default)]
    pub stats: Map<String, Value>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub error: Option<String>,
}

/// A single-field change sent through `updateUser`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserUpdate {
    Premium(bool),
    Dev(bool),
    Password(String),
}

impl UserUpdate {
    fn to_json(&self) -> Value {
        match self {
            UserUpdate::Premium(on) => json!({ "premium": u8::from(*on) }),
            UserUpdate::Dev(on) => json!({ "isDev": u8::from(*on) }),
            UserUpdate::Password(pw) => json!({ "password": pw }),
        }
    }
}

/// Remote admin endpoint.
pub trait AdminApi: Send + Sync {
    /// Send `{ action, ...payload }` and return the decoded JSON body.
    fn call(&self, action: &str, payload: Value) -> Result<Value, ApiError>;

    fn fetch_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        let body = self.call("getAllUsers", json!({}))?;
        let resp: UsersResponse = decode(body)?;
        Ok(resp.users.unwrap_or_default())
    }

    fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<MutationResult, ApiError> {
        let body = self.call("updateUser", json!({ "id": id, "updateData": update.to_json() }))?;
        decode(body)
    }

    fn delete_user(&self, id: &UserId) -> Result<MutationResult, ApiError> {
        let body = self.call("deleteUser", json!({ "id": id }))?;
        decode(body)
    }

    fn reveal_password(&self, id: &UserId) -> Result<RevealResult, ApiError> {
        let body = self.call("revealPassword", json!({ "id": id }))?;
        decode(body)
    }

    fn logs_and_stats(&self) -> Result<LogsAndStats, ApiError> {
        let body = self.call("getLogsAndStats", json!({}))?;
        decode(body)
    }
}

fn decode<T: for<'de> Deserialize<'de>>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Build the wire body: `action` first, payload fields merged after it.
pub fn request_body(action: &str, payload: Value) -> Value {
    let mut body = Map::new();
    body.insert("action".to_string(), Value::String(action.to_string()));
    if let Value::Object(extra) = payload {
        body.extend(extra);
    }
    Value::Object(body)
}

/// Interpret a loosely typed flag. Numbers are true when non-zero; strings
/// accept the usual spellings of "on".
pub fn flag_value(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => parse_bool(s),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Parse a `createdAt` value. Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.f]`
/// (UTC), a bare `YYYY-MM-DD` (midnight UTC) and epoch milliseconds.
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

fn value_text(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().is_some_and(flag_value))
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(parse_timestamp))
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(value_text).unwrap_or_default())
}

fn de_opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(value_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use std::sync::Mutex;

    /// Records every call and answers with a canned body.
    struct Canned {
        reply: Value,
        seen: Mutex<Vec<(String, Value)>>,
    }

    impl Canned {
        fn new(reply: Value) -> Self {
            Self { reply, seen: Mutex::new(Vec::new()) }
        }
    }

    impl AdminApi for Canned {
        fn call(&self, action: &str, payload: Value) -> Result<Value, ApiError> {
            self.seen.lock().unwrap().push((action.to_string(), payload));
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn flags_are_normalized_on_ingestion() {
        let users: Vec<UserRecord> = serde_json::from_value(json!([
            { "id": 1, "username": "a", "premium": 1, "isDev": 0 },
            { "id": 2, "username": "b", "premium": true, "isDev": "1" },
            { "id": 3, "username": "c", "premium": null },
            { "id": "x4", "username": "d", "premium": "false", "isDev": 2 },
        ]))
        .unwrap();
        let flags: Vec<(bool, bool)> = users.iter().map(|u| (u.premium, u.is_dev)).collect();
        assert_eq!(flags, vec![(true, false), (true, true), (false, false), (false, true)]);
        assert_eq!(users[3].id, UserId::Text("x4".into()));
    }

    #[test]
    fn timestamps_accept_common_layouts() {
        let expected = Utc.with_ymd_and_hms(2023, 1, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp_str("2023-01-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp_str("2023-01-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp_str("2023-01-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp_str("2023-01-01T12:30:00.000"), Some(expected));
        let day = parse_timestamp_str("2023-01-01").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2023, 1, 1));
        assert_eq!(parse_timestamp(&json!(1_672_576_200_000_i64)), Some(expected));
        assert_eq!(parse_timestamp_str("yesterday"), None);
    }

    #[test]
    fn missing_users_array_is_empty_snapshot() {
        let api = Canned::new(json!({ "users": null }));
        assert!(api.fetch_users().unwrap().is_empty());
        let api = Canned::new(json!({}));
        assert!(api.fetch_users().unwrap().is_empty());
    }

    #[test]
    fn update_payload_uses_numeric_flags() {
        let api = Canned::new(json!({ "success": true }));
        api.update_user(&UserId::Num(7), &UserUpdate::Premium(false))
            .unwrap()
            .into_result()
            .unwrap();
        let seen = api.seen.lock().unwrap();
        assert_eq!(seen[0].0, "updateUser");
        assert_eq!(seen[0].1, json!({ "id": 7, "updateData": { "premium": 0 } }));
    }

    #[test]
    fn rejected_mutation_carries_server_error() {
        let api = Canned::new(json!({ "success": false, "error": "not allowed" }));
        let err = api.delete_user(&UserId::Num(1)).unwrap().into_result().unwrap_err();
        assert_eq!(err, ApiError::Rejected("not allowed".into()));

        let api = Canned::new(json!({ "success": 0 }));
        let err = api.delete_user(&UserId::Num(1)).unwrap().into_result().unwrap_err();
        assert_eq!(err.to_string(), "Unknown error.");
    }

    #[test]
    fn request_body_puts_action_first() {
        let body = request_body("deleteUser", json!({ "id": 3 }));
        assert_eq!(body, json!({ "action": "deleteUser", "id": 3 }));
        assert_eq!(request_body("getAllUsers", json!({})), json!({ "action": "getAllUsers" }));
    }
}
