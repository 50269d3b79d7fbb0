//! Shape and range checks applied to raw check records before probing.
//!
//! Records come straight off disk and may be corrupted or hand-edited, so
//! nothing about their structure is trusted. A record either comes out fully
//! normalized or is rejected as a whole.

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Check, CheckMethod, CheckState, Protocol};

const ID_LENGTH: usize = 20;
const PHONE_LENGTH: usize = 10;
const MIN_TIMEOUT_SECONDS: u64 = 1;
const MAX_TIMEOUT_SECONDS: u64 = 5;

/// Fields the validator owns; anything else is carried through as-is
const KNOWN_FIELDS: [&str; 9] = [
    "id",
    "userPhone",
    "protocol",
    "url",
    "method",
    "successCodes",
    "timeoutSeconds",
    "state",
    "lastChecked",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("id must be a string of exactly 20 characters")]
    Id,
    #[error("userPhone must be a string of exactly 10 characters")]
    UserPhone,
    #[error("protocol must be one of http, https")]
    Protocol,
    #[error("url must be a non-empty string")]
    Url,
    #[error("method must be one of get, post, put, delete")]
    Method,
    #[error("successCodes must be a non-empty array")]
    SuccessCodes,
    #[error("timeoutSeconds must be a whole number between 1 and 5")]
    TimeoutSeconds,
}

/// Validate a raw record and normalize it into a [`Check`].
///
/// `state` falls back to `down` and `lastChecked` to "never" when missing or
/// malformed; every other field is required.
pub fn validate_check(raw: &Value) -> Result<Check, ValidationError> {
    let record = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let id = trimmed_with_length(record.get("id"), ID_LENGTH).ok_or(ValidationError::Id)?;
    let user_phone =
        trimmed_with_length(record.get("userPhone"), PHONE_LENGTH).ok_or(ValidationError::UserPhone)?;

    let protocol = record
        .get("protocol")
        .and_then(Value::as_str)
        .and_then(Protocol::parse)
        .ok_or(ValidationError::Protocol)?;

    let url = record
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ValidationError::Url)?
        .to_string();

    let method = record
        .get("method")
        .and_then(Value::as_str)
        .and_then(CheckMethod::parse)
        .ok_or(ValidationError::Method)?;

    let success_codes = record
        .get("successCodes")
        .and_then(Value::as_array)
        .filter(|codes| !codes.is_empty())
        .ok_or(ValidationError::SuccessCodes)?
        .clone();

    let timeout_seconds = record
        .get("timeoutSeconds")
        .and_then(whole_number)
        .filter(|secs| (MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(secs))
        .ok_or(ValidationError::TimeoutSeconds)?;

    let state = match record.get("state").and_then(Value::as_str) {
        Some("up") => CheckState::Up,
        _ => CheckState::Down,
    };

    let last_checked = record
        .get("lastChecked")
        .and_then(Value::as_f64)
        .filter(|millis| *millis > 0.0)
        .map(|millis| millis as i64);

    let extra: Map<String, Value> = record
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Check {
        id,
        user_phone,
        protocol,
        url,
        method,
        success_codes,
        timeout_seconds,
        state,
        last_checked,
        extra,
    })
}

fn trimmed_with_length(value: Option<&Value>, length: usize) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    (trimmed.chars().count() == length).then(|| trimmed.to_string())
}

/// Accepts `3` and `3.0` alike, rejects `2.5` and negatives
fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let n = value.as_f64()?;
    (n.fract() == 0.0 && n >= 0.0).then_some(n as u64)
}
