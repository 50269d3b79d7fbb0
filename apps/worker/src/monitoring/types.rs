use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reachability state of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    /// Checks start out down until their first evaluation says otherwise
    #[default]
    Down,
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// Scheme used to reach the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method of the probe request, stored lowercase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl CheckMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "get" => Some(CheckMethod::Get),
            "post" => Some(CheckMethod::Post),
            "put" => Some(CheckMethod::Put),
            "delete" => Some(CheckMethod::Delete),
            _ => None,
        }
    }

    /// Upper-cased method name as sent on the wire
    pub fn as_upper(&self) -> &'static str {
        match self {
            CheckMethod::Get => "GET",
            CheckMethod::Post => "POST",
            CheckMethod::Put => "PUT",
            CheckMethod::Delete => "DELETE",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            CheckMethod::Get => reqwest::Method::GET,
            CheckMethod::Post => reqwest::Method::POST,
            CheckMethod::Put => reqwest::Method::PUT,
            CheckMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A validated check record, ready to be probed.
///
/// Only [`crate::monitoring::validation::validate_check`] builds these from
/// stored data, so every field here already passed its shape and range rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    pub user_phone: String,
    pub protocol: Protocol,
    pub url: String,
    pub method: CheckMethod,
    /// Stored exactly as the user gave them; only integer entries can match
    pub success_codes: Vec<Value>,
    pub timeout_seconds: u64,
    pub state: CheckState,
    /// Milliseconds since the Unix epoch, `None` until the first evaluation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
    /// Fields the worker does not interpret, written back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Check {
    /// `protocol://url`, the target the probe is sent to
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    /// Whether `code` is one of the configured healthy status codes
    pub fn accepts(&self, code: u16) -> bool {
        self.success_codes.iter().any(|value| value.as_u64() == Some(u64::from(code)))
    }

    /// Whether the worker has evaluated this check before
    pub fn has_baseline(&self) -> bool {
        self.last_checked.is_some()
    }
}

/// Why a probe did not produce a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "classification", rename_all = "kebab-case")]
pub enum ProbeError {
    NetworkError { detail: String },
    Timeout,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::NetworkError { detail } => write!(f, "network error: {detail}"),
            ProbeError::Timeout => write!(f, "timeout"),
        }
    }
}

/// Terminal result of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeOutcome {
    Response {
        #[serde(rename = "responseCode")]
        response_code: u16,
    },
    Failed {
        error: ProbeError,
    },
}

impl ProbeOutcome {
    pub fn response(code: u16) -> Self {
        ProbeOutcome::Response { response_code: code }
    }

    pub fn network_error(detail: impl Into<String>) -> Self {
        ProbeOutcome::Failed { error: ProbeError::NetworkError { detail: detail.into() } }
    }

    pub fn timeout() -> Self {
        ProbeOutcome::Failed { error: ProbeError::Timeout }
    }

    pub fn response_code(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Response { response_code } => Some(*response_code),
            ProbeOutcome::Failed { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeOutcome::Failed { error: ProbeError::Timeout })
    }
}

/// One line of a check's live log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckLogEntry {
    pub check: Check,
    pub outcome: ProbeOutcome,
    pub state: CheckState,
    pub alert: bool,
    pub time: i64,
}
