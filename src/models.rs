// Core data models for authdiff

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Maximum number of characters of a response body retained for audit output.
pub const BODY_PREVIEW_LIMIT: usize = 200;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
    HEAD,
}

impl Method {
    /// Parse a method name as it appears in a target list. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "PATCH" => Some(Method::PATCH),
            "OPTIONS" => Some(Method::OPTIONS),
            "HEAD" => Some(Method::HEAD),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
            Method::OPTIONS => write!(f, "OPTIONS"),
            Method::HEAD => write!(f, "HEAD"),
        }
    }
}

/// One probe target: a (method, path, body) triple. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Endpoint {
    pub fn new(method: Method, path: String, body: Option<serde_json::Value>) -> Self {
        Self { method, path, body }
    }

    /// A bare path target defaults to GET with no body.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path.into(), None)
    }

    /// Identity key: (method, path, hash of the serialized body).
    /// Two targets sharing a method and path but carrying different bodies
    /// are distinct.
    pub fn identity(&self) -> (Method, &str, u64) {
        let mut hasher = DefaultHasher::new();
        if let Some(body) = &self.body {
            body.to_string().hash(&mut hasher);
        }
        (self.method, &self.path, hasher.finish())
    }
}

/// The set of headers attached to one probe: optional bearer token plus
/// extra headers. Read-only shared state across the whole run; extra headers
/// apply to the anonymous and authenticated contexts alike.
#[derive(Debug, Clone, Default)]
pub struct CredentialContext {
    pub token: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

impl CredentialContext {
    pub fn anonymous(extra_headers: Vec<(String, String)>) -> Self {
        Self { token: None, extra_headers }
    }

    pub fn bearer(token: String, extra_headers: Vec<(String, String)>) -> Self {
        Self { token: Some(token), extra_headers }
    }

    /// Attach this context's credentials to a request.
    pub fn apply(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        for (k, v) in &self.extra_headers {
            req = req.header(k.as_str(), v.as_str());
        }
        req
    }
}

/// Closed verdict taxonomy for one HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Blocked,
    NotFound,
    RateLimited,
    ServerError,
    DataReturned,
    ProtocolError,
    ConnectionError,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Blocked => "BLOCKED",
            Classification::NotFound => "NOT_FOUND",
            Classification::RateLimited => "RATE_LIMITED",
            Classification::ServerError => "SERVER_ERROR",
            Classification::DataReturned => "DATA_RETURNED",
            Classification::ProtocolError => "PROTOCOL_ERROR",
            Classification::ConnectionError => "CONNECTION_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Result of probing one endpoint under one credential context.
/// `status` is absent when the request never produced an HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub status: Option<u16>,
    pub classification: Classification,
    pub body_preview: String,
}

impl ProbeOutcome {
    pub fn from_response(status: u16, body: &str) -> Self {
        Self {
            status: Some(status),
            classification: crate::classifier::classify(status, body),
            body_preview: truncate_preview(body),
        }
    }

    /// Transport-level failure: DNS, TLS, timeout, connection reset.
    pub fn transport_failure(description: &str) -> Self {
        Self {
            status: None,
            classification: Classification::ConnectionError,
            body_preview: truncate_preview(description),
        }
    }
}

fn truncate_preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_LIMIT).collect()
}

/// One line of the run: an endpoint, its anonymous outcome, its authenticated
/// outcome (present iff a credential was supplied), and the leak verdict.
/// Never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub endpoint: Endpoint,
    pub anon: ProbeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<ProbeOutcome>,
    pub leaked: bool,
}

impl RunRecord {
    /// The leak verdict depends only on the anonymous outcome: the point of
    /// the scan is whether the unauthenticated path returns data at all.
    pub fn new(endpoint: Endpoint, anon: ProbeOutcome, auth: Option<ProbeOutcome>) -> Self {
        let leaked = anon.classification == Classification::DataReturned;
        Self { endpoint, anon, auth, leaked }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_hash_distinguishes_targets() {
        let a = Endpoint::new(
            Method::POST,
            "/graphql".to_string(),
            Some(serde_json::json!({"query": "{ viewer { id } }"})),
        );
        let b = Endpoint::new(
            Method::POST,
            "/graphql".to_string(),
            Some(serde_json::json!({"query": "{ users { email } }"})),
        );
        assert_ne!(a.identity(), b.identity());
        let a_copy = a.clone();
        assert_eq!(a.identity(), a_copy.identity());
    }

    #[test]
    fn preview_is_bounded() {
        let long = "x".repeat(10_000);
        let outcome = ProbeOutcome::from_response(200, &long);
        assert_eq!(outcome.body_preview.chars().count(), BODY_PREVIEW_LIMIT);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(300);
        let outcome = ProbeOutcome::from_response(200, &body);
        assert_eq!(outcome.body_preview.chars().count(), BODY_PREVIEW_LIMIT);
    }
}
