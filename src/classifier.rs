// Response classifier for authdiff
// Pure ordered decision table: status code first, body inspection second.

use crate::models::Classification;
use serde_json::Value;

/// Keywords that mark a GraphQL-style error payload as an authorization
/// failure. Matched case-insensitively against error messages and codes.
const BLOCKED_KEYWORDS: &[&str] = &["unauthorized", "forbidden", "auth", "permission", "login"];

/// Classify one HTTP response. Pure and total: any body shape, including
/// unparseable bytes, lands on a branch rather than an error.
///
/// Precedence is strict top-to-bottom. Transport-level status codes
/// (401/403/404/429/5xx) are authoritative; body inspection only matters for
/// endpoints that mask authorization failures behind HTTP 200, so a 200 must
/// never short-circuit past an embedded "forbidden" error.
pub fn classify(status: u16, body: &str) -> Classification {
    match status {
        401 | 403 => return Classification::Blocked,
        404 => return Classification::NotFound,
        429 => return Classification::RateLimited,
        s if s >= 500 => return Classification::ServerError,
        _ => {}
    }

    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => {
            return if status == 200 {
                Classification::DataReturned
            } else {
                Classification::ProtocolError
            };
        }
    };

    if let Some(errors) = parsed.as_object().and_then(|obj| obj.get("errors")) {
        if errors_indicate_blocked(errors) {
            return Classification::Blocked;
        }
        return if parsed.get("data").map_or(false, is_truthy) {
            Classification::DataReturned
        } else {
            Classification::ProtocolError
        };
    }

    if is_truthy(&parsed) && status == 200 {
        Classification::DataReturned
    } else {
        Classification::ProtocolError
    }
}

/// Scan each error's message and nested `extensions.code` for the blocked
/// keyword set.
fn errors_indicate_blocked(errors: &Value) -> bool {
    let Some(list) = errors.as_array() else {
        return false;
    };
    list.iter().any(|e| {
        let message = field_text(e.get("message"));
        let code = field_text(e.get("extensions").and_then(|ext| ext.get("code")));
        BLOCKED_KEYWORDS
            .iter()
            .any(|kw| message.contains(kw) || code.contains(kw))
    })
}

/// Lowercased text of a field, coercing non-string values the way the
/// messages actually appear in the wild (numeric codes, nested objects).
fn field_text(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Truthiness of a JSON value: null, false, 0, "", [] and {} are all empty.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
