// Target-list parsing for authdiff
//
// A target list is a JSON array. Each element is either a bare path string
// (probed as GET with no body) or an object {method, path, body} where
// method defaults to GET and body is optional.

use crate::error::ScanError;
use crate::models::{Endpoint, Method};
use serde_json::Value;

/// Outcome of parsing one target list: the usable endpoints in input order,
/// plus one warning per element that had to be skipped. A malformed element
/// never aborts the rest of the list.
#[derive(Debug)]
pub struct ParsedTargets {
    pub endpoints: Vec<Endpoint>,
    pub warnings: Vec<String>,
}

/// Read and parse a target list file. Unreadable or non-array input is a
/// pre-run configuration failure.
pub fn load_target_list(path: &str) -> Result<ParsedTargets, ScanError> {
    let data = std::fs::read_to_string(path).map_err(|e| ScanError::TargetList {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let json: Value = serde_json::from_str(&data).map_err(|e| ScanError::TargetList {
        path: path.to_string(),
        reason: format!("invalid JSON: {}", e),
    })?;
    parse_target_list(&json).map_err(|reason| ScanError::TargetList {
        path: path.to_string(),
        reason,
    })
}

pub fn parse_target_list(json: &Value) -> Result<ParsedTargets, String> {
    let items = json
        .as_array()
        .ok_or_else(|| "target list must be a JSON array".to_string())?;

    let mut endpoints = Vec::new();
    let mut warnings = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        match parse_target(item) {
            Ok(ep) => endpoints.push(ep),
            Err(reason) => warnings.push(format!("skipping target #{}: {}", idx + 1, reason)),
        }
    }

    Ok(ParsedTargets { endpoints, warnings })
}

fn parse_target(item: &Value) -> Result<Endpoint, String> {
    match item {
        Value::String(path) => Ok(Endpoint::get(path.clone())),
        Value::Object(obj) => {
            let path = obj
                .get("path")
                .and_then(|p| p.as_str())
                .ok_or_else(|| "missing required \"path\" field".to_string())?;
            let method = match obj.get("method") {
                None => Method::GET,
                Some(m) => {
                    let name = m.as_str().ok_or_else(|| "\"method\" must be a string".to_string())?;
                    Method::parse(name).ok_or_else(|| format!("unknown method {:?}", name))?
                }
            };
            Ok(Endpoint::new(method, path.to_string(), obj.get("body").cloned()))
        }
        other => Err(format!("expected a path string or object, got {}", other)),
    }
}
