// Printable-string extraction from opaque binary bundles
//
// Bytecode-compiled app bundles (Hermes and friends) are not readable
// source, but their string tables still carry URLs, API paths, auth header
// names and config keys. A linear scan for printable ASCII runs is enough
// to recover endpoint candidates for the differential engine; no
// bytecode-format parsing happens here.

use crate::error::ScanError;
use crate::models::Endpoint;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Default minimum length of a printable run worth keeping.
pub const DEFAULT_MIN_LENGTH: usize = 4;

lazy_static! {
    static ref URL_PATTERN: Regex =
        Regex::new(r"https?://[a-zA-Z0-9._\-/:%@?&=#+]+").unwrap();
    static ref PATH_PATTERN: Regex = Regex::new(r"^/[a-zA-Z0-9_\-/{}:.]+$").unwrap();
    static ref SECRET_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)[A-Za-z0-9_]*(api[_-]?key|secret|token|password|credential)[A-Za-z0-9_]*").unwrap(),
        // Google API key shape
        Regex::new(r"^AIza[0-9A-Za-z_-]{35}$").unwrap(),
        // Long base64 blob
        Regex::new(r"^[A-Za-z0-9+/]{40,}={0,2}$").unwrap(),
        Regex::new(r"(?i)Bearer\s+\S+").unwrap(),
        Regex::new(r"(?i)Authorization").unwrap(),
    ];
}

/// Substrings that mark a string as API-surface-adjacent even when it is not
/// a clean path literal.
const PATH_KEYWORDS: &[&str] = &[
    "api", "auth", "login", "token", "user", "graphql", "query", "mutation", "v1", "v2", "v3",
    "oauth", "callback", "webhook",
];

/// Read a bundle and extract every printable ASCII run of at least `min_length`.
pub fn extract_from_file(path: &str, min_length: usize) -> Result<Vec<String>, ScanError> {
    let data = std::fs::read(path)
        .map_err(|e| ScanError::Config(format!("failed to read bundle {}: {}", path, e)))?;
    Ok(extract_printable_strings(&data, min_length))
}

/// Linear scan of raw bytes for runs of printable ASCII (0x20..=0x7e).
pub fn extract_printable_strings(data: &[u8], min_length: usize) -> Vec<String> {
    let min_length = min_length.max(1);
    let mut strings = Vec::new();
    let mut run_start = None;

    for (i, &byte) in data.iter().enumerate() {
        let printable = (0x20..=0x7e).contains(&byte);
        match (printable, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                if i - start >= min_length {
                    // Run bytes are ASCII by construction.
                    strings.push(String::from_utf8_lossy(&data[start..i]).into_owned());
                }
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        if data.len() - start >= min_length {
            strings.push(String::from_utf8_lossy(&data[start..]).into_owned());
        }
    }

    strings
}

/// Keep the substrings that look like full URLs. Sorted, deduplicated.
pub fn filter_urls(strings: &[String]) -> Vec<String> {
    let mut out = BTreeSet::new();
    for s in strings {
        for m in URL_PATTERN.find_iter(s) {
            out.insert(m.as_str().to_string());
        }
    }
    out.into_iter().collect()
}

/// Keep the strings that look like API paths: clean path literals, or
/// slash-carrying strings mentioning an API-ish keyword. Sorted, deduplicated.
pub fn filter_api_paths(strings: &[String]) -> Vec<String> {
    let mut out = BTreeSet::new();
    for s in strings {
        if PATH_PATTERN.is_match(s) {
            out.insert(s.clone());
        } else if s.contains('/') && s.len() < 200 {
            let lower = s.to_lowercase();
            if PATH_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                out.insert(s.clone());
            }
        }
    }
    out.into_iter().collect()
}

/// Keep the strings that might be secrets or key material. Sorted, deduplicated.
pub fn filter_secrets(strings: &[String]) -> Vec<String> {
    let mut out = BTreeSet::new();
    for s in strings {
        if SECRET_PATTERNS.iter().any(|p| p.is_match(s)) {
            out.insert(s.clone());
        }
    }
    out.into_iter().collect()
}

/// Turn extracted path literals into GET targets for the engine. Only clean
/// path literals qualify; keyword matches are too noisy to probe blindly.
pub fn paths_to_targets(strings: &[String]) -> Vec<Endpoint> {
    strings
        .iter()
        .filter(|s| PATH_PATTERN.is_match(s))
        .map(|s| Endpoint::get(s.clone()))
        .collect()
}
