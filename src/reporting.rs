// Reporting and output for authdiff
// All console and file side effects live here; no other component prints.

use crate::error::ScanError;
use crate::models::{Classification, Method, RunRecord};
use crate::runner::RecordSink;
use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

/// Aggregate view of a finished run, computed over anonymous outcomes only.
#[derive(Debug, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub data_returned: usize,
    pub blocked: usize,
    pub leaking: Vec<(Method, String)>,
}

impl Summary {
    pub fn of(records: &[RunRecord]) -> Self {
        let data_returned = records
            .iter()
            .filter(|r| r.anon.classification == Classification::DataReturned)
            .count();
        let blocked = records
            .iter()
            .filter(|r| r.anon.classification == Classification::Blocked)
            .count();
        let leaking = records
            .iter()
            .filter(|r| r.leaked)
            .map(|r| (r.endpoint.method, r.endpoint.path.clone()))
            .collect();
        Self {
            total: records.len(),
            data_returned,
            blocked,
            leaking,
        }
    }

    /// A run is clean only when no anonymous probe returned data.
    pub fn has_leaks(&self) -> bool {
        self.data_returned > 0
    }
}

/// Live table renderer: one row per record as it arrives.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn print_header(&self, target_count: usize, base_url: &str) {
        println!("Testing {} endpoints against {}", target_count, base_url);
        println!("{:<7} {:<50} {:<15} {:<15}", "METHOD", "PATH", "ANON", "AUTH");
        println!("{}", "-".repeat(90));
    }

    pub fn print_summary(&self, summary: &Summary) {
        println!("{}", "=".repeat(90));
        println!(
            "ANON DATA_RETURNED: {}/{}  |  ANON BLOCKED: {}/{}",
            summary.data_returned, summary.total, summary.blocked, summary.total
        );
        if summary.has_leaks() {
            println!(
                "\n[!!] {} endpoint(s) return data WITHOUT authentication:",
                summary.data_returned
            );
            for (method, path) in &summary.leaking {
                println!("     {} {}", method, path);
            }
        }
    }
}

impl RecordSink for ConsoleReporter {
    fn record(&mut self, record: &RunRecord) {
        let auth_class = record
            .auth
            .as_ref()
            .map(|o| o.classification.to_string())
            .unwrap_or_else(|| "-".to_string());
        let marker = if record.leaked { " !!" } else { "" };
        println!(
            "{:<7} {:<50} {:<15} {:<15}{}",
            record.endpoint.method.to_string(),
            record.endpoint.path,
            record.anon.classification.to_string(),
            auth_class,
            marker
        );
    }
}

#[derive(Serialize)]
struct PersistedReport<'a> {
    generated_at: String,
    records: &'a [RunRecord],
}

/// Persist the full ordered record sequence as a JSON document.
pub fn save_json(path: &str, records: &[RunRecord]) -> Result<(), ScanError> {
    let report = PersistedReport {
        generated_at: Local::now().to_rfc3339(),
        records,
    };
    let mut file = File::create(path)?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Escape CSV field to prevent formula injection attacks.
/// Cells starting with =, +, -, @, or tab are prefixed with a single quote.
fn escape_csv_field(field: &str) -> String {
    let Some(first_char) = field.chars().next() else {
        return String::new();
    };
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    if needs_escaping || field.contains(',') || field.contains('"') || field.contains('\n') {
        if needs_escaping {
            format!("\"'{}\"", field.replace('"', "\"\""))
        } else {
            format!("\"{}\"", field.replace('"', "\"\""))
        }
    } else {
        field.to_string()
    }
}

/// Export the run as a timestamped CSV file; returns the filename written.
pub fn export_csv(records: &[RunRecord]) -> Result<String, ScanError> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("authdiff_report_{}.csv", timestamp);
    let mut file = File::create(&filename)?;

    writeln!(file, "Method,Path,AnonStatus,AnonClass,AuthStatus,AuthClass,Leaked")?;
    for record in records {
        let (auth_status, auth_class) = match &record.auth {
            Some(o) => (
                o.status.map(|s| s.to_string()).unwrap_or_default(),
                o.classification.to_string(),
            ),
            None => (String::new(), String::new()),
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            escape_csv_field(&record.endpoint.method.to_string()),
            escape_csv_field(&record.endpoint.path),
            record.anon.status.map(|s| s.to_string()).unwrap_or_default(),
            record.anon.classification,
            auth_status,
            auth_class,
            record.leaked
        )?;
    }

    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, ProbeOutcome};

    fn record(path: &str, status: u16, body: &str) -> RunRecord {
        RunRecord::new(
            Endpoint::get(path),
            ProbeOutcome::from_response(status, body),
            None,
        )
    }

    #[test]
    fn summary_counts_anon_outcomes() {
        let records = vec![
            record("/a", 200, r#"{"ok":1}"#),
            record("/b", 401, ""),
            record("/c", 403, ""),
            record("/d", 404, ""),
        ];
        let summary = Summary::of(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.data_returned, 1);
        assert_eq!(summary.blocked, 2);
        assert_eq!(summary.leaking, vec![(Method::GET, "/a".to_string())]);
        assert!(summary.has_leaks());
    }

    #[test]
    fn clean_run_has_no_leaks() {
        let records = vec![record("/a", 401, ""), record("/b", 404, "")];
        assert!(!Summary::of(&records).has_leaks());
    }

    #[test]
    fn csv_escaping_blocks_formula_injection() {
        assert_eq!(escape_csv_field("=cmd()"), "\"'=cmd()\"");
        assert_eq!(escape_csv_field("+SUM(A1)"), "\"'+SUM(A1)\"");
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("has,comma"), "\"has,comma\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field(""), "");
    }
}
