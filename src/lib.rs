pub mod classifier;
pub mod error;
pub mod extract;
pub mod introspect;
pub mod models;
pub mod prober;
pub mod reporting;
pub mod runner;
pub mod targets;

// Re-export commonly used items
pub use error::ScanError;
pub use models::*;
pub use prober::{HttpProber, Probe};
pub use reporting::{ConsoleReporter, Summary};
pub use runner::{DifferentialRunner, NullSink, RecordSink};
pub use targets::{load_target_list, parse_target_list, ParsedTargets};
