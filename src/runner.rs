// Differential runner for authdiff
//
// Drives the anon/auth probe pair for every target, strictly in input order
// on a single logical task. Pacing is the only scheduling knob: the delay
// keeps the tool's own request rate from inducing RATE_LIMITED verdicts.

use crate::models::{CredentialContext, Endpoint, RunRecord};
use crate::prober::Probe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Streaming consumer of run records. The runner emits each record as soon
/// as its target finishes, not buffered until the run ends.
pub trait RecordSink {
    fn record(&mut self, record: &RunRecord);
}

/// Sink that discards the stream, for callers that only want the returned Vec.
pub struct NullSink;

impl RecordSink for NullSink {
    fn record(&mut self, _record: &RunRecord) {}
}

pub struct DifferentialRunner<P: Probe> {
    prober: P,
    delay: Duration,
    cancel: Arc<AtomicBool>,
}

impl<P: Probe> DifferentialRunner<P> {
    pub fn new(prober: P, delay: Duration) -> Self {
        Self {
            prober,
            delay,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked at each target boundary. Once set, no further targets
    /// are probed; records already emitted stand as-is. A target contributes
    /// either a full record or nothing.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Probe every target anonymously, then (when a credential was supplied)
    /// authenticated, and emit one record per target in input order.
    ///
    /// The run is finite and always completes: a CONNECTION_ERROR or
    /// SERVER_ERROR on one target never aborts the loop.
    pub async fn run(
        &self,
        targets: &[Endpoint],
        anon: &CredentialContext,
        auth: Option<&CredentialContext>,
        sink: &mut dyn RecordSink,
    ) -> Vec<RunRecord> {
        let mut records = Vec::with_capacity(targets.len());

        for endpoint in targets {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }

            let anon_outcome = self.prober.probe(endpoint, anon).await;
            self.pace().await;

            let auth_outcome = match auth {
                Some(ctx) => {
                    let outcome = self.prober.probe(endpoint, ctx).await;
                    self.pace().await;
                    Some(outcome)
                }
                None => None,
            };

            let record = RunRecord::new(endpoint.clone(), anon_outcome, auth_outcome);
            sink.record(&record);
            records.push(record);
        }

        records
    }

    async fn pace(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, Method, ProbeOutcome};
    use std::sync::Mutex;

    /// Scripted prober: replays canned outcomes per path and logs the order
    /// in which probes were issued.
    struct ScriptedProber {
        log: Mutex<Vec<(String, bool)>>,
        outcomes: Vec<(String, u16, String)>,
    }

    impl ScriptedProber {
        fn new(outcomes: &[(&str, u16, &str)]) -> Self {
            Self {
                log: Mutex::new(Vec::new()),
                outcomes: outcomes
                    .iter()
                    .map(|(p, s, b)| (p.to_string(), *s, b.to_string()))
                    .collect(),
            }
        }
    }

    impl Probe for ScriptedProber {
        async fn probe(&self, endpoint: &Endpoint, ctx: &CredentialContext) -> ProbeOutcome {
            self.log
                .lock()
                .unwrap()
                .push((endpoint.path.clone(), ctx.token.is_some()));
            match self.outcomes.iter().find(|(p, _, _)| *p == endpoint.path) {
                Some((_, status, body)) => ProbeOutcome::from_response(*status, body),
                None => ProbeOutcome::transport_failure("connection timed out"),
            }
        }
    }

    fn runner(prober: ScriptedProber) -> DifferentialRunner<ScriptedProber> {
        DifferentialRunner::new(prober, Duration::ZERO)
    }

    #[tokio::test]
    async fn records_preserve_input_order() {
        let prober = ScriptedProber::new(&[
            ("/c", 200, r#"{"v":3}"#),
            ("/a", 200, r#"{"v":1}"#),
            ("/b", 200, r#"{"v":2}"#),
        ]);
        let targets = vec![Endpoint::get("/c"), Endpoint::get("/a"), Endpoint::get("/b")];
        let records = runner(prober)
            .run(&targets, &CredentialContext::default(), None, &mut NullSink)
            .await;
        let paths: Vec<&str> = records.iter().map(|r| r.endpoint.path.as_str()).collect();
        assert_eq!(paths, vec!["/c", "/a", "/b"]);
    }

    #[tokio::test]
    async fn anon_probe_precedes_auth_probe_per_target() {
        let prober = ScriptedProber::new(&[("/x", 200, r#"{"v":1}"#), ("/y", 403, "denied")]);
        let targets = vec![Endpoint::get("/x"), Endpoint::get("/y")];
        let auth = CredentialContext::bearer("tok".to_string(), vec![]);
        let r = runner(prober);
        let records = r
            .run(&targets, &CredentialContext::default(), Some(&auth), &mut NullSink)
            .await;
        assert_eq!(records.len(), 2);
        let log = r.prober.log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                ("/x".to_string(), false),
                ("/x".to_string(), true),
                ("/y".to_string(), false),
                ("/y".to_string(), true),
            ]
        );
    }

    #[tokio::test]
    async fn leak_verdict_follows_anon_outcome_only() {
        // Scenario A: anon 200 with data leaks.
        // Scenario B: anon GraphQL Forbidden does not.
        let prober = ScriptedProber::new(&[
            ("/api/v1/health", 200, r#"{"status":"ok"}"#),
            ("/graphql", 200, r#"{"errors":[{"message":"Forbidden"}]}"#),
        ]);
        let targets = vec![
            Endpoint::get("/api/v1/health"),
            Endpoint::new(
                Method::POST,
                "/graphql".to_string(),
                Some(serde_json::json!({"query": "{ viewer { id } }"})),
            ),
        ];
        let records = runner(prober)
            .run(&targets, &CredentialContext::default(), None, &mut NullSink)
            .await;
        assert_eq!(records[0].anon.classification, Classification::DataReturned);
        assert!(records[0].leaked);
        assert_eq!(records[1].anon.classification, Classification::Blocked);
        assert!(!records[1].leaked);
    }

    #[tokio::test]
    async fn connection_error_does_not_abort_the_run() {
        // Scenario C: first target times out, second still gets probed.
        let prober = ScriptedProber::new(&[("/after", 200, r#"{"ok":1}"#)]);
        let targets = vec![Endpoint::get("/api/v1/users/me"), Endpoint::get("/after")];
        let records = runner(prober)
            .run(&targets, &CredentialContext::default(), None, &mut NullSink)
            .await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].anon.status, None);
        assert_eq!(records[0].anon.classification, Classification::ConnectionError);
        assert!(!records[0].leaked);
        assert_eq!(records[1].anon.classification, Classification::DataReturned);
    }

    #[tokio::test]
    async fn no_credential_means_no_auth_outcome() {
        // Scenario D: without a token every record has auth = None.
        let prober = ScriptedProber::new(&[
            ("/a", 200, r#"{"v":1}"#),
            ("/b", 404, ""),
            ("/c", 403, ""),
        ]);
        let targets = vec![Endpoint::get("/a"), Endpoint::get("/b"), Endpoint::get("/c")];
        let records = runner(prober)
            .run(&targets, &CredentialContext::default(), None, &mut NullSink)
            .await;
        assert!(records.iter().all(|r| r.auth.is_none()));
    }

    #[tokio::test]
    async fn run_is_idempotent_against_static_target() {
        let targets = vec![Endpoint::get("/a"), Endpoint::get("/b")];
        let script: &[(&str, u16, &str)] = &[("/a", 200, r#"{"v":1}"#), ("/b", 401, "")];
        let first = runner(ScriptedProber::new(script))
            .run(&targets, &CredentialContext::default(), None, &mut NullSink)
            .await;
        let second = runner(ScriptedProber::new(script))
            .run(&targets, &CredentialContext::default(), None, &mut NullSink)
            .await;
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.anon.classification, b.anon.classification);
            assert_eq!(a.leaked, b.leaked);
        }
    }

    #[tokio::test]
    async fn cancellation_stops_at_target_boundary() {
        struct CancellingSink {
            flag: Arc<AtomicBool>,
        }
        impl RecordSink for CancellingSink {
            fn record(&mut self, _record: &RunRecord) {
                self.flag.store(true, Ordering::Relaxed);
            }
        }

        let prober = ScriptedProber::new(&[
            ("/a", 200, r#"{"v":1}"#),
            ("/b", 200, r#"{"v":2}"#),
            ("/c", 200, r#"{"v":3}"#),
        ]);
        let targets = vec![Endpoint::get("/a"), Endpoint::get("/b"), Endpoint::get("/c")];
        let r = runner(prober);
        let mut sink = CancellingSink { flag: r.cancel_flag() };
        let records = r
            .run(&targets, &CredentialContext::default(), None, &mut sink)
            .await;
        // Cancel lands after the first full record; nothing partial follows.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint.path, "/a");
    }

    #[tokio::test]
    async fn records_stream_to_the_sink_as_they_complete() {
        struct CollectingSink(Vec<String>);
        impl RecordSink for CollectingSink {
            fn record(&mut self, record: &RunRecord) {
                self.0.push(record.endpoint.path.clone());
            }
        }

        let prober = ScriptedProber::new(&[("/a", 200, r#"{"v":1}"#), ("/b", 404, "")]);
        let targets = vec![Endpoint::get("/a"), Endpoint::get("/b")];
        let mut sink = CollectingSink(Vec::new());
        let records = runner(prober)
            .run(&targets, &CredentialContext::default(), None, &mut sink)
            .await;
        assert_eq!(sink.0, vec!["/a", "/b"]);
        assert_eq!(records.len(), sink.0.len());
    }
}
