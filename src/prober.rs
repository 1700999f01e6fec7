// HTTP prober for authdiff
// One request per (endpoint, credential context); transport failures are
// absorbed here so the runner always advances to the next target.

use crate::error::ScanError;
use crate::models::{CredentialContext, Endpoint, Method, ProbeOutcome};
use reqwest::Client;
use std::time::Duration;

/// Seam between the differential runner and the network. The runner only
/// needs something that turns (endpoint, context) into an outcome.
pub trait Probe {
    async fn probe(&self, endpoint: &Endpoint, ctx: &CredentialContext) -> ProbeOutcome;
}

/// Real prober backed by a reqwest client with a bounded per-request timeout.
/// The connection pool is reused across probes for liveness only; it carries
/// no ordering semantics.
pub struct HttpProber {
    client: Client,
    base_url: String,
}

impl HttpProber {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ScanError> {
        if base_url.trim().is_empty() {
            return Err(ScanError::Config("base URL must not be empty".to_string()));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ScanError::Config(format!(
                "base URL must start with http:// or https://, got {}",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ScanError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path)
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::GET => reqwest::Method::GET,
        Method::POST => reqwest::Method::POST,
        Method::PUT => reqwest::Method::PUT,
        Method::DELETE => reqwest::Method::DELETE,
        Method::PATCH => reqwest::Method::PATCH,
        Method::OPTIONS => reqwest::Method::OPTIONS,
        Method::HEAD => reqwest::Method::HEAD,
    }
}

impl Probe for HttpProber {
    /// Issue one request. Never returns an error: DNS, TLS, timeout and
    /// reset all map to a CONNECTION_ERROR outcome carrying the failure text.
    async fn probe(&self, endpoint: &Endpoint, ctx: &CredentialContext) -> ProbeOutcome {
        let url = self.url_for(endpoint);
        let mut req = self
            .client
            .request(to_reqwest_method(endpoint.method), &url)
            .header("Content-Type", "application/json");
        req = ctx.apply(req);

        // Body-carrying methods always send JSON, an empty object when the
        // target declares none. GET and HEAD never carry a body.
        if !matches!(endpoint.method, Method::GET | Method::HEAD) {
            let body = endpoint.body.clone().unwrap_or_else(|| serde_json::json!({}));
            req = req.json(&body);
        }

        match req.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match resp.text().await {
                    Ok(body) => ProbeOutcome::from_response(status, &body),
                    Err(e) => ProbeOutcome::transport_failure(&e.to_string()),
                }
            }
            Err(e) => ProbeOutcome::transport_failure(&e.to_string()),
        }
    }
}
