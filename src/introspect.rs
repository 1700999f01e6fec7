// GraphQL introspection client for authdiff
//
// Dumps the schema a GraphQL endpoint exposes to a given credential context,
// summarizes its operations, flags names that deserve an auth check, and
// converts query operations into probe targets for the differential engine.

use crate::error::ScanError;
use crate::models::{CredentialContext, Endpoint, Method};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Full introspection query, including deprecated fields and nested type refs.
pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types {
      kind
      name
      fields(includeDeprecated: true) {
        name
        args { name type { ...TypeRef } }
        type { ...TypeRef }
      }
      inputFields { name type { ...TypeRef } }
      enumValues(includeDeprecated: true) { name }
    }
  }
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType { kind name }
    }
  }
}
"#;

/// Shallow fallback for servers that reject deep introspection.
pub const SIMPLE_QUERY: &str =
    "{ __schema { queryType { name } mutationType { name } types { name kind } } }";

/// Operation names containing any of these demand an auth check.
const SENSITIVE_KEYWORDS: &[&str] = &[
    "admin", "delete", "internal", "accounting", "publish", "create_user", "remove", "config",
    "secret", "password", "credential",
];

/// One query or mutation exposed by the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaOperation {
    pub name: String,
    pub args: Vec<String>,
}

/// Parsed view of an introspection response.
#[derive(Debug, Default)]
pub struct SchemaSummary {
    pub user_type_count: usize,
    pub queries: Vec<SchemaOperation>,
    pub mutations: Vec<SchemaOperation>,
}

impl SchemaSummary {
    /// Operation names (queries and mutations) matching the sensitive list.
    pub fn sensitive_operations(&self) -> Vec<String> {
        self.queries
            .iter()
            .chain(self.mutations.iter())
            .filter(|op| {
                let lower = op.name.to_lowercase();
                SENSITIVE_KEYWORDS.iter().any(|kw| lower.contains(kw))
            })
            .map(|op| op.name.clone())
            .collect()
    }

    pub fn render(&self) -> String {
        let mut lines = vec![format!(
            "Types: {} | Queries: {} | Mutations: {}",
            self.user_type_count,
            self.queries.len(),
            self.mutations.len()
        )];

        if !self.queries.is_empty() {
            lines.push(String::new());
            lines.push("=== QUERIES ===".to_string());
            for op in sorted_by_name(&self.queries) {
                lines.push(format!("  {}({})", op.name, op.args.join(", ")));
            }
        }
        if !self.mutations.is_empty() {
            lines.push(String::new());
            lines.push("=== MUTATIONS ===".to_string());
            for op in sorted_by_name(&self.mutations) {
                lines.push(format!("  {}({})", op.name, op.args.join(", ")));
            }
        }

        let sensitive = self.sensitive_operations();
        if !sensitive.is_empty() {
            lines.push(String::new());
            lines.push("=== SUSPICIOUS OPERATIONS (check auth!) ===".to_string());
            for name in sensitive {
                lines.push(format!("  !! {}", name));
            }
        }

        lines.join("\n")
    }
}

fn sorted_by_name(ops: &[SchemaOperation]) -> Vec<&SchemaOperation> {
    let mut sorted: Vec<&SchemaOperation> = ops.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

/// Parse an introspection response into a summary. Returns None when the
/// response carries no usable `data.__schema` (introspection blocked).
pub fn parse_schema(response: &Value) -> Option<SchemaSummary> {
    let schema = response.get("data")?.get("__schema")?;
    if !schema.is_object() {
        return None;
    }
    let types = schema.get("types").and_then(|t| t.as_array());

    let query_type = type_name(schema.get("queryType")).unwrap_or_else(|| "Query".to_string());
    let mutation_type =
        type_name(schema.get("mutationType")).unwrap_or_else(|| "Mutation".to_string());

    let mut summary = SchemaSummary::default();
    for t in types.into_iter().flatten() {
        let Some(name) = t.get("name").and_then(|n| n.as_str()) else {
            continue;
        };
        if !name.starts_with("__") {
            summary.user_type_count += 1;
        }
        if name == query_type {
            summary.queries = parse_fields(t.get("fields"));
        } else if name == mutation_type {
            summary.mutations = parse_fields(t.get("fields"));
        }
    }
    Some(summary)
}

fn type_name(value: Option<&Value>) -> Option<String> {
    value?
        .get("name")
        .and_then(|n| n.as_str())
        .map(|s| s.to_string())
}

fn parse_fields(fields: Option<&Value>) -> Vec<SchemaOperation> {
    fields
        .and_then(|f| f.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|f| {
                    let name = f.get("name")?.as_str()?.to_string();
                    let args = f
                        .get("args")
                        .and_then(|a| a.as_array())
                        .map(|list| {
                            list.iter()
                                .filter_map(|a| a.get("name")?.as_str().map(|s| s.to_string()))
                                .collect()
                        })
                        .unwrap_or_default();
                    Some(SchemaOperation { name, args })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Convert query operations into POST targets carrying a minimal GraphQL
/// body, ready for the differential engine. Mutations are flagged by the
/// summary but never auto-probed: firing them anonymously has side effects.
pub fn operations_as_targets(path: &str, queries: &[SchemaOperation]) -> Vec<Endpoint> {
    queries
        .iter()
        .map(|op| {
            Endpoint::new(
                Method::POST,
                path.to_string(),
                Some(serde_json::json!({ "query": format!("{{ {} }}", op.name) })),
            )
        })
        .collect()
}

/// Issues the introspection queries over HTTP.
pub struct IntrospectionClient {
    client: Client,
}

impl IntrospectionClient {
    pub fn new(timeout: Duration) -> Result<Self, ScanError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// POST the full introspection query; when the server rejects deep
    /// introspection (errors and no schema), retry with the shallow form.
    pub async fn introspect(
        &self,
        url: &str,
        ctx: &CredentialContext,
    ) -> Result<Value, ScanError> {
        let first = self.post_query(url, ctx, INTROSPECTION_QUERY).await?;
        let no_schema = first
            .get("data")
            .and_then(|d| d.get("__schema"))
            .map_or(true, |s| !s.is_object());
        let blocked = first.get("errors").is_some() && no_schema;
        if blocked {
            return self.post_query(url, ctx, SIMPLE_QUERY).await;
        }
        Ok(first)
    }

    async fn post_query(
        &self,
        url: &str,
        ctx: &CredentialContext,
        query: &str,
    ) -> Result<Value, ScanError> {
        let req = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "query": query }));
        let resp = ctx.apply(req).send().await?;
        Ok(resp.json().await?)
    }
}
