//! JSON request handling
//!
//! The `serve` command speaks one JSON object per line. Each request names an
//! operation in `op` and may carry a `request_id`, which is echoed back so
//! responses can be matched when requests run concurrently.
//!
//! ```text
//! {"request_id": 1, "op": "create", "type_name": "sentinel_apollo", "planned": {"name": "hospital"}}
//! {"request_id": 1, "result": {"id": "apollo-hospital-1700000000", ...}, "diagnostics": []}
//! ```

use crate::provider::{Provider, ResourceServer};
use crate::resource::{CancelToken, Diagnostic, DiagnosticClass, Diagnostics, ResourceInstance};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request line
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub request_id: Option<Value>,
    #[serde(flatten)]
    pub operation: Operation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Metadata,
    /// Provider schema, or a resource schema when `type_name` is set
    Schema {
        #[serde(default)]
        type_name: Option<String>,
    },
    /// Provider block values; non-empty ones win over the startup defaults
    Configure {
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        api_key: Option<String>,
    },
    Plan {
        type_name: String,
        #[serde(default)]
        prior: Option<Value>,
        planned: Value,
    },
    Create {
        type_name: String,
        planned: Value,
    },
    Read {
        type_name: String,
        state: Value,
    },
    Update {
        type_name: String,
        prior: Value,
        planned: Value,
    },
    Delete {
        type_name: String,
        state: Value,
    },
    ImportState {
        type_name: String,
        id: String,
    },
}

/// One response line
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    pub result: Value,
    pub diagnostics: Diagnostics,
}

impl Response {
    fn new(request_id: Option<Value>, result: Value, diagnostics: Diagnostics) -> Self {
        Self {
            request_id,
            result,
            diagnostics,
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

/// Parse and handle one request line; malformed input becomes an error response
pub async fn handle_line(provider: &Provider, line: &str, cancel: &CancelToken) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(provider, request, cancel).await,
        Err(e) => {
            tracing::warn!("Malformed request: {}", e);
            // Salvage the request_id so the caller can still match the reply
            let request_id = serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|v| v.get("request_id").cloned());
            Response::new(
                request_id,
                Value::Null,
                Diagnostic::error(
                    DiagnosticClass::Validation,
                    "Malformed request",
                    e.to_string(),
                )
                .into(),
            )
        }
    }
}

/// Dispatch one request to the provider
pub async fn handle(provider: &Provider, request: Request, cancel: &CancelToken) -> Response {
    let Request {
        request_id,
        operation,
    } = request;

    let (result, diagnostics) = match operation {
        Operation::Metadata => (to_value(&provider.metadata()), Diagnostics::new()),

        Operation::Schema { type_name: None } => (to_value(&provider.schema()), Diagnostics::new()),
        Operation::Schema {
            type_name: Some(type_name),
        } => match resource(provider, &type_name) {
            Ok(server) => (to_value(server.schema()), Diagnostics::new()),
            Err(diags) => (Value::Null, diags),
        },

        Operation::Configure { endpoint, api_key } => {
            let config = provider.defaults().clone().with_overrides(endpoint, api_key);
            (Value::Null, provider.configure(&config))
        }

        Operation::Plan {
            type_name,
            prior,
            planned,
        } => with_resource(provider, &type_name, |server| {
            let mut diags = Diagnostics::new();
            let prior = match prior.filter(|p| !p.is_null()) {
                Some(prior) => match decode(server, &prior, &mut diags) {
                    Some(prior) => Some(prior),
                    None => return (Value::Null, diags),
                },
                None => None,
            };
            let Some(planned) = decode(server, &planned, &mut diags) else {
                return (Value::Null, diags);
            };
            let plan = server.engine().plan(prior.as_ref(), planned);
            (plan.to_record(), diags)
        }),

        Operation::Create { type_name, planned } => match resource(provider, &type_name) {
            Ok(server) => {
                let mut diags = Diagnostics::new();
                match decode(&server, &planned, &mut diags) {
                    Some(planned) => {
                        let out = server.create(planned, cancel).await;
                        diags.extend(out.diagnostics);
                        (out.value.to_record(), diags)
                    }
                    None => (Value::Null, diags),
                }
            }
            Err(diags) => (Value::Null, diags),
        },

        Operation::Read { type_name, state } => match resource(provider, &type_name) {
            Ok(server) => {
                let mut diags = Diagnostics::new();
                match decode(&server, &state, &mut diags) {
                    Some(state) => {
                        let out = server.read(state, cancel).await;
                        diags.extend(out.diagnostics);
                        (to_value(&out.value), diags)
                    }
                    None => (Value::Null, diags),
                }
            }
            Err(diags) => (Value::Null, diags),
        },

        Operation::Update {
            type_name,
            prior,
            planned,
        } => match resource(provider, &type_name) {
            Ok(server) => {
                let mut diags = Diagnostics::new();
                let prior = decode(&server, &prior, &mut diags);
                let planned = decode(&server, &planned, &mut diags);
                match (prior, planned) {
                    (Some(prior), Some(planned)) => {
                        let out = server.update(prior, planned, cancel).await;
                        diags.extend(out.diagnostics);
                        (out.value.to_record(), diags)
                    }
                    _ => (Value::Null, diags),
                }
            }
            Err(diags) => (Value::Null, diags),
        },

        Operation::Delete { type_name, state } => match resource(provider, &type_name) {
            Ok(server) => {
                let mut diags = Diagnostics::new();
                if let Some(state) = decode(&server, &state, &mut diags) {
                    diags.extend(server.delete(state, cancel).await);
                }
                (Value::Null, diags)
            }
            Err(diags) => (Value::Null, diags),
        },

        Operation::ImportState { type_name, id } => match resource(provider, &type_name) {
            Ok(server) => {
                let out = server.import_state(&id, cancel).await;
                let result = out
                    .value
                    .map(|instance| instance.to_record())
                    .unwrap_or(Value::Null);
                (result, out.diagnostics)
            }
            Err(diags) => (Value::Null, diags),
        },
    };

    Response::new(request_id, result, diagnostics)
}

fn resource(provider: &Provider, type_name: &str) -> Result<ResourceServer, Diagnostics> {
    provider.resource(type_name).map_err(|e| {
        Diagnostic::error(
            DiagnosticClass::Validation,
            "Unknown resource type",
            e.to_string(),
        )
        .into()
    })
}

fn with_resource<F>(provider: &Provider, type_name: &str, f: F) -> (Value, Diagnostics)
where
    F: FnOnce(&ResourceServer) -> (Value, Diagnostics),
{
    match resource(provider, type_name) {
        Ok(server) => f(&server),
        Err(diags) => (Value::Null, diags),
    }
}

fn decode(
    server: &ResourceServer,
    record: &Value,
    diags: &mut Diagnostics,
) -> Option<ResourceInstance> {
    let (instance, decode_diags) = ResourceInstance::from_record(record, server.schema());
    diags.extend(decode_diags);
    instance
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySentryApi;
    use crate::resource::Registry;
    use serde_json::json;
    use std::sync::Arc;

    fn provider() -> Provider {
        let provider = Provider::new("test", Arc::new(Registry::builtin().unwrap()));
        provider.configure_with(Arc::new(InMemorySentryApi::new()), Diagnostics::new());
        provider
    }

    async fn call(provider: &Provider, request: Value) -> Response {
        handle_line(provider, &request.to_string(), &CancelToken::never()).await
    }

    #[tokio::test]
    async fn test_metadata() {
        let provider = provider();
        let response = call(&provider, json!({"op": "metadata", "request_id": 7})).await;
        assert_eq!(response.request_id, Some(json!(7)));
        assert_eq!(response.result["type_name"], "sentinel");
        assert_eq!(response.result["resources"].as_array().unwrap().len(), 18);
    }

    #[tokio::test]
    async fn test_resource_schema() {
        let provider = provider();
        let response = call(
            &provider,
            json!({"op": "schema", "type_name": "sentinel_sobek"}),
        )
        .await;
        assert!(!response.has_error());
        assert_eq!(response.result["sector"], "Dams");
        assert_eq!(response.result["attributes"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_create_read_delete() {
        let provider = provider();
        let created = call(
            &provider,
            json!({
                "op": "create",
                "type_name": "sentinel_apollo",
                "planned": {"name": "hospital", "config": {"threat_level": "high"}}
            }),
        )
        .await;
        assert!(!created.has_error(), "{:?}", created.diagnostics);
        let id = created.result["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("apollo-hospital-"));
        assert_eq!(created.result["sector"], "Healthcare");
        assert_eq!(created.result["status"], "active");
        assert_eq!(created.result["enabled"], true);

        let read = call(
            &provider,
            json!({"op": "read", "type_name": "sentinel_apollo", "state": created.result}),
        )
        .await;
        assert_eq!(read.result["state"], "present");
        assert_eq!(read.result["instance"]["id"], id.as_str());

        let deleted = call(
            &provider,
            json!({"op": "delete", "type_name": "sentinel_apollo", "state": created.result}),
        )
        .await;
        assert!(deleted.diagnostics.is_empty());

        let gone = call(
            &provider,
            json!({"op": "read", "type_name": "sentinel_apollo", "state": created.result}),
        )
        .await;
        assert_eq!(gone.result["state"], "absent");
        assert!(!gone.has_error());
    }

    #[tokio::test]
    async fn test_update_keeps_id_from_prior() {
        let provider = provider();
        let created = call(
            &provider,
            json!({"op": "create", "type_name": "sentinel_ra", "planned": {"name": "grid"}}),
        )
        .await;

        let updated = call(
            &provider,
            json!({
                "op": "update",
                "type_name": "sentinel_ra",
                "prior": created.result,
                "planned": {"name": "grid", "enabled": false}
            }),
        )
        .await;
        assert!(!updated.has_error(), "{:?}", updated.diagnostics);
        assert_eq!(updated.result["id"], created.result["id"]);
        assert_eq!(updated.result["enabled"], false);
        assert!(
            updated.result["last_updated"].as_str().unwrap()
                > created.result["last_updated"].as_str().unwrap()
        );
    }

    #[tokio::test]
    async fn test_plan_fills_defaults() {
        let provider = provider();
        let response = call(
            &provider,
            json!({
                "op": "plan",
                "type_name": "sentinel_thoth",
                "prior": {"id": "thoth-x-1", "name": "x", "sector": "Information Technology"},
                "planned": {"name": "x"}
            }),
        )
        .await;
        assert_eq!(response.result["enabled"], true);
        assert_eq!(response.result["id"], "thoth-x-1");
        assert_eq!(response.result["sector"], "Information Technology");
    }

    #[tokio::test]
    async fn test_import_missing_is_not_found() {
        let provider = provider();
        let response = call(
            &provider,
            json!({"op": "import_state", "type_name": "sentinel_ares", "id": "ares-x-123"}),
        )
        .await;
        assert_eq!(response.result, Value::Null);
        assert!(response.diagnostics.has_class(DiagnosticClass::NotFound));
    }

    #[tokio::test]
    async fn test_bad_record_reports_attribute() {
        let provider = provider();
        let response = call(
            &provider,
            json!({"op": "create", "type_name": "sentinel_apollo", "planned": {"name": "x", "enabled": "yes"}}),
        )
        .await;
        assert!(response.has_error());
        let errors: Vec<_> = response.diagnostics.errors().collect();
        assert_eq!(errors[0].attribute.as_deref(), Some("enabled"));
    }

    #[tokio::test]
    async fn test_configure_rejects_bad_endpoint() {
        let provider = Provider::new("test", Arc::new(Registry::builtin().unwrap()));
        let response = call(
            &provider,
            json!({"op": "configure", "endpoint": "not a url"}),
        )
        .await;
        assert!(response.diagnostics.has_class(DiagnosticClass::Configuration));

        let response = call(
            &provider,
            json!({"op": "create", "type_name": "sentinel_ra", "planned": {"name": "grid"}}),
        )
        .await;
        assert!(response.diagnostics.has_class(DiagnosticClass::InvalidState));
    }

    #[tokio::test]
    async fn test_unknown_type_name() {
        let provider = provider();
        let response = call(
            &provider,
            json!({"op": "read", "type_name": "sentinel_zeus", "state": {"id": "zeus-1"}}),
        )
        .await;
        assert!(response.has_error());
        assert_eq!(response.result, Value::Null);
    }

    #[tokio::test]
    async fn test_malformed_line_keeps_request_id() {
        let provider = provider();
        let response = handle_line(
            &provider,
            r#"{"request_id": "abc", "op": "launch"}"#,
            &CancelToken::never(),
        )
        .await;
        assert!(response.has_error());
        assert_eq!(response.request_id, Some(json!("abc")));

        let response = handle_line(&provider, "not json", &CancelToken::never()).await;
        assert!(response.has_error());
        assert!(response.request_id.is_none());
    }
}
