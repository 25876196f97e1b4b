//! Provider surface
//!
//! What the orchestrator sees: provider metadata and schema, a one-time
//! configure step, and one [`ResourceServer`] per registered kind named
//! `sentinel_<kind>`.

use crate::api::{HttpSentryApi, InMemorySentryApi, SentryApi};
use crate::config::ProviderConfig;
use crate::resource::schema::{AttributeSpec, AttributeType, Mutability};
use crate::resource::{
    CancelToken, DiagnosticClass, Diagnostics, LifecycleEngine, Outcome, ReadState, Registry,
    RegistryError, ResourceInstance, ResourceSchema,
};
use serde::Serialize;
use std::sync::Arc;

pub const PROVIDER_TYPE_NAME: &str = "sentinel";

const PROVIDER_DESCRIPTION: &str = "The Sentinel Provider manages AI Sentry resources for the Sentinel Project. \
Each sentry is specialized for one critical infrastructure sector such as healthcare, energy or finance.";

/// Provider metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMetadata {
    pub type_name: String,
    pub version: String,
    pub resources: Vec<String>,
}

/// Schema of the provider-level configuration block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSchema {
    pub description: String,
    pub attributes: Vec<AttributeSpec>,
}

/// Sentinel provider
pub struct Provider {
    /// "dev" for local builds, the release version otherwise
    version: String,
    registry: Arc<Registry>,
    /// Startup configuration that Configure requests are layered over
    defaults: ProviderConfig,
}

impl Provider {
    pub fn new(version: &str, registry: Arc<Registry>) -> Self {
        Self {
            version: version.to_string(),
            registry,
            defaults: ProviderConfig::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: ProviderConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &ProviderConfig {
        &self.defaults
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: self.version.clone(),
            resources: self
                .registry
                .names()
                .into_iter()
                .map(resource_type_name)
                .collect(),
        }
    }

    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            description: PROVIDER_DESCRIPTION.to_string(),
            attributes: vec![
                AttributeSpec::new(
                    "endpoint",
                    "The Sentinel API endpoint URL. May also be provided via SENTINEL_ENDPOINT environment variable.",
                    AttributeType::String,
                    Mutability::Optional,
                ),
                AttributeSpec::new(
                    "api_key",
                    "The API key for authentication with the Sentinel API. May also be provided via SENTINEL_API_KEY environment variable.",
                    AttributeType::String,
                    Mutability::Optional,
                )
                .sensitive(),
            ],
        }
    }

    /// Build the API client from `config` and hand it to every engine
    pub fn configure(&self, config: &ProviderConfig) -> Diagnostics {
        let mut diags = Diagnostics::new();

        if self.registry.engines().any(|e| e.is_configured()) {
            diags.add_warning(
                DiagnosticClass::Configuration,
                "Provider already configured",
                "Configure was called more than once; the first configuration stays in effect.",
            );
            return diags;
        }

        let client: Arc<dyn SentryApi> = match config.effective_endpoint() {
            Some(endpoint) => {
                if url::Url::parse(endpoint).is_err() {
                    diags.add_error(
                        DiagnosticClass::Configuration,
                        "Invalid endpoint",
                        format!("\"{}\" is not a valid URL.", endpoint),
                    );
                    return diags;
                }
                if config.api_key.as_ref().map_or(true, |k| k.is_empty()) {
                    diags.add_warning(
                        DiagnosticClass::Configuration,
                        "Missing API key",
                        "No api_key is set; requests to the Sentinel API are unauthenticated.",
                    );
                }
                match HttpSentryApi::new(endpoint, config.api_key.clone(), config.timeout()) {
                    Ok(api) => {
                        tracing::info!("Using Sentinel API at {}", api.endpoint());
                        Arc::new(api)
                    }
                    Err(e) => {
                        diags.add_error(
                            DiagnosticClass::Configuration,
                            "Unable to create Sentinel API client",
                            format!("{:#}", e),
                        );
                        return diags;
                    }
                }
            }
            None => {
                tracing::warn!("No Sentinel endpoint configured, using in-memory API");
                diags.add_warning(
                    DiagnosticClass::Configuration,
                    "No endpoint configured",
                    "Sentries are kept in memory for the lifetime of this process. Set endpoint or SENTINEL_ENDPOINT to manage a real Sentinel API.",
                );
                Arc::new(InMemorySentryApi::new())
            }
        };

        self.configure_with(client, diags)
    }

    /// Hand an already-built client to every engine
    pub fn configure_with(
        &self,
        client: Arc<dyn SentryApi>,
        mut diags: Diagnostics,
    ) -> Diagnostics {
        for engine in self.registry.engines() {
            diags.extend(engine.configure(Arc::clone(&client)));
        }
        diags
    }

    /// Resource server for a type name such as `sentinel_apollo`
    pub fn resource(&self, type_name: &str) -> Result<ResourceServer, RegistryError> {
        let kind = type_name
            .strip_prefix(PROVIDER_TYPE_NAME)
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| RegistryError::NotFound(type_name.to_string()))?;

        Ok(ResourceServer {
            type_name: type_name.to_string(),
            engine: self.registry.lookup(kind)?,
        })
    }
}

/// `apollo` -> `sentinel_apollo`
pub fn resource_type_name(kind: &str) -> String {
    format!("{}_{}", PROVIDER_TYPE_NAME, kind)
}

/// Per-kind request surface
#[derive(Clone)]
pub struct ResourceServer {
    type_name: String,
    engine: Arc<LifecycleEngine>,
}

impl ResourceServer {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn schema(&self) -> &ResourceSchema {
        self.engine.schema()
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub async fn create(
        &self,
        planned: ResourceInstance,
        cancel: &CancelToken,
    ) -> Outcome<ResourceInstance> {
        let planned = self.engine.plan(None, planned);
        self.engine.create(planned, cancel).await
    }

    pub async fn read(&self, state: ResourceInstance, cancel: &CancelToken) -> Outcome<ReadState> {
        self.engine.read(state, cancel).await
    }

    pub async fn update(
        &self,
        prior: ResourceInstance,
        planned: ResourceInstance,
        cancel: &CancelToken,
    ) -> Outcome<ResourceInstance> {
        let planned = self.engine.plan(Some(&prior), planned);
        self.engine.update(&prior, planned, cancel).await
    }

    pub async fn delete(&self, state: ResourceInstance, cancel: &CancelToken) -> Diagnostics {
        self.engine.delete(&state, cancel).await
    }

    pub async fn import_state(
        &self,
        id: &str,
        cancel: &CancelToken,
    ) -> Outcome<Option<ResourceInstance>> {
        self.engine.import(id, cancel).await
    }
}
