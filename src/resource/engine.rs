//! Lifecycle Engine
//!
//! One engine per resource kind drives the CRUD state machine:
//!
//! ```text
//! NonExistent --create--> Active --update--> Active --delete--> NonExistent
//!                          |  ^
//!                          +--+ read (or -> NonExistent when the remote is gone)
//! NonExistent --import--> Active
//! ```
//!
//! The engine keeps no per-instance state. Everything mutable travels in the
//! [`ResourceInstance`] passed in and handed back, so one engine serves any
//! number of instances concurrently. Callers must not run two operations on
//! the same ID at once; that is not checked here.
//!
//! Operations never return `Err`. Problems land in the returned
//! [`Diagnostics`]. Once a fatal precondition fails, no remote call is made.

use super::cancel::CancelToken;
use super::diagnostics::{Diagnostic, DiagnosticClass, Diagnostics};
use super::identity::{generate_id, timestamp, timestamp_after};
use super::model::{ResourceInstance, STATUS_ACTIVE};
use super::registry::ResourceKind;
use super::schema::{build_schema, ResourceSchema, ATTR_ID, ATTR_SECTOR};
use crate::api::{format_api_error, ApiError, SentryApi};
use serde::Serialize;
use std::sync::{Arc, OnceLock};

/// Value produced by an operation together with its diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Outcome<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

/// Result of a read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "instance", rename_all = "lowercase")]
pub enum ReadState {
    Present(ResourceInstance),
    /// The remote object is gone; the caller should drop it from its state
    Absent,
}

impl ReadState {
    pub fn into_instance(self) -> Option<ResourceInstance> {
        match self {
            Self::Present(instance) => Some(instance),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// CRUD state machine for one resource kind
pub struct LifecycleEngine {
    kind: ResourceKind,
    schema: ResourceSchema,
    client: OnceLock<Arc<dyn SentryApi>>,
}

impl LifecycleEngine {
    pub fn new(kind: ResourceKind) -> Self {
        let schema = build_schema(&kind.sector, &kind.effective_description());
        Self {
            kind,
            schema,
            client: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub fn is_configured(&self) -> bool {
        self.client.get().is_some()
    }

    /// Install the API client. Only the first call takes effect.
    pub fn configure(&self, client: Arc<dyn SentryApi>) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if self.client.set(client).is_err() {
            diags.add_warning(
                DiagnosticClass::Configuration,
                "Provider already configured",
                format!(
                    "The {} resource already has an API client; the new configuration was ignored.",
                    self.kind.name
                ),
            );
        }
        diags
    }

    fn client(&self, diags: &mut Diagnostics) -> Option<Arc<dyn SentryApi>> {
        let client = self.client.get().cloned();
        if client.is_none() {
            diags.add_error(
                DiagnosticClass::InvalidState,
                "Unconfigured provider",
                format!(
                    "The {} resource was used before the provider was configured.",
                    self.kind.name
                ),
            );
        }
        client
    }

    /// Fill in what a plan leaves unknown: the `enabled` default, and the
    /// stored values of attributes that keep state across plans.
    pub fn plan(
        &self,
        prior: Option<&ResourceInstance>,
        mut desired: ResourceInstance,
    ) -> ResourceInstance {
        if desired.enabled.is_none() {
            desired.enabled = Some(self.schema.enabled_default());
        }

        if let Some(prior) = prior {
            for spec in &self.schema.attributes {
                if spec.use_state_for_unknown && desired.is_blank(spec.name) {
                    desired.copy_attribute(spec.name, prior);
                }
            }
        }

        desired
    }

    /// Create a new remote sentry from `desired`
    pub async fn create(
        &self,
        desired: ResourceInstance,
        cancel: &CancelToken,
    ) -> Outcome<ResourceInstance> {
        let mut diags = Diagnostics::new();

        if let Some(id) = desired.id() {
            diags.push(
                Diagnostic::error(
                    DiagnosticClass::InvalidState,
                    "Resource already exists",
                    format!(
                        "Create was called for an instance that already has id {}. Use update instead.",
                        id
                    ),
                )
                .at(ATTR_ID),
            );
            return Outcome::new(desired, diags);
        }

        diags.extend(self.schema.validate(&desired));

        if let Some(sector) = desired.sector.as_deref().filter(|s| !s.is_empty()) {
            if sector != self.kind.sector {
                diags.push(
                    Diagnostic::warning(
                        DiagnosticClass::Validation,
                        "Computed attribute ignored",
                        format!(
                            "sector is derived from the resource kind; \"{}\" was replaced by \"{}\".",
                            sector, self.kind.sector
                        ),
                    )
                    .at(ATTR_SECTOR),
                );
            }
        }

        if diags.has_error() {
            return Outcome::new(desired, diags);
        }
        let Some(client) = self.client(&mut diags) else {
            return Outcome::new(desired, diags);
        };
        if cancel.is_cancelled() {
            diags.push(cancelled("create"));
            return Outcome::new(desired, diags);
        }

        let mut instance = desired.clone();
        let id = generate_id(&self.kind.name, &desired.name);
        instance.id = Some(id.clone());
        instance.sector = Some(self.kind.sector.clone());
        instance.status = Some(STATUS_ACTIVE.to_string());
        instance.enabled = Some(desired.enabled_or(self.schema.enabled_default()));
        instance.last_updated = Some(timestamp());

        tracing::info!(kind = %self.kind.name, id = %id, name = %instance.name, "Creating sentry");

        match cancel.run(client.create_remote(&self.kind, &instance)).await {
            None => {
                diags.push(cancelled("create"));
                return Outcome::new(desired, diags);
            }
            Some(Ok(remote_id)) if remote_id != id => {
                diags.add_warning(
                    DiagnosticClass::Remote,
                    "Remote identifier differs",
                    format!(
                        "The API stored the sentry as {}; it is tracked as {}.",
                        remote_id, id
                    ),
                );
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                // The instance is still returned so the caller can keep partial state
                tracing::warn!(kind = %self.kind.name, id = %id, "Create failed remotely: {}", err);
                diags.push(remote_failure("create", &id, &err));
            }
        }

        Outcome::new(instance, diags)
    }

    /// Refresh `stored` from the remote
    pub async fn read(&self, stored: ResourceInstance, cancel: &CancelToken) -> Outcome<ReadState> {
        let mut diags = Diagnostics::new();

        let Some(id) = stored.id().map(str::to_string) else {
            diags.push(missing_id("read"));
            return Outcome::new(ReadState::Present(stored), diags);
        };
        let Some(client) = self.client(&mut diags) else {
            return Outcome::new(ReadState::Present(stored), diags);
        };
        if cancel.is_cancelled() {
            diags.push(cancelled("read"));
            return Outcome::new(ReadState::Present(stored), diags);
        }

        tracing::info!(kind = %self.kind.name, id = %id, "Reading sentry");

        let remote = match cancel.run(client.fetch_remote(&id)).await {
            None => {
                diags.push(cancelled("read"));
                return Outcome::new(ReadState::Present(stored), diags);
            }
            Some(Ok(Some(remote))) => remote,
            Some(Ok(None)) => {
                tracing::info!(
                    kind = %self.kind.name,
                    id = %id,
                    "Sentry no longer exists remotely"
                );
                return Outcome::new(ReadState::Absent, diags);
            }
            Some(Err(err)) if err.is_not_found() => {
                tracing::info!(
                    kind = %self.kind.name,
                    id = %id,
                    "Sentry no longer exists remotely"
                );
                return Outcome::new(ReadState::Absent, diags);
            }
            Some(Err(err)) => {
                tracing::warn!(kind = %self.kind.name, id = %id, "Read failed remotely: {}", err);
                diags.push(remote_failure("read", &id, &err));
                return Outcome::new(ReadState::Present(stored), diags);
            }
        };

        Outcome::new(ReadState::Present(self.refresh(stored, remote)), diags)
    }

    /// Adopt the remote's view of the caller-owned fields; id and sector stay
    fn refresh(&self, stored: ResourceInstance, remote: ResourceInstance) -> ResourceInstance {
        let name = if remote.name.trim().is_empty() {
            stored.name
        } else {
            remote.name
        };

        ResourceInstance {
            id: stored.id,
            name,
            description: remote.description,
            sector: stored.sector.or_else(|| Some(self.kind.sector.clone())),
            status: remote.status.or(stored.status),
            enabled: remote.enabled.or(stored.enabled),
            config: remote.config,
            tags: remote.tags,
            last_updated: remote.last_updated.or(stored.last_updated),
        }
    }

    /// Apply `desired` to the sentry stored as `prior`
    pub async fn update(
        &self,
        prior: &ResourceInstance,
        desired: ResourceInstance,
        cancel: &CancelToken,
    ) -> Outcome<ResourceInstance> {
        let mut diags = Diagnostics::new();

        let Some(id) = desired.id().map(str::to_string) else {
            diags.push(missing_id("update"));
            return Outcome::new(prior.clone(), diags);
        };

        if prior.id() != Some(id.as_str()) {
            diags.push(immutable_changed(ATTR_ID, prior.id(), &id));
        }
        if let Some(sector) = desired.sector.as_deref().filter(|s| !s.is_empty()) {
            if sector != self.kind.sector {
                diags.push(immutable_changed(
                    ATTR_SECTOR,
                    prior.sector.as_deref().or(Some(self.kind.sector.as_str())),
                    sector,
                ));
            }
        }
        diags.extend(self.schema.validate(&desired));

        if diags.has_error() {
            return Outcome::new(prior.clone(), diags);
        }
        let Some(client) = self.client(&mut diags) else {
            return Outcome::new(prior.clone(), diags);
        };
        if cancel.is_cancelled() {
            diags.push(cancelled("update"));
            return Outcome::new(prior.clone(), diags);
        }

        let mut instance = prior.clone();
        instance.apply_mutable(&desired);
        instance.enabled = Some(desired.enabled_or(self.schema.enabled_default()));
        instance.sector = Some(self.kind.sector.clone());
        if instance.status.is_none() {
            instance.status = Some(STATUS_ACTIVE.to_string());
        }
        instance.last_updated = Some(timestamp_after(prior.last_updated.as_deref()));

        tracing::info!(kind = %self.kind.name, id = %id, "Updating sentry");

        match cancel.run(client.update_remote(&id, &instance)).await {
            None => {
                diags.push(cancelled("update"));
                return Outcome::new(prior.clone(), diags);
            }
            Some(Ok(())) => {}
            Some(Err(err)) if err.is_not_found() => {
                diags.push(
                    Diagnostic::error(
                        DiagnosticClass::NotFound,
                        "Resource no longer exists",
                        format!(
                            "Sentry {} was deleted outside the provider. Refresh to remove it from state.",
                            id
                        ),
                    )
                    .at(ATTR_ID),
                );
            }
            Some(Err(err)) => {
                tracing::warn!(kind = %self.kind.name, id = %id, "Update failed remotely: {}", err);
                diags.push(remote_failure("update", &id, &err));
            }
        }

        Outcome::new(instance, diags)
    }

    /// Delete the sentry stored as `stored`. Deleting a sentry that is
    /// already gone succeeds.
    pub async fn delete(&self, stored: &ResourceInstance, cancel: &CancelToken) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let Some(id) = stored.id() else {
            diags.push(missing_id("delete"));
            return diags;
        };
        let Some(client) = self.client(&mut diags) else {
            return diags;
        };
        if cancel.is_cancelled() {
            diags.push(cancelled("delete"));
            return diags;
        }

        tracing::info!(kind = %self.kind.name, id = %id, "Deleting sentry");

        match cancel.run(client.delete_remote(id)).await {
            None => diags.push(cancelled("delete")),
            Some(Ok(())) => {}
            Some(Err(err)) if err.is_not_found() => {
                tracing::debug!(kind = %self.kind.name, id = %id, "Sentry already deleted");
            }
            Some(Err(err)) => {
                tracing::warn!(kind = %self.kind.name, id = %id, "Delete failed remotely: {}", err);
                diags.push(remote_failure("delete", id, &err));
            }
        }

        diags
    }

    /// Bring an existing remote sentry under management by its ID
    pub async fn import(
        &self,
        external_id: &str,
        cancel: &CancelToken,
    ) -> Outcome<Option<ResourceInstance>> {
        let id = external_id.trim();
        if id.is_empty() {
            let diags = Diagnostic::error(
                DiagnosticClass::Validation,
                "Missing import identifier",
                "Import requires the ID of an existing sentry.",
            )
            .at(ATTR_ID)
            .into();
            return Outcome::new(None, diags);
        }

        tracing::info!(kind = %self.kind.name, id = %id, "Importing sentry");

        let Outcome {
            value,
            mut diagnostics,
        } = self.read(ResourceInstance::with_id(id), cancel).await;

        let imported = match value {
            _ if diagnostics.has_error() => None,
            ReadState::Present(instance) => Some(instance),
            ReadState::Absent => {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticClass::NotFound,
                        "Cannot import non-existent remote object",
                        format!("No {} sentry with id {} exists.", self.kind.name, id),
                    )
                    .at(ATTR_ID),
                );
                None
            }
        };

        Outcome::new(imported, diagnostics)
    }
}

fn cancelled(operation: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticClass::Cancelled,
        "Operation cancelled",
        format!("The {} was cancelled; the instance was left unchanged.", operation),
    )
}

fn missing_id(operation: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticClass::InvalidState,
        "Missing resource identifier",
        format!(
            "Cannot {} a sentry that has no id. Create or import it first.",
            operation
        ),
    )
    .at(ATTR_ID)
}

fn immutable_changed(attribute: &str, stored: Option<&str>, planned: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticClass::Validation,
        "Cannot change immutable attribute",
        format!(
            "{} is fixed at creation (stored {:?}, planned {:?}). Replace the resource instead.",
            attribute,
            stored.unwrap_or(""),
            planned
        ),
    )
    .at(attribute)
}

fn remote_failure(operation: &str, id: &str, err: &ApiError) -> Diagnostic {
    Diagnostic::error(
        DiagnosticClass::Remote,
        format!("Sentinel API {} failed", operation),
        format!("{} ({})", format_api_error(err), id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySentryApi;
    use crate::resource::cancel::cancel_pair;

    fn engine() -> (LifecycleEngine, InMemorySentryApi) {
        let engine = LifecycleEngine::new(ResourceKind::new("apollo", "Healthcare", ""));
        let api = InMemorySentryApi::new();
        assert!(engine.configure(Arc::new(api.clone())).is_empty());
        (engine, api)
    }

    #[tokio::test]
    async fn test_create_assigns_computed_attributes() {
        let (engine, api) = engine();
        let out = engine
            .create(ResourceInstance::new("hospital"), &CancelToken::never())
            .await;

        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let instance = out.value;
        assert!(instance.id().unwrap().starts_with("apollo-hospital-"));
        assert_eq!(instance.sector.as_deref(), Some("Healthcare"));
        assert_eq!(instance.status.as_deref(), Some("active"));
        assert_eq!(instance.enabled, Some(true));
        assert!(instance.last_updated.is_some());
        assert_eq!(api.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_existing_id() {
        let (engine, api) = engine();
        let out = engine
            .create(ResourceInstance::with_id("apollo-x-1"), &CancelToken::never())
            .await;

        assert!(out.diagnostics.has_class(DiagnosticClass::InvalidState));
        assert_eq!(out.value.id(), Some("apollo-x-1"));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_ignores_caller_sector() {
        let (engine, _) = engine();
        let mut desired = ResourceInstance::new("hospital");
        desired.sector = Some("Dams".to_string());

        let out = engine.create(desired, &CancelToken::never()).await;
        assert!(!out.has_error());
        assert_eq!(out.diagnostics.warnings().count(), 1);
        assert_eq!(out.value.sector.as_deref(), Some("Healthcare"));
    }

    #[tokio::test]
    async fn test_create_validation_stops_before_remote() {
        let (engine, api) = engine();
        let out = engine
            .create(ResourceInstance::new(" "), &CancelToken::never())
            .await;

        assert!(out.diagnostics.has_class(DiagnosticClass::Validation));
        assert!(!out.value.has_id());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_remote_failure_returns_partial_state() {
        let (engine, api) = engine();
        api.set_failure(Some("backend down")).await;

        let out = engine
            .create(ResourceInstance::new("hospital"), &CancelToken::never())
            .await;

        assert!(out.diagnostics.has_class(DiagnosticClass::Remote));
        assert!(out.value.has_id());
        assert_eq!(out.value.status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn test_unconfigured_engine() {
        let engine = LifecycleEngine::new(ResourceKind::new("ra", "Energy", ""));
        let out = engine
            .create(ResourceInstance::new("grid"), &CancelToken::never())
            .await;
        assert!(out.diagnostics.has_class(DiagnosticClass::InvalidState));
        assert!(!out.value.has_id());
    }

    #[test]
    fn test_configure_twice_warns() {
        let (engine, _) = engine();
        let diags = engine.configure(Arc::new(InMemorySentryApi::new()));
        assert!(!diags.has_error());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_plan_keeps_stored_identity() {
        let (engine, _) = engine();
        let mut prior = ResourceInstance::with_id("apollo-hospital-1");
        prior.sector = Some("Healthcare".to_string());
        prior.enabled = Some(false);

        let planned = engine.plan(Some(&prior), ResourceInstance::new("hospital"));
        assert_eq!(planned.id(), Some("apollo-hospital-1"));
        assert_eq!(planned.sector.as_deref(), Some("Healthcare"));
        // enabled is not carried over: omitted means the default
        assert_eq!(planned.enabled, Some(true));
    }

    #[test]
    fn test_plan_without_prior() {
        let (engine, _) = engine();
        let planned = engine.plan(None, ResourceInstance::new("hospital"));
        assert!(!planned.has_id());
        assert_eq!(planned.enabled, Some(true));
    }

    #[tokio::test]
    async fn test_update_without_id_makes_no_call() {
        let (engine, api) = engine();
        let prior = ResourceInstance::with_id("apollo-hospital-1");
        let out = engine
            .update(&prior, ResourceInstance::new("hospital"), &CancelToken::never())
            .await;

        assert!(out.diagnostics.has_class(DiagnosticClass::InvalidState));
        assert_eq!(out.value, prior);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_reports_both_immutable_changes() {
        let (engine, api) = engine();
        let created = engine
            .create(ResourceInstance::new("hospital"), &CancelToken::never())
            .await
            .value;

        let mut desired = created.clone();
        desired.id = Some("apollo-other-1".to_string());
        desired.sector = Some("Dams".to_string());
        let calls = api.call_count();

        let out = engine.update(&created, desired, &CancelToken::never()).await;
        let attrs: Vec<_> = out
            .diagnostics
            .errors()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attrs, vec!["id", "sector"]);
        assert_eq!(out.value, created);
        assert_eq!(api.call_count(), calls);
    }

    #[tokio::test]
    async fn test_update_replaces_mutable_fields() {
        let (engine, _) = engine();
        let mut desired = ResourceInstance::new("hospital");
        desired.tags.insert("env".to_string(), "prod".to_string());
        desired.config.insert("threat_level".to_string(), "high".to_string());
        let created = engine.create(desired, &CancelToken::never()).await.value;

        let mut desired = created.clone();
        desired.tags.clear();
        desired.config = [("mode".to_string(), "passive".to_string())].into();
        desired.enabled = Some(false);
        desired.description = Some("night shift".to_string());

        let out = engine.update(&created, desired, &CancelToken::never()).await;
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let updated = out.value;
        assert!(updated.tags.is_empty());
        assert_eq!(updated.config.len(), 1);
        assert_eq!(updated.enabled, Some(false));
        assert_eq!(updated.id, created.id);
        assert!(updated.last_updated > created.last_updated);
    }

    #[tokio::test]
    async fn test_update_after_remote_delete_is_not_found() {
        let (engine, api) = engine();
        let created = engine
            .create(ResourceInstance::new("hospital"), &CancelToken::never())
            .await
            .value;
        api.remove(created.id().unwrap()).await;

        let out = engine
            .update(&created, created.clone(), &CancelToken::never())
            .await;
        assert!(out.diagnostics.has_class(DiagnosticClass::NotFound));
    }

    #[tokio::test]
    async fn test_read_remote_error_keeps_stored() {
        let (engine, api) = engine();
        let created = engine
            .create(ResourceInstance::new("hospital"), &CancelToken::never())
            .await
            .value;
        api.set_failure(Some("timeout")).await;

        let out = engine.read(created.clone(), &CancelToken::never()).await;
        assert!(out.diagnostics.has_class(DiagnosticClass::Remote));
        assert_eq!(out.value, ReadState::Present(created));
    }

    #[tokio::test]
    async fn test_read_adopts_remote_drift() {
        let (engine, api) = engine();
        let created = engine
            .create(ResourceInstance::new("hospital"), &CancelToken::never())
            .await
            .value;

        let mut drifted = created.clone();
        drifted.enabled = Some(false);
        drifted.sector = Some("Dams".to_string());
        api.insert(drifted).await;

        let out = engine.read(created.clone(), &CancelToken::never()).await;
        let refreshed = out.value.into_instance().unwrap();
        assert_eq!(refreshed.enabled, Some(false));
        assert_eq!(refreshed.sector, created.sector);
    }

    #[tokio::test]
    async fn test_delete_without_id() {
        let (engine, api) = engine();
        let diags = engine
            .delete(&ResourceInstance::new("hospital"), &CancelToken::never())
            .await;
        assert!(diags.has_class(DiagnosticClass::InvalidState));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_remote_failure() {
        let (engine, api) = engine();
        api.set_failure(Some("read-only mode")).await;
        let diags = engine
            .delete(&ResourceInstance::with_id("apollo-x-1"), &CancelToken::never())
            .await;
        assert!(diags.has_class(DiagnosticClass::Remote));
    }

    #[tokio::test]
    async fn test_import_blank_id() {
        let (engine, api) = engine();
        let out = engine.import("  ", &CancelToken::never()).await;
        assert!(out.value.is_none());
        assert!(out.diagnostics.has_class(DiagnosticClass::Validation));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_import_fills_sector() {
        let (engine, api) = engine();
        let mut remote = ResourceInstance::with_id("apollo-legacy-1");
        remote.name = "legacy".to_string();
        remote.enabled = Some(true);
        api.insert(remote).await;

        let out = engine.import("apollo-legacy-1", &CancelToken::never()).await;
        assert!(out.diagnostics.is_empty());
        let imported = out.value.unwrap();
        assert_eq!(imported.name, "legacy");
        assert_eq!(imported.sector.as_deref(), Some("Healthcare"));
    }

    #[tokio::test]
    async fn test_cancel_before_call_returns_input() {
        let (engine, api) = engine();
        let (handle, token) = cancel_pair();
        handle.cancel();

        let desired = ResourceInstance::new("hospital");
        let out = engine.create(desired.clone(), &token).await;
        assert!(out.diagnostics.has_class(DiagnosticClass::Cancelled));
        assert_eq!(out.value, desired);
        assert_eq!(api.call_count(), 0);
    }
}
