//! In-memory Sentinel API
//!
//! Keeps sentries in a process-local map. Used when no endpoint is
//! configured, and by tests, which can inject failures and latency.

use super::{ApiError, SentryApi};
use crate::resource::{ResourceInstance, ResourceKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemorySentryApi {
    store: Arc<RwLock<HashMap<String, ResourceInstance>>>,
    failure: Arc<RwLock<Option<String>>>,
    latency: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl InMemorySentryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every following call fail with `message` (`None` to recover)
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    /// Drop a record behind the provider's back, as an out-of-band delete would
    pub async fn remove(&self, id: &str) -> Option<ResourceInstance> {
        self.store.write().await.remove(id)
    }

    /// Put a record in place, as if created outside the provider
    pub async fn insert(&self, instance: ResourceInstance) {
        if let Some(id) = instance.id().map(str::to_string) {
            self.store.write().await.insert(id, instance);
        }
    }

    pub async fn get(&self, id: &str) -> Option<ResourceInstance> {
        self.store.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Number of API calls made so far, including failed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.failure.read().await.as_ref() {
            Some(message) => Err(ApiError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SentryApi for InMemorySentryApi {
    async fn create_remote(
        &self,
        kind: &ResourceKind,
        instance: &ResourceInstance,
    ) -> Result<String, ApiError> {
        self.enter().await?;

        let Some(id) = instance.id().map(str::to_string) else {
            return Err(ApiError::InvalidResponse(format!(
                "{} instance has no id",
                kind.name
            )));
        };

        tracing::debug!("memory create: kind={}, id={}", kind.name, id);
        self.store.write().await.insert(id.clone(), instance.clone());
        Ok(id)
    }

    async fn fetch_remote(&self, id: &str) -> Result<Option<ResourceInstance>, ApiError> {
        self.enter().await?;
        Ok(self.store.read().await.get(id).cloned())
    }

    async fn update_remote(&self, id: &str, instance: &ResourceInstance) -> Result<(), ApiError> {
        self.enter().await?;

        let mut store = self.store.write().await;
        match store.get_mut(id) {
            Some(existing) => {
                *existing = instance.clone();
                Ok(())
            }
            None => Err(ApiError::NotFound(id.to_string())),
        }
    }

    async fn delete_remote(&self, id: &str) -> Result<(), ApiError> {
        self.enter().await?;

        match self.store.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(id.to_string())),
        }
    }
}
