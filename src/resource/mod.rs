//! Resource lifecycle layer
//!
//! This module provides a data-driven approach to managing sentry resources.
//! Kinds are loaded from a catalog, and one generic engine handles every
//! kind, so new sectors are added without code changes.
//!
//! # Architecture
//!
//! - [`schema`] - The attribute set shared by every kind
//! - [`model`] - One sentry instance, plan or stored state
//! - [`identity`] - ID and `last_updated` generation
//! - [`diagnostics`] - Structured errors and warnings
//! - [`engine`] - Create / read / update / delete / import
//! - [`registry`] - Kind catalog and engine lookup
//! - [`cancel`] - Cancellation passed into each operation
//!
//! # Example
//!
//! ```ignore
//! use sentinel_provider::resource::{CancelToken, Registry, ResourceInstance};
//!
//! async fn create_hospital(registry: &Registry) {
//!     let engine = registry.lookup("apollo").unwrap();
//!     let out = engine.create(ResourceInstance::new("hospital"), &CancelToken::never()).await;
//!     for diag in out.diagnostics.iter() {
//!         eprintln!("{}", diag);
//!     }
//! }
//! ```

pub mod cancel;
pub mod diagnostics;
pub mod engine;
pub mod identity;
pub mod model;
pub mod registry;
pub mod schema;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use diagnostics::{Diagnostic, DiagnosticClass, Diagnostics, Severity};
pub use engine::{LifecycleEngine, Outcome, ReadState};
pub use model::{ResourceInstance, STATUS_ACTIVE};
pub use registry::{Registry, RegistryError, ResourceKind};
pub use schema::{build_schema, AttributeSpec, AttributeType, Mutability, ResourceSchema};
