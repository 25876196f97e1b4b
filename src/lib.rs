//! Sentinel provider
//!
//! Declarative lifecycle management for Sentinel sector sentries. An
//! orchestrator sends plan/create/read/update/delete/import requests; one
//! generic engine per registered kind answers them against the Sentinel API.

pub mod api;
pub mod config;
pub mod provider;
pub mod resource;
pub mod server;

/// Version injected at compile time via SENTINEL_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("SENTINEL_VERSION") {
    Some(v) => v,
    None => "dev",
};
