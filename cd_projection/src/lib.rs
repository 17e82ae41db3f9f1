//! CD pipeline topology projection.
//!
//! Projects pipeline, stage, codebase, branch and delivery tooling resources
//! reported by the cluster orchestrator into a per-tenant relational schema.
//! Stages are admitted strictly in order, and each stage's verified docker
//! image streams feed the next one. Every synchronization is idempotent under
//! redelivery and applied in a single transaction.

pub mod config;
pub mod error;
pub mod metrics;
pub mod migration;
pub mod models;
pub mod projector;
pub mod requests;
pub mod schema;
pub mod services;
pub mod store;
pub mod tenant;

pub use config::ProjectionConfig;
pub use error::{ErrorKind, ProjectionError, SyncStep};
pub use projector::Projector;
pub use store::{Gateway, MemoryStore, PgStore, Store};
pub use tenant::TenantSchema;
