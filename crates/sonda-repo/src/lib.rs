//! Repository synthesis and engine lifecycle.
//!
//! Binds a discovered [`SchemaInfo`](sonda_core::SchemaInfo) to the
//! statement-execution collaborator: per-table CRUD repositories with
//! relationship loading (single and batched), and the [`Engine`] façade
//! that owns the schema and repository caches.

pub mod config;
pub mod engine;
pub mod executor;
pub mod repository;
mod sql;

pub use config::EngineConfig;
pub use engine::Engine;
pub use executor::{
    executor_for, ParamStyle, PostgresExecutor, Row, SqliteExecutor, StatementExecutor,
};
pub use repository::{Repository, RepositoryFactory};

pub use executor::ExecOutcome;
pub use sonda_analyze::{AnalyzerConfig, PerformanceReport, QueryAnalyzer};
pub use sonda_introspect::DatabaseConnection;
