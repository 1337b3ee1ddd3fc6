use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sonda_analyze::{PerformanceReport, QueryAnalyzer};
use sonda_core::{Error, Result, SchemaInfo};
use sonda_introspect::{discovery_for, DatabaseConnection, SchemaDiscovery};

use crate::config::EngineConfig;
use crate::executor::{executor_for, StatementExecutor};
use crate::repository::{Repository, RepositoryFactory};

/// Lifecycle façade over discovery, repositories and the analyzer.
///
/// Owns the two process-wide caches: the schema snapshot and the
/// repository-by-table map. Both are mutated only by
/// `initialize`/`refresh_schema`/`close`; steady-state readers never
/// mutate. One engine instance per process is assumed.
pub struct Engine {
    discovery: SchemaDiscovery,
    executor: Arc<dyn StatementExecutor>,
    analyzer: Arc<QueryAnalyzer>,
    config: EngineConfig,
    schema: RwLock<Option<Arc<SchemaInfo>>>,
    repositories: RwLock<HashMap<String, Arc<Repository>>>,
}

impl Engine {
    /// Build an engine from a live connection, selecting the dialect
    /// introspector and executor.
    pub fn from_connection(connection: &DatabaseConnection, config: EngineConfig) -> Self {
        let discovery = discovery_for(connection, config.discovery_options());
        let executor = executor_for(connection);
        Self::new(discovery, executor, config)
    }

    /// Build an engine from explicit collaborators. The executor seam is
    /// what tests instrument.
    pub fn new(
        discovery: SchemaDiscovery,
        executor: Arc<dyn StatementExecutor>,
        config: EngineConfig,
    ) -> Self {
        let analyzer = Arc::new(QueryAnalyzer::new(config.analyzer_config()));
        Self {
            discovery,
            executor,
            analyzer,
            config,
            schema: RwLock::new(None),
            repositories: RwLock::new(HashMap::new()),
        }
    }

    /// Run discovery once and publish the schema snapshot.
    ///
    /// Fails fast when the connection does not answer a liveness probe.
    /// Calling again is a warning, not an error.
    pub async fn initialize(&self) -> Result<()> {
        if self.schema.read().expect("schema lock").is_some() {
            tracing::warn!(event = "already_initialized");
            return Ok(());
        }

        self.executor.ping().await?;

        tracing::info!(event = "discovery_started", dialect = self.discovery.dialect());
        let schema = Arc::new(self.discovery.discover().await?);
        self.analyzer.set_schema(Arc::clone(&schema));
        *self.schema.write().expect("schema lock") = Some(schema);
        Ok(())
    }

    /// The cached schema snapshot.
    pub fn schema(&self) -> Result<Arc<SchemaInfo>> {
        self.schema
            .read()
            .expect("schema lock")
            .clone()
            .ok_or(Error::NotInitialized)
    }

    /// Repository for one table, created lazily and cached until the next
    /// refresh.
    pub fn get_repository(&self, table: &str) -> Result<Arc<Repository>> {
        let schema = self.schema()?;

        if let Some(repository) = self
            .repositories
            .read()
            .expect("repository lock")
            .get(table)
        {
            return Ok(Arc::clone(repository));
        }

        let info = schema.table(table).ok_or_else(|| Error::TableNotFound {
            name: table.to_string(),
            available: schema.table_names(),
        })?;

        let factory = RepositoryFactory::new(
            Arc::clone(&self.executor),
            Arc::clone(&self.analyzer),
            self.config.custom_type_mappings.clone(),
        );
        let repository = Arc::new(factory.build(info, &schema.relationships));

        let mut cache = self.repositories.write().expect("repository lock");
        let entry = cache
            .entry(table.to_string())
            .or_insert_with(|| Arc::clone(&repository));
        Ok(Arc::clone(entry))
    }

    /// Re-run discovery and swap the caches.
    ///
    /// The repository cache is cleared only after the new snapshot is fully
    /// built; repositories already handed out keep the old snapshot
    /// (eventual consistency on refresh).
    pub async fn refresh_schema(&self) -> Result<()> {
        if self.schema.read().expect("schema lock").is_none() {
            return Err(Error::NotInitialized);
        }

        let schema = Arc::new(self.discovery.discover().await?);
        self.analyzer.set_schema(Arc::clone(&schema));
        *self.schema.write().expect("schema lock") = Some(schema);
        self.repositories.write().expect("repository lock").clear();
        tracing::info!(event = "schema_refreshed");
        Ok(())
    }

    /// Aggregate counts and timings from the analyzer's rolling history.
    pub fn get_performance_metrics(&self) -> PerformanceReport {
        self.analyzer.report()
    }

    /// The analyzer handle, for callers wanting raw warnings.
    pub fn analyzer(&self) -> &Arc<QueryAnalyzer> {
        &self.analyzer
    }

    /// Drop the caches; subsequent schema or repository access reports
    /// the engine as uninitialized.
    pub fn close(&self) {
        self.repositories.write().expect("repository lock").clear();
        *self.schema.write().expect("schema lock") = None;
        tracing::info!(event = "engine_closed");
    }
}
