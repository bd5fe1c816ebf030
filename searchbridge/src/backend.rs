//! Backend bootstrap
//!
//! Ties the pieces together for one cluster: detects the engine version,
//! selects the dialect, and builds one [`IndexHandle`] per configured logical
//! index. [`Backend::start`] applies each index's lifecycle strategy and
//! [`Backend::stop`] undoes what the strategy asks to undo.

use crate::config::{BulkConfig, Config};
use crate::dialect::{Dialect, DialectRegistry};
use crate::index::IndexHandle;
use crate::lifecycle::{IndexLifecycleManager, LifecycleStrategy, RolloverResult};
use crate::naming::{IndexNames, IndexNamingStrategy, SimpleIndexNamingStrategy};
use crate::orchestrator::{ExecutionContext, WorkOrchestrator};
use crate::schema::IndexSchema;
use crate::sharding::Sharding;
use crate::transport::{HttpTransport, Transport};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Backend {
    orchestrator: WorkOrchestrator,
    lifecycle: Arc<IndexLifecycleManager>,
    indexes: BTreeMap<String, Arc<IndexHandle>>,
    strategies: BTreeMap<String, LifecycleStrategy>,
}

impl Backend {
    /// Connect over HTTP to the cluster named in `config.client`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.client)?);
        Self::bootstrap(config, transport).await
    }

    /// Bootstrap over an existing transport with the default naming strategy.
    pub async fn bootstrap(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::bootstrap_with_naming(config, transport, Arc::new(SimpleIndexNamingStrategy::new())).await
    }

    pub async fn bootstrap_with_naming(
        config: &Config,
        transport: Arc<dyn Transport>,
        naming: Arc<dyn IndexNamingStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        let dialect = DialectRegistry::bootstrap(&config.client, transport.as_ref()).await?;
        let orchestrator = WorkOrchestrator::new(transport.clone(), dialect.clone(), config.bulk.clone());

        let lifecycle = Arc::new(
            IndexLifecycleManager::new(transport, dialect.clone(), naming.clone(), config.lifecycle.clone())
                .with_cancellation(orchestrator.shutdown_token().clone()),
        );

        let mut indexes = BTreeMap::new();
        let mut strategies = BTreeMap::new();
        for (logical, index_config) in &config.indexes {
            let names = IndexNames::new(naming.as_ref(), logical)?;
            let sharding = Sharding::from_config(&names.logical, &index_config.sharding)?;
            let schema = match &index_config.schema {
                Some(path) => IndexSchema::load(&config.resolve_path(path))?,
                None => IndexSchema::default(),
            };
            let strategy = index_config.lifecycle.unwrap_or(config.lifecycle.strategy);

            tracing::debug!(
                "Registered index '{}' (write: {}, read: {}, shards: {}, lifecycle: {})",
                names.logical,
                names.write_alias,
                names.read_alias,
                sharding.shard_identifiers().len(),
                strategy
            );

            strategies.insert(names.logical.clone(), strategy);
            indexes.insert(
                names.logical.clone(),
                Arc::new(IndexHandle::new(
                    names,
                    sharding,
                    schema,
                    dialect.work_factory().clone(),
                )),
            );
        }

        tracing::info!(
            "Backend ready: dialect {} (engine {}), {} indexes",
            dialect.kind(),
            dialect.version(),
            indexes.len()
        );

        Ok(Self {
            orchestrator,
            lifecycle,
            indexes,
            strategies,
        })
    }

    /// Apply each index's lifecycle strategy, in logical name order.
    pub async fn start(&self) -> Result<()> {
        for (logical, handle) in &self.indexes {
            let strategy = self.strategy(logical);
            self.lifecycle
                .apply(strategy, logical, handle.schema())
                .await?;
        }
        Ok(())
    }

    /// Release every index, then cancel whatever is still in flight.
    ///
    /// All indexes are released even when one fails; the first error is returned.
    pub async fn stop(&self) -> Result<()> {
        let mut first_error = None;
        for logical in self.indexes.keys() {
            if let Err(e) = self.lifecycle.release(self.strategy(logical), logical).await {
                tracing::warn!("Failed to release index '{}': {}", logical, e);
                first_error.get_or_insert(e);
            }
        }
        self.orchestrator.shutdown();
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        self.orchestrator.dialect()
    }

    pub fn orchestrator(&self) -> &WorkOrchestrator {
        &self.orchestrator
    }

    pub fn lifecycle(&self) -> &Arc<IndexLifecycleManager> {
        &self.lifecycle
    }

    pub fn bulk_config(&self) -> &BulkConfig {
        self.orchestrator.bulk_config()
    }

    /// A new unit of work with its own bulk queue
    pub fn create_context(&self) -> ExecutionContext {
        self.orchestrator.create_context()
    }

    pub fn index(&self, logical: &str) -> Result<&Arc<IndexHandle>> {
        self.indexes.get(logical).ok_or_else(|| {
            Error::Configuration(format!("unknown logical index '{}'", logical))
        })
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Arc<IndexHandle>> {
        self.indexes.values()
    }

    pub fn strategy(&self, logical: &str) -> LifecycleStrategy {
        self.strategies
            .get(logical)
            .copied()
            .unwrap_or_default()
    }

    /// Roll a logical index over to its next generation with its configured schema.
    pub async fn rollover(&self, logical: &str, drop_old: bool) -> Result<RolloverResult> {
        let handle = self.index(logical)?;
        self.lifecycle
            .rollover(logical, handle.schema(), drop_old)
            .await
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("dialect", &self.dialect().kind())
            .field("indexes", &self.indexes.keys().collect::<Vec<_>>())
            .finish()
    }
}
