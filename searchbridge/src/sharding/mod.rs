//! Shard routing for logical indexes
//!
//! A [`ShardingStrategy`] maps a document (id + optional routing key) to
//! exactly one shard for writes, and a set of routing keys to the shards that
//! may hold matching documents for reads.
//!
//! Strategies are wrapped in [`Sharding`], which:
//! - runs `initialize` exactly once and records the final shard set
//! - rejects identifiers the strategy never registered
//! - is immutable afterwards and can be shared across threads freely
//!
//! Built-in strategies:
//! - `none` - a single implicit shard, no routing sent to the engine
//! - `hash` - `number_of_shards` shards, picked by a stable hash
//! - `explicit` - the routing key names the shard directly

mod explicit;
mod hash;

pub use explicit::ExplicitShardingStrategy;
pub use hash::HashShardingStrategy;

use crate::config::ShardingConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of one shard of a logical index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardIdentifier(String);

impl ShardIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShardIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShardIdentifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Shard identifier used when sharding is disabled.
pub const SINGLE_SHARD: &str = "0";

/// Handed to [`ShardingStrategy::initialize`] to register the shard set.
#[derive(Debug)]
pub struct ShardingStrategyInitializationContext {
    index_name: String,
    shard_identifiers: Option<BTreeSet<ShardIdentifier>>,
    disabled: bool,
}

impl ShardingStrategyInitializationContext {
    fn new(index_name: &str) -> Self {
        Self {
            index_name: index_name.to_string(),
            shard_identifiers: None,
            disabled: false,
        }
    }

    /// Logical name of the index being sharded
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Register the complete, final set of shard identifiers.
    pub fn shard_identifiers<I>(&mut self, identifiers: I) -> Result<()>
    where
        I: IntoIterator<Item = ShardIdentifier>,
    {
        if self.shard_identifiers.is_some() || self.disabled {
            return Err(Error::Configuration(format!(
                "shard identifiers for index '{}' were already registered",
                self.index_name
            )));
        }
        let identifiers: BTreeSet<ShardIdentifier> = identifiers.into_iter().collect();
        if identifiers.is_empty() {
            return Err(Error::Configuration(format!(
                "sharding strategy for index '{}' registered an empty shard set",
                self.index_name
            )));
        }
        self.shard_identifiers = Some(identifiers);
        Ok(())
    }

    /// Declare that this index is not sharded.
    pub fn disable_sharding(&mut self) {
        self.disabled = true;
        self.shard_identifiers = Some(BTreeSet::from([ShardIdentifier::from(SINGLE_SHARD)]));
    }
}

/// Routes documents and queries to shards.
///
/// Every method except `initialize` is called concurrently and must be a
/// pure function of the state built during initialization.
pub trait ShardingStrategy: Send + Sync + std::fmt::Debug {
    fn initialize(&mut self, context: &mut ShardingStrategyInitializationContext) -> Result<()>;

    fn to_shard_identifier(
        &self,
        document_id: &str,
        routing_key: Option<&str>,
    ) -> Result<ShardIdentifier>;

    /// Superset of the shards `to_shard_identifier` can return for any
    /// document routed with one of `routing_keys`.
    fn to_shard_identifiers(&self, routing_keys: &BTreeSet<String>) -> BTreeSet<ShardIdentifier>;
}

/// Strategy used when sharding is disabled.
#[derive(Debug, Default)]
pub struct NoShardingStrategy;

impl ShardingStrategy for NoShardingStrategy {
    fn initialize(&mut self, context: &mut ShardingStrategyInitializationContext) -> Result<()> {
        context.disable_sharding();
        Ok(())
    }

    fn to_shard_identifier(&self, _document_id: &str, _routing_key: Option<&str>) -> Result<ShardIdentifier> {
        Ok(ShardIdentifier::from(SINGLE_SHARD))
    }

    fn to_shard_identifiers(&self, _routing_keys: &BTreeSet<String>) -> BTreeSet<ShardIdentifier> {
        BTreeSet::from([ShardIdentifier::from(SINGLE_SHARD)])
    }
}

/// A strategy bound to one logical index, initialized at most once.
#[derive(Debug)]
pub struct Sharding {
    index_name: String,
    strategy: Box<dyn ShardingStrategy>,
    shard_identifiers: BTreeSet<ShardIdentifier>,
    enabled: bool,
    initialized: bool,
}

impl Sharding {
    /// Wrap a strategy; call [`Sharding::initialize`] before routing anything.
    pub fn new(index_name: impl Into<String>, strategy: Box<dyn ShardingStrategy>) -> Self {
        Self {
            index_name: index_name.into(),
            strategy,
            shard_identifiers: BTreeSet::new(),
            enabled: false,
            initialized: false,
        }
    }

    /// Build and initialize the strategy described by `config`.
    pub fn from_config(index_name: &str, config: &ShardingConfig) -> Result<Self> {
        let strategy: Box<dyn ShardingStrategy> = match config {
            ShardingConfig::None => Box::new(NoShardingStrategy),
            ShardingConfig::Hash { number_of_shards } => {
                Box::new(HashShardingStrategy::new(*number_of_shards))
            }
            ShardingConfig::Explicit { shard_identifiers } => {
                Box::new(ExplicitShardingStrategy::new(shard_identifiers.iter().cloned()))
            }
        };
        let mut sharding = Self::new(index_name, strategy);
        sharding.initialize()?;
        Ok(sharding)
    }

    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::Configuration(format!(
                "sharding strategy for index '{}' is already initialized",
                self.index_name
            )));
        }

        let mut context = ShardingStrategyInitializationContext::new(&self.index_name);
        self.strategy.initialize(&mut context)?;

        self.shard_identifiers = context.shard_identifiers.ok_or_else(|| {
            Error::Configuration(format!(
                "sharding strategy for index '{}' registered no shard identifiers",
                self.index_name
            ))
        })?;
        self.enabled = !context.disabled;
        self.initialized = true;

        tracing::debug!(
            index = %self.index_name,
            shards = self.shard_identifiers.len(),
            enabled = self.enabled,
            "Initialized sharding"
        );
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn shard_identifiers(&self) -> &BTreeSet<ShardIdentifier> {
        &self.shard_identifiers
    }

    pub fn to_shard_identifier(
        &self,
        document_id: &str,
        routing_key: Option<&str>,
    ) -> Result<ShardIdentifier> {
        self.ensure_initialized()?;
        let shard = self.strategy.to_shard_identifier(document_id, routing_key)?;
        if !self.shard_identifiers.contains(&shard) {
            return Err(Error::Configuration(format!(
                "sharding strategy for index '{}' returned unknown shard '{}'",
                self.index_name, shard
            )));
        }
        Ok(shard)
    }

    pub fn to_shard_identifiers(
        &self,
        routing_keys: &BTreeSet<String>,
    ) -> Result<BTreeSet<ShardIdentifier>> {
        self.ensure_initialized()?;
        if routing_keys.is_empty() {
            return Err(Error::Configuration(format!(
                "shard narrowing on index '{}' needs at least one routing key",
                self.index_name
            )));
        }
        let shards = self.strategy.to_shard_identifiers(routing_keys);
        if let Some(unknown) = shards.iter().find(|s| !self.shard_identifiers.contains(*s)) {
            return Err(Error::Configuration(format!(
                "sharding strategy for index '{}' returned unknown shard '{}'",
                self.index_name, unknown
            )));
        }
        Ok(shards)
    }

    /// Routing value to send with a document write, `None` when unsharded.
    pub fn write_routing(&self, document_id: &str, routing_key: Option<&str>) -> Result<Option<String>> {
        let shard = self.to_shard_identifier(document_id, routing_key)?;
        Ok(self.enabled.then(|| shard.0))
    }

    /// Comma-separated routing value narrowing a search, `None` when unsharded.
    pub fn search_routing(&self, routing_keys: &BTreeSet<String>) -> Result<Option<String>> {
        let shards = self.to_shard_identifiers(routing_keys)?;
        if !self.enabled {
            return Ok(None);
        }
        Ok(Some(
            shards
                .iter()
                .map(ShardIdentifier::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ))
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "sharding strategy for index '{}' used before initialization",
                self.index_name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct RogueStrategy;

    impl ShardingStrategy for RogueStrategy {
        fn initialize(&mut self, context: &mut ShardingStrategyInitializationContext) -> Result<()> {
            context.shard_identifiers([ShardIdentifier::from("a")])
        }

        fn to_shard_identifier(&self, _: &str, _: Option<&str>) -> Result<ShardIdentifier> {
            Ok(ShardIdentifier::from("z"))
        }

        fn to_shard_identifiers(&self, _: &BTreeSet<String>) -> BTreeSet<ShardIdentifier> {
            BTreeSet::from([ShardIdentifier::from("z")])
        }
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut sharding = Sharding::new("book", Box::new(NoShardingStrategy));
        sharding.initialize().unwrap();
        assert!(matches!(sharding.initialize(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_use_before_initialize_fails() {
        let sharding = Sharding::new("book", Box::new(HashShardingStrategy::new(2)));
        assert!(sharding.to_shard_identifier("1", None).is_err());
    }

    #[test]
    fn test_unknown_shard_is_rejected() {
        let mut sharding = Sharding::new("book", Box::new(RogueStrategy));
        sharding.initialize().unwrap();
        let err = sharding.to_shard_identifier("1", None).unwrap_err();
        assert!(err.to_string().contains("unknown shard 'z'"));
        let keys = BTreeSet::from(["k".to_string()]);
        assert!(sharding.to_shard_identifiers(&keys).is_err());
    }

    #[test]
    fn test_no_sharding_sends_no_routing() {
        let sharding = Sharding::from_config("book", &ShardingConfig::None).unwrap();
        assert!(!sharding.is_enabled());
        assert_eq!(sharding.write_routing("1", Some("key")).unwrap(), None);
        let keys = BTreeSet::from(["key".to_string()]);
        assert_eq!(sharding.search_routing(&keys).unwrap(), None);
    }

    #[test]
    fn test_empty_routing_keys_rejected() {
        let sharding =
            Sharding::from_config("book", &ShardingConfig::Hash { number_of_shards: 3 }).unwrap();
        assert!(sharding.to_shard_identifiers(&BTreeSet::new()).is_err());
    }

    #[test]
    fn test_hash_search_routing_joins_shards() {
        let sharding =
            Sharding::from_config("book", &ShardingConfig::Hash { number_of_shards: 4 }).unwrap();
        let keys = BTreeSet::from(["alpha".to_string(), "beta".to_string()]);
        let routing = sharding.search_routing(&keys).unwrap().unwrap();
        for key in &keys {
            let shard = sharding.to_shard_identifier("any", Some(key)).unwrap();
            assert!(routing.split(',').any(|s| s == shard.as_str()));
        }
    }
}
