//! Explicit sharding: the routing key is the shard identifier.
//!
//! Documents without a routing key are spread over the registered shards by
//! a stable hash of their id.

use super::hash::stable_hash;
use super::{ShardIdentifier, ShardingStrategy, ShardingStrategyInitializationContext};
use crate::{Error, Result};
use std::collections::BTreeSet;

#[derive(Debug)]
pub struct ExplicitShardingStrategy {
    shards: BTreeSet<ShardIdentifier>,
}

impl ExplicitShardingStrategy {
    pub fn new<I, S>(shard_identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shards: shard_identifiers
                .into_iter()
                .map(|s| ShardIdentifier::new(s))
                .collect(),
        }
    }
}

impl ShardingStrategy for ExplicitShardingStrategy {
    fn initialize(&mut self, context: &mut ShardingStrategyInitializationContext) -> Result<()> {
        if self.shards.is_empty() {
            return Err(Error::Configuration(format!(
                "explicit sharding for index '{}' needs at least one shard identifier",
                context.index_name()
            )));
        }
        context.shard_identifiers(self.shards.iter().cloned())
    }

    fn to_shard_identifier(
        &self,
        document_id: &str,
        routing_key: Option<&str>,
    ) -> Result<ShardIdentifier> {
        let Some(key) = routing_key else {
            let position = (stable_hash(document_id) % self.shards.len().max(1) as u64) as usize;
            return self.shards.iter().nth(position).cloned().ok_or_else(|| {
                Error::Configuration(format!(
                    "explicit sharding has no shard for document '{}'",
                    document_id
                ))
            });
        };
        self.shards
            .get(&ShardIdentifier::from(key))
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "routing key '{}' of document '{}' is not a shard identifier (expected one of {:?})",
                    key,
                    document_id,
                    self.shards.iter().map(ShardIdentifier::as_str).collect::<Vec<_>>()
                ))
            })
    }

    fn to_shard_identifiers(&self, routing_keys: &BTreeSet<String>) -> BTreeSet<ShardIdentifier> {
        routing_keys
            .iter()
            .map(|key| ShardIdentifier::from(key.as_str()))
            .filter(|shard| self.shards.contains(shard))
            .collect()
    }
}
