//! Hash-based sharding
//!
//! Shard identifiers are `"0"..."n-1"`. The routing key, or the document id
//! when no key is given, is hashed with SHA-256 so the mapping stays stable
//! across processes, platforms and toolchain upgrades.

use super::{ShardIdentifier, ShardingStrategy, ShardingStrategyInitializationContext};
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

#[derive(Debug)]
pub struct HashShardingStrategy {
    number_of_shards: usize,
    shards: Vec<ShardIdentifier>,
}

impl HashShardingStrategy {
    pub fn new(number_of_shards: usize) -> Self {
        Self {
            number_of_shards,
            shards: Vec::new(),
        }
    }

    /// `None` until the strategy is initialized.
    fn shard_for(&self, key: &str) -> Option<ShardIdentifier> {
        if self.shards.is_empty() {
            return None;
        }
        let position = (stable_hash(key) % self.shards.len() as u64) as usize;
        self.shards.get(position).cloned()
    }
}

/// First 8 bytes of the SHA-256 digest, big-endian.
pub(crate) fn stable_hash(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

impl ShardingStrategy for HashShardingStrategy {
    fn initialize(&mut self, context: &mut ShardingStrategyInitializationContext) -> Result<()> {
        if self.number_of_shards == 0 {
            return Err(Error::Configuration(format!(
                "hash sharding for index '{}' needs number_of_shards >= 1",
                context.index_name()
            )));
        }
        if self.number_of_shards == 1 {
            context.disable_sharding();
            self.shards = vec![ShardIdentifier::from(super::SINGLE_SHARD)];
            return Ok(());
        }

        self.shards = (0..self.number_of_shards)
            .map(|i| ShardIdentifier::new(i.to_string()))
            .collect();
        context.shard_identifiers(self.shards.iter().cloned())
    }

    fn to_shard_identifier(
        &self,
        document_id: &str,
        routing_key: Option<&str>,
    ) -> Result<ShardIdentifier> {
        self.shard_for(routing_key.unwrap_or(document_id)).ok_or_else(|| {
            Error::Configuration("hash sharding used before initialization".into())
        })
    }

    fn to_shard_identifiers(&self, routing_keys: &BTreeSet<String>) -> BTreeSet<ShardIdentifier> {
        routing_keys.iter().filter_map(|key| self.shard_for(key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShardingConfig;
    use crate::sharding::Sharding;

    #[test]
    fn test_stable_hash_is_fixed() {
        // Changing this value moves every existing document to another shard.
        assert_eq!(stable_hash("book"), 10552391189809386773);
    }

    #[test]
    fn test_routing_key_overrides_document_id() {
        let sharding =
            Sharding::from_config("book", &ShardingConfig::Hash { number_of_shards: 8 }).unwrap();
        let a = sharding.to_shard_identifier("doc-1", Some("tenant-a")).unwrap();
        let b = sharding.to_shard_identifier("doc-2", Some("tenant-a")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_uninitialized_strategy_fails_instead_of_panicking() {
        let strategy = HashShardingStrategy::new(4);
        assert!(matches!(
            strategy.to_shard_identifier("1", None),
            Err(Error::Configuration(_))
        ));
        let keys = BTreeSet::from(["a".to_string()]);
        assert!(strategy.to_shard_identifiers(&keys).is_empty());
    }

    #[test]
    fn test_zero_shards_rejected() {
        let result = Sharding::from_config("book", &ShardingConfig::Hash { number_of_shards: 0 });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_single_shard_disables_routing() {
        let sharding =
            Sharding::from_config("book", &ShardingConfig::Hash { number_of_shards: 1 }).unwrap();
        assert!(!sharding.is_enabled());
    }

    #[test]
    fn test_documents_spread_across_shards() {
        let sharding =
            Sharding::from_config("book", &ShardingConfig::Hash { number_of_shards: 4 }).unwrap();
        let used: BTreeSet<_> = (0..200)
            .map(|i| sharding.to_shard_identifier(&format!("doc-{i}"), None).unwrap())
            .collect();
        assert_eq!(used.len(), 4);
    }
}
