//! Per-logical-index handle
//!
//! Binds a logical index to its names, sharding and expected schema, and
//! builds document works addressed through its aliases: writes go to the
//! write alias, reads and maintenance to the read alias.

use crate::naming::IndexNames;
use crate::schema::IndexSchema;
use crate::sharding::{ShardIdentifier, Sharding};
use crate::work::{
    CountWork, DeleteByQueryWork, DeleteWork, ExplainWork, FlushWork, IndexWork,
    MergeSegmentsWork, RefreshWork, WorkFactory,
};
use crate::Result;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug)]
pub struct IndexHandle {
    names: IndexNames,
    sharding: Sharding,
    schema: IndexSchema,
    factory: WorkFactory,
}

impl IndexHandle {
    pub fn new(names: IndexNames, sharding: Sharding, schema: IndexSchema, factory: WorkFactory) -> Self {
        Self {
            names,
            sharding,
            schema,
            factory,
        }
    }

    pub fn logical(&self) -> &str {
        &self.names.logical
    }

    pub fn names(&self) -> &IndexNames {
        &self.names
    }

    pub fn sharding(&self) -> &Sharding {
        &self.sharding
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Shard a document is written to
    pub fn shard_for(&self, id: &str, routing_key: Option<&str>) -> Result<ShardIdentifier> {
        self.sharding.to_shard_identifier(id, routing_key)
    }

    fn read_targets(&self) -> Vec<String> {
        vec![self.names.read_alias.clone()]
    }

    fn search_routing(&self, routing_keys: Option<&BTreeSet<String>>) -> Result<Option<String>> {
        match routing_keys {
            Some(keys) => self.sharding.search_routing(keys),
            None => Ok(None),
        }
    }

    /// Add or replace a document
    pub fn index_document(&self, id: &str, routing_key: Option<&str>, source: Value) -> Result<IndexWork> {
        let routing = self.sharding.write_routing(id, routing_key)?;
        Ok(self
            .factory
            .index(&self.names.write_alias, id, routing.as_deref(), source))
    }

    /// Add a document that must not exist yet
    pub fn create_document(&self, id: &str, routing_key: Option<&str>, source: Value) -> Result<IndexWork> {
        let routing = self.sharding.write_routing(id, routing_key)?;
        Ok(self
            .factory
            .create_document(&self.names.write_alias, id, routing.as_deref(), source))
    }

    pub fn delete_document(&self, id: &str, routing_key: Option<&str>) -> Result<DeleteWork> {
        let routing = self.sharding.write_routing(id, routing_key)?;
        Ok(self
            .factory
            .delete(&self.names.write_alias, id, routing.as_deref()))
    }

    /// Explain how `query` scores one document. Goes through the write alias,
    /// which always resolves to a single index.
    pub fn explain(&self, id: &str, routing_key: Option<&str>, query: Value) -> Result<ExplainWork> {
        let routing = self.sharding.write_routing(id, routing_key)?;
        Ok(self
            .factory
            .explain(&self.names.write_alias, id, routing.as_deref(), query))
    }

    /// Count matching documents, searching only the shards of `routing_keys` when given
    pub fn count(&self, query: Option<Value>, routing_keys: Option<&BTreeSet<String>>) -> Result<CountWork> {
        let routing = self.search_routing(routing_keys)?;
        Ok(self
            .factory
            .count(&self.read_targets(), query, routing.as_deref()))
    }

    /// Delete matching documents, or all of them with a `match_all` query
    pub fn purge(&self, query: Value, routing_keys: Option<&BTreeSet<String>>) -> Result<DeleteByQueryWork> {
        let routing = self.search_routing(routing_keys)?;
        Ok(self
            .factory
            .delete_by_query(&self.read_targets(), query, routing.as_deref()))
    }

    pub fn refresh(&self) -> RefreshWork {
        self.factory.refresh(&self.read_targets())
    }

    pub fn flush(&self) -> FlushWork {
        self.factory.flush(&self.read_targets())
    }

    pub fn merge_segments(&self, max_num_segments: Option<u32>) -> MergeSegmentsWork {
        self.factory
            .merge_segments(&self.read_targets(), max_num_segments)
    }
}
