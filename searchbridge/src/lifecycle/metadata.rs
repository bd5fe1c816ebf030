//! Snapshot of an index as the cluster reports it

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasMetadata {
    /// Absent on engines without write markers, or when never set
    pub is_write_index: Option<bool>,
}

/// One physical index as fetched from the cluster.
///
/// Never kept across cluster-side mutations: fetch, check, discard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExistingIndexMetadata {
    pub primary_name: String,
    pub aliases: BTreeMap<String, AliasMetadata>,
    /// Mappings with any mapping type level already removed
    pub mappings: Value,
    pub settings: Value,
}

impl ExistingIndexMetadata {
    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Analysis section, wherever the engine placed it in the settings
    pub fn analysis(&self) -> Option<&Value> {
        self.settings
            .pointer("/index/analysis")
            .or_else(|| self.settings.get("analysis"))
    }
}
