//! Minimal query building blocks used by the core works.

use super::DialectCapabilities;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct QueryFactory {
    capabilities: DialectCapabilities,
}

impl QueryFactory {
    pub(crate) fn new(capabilities: DialectCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn match_all(&self) -> Value {
        json!({ "match_all": {} })
    }

    /// `ids` query; typed engines expect the mapping type alongside the ids.
    pub fn ids<I, S>(&self, ids: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = ids.into_iter().map(Into::into).collect();
        match self.capabilities.mapping_type {
            Some(mapping_type) => json!({ "ids": { "type": mapping_type, "values": values } }),
            None => json!({ "ids": { "values": values } }),
        }
    }

    pub fn term(&self, field: &str, value: impl Into<Value>) -> Value {
        json!({ "term": { field: value.into() } })
    }

    /// Wrap a query in the request body the count / delete-by-query APIs take.
    pub fn request_body(&self, query: Value) -> Value {
        json!({ "query": query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    #[test]
    fn test_ids_query_per_dialect() {
        let typed = QueryFactory::new(DialectKind::Es60.capabilities());
        assert_eq!(
            typed.ids(["1", "2"]),
            json!({"ids": {"type": "doc", "values": ["1", "2"]}})
        );

        let typeless = QueryFactory::new(DialectKind::Es7.capabilities());
        assert_eq!(typeless.ids(["1"]), json!({"ids": {"values": ["1"]}}));
    }
}
