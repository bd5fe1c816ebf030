//! Dialect-aware construction of works

use super::admin::{
    AliasAction, AliasDefinition, CreateIndexWork, DropIndexWork, GetIndexMetadataWork,
    PutMappingWork, UpdateAliasesWork, WaitForIndexStatusWork,
};
use super::bulk::BulkWork;
use super::document::{BulkOperation, DeleteWork, DocumentTarget, IndexWork};
use super::maintenance::{
    CountWork, DeleteByQueryWork, ExplainWork, FlushWork, MergeSegmentsWork, RefreshWork,
};
use super::BulkableWork;
use crate::config::RefreshStrategy;
use crate::dialect::DialectCapabilities;
use crate::lifecycle::IndexStatus;
use crate::schema::IndexSchema;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Builds every work for one dialect.
#[derive(Debug, Clone)]
pub struct WorkFactory {
    capabilities: DialectCapabilities,
}

impl WorkFactory {
    pub(crate) fn new(capabilities: DialectCapabilities) -> Self {
        Self { capabilities }
    }

    fn target(&self, index: &str, id: &str, routing: Option<&str>) -> DocumentTarget {
        DocumentTarget {
            index: index.to_string(),
            id: id.to_string(),
            routing: routing.map(str::to_string),
            mapping_type: self.capabilities.mapping_type,
            bulk_routing_member: self.capabilities.bulk_routing_member,
        }
    }

    fn alias_definition(&self, definition: AliasDefinition) -> AliasDefinition {
        if self.capabilities.supports_write_index {
            definition
        } else {
            AliasDefinition::default()
        }
    }

    /// Add or replace a document
    pub fn index(&self, index: &str, id: &str, routing: Option<&str>, source: Value) -> IndexWork {
        IndexWork::new(BulkOperation::Index, self.target(index, id, routing), source)
    }

    /// Add a document, failing if the id is taken
    pub fn create_document(
        &self,
        index: &str,
        id: &str,
        routing: Option<&str>,
        source: Value,
    ) -> IndexWork {
        IndexWork::new(BulkOperation::Create, self.target(index, id, routing), source)
    }

    pub fn delete(&self, index: &str, id: &str, routing: Option<&str>) -> DeleteWork {
        DeleteWork::new(self.target(index, id, routing))
    }

    pub fn bulk(&self, items: Vec<Arc<dyn BulkableWork>>, refresh: RefreshStrategy) -> BulkWork {
        BulkWork::new(items, refresh)
    }

    /// Write markers are silently dropped on dialects that do not know them.
    pub fn create_index(
        &self,
        index: &str,
        schema: &IndexSchema,
        aliases: BTreeMap<String, AliasDefinition>,
    ) -> CreateIndexWork {
        let aliases = aliases
            .into_iter()
            .map(|(name, definition)| (name, self.alias_definition(definition)))
            .collect();
        CreateIndexWork::new(
            index.to_string(),
            schema.clone(),
            aliases,
            self.capabilities.mapping_type,
        )
    }

    pub fn drop_index(&self, index: &str, ignore_missing: bool) -> DropIndexWork {
        DropIndexWork::new(index.to_string(), ignore_missing)
    }

    pub fn get_index_metadata(&self, name: &str) -> GetIndexMetadataWork {
        GetIndexMetadataWork::new(name.to_string(), self.capabilities.mapping_type)
    }

    pub fn put_mapping(&self, index: &str, mappings: Value) -> PutMappingWork {
        PutMappingWork::new(index.to_string(), mappings, self.capabilities.mapping_type)
    }

    pub fn update_aliases(&self, actions: Vec<AliasAction>) -> UpdateAliasesWork {
        let actions = if self.capabilities.supports_write_index {
            actions
        } else {
            actions
                .into_iter()
                .map(AliasAction::without_write_marker)
                .collect()
        };
        UpdateAliasesWork::new(actions)
    }

    pub fn wait_for_index_status(
        &self,
        index: &str,
        status: IndexStatus,
        timeout: Duration,
    ) -> WaitForIndexStatusWork {
        WaitForIndexStatusWork::new(index.to_string(), status, timeout)
    }

    pub fn flush(&self, indexes: &[String]) -> FlushWork {
        FlushWork::new(indexes.to_vec())
    }

    pub fn refresh(&self, indexes: &[String]) -> RefreshWork {
        RefreshWork::new(indexes.to_vec())
    }

    pub fn merge_segments(&self, indexes: &[String], max_num_segments: Option<u32>) -> MergeSegmentsWork {
        MergeSegmentsWork::new(indexes.to_vec(), max_num_segments)
    }

    pub fn explain(&self, index: &str, id: &str, routing: Option<&str>, query: Value) -> ExplainWork {
        ExplainWork::new(
            index.to_string(),
            id.to_string(),
            query,
            routing.map(str::to_string),
            self.capabilities.mapping_type,
        )
    }

    pub fn count(&self, indexes: &[String], query: Option<Value>, routing: Option<&str>) -> CountWork {
        CountWork::new(indexes.to_vec(), query, routing.map(str::to_string))
    }

    pub fn delete_by_query(
        &self,
        indexes: &[String],
        query: Value,
        routing: Option<&str>,
    ) -> DeleteByQueryWork {
        DeleteByQueryWork::new(indexes.to_vec(), query, routing.map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::transport::{HttpMethod, RequestBody};
    use crate::work::Work;
    use serde_json::json;

    fn factory(kind: DialectKind) -> WorkFactory {
        WorkFactory::new(kind.capabilities())
    }

    #[test]
    fn test_bulk_header_per_dialect() {
        let es56 = factory(DialectKind::Es56).index("book-write", "1", Some("eu"), json!({}));
        assert_eq!(
            es56.bulk_lines()[0],
            json!({"index": {"_index": "book-write", "_type": "doc", "_id": "1", "_routing": "eu"}})
        );

        let es7 = factory(DialectKind::Es7).delete("book-write", "1", Some("eu"));
        assert_eq!(
            es7.bulk_lines(),
            vec![json!({"delete": {"_index": "book-write", "_id": "1", "routing": "eu"}})]
        );
    }

    #[test]
    fn test_single_document_request() {
        let work = factory(DialectKind::Es64)
            .create_document("book-write", "1", Some("eu"), json!({"title": "Dune"}))
            .with_refresh(RefreshStrategy::Force);
        let request = Work::request(&work);
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.path, "/book-write/doc/1");
        assert_eq!(request.param_value("op_type"), Some("create"));
        assert_eq!(request.param_value("routing"), Some("eu"));
        assert_eq!(request.param_value("refresh"), Some("true"));

        let es7 = factory(DialectKind::Es7).delete("book-write", "1", None);
        assert_eq!(Work::request(&es7).path, "/book-write/_doc/1");
    }

    #[test]
    fn test_write_marker_dropped_on_old_dialects() {
        let actions = vec![AliasAction::add(
            "book-000002",
            "book-write",
            &AliasDefinition::write(),
        )];
        let es60 = factory(DialectKind::Es60).update_aliases(actions.clone());
        assert_eq!(
            es60.actions(),
            &[AliasAction::Add {
                index: "book-000002".into(),
                alias: "book-write".into(),
                is_write_index: None
            }]
        );
        let es64 = factory(DialectKind::Es64).update_aliases(actions.clone());
        assert_eq!(es64.actions(), actions.as_slice());

        let mut aliases = BTreeMap::new();
        aliases.insert("book-write".to_string(), AliasDefinition::write());
        let create = factory(DialectKind::Es56).create_index("book-000001", &IndexSchema::default(), aliases);
        match create.request().body {
            RequestBody::Json(body) => assert_eq!(body["aliases"], json!({"book-write": {}})),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_put_mapping_paths() {
        let mappings = json!({"properties": {"isbn": {"type": "keyword"}}});
        assert_eq!(
            factory(DialectKind::Es60).put_mapping("book-000001", mappings.clone()).request().path,
            "/book-000001/_mapping/doc"
        );
        assert_eq!(
            factory(DialectKind::Es7).put_mapping("book-000001", mappings).request().path,
            "/book-000001/_mapping"
        );
    }
}
