//! Index administration: create, drop, inspect, mapping and alias updates

use super::{engine_error, ensure_success, Work, WorkKind};
use crate::lifecycle::{AliasMetadata, CreateIndexResult, ExistingIndexMetadata, IndexStatus};
use crate::schema::IndexSchema;
use crate::transport::{HttpMethod, WireRequest, WireResponse};
use crate::{Error, Result, TransportError};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Alias attached to an index at creation or through `_aliases`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasDefinition {
    /// `None` leaves the marker out of the request entirely
    pub is_write_index: Option<bool>,
}

impl AliasDefinition {
    pub fn write() -> Self {
        Self {
            is_write_index: Some(true),
        }
    }

    pub fn read() -> Self {
        Self::default()
    }

    fn to_json(&self) -> Value {
        match self.is_write_index {
            Some(marker) => json!({ "is_write_index": marker }),
            None => json!({}),
        }
    }
}

/// One step of an atomic `_aliases` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Add {
        index: String,
        alias: String,
        is_write_index: Option<bool>,
    },
    Remove {
        index: String,
        alias: String,
    },
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>, definition: &AliasDefinition) -> Self {
        AliasAction::Add {
            index: index.into(),
            alias: alias.into(),
            is_write_index: definition.is_write_index,
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub(crate) fn without_write_marker(self) -> Self {
        match self {
            AliasAction::Add { index, alias, .. } => AliasAction::Add {
                index,
                alias,
                is_write_index: None,
            },
            remove => remove,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            AliasAction::Add {
                index,
                alias,
                is_write_index,
            } => {
                let mut add = json!({ "index": index, "alias": alias });
                if let Some(marker) = is_write_index {
                    add["is_write_index"] = json!(marker);
                }
                json!({ "add": add })
            }
            AliasAction::Remove { index, alias } => {
                json!({ "remove": { "index": index, "alias": alias } })
            }
        }
    }
}

/// Wrap mappings under the mapping type on typed dialects.
fn typed_mappings(mapping_type: Option<&'static str>, mappings: &Value) -> Value {
    match mapping_type {
        Some(mapping_type) => json!({ mapping_type: mappings }),
        None => mappings.clone(),
    }
}

fn is_already_exists(error_type: &str) -> bool {
    matches!(
        error_type,
        "resource_already_exists_exception" | "index_already_exists_exception"
    )
}

fn is_index_missing(response: &WireResponse) -> bool {
    response.status == 404
}

#[derive(Debug, Clone)]
pub struct CreateIndexWork {
    index: String,
    schema: IndexSchema,
    aliases: BTreeMap<String, AliasDefinition>,
    mapping_type: Option<&'static str>,
}

impl CreateIndexWork {
    pub(crate) fn new(
        index: String,
        schema: IndexSchema,
        aliases: BTreeMap<String, AliasDefinition>,
        mapping_type: Option<&'static str>,
    ) -> Self {
        Self {
            index,
            schema,
            aliases,
            mapping_type,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

impl Work for CreateIndexWork {
    type Output = CreateIndexResult;

    fn kind(&self) -> WorkKind {
        WorkKind::CreateIndex
    }

    fn request(&self) -> WireRequest {
        let mut body = Map::new();
        if self.schema.settings.as_object().is_some_and(|s| !s.is_empty()) {
            body.insert("settings".into(), self.schema.settings.clone());
        }
        body.insert(
            "mappings".into(),
            typed_mappings(self.mapping_type, &self.schema.mappings),
        );
        if !self.aliases.is_empty() {
            let aliases: Map<String, Value> = self
                .aliases
                .iter()
                .map(|(name, definition)| (name.clone(), definition.to_json()))
                .collect();
            body.insert("aliases".into(), Value::Object(aliases));
        }
        WireRequest::new(HttpMethod::Put, format!("/{}", self.index)).json(Value::Object(body))
    }

    /// An "already exists" answer means another process won the race; the
    /// lifecycle manager turns it into [`CreateIndexResult::AlreadyExists`].
    fn handle_response(&self, response: WireResponse) -> Result<CreateIndexResult> {
        if response.is_success() {
            return Ok(CreateIndexResult::Created);
        }
        let (error_type, _) = response.error_details();
        if is_already_exists(&error_type) {
            return Err(Error::ConcurrentCreationDetected(self.index.clone()));
        }
        Err(engine_error(&response))
    }
}

#[derive(Debug, Clone)]
pub struct DropIndexWork {
    index: String,
    ignore_missing: bool,
}

impl DropIndexWork {
    pub(crate) fn new(index: String, ignore_missing: bool) -> Self {
        Self {
            index,
            ignore_missing,
        }
    }
}

impl Work for DropIndexWork {
    /// Whether an index was actually deleted
    type Output = bool;

    fn kind(&self) -> WorkKind {
        WorkKind::DropIndex
    }

    fn request(&self) -> WireRequest {
        WireRequest::new(HttpMethod::Delete, format!("/{}", self.index))
    }

    fn handle_response(&self, response: WireResponse) -> Result<bool> {
        if self.ignore_missing && is_index_missing(&response) {
            return Ok(false);
        }
        ensure_success(&response)?;
        Ok(true)
    }
}

/// Reads mappings, settings and aliases of the indexes behind a name.
///
/// The name may be a physical index or an alias; `None` means nothing
/// answers to it.
#[derive(Debug, Clone)]
pub struct GetIndexMetadataWork {
    name: String,
    mapping_type: Option<&'static str>,
}

impl GetIndexMetadataWork {
    pub(crate) fn new(name: String, mapping_type: Option<&'static str>) -> Self {
        Self { name, mapping_type }
    }

    fn untyped_mappings(&self, mappings: Option<&Value>) -> Value {
        let Some(mappings) = mappings else {
            return json!({});
        };
        match self.mapping_type.and_then(|t| mappings.get(t)) {
            Some(inner) => inner.clone(),
            None => mappings.clone(),
        }
    }
}

impl Work for GetIndexMetadataWork {
    type Output = Option<Vec<ExistingIndexMetadata>>;

    fn kind(&self) -> WorkKind {
        WorkKind::GetIndexMetadata
    }

    fn request(&self) -> WireRequest {
        WireRequest::new(HttpMethod::Get, format!("/{}", self.name))
    }

    fn handle_response(&self, response: WireResponse) -> Result<Self::Output> {
        if is_index_missing(&response) {
            return Ok(None);
        }
        ensure_success(&response)?;

        let indexes = response.body.as_object().ok_or_else(|| {
            TransportError::MalformedResponse(format!(
                "index metadata for '{}' is not an object",
                self.name
            ))
        })?;

        let mut metadata: Vec<ExistingIndexMetadata> = indexes
            .iter()
            .map(|(primary_name, index)| {
                let aliases = index
                    .get("aliases")
                    .and_then(Value::as_object)
                    .map(|aliases| {
                        aliases
                            .iter()
                            .map(|(name, alias)| {
                                (
                                    name.clone(),
                                    AliasMetadata {
                                        is_write_index: alias
                                            .get("is_write_index")
                                            .and_then(Value::as_bool),
                                    },
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                ExistingIndexMetadata {
                    primary_name: primary_name.clone(),
                    aliases,
                    mappings: self.untyped_mappings(index.get("mappings")),
                    settings: index.get("settings").cloned().unwrap_or_else(|| json!({})),
                }
            })
            .collect();
        metadata.sort_by(|a, b| a.primary_name.cmp(&b.primary_name));
        Ok(Some(metadata))
    }
}

#[derive(Debug, Clone)]
pub struct PutMappingWork {
    index: String,
    mappings: Value,
    mapping_type: Option<&'static str>,
}

impl PutMappingWork {
    pub(crate) fn new(index: String, mappings: Value, mapping_type: Option<&'static str>) -> Self {
        Self {
            index,
            mappings,
            mapping_type,
        }
    }
}

impl Work for PutMappingWork {
    type Output = ();

    fn kind(&self) -> WorkKind {
        WorkKind::PutMapping
    }

    fn request(&self) -> WireRequest {
        let path = match self.mapping_type {
            Some(mapping_type) => format!("/{}/_mapping/{}", self.index, mapping_type),
            None => format!("/{}/_mapping", self.index),
        };
        WireRequest::new(HttpMethod::Put, path).json(self.mappings.clone())
    }

    fn handle_response(&self, response: WireResponse) -> Result<()> {
        ensure_success(&response)
    }
}

/// Alias changes applied atomically by the engine.
#[derive(Debug, Clone)]
pub struct UpdateAliasesWork {
    actions: Vec<AliasAction>,
}

impl UpdateAliasesWork {
    pub(crate) fn new(actions: Vec<AliasAction>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[AliasAction] {
        &self.actions
    }
}

impl Work for UpdateAliasesWork {
    type Output = ();

    fn kind(&self) -> WorkKind {
        WorkKind::UpdateAliases
    }

    fn request(&self) -> WireRequest {
        let actions: Vec<Value> = self.actions.iter().map(AliasAction::to_json).collect();
        WireRequest::new(HttpMethod::Post, "/_aliases").json(json!({ "actions": actions }))
    }

    fn handle_response(&self, response: WireResponse) -> Result<()> {
        ensure_success(&response)
    }
}

#[derive(Debug, Clone)]
pub struct WaitForIndexStatusWork {
    index: String,
    status: IndexStatus,
    timeout: Duration,
}

impl WaitForIndexStatusWork {
    pub(crate) fn new(index: String, status: IndexStatus, timeout: Duration) -> Self {
        Self {
            index,
            status,
            timeout,
        }
    }
}

impl Work for WaitForIndexStatusWork {
    /// Status reached by the index
    type Output = IndexStatus;

    fn kind(&self) -> WorkKind {
        WorkKind::WaitForIndexStatus
    }

    fn request(&self) -> WireRequest {
        WireRequest::new(HttpMethod::Get, format!("/_cluster/health/{}", self.index))
            .param("wait_for_status", self.status.as_str())
            .param("timeout", format!("{}ms", self.timeout.as_millis()))
    }

    fn handle_response(&self, response: WireResponse) -> Result<IndexStatus> {
        let timed_out = response
            .body
            .get("timed_out")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let reported = response
            .body
            .get("status")
            .and_then(Value::as_str)
            .and_then(IndexStatus::parse);

        // The engine answers 408 when the wait times out
        if timed_out || response.status == 408 {
            return Err(Error::IndexLifecycle(format!(
                "index '{}' did not reach status {} within {:?} (current: {})",
                self.index,
                self.status,
                self.timeout,
                reported.map(|s| s.as_str()).unwrap_or("unknown")
            )));
        }
        ensure_success(&response)?;

        reported.ok_or_else(|| {
            TransportError::MalformedResponse(format!(
                "cluster health for '{}' has no status",
                self.index
            ))
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_index_typed_body() {
        let schema = IndexSchema::new(
            json!({"properties": {"title": {"type": "text"}}}),
            json!({"number_of_shards": 1}),
        )
        .unwrap();
        let mut aliases = BTreeMap::new();
        aliases.insert("book-read".to_string(), AliasDefinition::read());
        let work = CreateIndexWork::new("book-000001".into(), schema, aliases, Some("doc"));

        let request = work.request();
        assert_eq!(request.path, "/book-000001");
        assert_eq!(
            request.body,
            crate::transport::RequestBody::Json(json!({
                "settings": {"number_of_shards": 1},
                "mappings": {"doc": {"properties": {"title": {"type": "text"}}}},
                "aliases": {"book-read": {}}
            }))
        );
    }

    #[test]
    fn test_create_index_race_detected() {
        let work = CreateIndexWork::new(
            "book-000001".into(),
            IndexSchema::default(),
            BTreeMap::new(),
            None,
        );
        let response = WireResponse::new(
            400,
            json!({"error": {"type": "resource_already_exists_exception", "reason": "exists"}}),
        );
        assert!(matches!(
            work.handle_response(response),
            Err(Error::ConcurrentCreationDetected(name)) if name == "book-000001"
        ));

        let response = WireResponse::new(
            400,
            json!({"error": {"type": "illegal_argument_exception", "reason": "bad"}}),
        );
        assert!(matches!(work.handle_response(response), Err(Error::Engine { .. })));
    }

    #[test]
    fn test_drop_missing_index() {
        let missing = WireResponse::new(404, json!({"error": {"type": "index_not_found_exception"}}));
        let lenient = DropIndexWork::new("book-000001".into(), true);
        assert!(!lenient.handle_response(missing.clone()).unwrap());
        let strict = DropIndexWork::new("book-000001".into(), false);
        assert!(strict.handle_response(missing).is_err());
    }

    #[test]
    fn test_metadata_unwraps_mapping_type() {
        let work = GetIndexMetadataWork::new("book-read".into(), Some("doc"));
        let response = WireResponse::new(
            200,
            json!({
                "book-000002": {
                    "aliases": {"book-read": {}, "book-write": {"is_write_index": true}},
                    "mappings": {"doc": {"properties": {"title": {"type": "text"}}}},
                    "settings": {"index": {"number_of_shards": "1"}}
                },
                "book-000001": {"aliases": {"book-read": {}}, "mappings": {}, "settings": {}}
            }),
        );
        let metadata = work.handle_response(response).unwrap().unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].primary_name, "book-000001");
        assert_eq!(metadata[1].mappings, json!({"properties": {"title": {"type": "text"}}}));
        assert_eq!(metadata[1].aliases["book-write"].is_write_index, Some(true));
        assert_eq!(metadata[1].aliases["book-read"].is_write_index, None);

        let missing = WireResponse::new(404, json!({}));
        assert!(work.handle_response(missing).unwrap().is_none());
    }

    #[test]
    fn test_alias_actions_render() {
        let work = UpdateAliasesWork::new(vec![
            AliasAction::remove("book-000001", "book-write"),
            AliasAction::add("book-000002", "book-write", &AliasDefinition::write()),
        ]);
        assert_eq!(
            work.request().body,
            crate::transport::RequestBody::Json(json!({"actions": [
                {"remove": {"index": "book-000001", "alias": "book-write"}},
                {"add": {"index": "book-000002", "alias": "book-write", "is_write_index": true}}
            ]}))
        );
    }

    #[test]
    fn test_wait_for_status_timeout() {
        let work = WaitForIndexStatusWork::new(
            "book-000001".into(),
            IndexStatus::Green,
            Duration::from_secs(1),
        );
        let request = work.request();
        assert_eq!(request.param_value("wait_for_status"), Some("green"));
        assert_eq!(request.param_value("timeout"), Some("1000ms"));

        let timed_out = WireResponse::new(408, json!({"status": "yellow", "timed_out": true}));
        assert!(matches!(work.handle_response(timed_out), Err(Error::IndexLifecycle(_))));

        let ok = WireResponse::new(200, json!({"status": "green", "timed_out": false}));
        assert_eq!(work.handle_response(ok).unwrap(), IndexStatus::Green);
    }
}
