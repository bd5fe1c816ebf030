//! In-memory stand-in for an Elasticsearch-family cluster.
//!
//! Understands the subset of the REST API the backend sends: index and
//! alias administration, `_bulk`, broadcast maintenance endpoints, `_count`
//! and `_delete_by_query`. Every request is recorded, and every alias change
//! leaves a snapshot in the alias history.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use searchbridge::transport::{HttpMethod, RequestBody, Transport, WireRequest, WireResponse};
use searchbridge::TransportError;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Barrier, Notify};

#[derive(Debug, Clone, Default)]
pub struct FakeIndex {
    pub mappings: Value,
    pub settings: Value,
    /// Alias name -> `is_write_index` marker
    pub aliases: BTreeMap<String, Option<bool>>,
    pub docs: BTreeMap<String, (Value, Option<String>)>,
}

/// Alias name -> indexes behind it
pub type AliasSnapshot = BTreeMap<String, BTreeSet<String>>;

#[derive(Default)]
struct State {
    indexes: BTreeMap<String, FakeIndex>,
    requests: Vec<WireRequest>,
    alias_history: Vec<AliasSnapshot>,
    rejected_ids: BTreeSet<String>,
    bulk_failure: Option<TransportError>,
}

struct Gate {
    method: HttpMethod,
    path: String,
    barrier: Arc<Barrier>,
    remaining: usize,
}

pub struct FakeCluster {
    version: String,
    distribution: Option<String>,
    state: Mutex<State>,
    gate: Mutex<Option<Gate>>,
    stall_bulk: AtomicBool,
    bulk_seen: Notify,
}

impl FakeCluster {
    pub fn new(version: &str) -> Arc<Self> {
        Self::with_distribution(version, None)
    }

    pub fn opensearch(version: &str) -> Arc<Self> {
        Self::with_distribution(version, Some("opensearch"))
    }

    fn with_distribution(version: &str, distribution: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            version: version.to_string(),
            distribution: distribution.map(str::to_string),
            state: Mutex::new(State::default()),
            gate: Mutex::new(None),
            stall_bulk: AtomicBool::new(false),
            bulk_seen: Notify::new(),
        })
    }

    pub fn transport(self: &Arc<Self>) -> Arc<dyn Transport> {
        self.clone()
    }

    // ── Fault injection ─────────────────────────────────────────────────

    /// Bulk items for these document ids fail with a mapping error
    pub fn reject_ids<I: IntoIterator<Item = &'static str>>(&self, ids: I) {
        self.state
            .lock()
            .rejected_ids
            .extend(ids.into_iter().map(str::to_string));
    }

    /// Every later `_bulk` request fails below the HTTP layer
    pub fn fail_bulk_with(&self, error: Option<TransportError>) {
        self.state.lock().bulk_failure = error;
    }

    /// `_bulk` requests never get an answer until unstalled
    pub fn stall_bulk(&self, stall: bool) {
        self.stall_bulk.store(stall, Ordering::SeqCst);
    }

    /// Resolves once a `_bulk` request reached the cluster
    pub async fn bulk_received(&self) {
        self.bulk_seen.notified().await;
    }

    /// Hold the next `parties` requests matching `method path` until all of
    /// them arrived.
    pub fn gate(&self, method: HttpMethod, path: &str, parties: usize) {
        *self.gate.lock() = Some(Gate {
            method,
            path: path.to_string(),
            barrier: Arc::new(Barrier::new(parties)),
            remaining: parties,
        });
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn requests(&self) -> Vec<WireRequest> {
        self.state.lock().requests.clone()
    }

    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<WireRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// Operation count of each `_bulk` request received, in order
    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.requests_to(HttpMethod::Post, "/_bulk")
            .iter()
            .map(|r| bulk_headers(r).len())
            .collect()
    }

    /// Document ids of every `_bulk` operation received, in order
    pub fn bulk_ids(&self) -> Vec<String> {
        self.requests_to(HttpMethod::Post, "/_bulk")
            .iter()
            .flat_map(bulk_headers)
            .filter_map(|(_, meta)| meta.get("_id").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    pub fn index(&self, name: &str) -> Option<FakeIndex> {
        self.state.lock().indexes.get(name).cloned()
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().indexes.keys().cloned().collect()
    }

    pub fn alias_targets(&self, alias: &str) -> BTreeSet<String> {
        alias_snapshot(&self.state.lock().indexes)
            .remove(alias)
            .unwrap_or_default()
    }

    pub fn alias_history(&self) -> Vec<AliasSnapshot> {
        self.state.lock().alias_history.clone()
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.state
            .lock()
            .indexes
            .get(index)
            .and_then(|i| i.docs.get(id))
            .map(|(source, _)| source.clone())
    }

    pub fn document_routing(&self, index: &str, id: &str) -> Option<String> {
        self.state
            .lock()
            .indexes
            .get(index)
            .and_then(|i| i.docs.get(id))
            .and_then(|(_, routing)| routing.clone())
    }

    /// Put an index in place directly, as another process would have
    pub fn seed_index(&self, name: &str, index: FakeIndex) {
        let mut state = self.state.lock();
        state.indexes.insert(name.to_string(), index);
        let snapshot = alias_snapshot(&state.indexes);
        state.alias_history.push(snapshot);
    }

    async fn pass_gate(&self, request: &WireRequest) {
        let barrier = {
            let mut gate = self.gate.lock();
            match gate.as_mut() {
                Some(g) if g.method == request.method && g.path == request.path => {
                    g.remaining -= 1;
                    let barrier = g.barrier.clone();
                    if g.remaining == 0 {
                        *gate = None;
                    }
                    Some(barrier)
                }
                _ => None,
            }
        };
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }

    fn handle(&self, request: &WireRequest) -> WireResponse {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        let segments: Vec<&str> = request
            .path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let response = match (request.method, segments.as_slice()) {
            (HttpMethod::Get, []) => self.cluster_info(),
            (HttpMethod::Post, ["_aliases"]) => update_aliases(&mut state, json_body(request)),
            (HttpMethod::Post, ["_bulk"]) => bulk(&mut state, request),
            (HttpMethod::Get, ["_cluster", "health", index]) => health(&state, index),
            (HttpMethod::Put, [index]) => create_index(&mut state, index, json_body(request)),
            (HttpMethod::Delete, [index]) => drop_index(&mut state, index),
            (HttpMethod::Get, [name]) => get_index(&state, name),
            (HttpMethod::Put, [index, "_mapping", rest @ ..]) => {
                put_mapping(&mut state, index, rest.first().copied(), json_body(request))
            }
            (HttpMethod::Post, [_, "_refresh" | "_flush" | "_forcemerge"])
            | (HttpMethod::Post, ["_refresh" | "_flush" | "_forcemerge"]) => shards_ok(),
            (HttpMethod::Post, [targets, "_count"]) => count(&state, targets),
            (HttpMethod::Post, [targets, "_delete_by_query"]) => delete_by_query(&mut state, targets),
            _ => error(400, "unsupported_operation_exception", &request.to_string()),
        };

        if matches!(
            (request.method, segments.as_slice()),
            (HttpMethod::Post, ["_aliases"]) | (HttpMethod::Put, [_]) | (HttpMethod::Delete, [_])
        ) {
            let snapshot = alias_snapshot(&state.indexes);
            state.alias_history.push(snapshot);
        }
        response
    }

    fn cluster_info(&self) -> WireResponse {
        let mut version = json!({ "number": self.version });
        if let Some(distribution) = &self.distribution {
            version["distribution"] = json!(distribution);
        }
        WireResponse::new(200, json!({ "name": "fake-node", "version": version }))
    }
}

#[async_trait]
impl Transport for FakeCluster {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        self.pass_gate(request).await;

        if request.method == HttpMethod::Post && request.path == "/_bulk" {
            self.bulk_seen.notify_one();
            if self.stall_bulk.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            let mut state = self.state.lock();
            if let Some(failure) = state.bulk_failure.clone() {
                state.requests.push(request.clone());
                return Err(failure);
            }
        }
        Ok(self.handle(request))
    }
}

// ── Engine behavior ─────────────────────────────────────────────────────

fn json_body(request: &WireRequest) -> Value {
    match &request.body {
        RequestBody::Json(body) => body.clone(),
        _ => json!({}),
    }
}

fn bulk_headers(request: &WireRequest) -> Vec<(String, Map<String, Value>)> {
    let RequestBody::NdJson(lines) = &request.body else {
        return Vec::new();
    };
    let mut headers = Vec::new();
    let mut lines = lines.iter();
    while let Some(line) = lines.next() {
        let Some((operation, meta)) = line.as_object().and_then(|o| o.iter().next()) else {
            continue;
        };
        if operation != "delete" {
            lines.next();
        }
        headers.push((operation.clone(), meta.as_object().cloned().unwrap_or_default()));
    }
    headers
}

fn error(status: u16, error_type: &str, reason: &str) -> WireResponse {
    WireResponse::new(
        status,
        json!({ "error": { "type": error_type, "reason": reason }, "status": status }),
    )
}

fn shards_ok() -> WireResponse {
    WireResponse::new(200, json!({ "_shards": { "total": 1, "successful": 1, "failed": 0 } }))
}

fn alias_snapshot(indexes: &BTreeMap<String, FakeIndex>) -> AliasSnapshot {
    let mut snapshot = AliasSnapshot::new();
    for (name, index) in indexes {
        for alias in index.aliases.keys() {
            snapshot.entry(alias.clone()).or_default().insert(name.clone());
        }
    }
    snapshot
}

/// Indexes a name answers to: the index itself, or every index behind the alias.
fn resolve(indexes: &BTreeMap<String, FakeIndex>, name: &str) -> Vec<String> {
    if indexes.contains_key(name) {
        return vec![name.to_string()];
    }
    indexes
        .iter()
        .filter(|(_, index)| index.aliases.contains_key(name))
        .map(|(index_name, _)| index_name.clone())
        .collect()
}

fn resolve_all(indexes: &BTreeMap<String, FakeIndex>, targets: &str) -> Vec<String> {
    let mut resolved: Vec<String> = targets
        .split(',')
        .flat_map(|name| resolve(indexes, name))
        .collect();
    resolved.sort();
    resolved.dedup();
    resolved
}

/// The index a write through `name` lands in.
fn write_index(indexes: &BTreeMap<String, FakeIndex>, name: &str) -> Option<String> {
    let candidates = resolve(indexes, name);
    if candidates.len() == 1 {
        return candidates.into_iter().next();
    }
    candidates
        .into_iter()
        .find(|index| indexes[index].aliases.get(name) == Some(&Some(true)))
}

fn alias_entries(definition: Option<&Value>) -> BTreeMap<String, Option<bool>> {
    definition
        .and_then(Value::as_object)
        .map(|aliases| {
            aliases
                .iter()
                .map(|(name, alias)| {
                    (name.clone(), alias.get("is_write_index").and_then(Value::as_bool))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn create_index(state: &mut State, name: &str, body: Value) -> WireResponse {
    if !resolve(&state.indexes, name).is_empty() {
        return error(
            400,
            "resource_already_exists_exception",
            &format!("index [{}] already exists", name),
        );
    }
    let settings = match body.get("settings") {
        Some(settings) if settings.get("index").is_some() => settings.clone(),
        Some(settings) => json!({ "index": settings }),
        None => json!({ "index": {} }),
    };
    state.indexes.insert(
        name.to_string(),
        FakeIndex {
            mappings: without_defaults(body.get("mappings").cloned().unwrap_or_else(|| json!({}))),
            settings,
            aliases: alias_entries(body.get("aliases")),
            docs: BTreeMap::new(),
        },
    );
    WireResponse::new(200, json!({ "acknowledged": true, "index": name }))
}

/// Mappings as the engine stores them: attributes left at their default are
/// not echoed back by `GET /<index>`.
fn without_defaults(mut mapping: Value) -> Value {
    if let Value::Object(map) = &mut mapping {
        map.retain(|key, value| {
            !matches!(
                (key.as_str(), &*value),
                ("index", Value::Bool(true))
                    | ("store", Value::Bool(false))
                    | ("doc_values", Value::Bool(true))
                    | ("dynamic", Value::Bool(true))
            )
        });
        if map.get("format").and_then(Value::as_str) == Some("strict_date_optional_time||epoch_millis") {
            map.remove("format");
        }
        if map.get("search_analyzer").is_some() && map.get("search_analyzer") == map.get("analyzer") {
            map.remove("search_analyzer");
        }
        for value in map.values_mut() {
            let child = std::mem::take(value);
            *value = without_defaults(child);
        }
    }
    mapping
}

fn drop_index(state: &mut State, name: &str) -> WireResponse {
    match state.indexes.remove(name) {
        Some(_) => WireResponse::new(200, json!({ "acknowledged": true })),
        None => error(404, "index_not_found_exception", &format!("no such index [{}]", name)),
    }
}

fn get_index(state: &State, name: &str) -> WireResponse {
    let found = resolve(&state.indexes, name);
    if found.is_empty() {
        return error(404, "index_not_found_exception", &format!("no such index [{}]", name));
    }
    let mut body = Map::new();
    for index_name in found {
        let index = &state.indexes[&index_name];
        let aliases: Map<String, Value> = index
            .aliases
            .iter()
            .map(|(alias, marker)| {
                let definition = match marker {
                    Some(write) => json!({ "is_write_index": write }),
                    None => json!({}),
                };
                (alias.clone(), definition)
            })
            .collect();
        body.insert(
            index_name,
            json!({
                "aliases": aliases,
                "mappings": index.mappings,
                "settings": index.settings,
            }),
        );
    }
    WireResponse::new(200, Value::Object(body))
}

fn put_mapping(state: &mut State, name: &str, mapping_type: Option<&str>, body: Value) -> WireResponse {
    let Some(index) = state.indexes.get_mut(name) else {
        return error(404, "index_not_found_exception", &format!("no such index [{}]", name));
    };
    let target = match mapping_type {
        Some(t) => &mut index.mappings[t],
        None => &mut index.mappings,
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Some(new_properties) = body.get("properties").and_then(Value::as_object) {
        let properties = target
            .as_object_mut()
            .map(|m| m.entry("properties").or_insert_with(|| json!({})));
        if let Some(Value::Object(existing)) = properties {
            for (field, definition) in new_properties {
                existing
                    .entry(field.clone())
                    .or_insert_with(|| without_defaults(definition.clone()));
            }
        }
    }
    WireResponse::new(200, json!({ "acknowledged": true }))
}

fn update_aliases(state: &mut State, body: Value) -> WireResponse {
    let actions = body
        .get("actions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    // Check everything first: the engine applies all actions or none
    for action in &actions {
        let Some((_, params)) = action.as_object().and_then(|o| o.iter().next()) else {
            return error(400, "parse_exception", "malformed alias action");
        };
        let index = params.get("index").and_then(Value::as_str).unwrap_or_default();
        if !state.indexes.contains_key(index) {
            return error(404, "index_not_found_exception", &format!("no such index [{}]", index));
        }
    }

    for action in &actions {
        let Some((kind, params)) = action.as_object().and_then(|o| o.iter().next()) else {
            continue;
        };
        let index = params.get("index").and_then(Value::as_str).unwrap_or_default();
        let alias = params.get("alias").and_then(Value::as_str).unwrap_or_default();
        if let Some(target) = state.indexes.get_mut(index) {
            match kind.as_str() {
                "add" => {
                    target.aliases.insert(
                        alias.to_string(),
                        params.get("is_write_index").and_then(Value::as_bool),
                    );
                }
                "remove" => {
                    target.aliases.remove(alias);
                }
                _ => {}
            }
        }
    }
    WireResponse::new(200, json!({ "acknowledged": true }))
}

fn health(state: &State, index: &str) -> WireResponse {
    if state.indexes.contains_key(index) {
        WireResponse::new(200, json!({ "status": "green", "timed_out": false }))
    } else {
        WireResponse::new(408, json!({ "status": "red", "timed_out": true }))
    }
}

fn bulk(state: &mut State, request: &WireRequest) -> WireResponse {
    let RequestBody::NdJson(lines) = &request.body else {
        return error(400, "parse_exception", "bulk body must be NDJSON");
    };

    let mut items = Vec::new();
    let mut errors = false;
    let mut lines = lines.iter();
    while let Some(header) = lines.next() {
        let Some((operation, meta)) = header.as_object().and_then(|o| o.iter().next()) else {
            return error(400, "parse_exception", "malformed bulk header");
        };
        let source = if operation == "delete" {
            None
        } else {
            lines.next().cloned()
        };
        let target = meta.get("_index").and_then(Value::as_str).unwrap_or_default();
        let id = meta.get("_id").and_then(Value::as_str).unwrap_or_default();
        let routing = meta
            .get("routing")
            .or_else(|| meta.get("_routing"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let item = bulk_item(state, operation, target, id, routing, source);
        errors |= item.get("error").is_some();
        let mut entry = Map::new();
        entry.insert(operation.clone(), item);
        items.push(Value::Object(entry));
    }
    WireResponse::new(200, json!({ "took": 1, "errors": errors, "items": items }))
}

fn bulk_item(
    state: &mut State,
    operation: &str,
    target: &str,
    id: &str,
    routing: Option<String>,
    source: Option<Value>,
) -> Value {
    let item_error = |index: &str, status: u16, error_type: &str, reason: &str| {
        json!({
            "_index": index,
            "_id": id,
            "status": status,
            "error": { "type": error_type, "reason": reason },
        })
    };

    if state.rejected_ids.contains(id) {
        return item_error(target, 400, "mapper_parsing_exception", "failed to parse");
    }
    let Some(index_name) = write_index(&state.indexes, target) else {
        return item_error(target, 404, "index_not_found_exception", "no such index");
    };
    let Some(index) = state.indexes.get_mut(&index_name) else {
        return item_error(target, 404, "index_not_found_exception", "no such index");
    };

    let exists = index.docs.contains_key(id);
    match operation {
        "create" if exists => item_error(
            &index_name,
            409,
            "version_conflict_engine_exception",
            "document already exists",
        ),
        "index" | "create" => {
            index
                .docs
                .insert(id.to_string(), (source.unwrap_or(Value::Null), routing));
            let (status, result) = if exists { (200, "updated") } else { (201, "created") };
            json!({ "_index": index_name, "_id": id, "_version": 1, "result": result, "status": status })
        }
        "delete" => {
            let removed = index.docs.remove(id).is_some();
            let (status, result) = if removed { (200, "deleted") } else { (404, "not_found") };
            json!({ "_index": index_name, "_id": id, "_version": 1, "result": result, "status": status })
        }
        other => item_error(&index_name, 400, "illegal_argument_exception", other),
    }
}

fn count(state: &State, targets: &str) -> WireResponse {
    let total: usize = resolve_all(&state.indexes, targets)
        .iter()
        .map(|name| state.indexes[name].docs.len())
        .sum();
    WireResponse::new(200, json!({ "count": total, "_shards": { "failed": 0 } }))
}

fn delete_by_query(state: &mut State, targets: &str) -> WireResponse {
    let mut deleted = 0;
    for name in resolve_all(&state.indexes, targets) {
        if let Some(index) = state.indexes.get_mut(&name) {
            deleted += index.docs.len();
            index.docs.clear();
        }
    }
    WireResponse::new(200, json!({ "deleted": deleted, "failures": [] }))
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Bootstrap and start a backend against `cluster` with a TOML configuration
pub async fn start_backend(cluster: &Arc<FakeCluster>, config: &str) -> searchbridge::Backend {
    let config = searchbridge::Config::from_toml(config).unwrap();
    let backend = searchbridge::Backend::bootstrap(&config, cluster.transport())
        .await
        .unwrap();
    backend.start().await.unwrap();
    backend
}
