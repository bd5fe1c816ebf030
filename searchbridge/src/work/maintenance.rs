//! Index maintenance, search-side helpers and version detection

use super::{ensure_no_shard_failures, ensure_success, Work, WorkKind};
use crate::dialect::{Distribution, EngineVersion};
use crate::transport::{HttpMethod, WireRequest, WireResponse};
use crate::{Result, TransportError};
use serde_json::{json, Value};

fn index_path(indexes: &[String], endpoint: &str) -> String {
    if indexes.is_empty() {
        format!("/{}", endpoint)
    } else {
        format!("/{}/{}", indexes.join(","), endpoint)
    }
}

fn count_member(body: &Value, member: &str, what: &str) -> Result<u64> {
    body.get(member).and_then(Value::as_u64).ok_or_else(|| {
        TransportError::MalformedResponse(format!("{} response has no '{}' count", what, member))
            .into()
    })
}

/// Persist in-memory segments to disk. No indexes means every index.
#[derive(Debug, Clone)]
pub struct FlushWork {
    indexes: Vec<String>,
}

impl FlushWork {
    pub(crate) fn new(indexes: Vec<String>) -> Self {
        Self { indexes }
    }
}

impl Work for FlushWork {
    type Output = ();

    fn kind(&self) -> WorkKind {
        WorkKind::Flush
    }

    fn request(&self) -> WireRequest {
        WireRequest::new(HttpMethod::Post, index_path(&self.indexes, "_flush"))
    }

    fn handle_response(&self, response: WireResponse) -> Result<()> {
        ensure_no_shard_failures(&response)
    }
}

/// Make recent writes visible to searches.
#[derive(Debug, Clone)]
pub struct RefreshWork {
    indexes: Vec<String>,
}

impl RefreshWork {
    pub(crate) fn new(indexes: Vec<String>) -> Self {
        Self { indexes }
    }
}

impl Work for RefreshWork {
    type Output = ();

    fn kind(&self) -> WorkKind {
        WorkKind::Refresh
    }

    fn request(&self) -> WireRequest {
        WireRequest::new(HttpMethod::Post, index_path(&self.indexes, "_refresh"))
    }

    fn handle_response(&self, response: WireResponse) -> Result<()> {
        ensure_no_shard_failures(&response)
    }
}

/// Force merge down to `max_num_segments` (engine default when unset).
#[derive(Debug, Clone)]
pub struct MergeSegmentsWork {
    indexes: Vec<String>,
    max_num_segments: Option<u32>,
}

impl MergeSegmentsWork {
    pub(crate) fn new(indexes: Vec<String>, max_num_segments: Option<u32>) -> Self {
        Self {
            indexes,
            max_num_segments,
        }
    }
}

impl Work for MergeSegmentsWork {
    type Output = ();

    fn kind(&self) -> WorkKind {
        WorkKind::MergeSegments
    }

    fn request(&self) -> WireRequest {
        let request = WireRequest::new(HttpMethod::Post, index_path(&self.indexes, "_forcemerge"));
        match self.max_num_segments {
            Some(n) => request.param("max_num_segments", n.to_string()),
            None => request,
        }
    }

    fn handle_response(&self, response: WireResponse) -> Result<()> {
        ensure_no_shard_failures(&response)
    }
}

/// Score explanation of one document for a query.
#[derive(Debug, Clone)]
pub struct ExplainWork {
    index: String,
    id: String,
    query: Value,
    routing: Option<String>,
    mapping_type: Option<&'static str>,
}

impl ExplainWork {
    pub(crate) fn new(
        index: String,
        id: String,
        query: Value,
        routing: Option<String>,
        mapping_type: Option<&'static str>,
    ) -> Self {
        Self {
            index,
            id,
            query,
            routing,
            mapping_type,
        }
    }
}

impl Work for ExplainWork {
    /// The engine's `explanation` tree
    type Output = Value;

    fn kind(&self) -> WorkKind {
        WorkKind::Explain
    }

    fn request(&self) -> WireRequest {
        let path = match self.mapping_type {
            Some(mapping_type) => format!("/{}/{}/{}/_explain", self.index, mapping_type, self.id),
            None => format!("/{}/_explain/{}", self.index, self.id),
        };
        let mut request = WireRequest::new(HttpMethod::Post, path);
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.clone());
        }
        request.json(json!({ "query": self.query }))
    }

    fn handle_response(&self, mut response: WireResponse) -> Result<Value> {
        ensure_success(&response)?;
        match response.body.get_mut("explanation").map(Value::take) {
            Some(explanation) => Ok(explanation),
            None => Err(TransportError::MalformedResponse(format!(
                "explain response for {}/{} has no explanation",
                self.index, self.id
            ))
            .into()),
        }
    }
}

/// Number of documents matching a query (all documents without one).
#[derive(Debug, Clone)]
pub struct CountWork {
    indexes: Vec<String>,
    query: Option<Value>,
    routing: Option<String>,
}

impl CountWork {
    pub(crate) fn new(indexes: Vec<String>, query: Option<Value>, routing: Option<String>) -> Self {
        Self {
            indexes,
            query,
            routing,
        }
    }
}

impl Work for CountWork {
    type Output = u64;

    fn kind(&self) -> WorkKind {
        WorkKind::Count
    }

    fn request(&self) -> WireRequest {
        let mut request = WireRequest::new(HttpMethod::Post, index_path(&self.indexes, "_count"));
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.clone());
        }
        match &self.query {
            Some(query) => request.json(json!({ "query": query })),
            None => request,
        }
    }

    fn handle_response(&self, response: WireResponse) -> Result<u64> {
        ensure_success(&response)?;
        count_member(&response.body, "count", "count")
    }
}

/// Delete every document matching a query; version conflicts are skipped.
#[derive(Debug, Clone)]
pub struct DeleteByQueryWork {
    indexes: Vec<String>,
    query: Value,
    routing: Option<String>,
}

impl DeleteByQueryWork {
    pub(crate) fn new(indexes: Vec<String>, query: Value, routing: Option<String>) -> Self {
        Self {
            indexes,
            query,
            routing,
        }
    }
}

impl Work for DeleteByQueryWork {
    /// Number of deleted documents
    type Output = u64;

    fn kind(&self) -> WorkKind {
        WorkKind::DeleteByQuery
    }

    fn request(&self) -> WireRequest {
        let mut request = WireRequest::new(
            HttpMethod::Post,
            index_path(&self.indexes, "_delete_by_query"),
        )
        .param("conflicts", "proceed");
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.clone());
        }
        request.json(json!({ "query": self.query }))
    }

    fn handle_response(&self, response: WireResponse) -> Result<u64> {
        ensure_success(&response)?;
        let failures = response
            .body
            .get("failures")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        if failures > 0 {
            tracing::warn!("Delete by query reported {} failures", failures);
        }
        count_member(&response.body, "deleted", "delete by query")
    }
}

/// `GET /`: the only work that runs before a dialect is known.
#[derive(Debug, Clone, Default)]
pub struct ClusterVersionWork;

impl ClusterVersionWork {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl Work for ClusterVersionWork {
    type Output = EngineVersion;

    fn kind(&self) -> WorkKind {
        WorkKind::ClusterVersion
    }

    fn request(&self) -> WireRequest {
        WireRequest::new(HttpMethod::Get, "/")
    }

    fn handle_response(&self, response: WireResponse) -> Result<EngineVersion> {
        ensure_success(&response)?;
        let number = response
            .body
            .pointer("/version/number")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TransportError::MalformedResponse("cluster info has no version.number".into())
            })?;
        let distribution = match response
            .body
            .pointer("/version/distribution")
            .and_then(Value::as_str)
        {
            Some(name) => name.parse()?,
            None => Distribution::Elastic,
        };

        let mut version = EngineVersion::parse(number)?;
        version.distribution = distribution;
        Ok(version)
    }
}
