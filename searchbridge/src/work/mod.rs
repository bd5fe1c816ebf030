//! Work model
//!
//! A work is an immutable description of one engine operation that knows how
//! to render its request and decode its response. Works are only built by
//! the active dialect's [`WorkFactory`], so wire-format differences never
//! leak into the orchestrator.
//!
//! Document writes additionally implement [`BulkableWork`] and can travel
//! inside one aggregate `_bulk` request; their per-item result is decoded
//! from the aggregate response through [`BulkResult::extract`].

mod admin;
mod bulk;
mod document;
mod factory;
mod maintenance;

pub use admin::{
    AliasAction, AliasDefinition, CreateIndexWork, DropIndexWork, GetIndexMetadataWork,
    PutMappingWork, UpdateAliasesWork, WaitForIndexStatusWork,
};
pub use bulk::{BulkItem, BulkResult, BulkWork};
pub use document::{BulkOperation, DeleteWork, IndexWork};
pub use factory::WorkFactory;
pub use maintenance::{
    ClusterVersionWork, CountWork, DeleteByQueryWork, ExplainWork, FlushWork, MergeSegmentsWork,
    RefreshWork,
};

use crate::transport::{WireRequest, WireResponse};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of operations the backend sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkKind {
    Index,
    Delete,
    CreateIndex,
    DropIndex,
    Flush,
    Refresh,
    MergeSegments,
    Explain,
    Bulk,
    GetIndexMetadata,
    PutMapping,
    UpdateAliases,
    WaitForIndexStatus,
    Count,
    DeleteByQuery,
    ClusterVersion,
}

impl WorkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Index => "index",
            WorkKind::Delete => "delete",
            WorkKind::CreateIndex => "create_index",
            WorkKind::DropIndex => "drop_index",
            WorkKind::Flush => "flush",
            WorkKind::Refresh => "refresh",
            WorkKind::MergeSegments => "merge_segments",
            WorkKind::Explain => "explain",
            WorkKind::Bulk => "bulk",
            WorkKind::GetIndexMetadata => "get_index_metadata",
            WorkKind::PutMapping => "put_mapping",
            WorkKind::UpdateAliases => "update_aliases",
            WorkKind::WaitForIndexStatus => "wait_for_index_status",
            WorkKind::Count => "count",
            WorkKind::DeleteByQuery => "delete_by_query",
            WorkKind::ClusterVersion => "cluster_version",
        }
    }
}

impl std::fmt::Display for WorkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One engine operation sent as its own round-trip.
pub trait Work: Send + Sync + std::fmt::Debug {
    type Output: Send + 'static;

    fn kind(&self) -> WorkKind;

    fn request(&self) -> WireRequest;

    fn handle_response(&self, response: WireResponse) -> Result<Self::Output>;
}

/// A document operation that can be embedded in a `_bulk` request.
pub trait BulkableWork: Send + Sync + std::fmt::Debug {
    fn operation(&self) -> BulkOperation;

    fn target_index(&self) -> &str;

    fn document_id(&self) -> &str;

    /// Action header line, followed by the source line when there is one.
    fn bulk_lines(&self) -> Vec<Value>;

    /// Approximate NDJSON size, used for the payload-size flush threshold.
    fn estimated_size(&self) -> usize {
        self.bulk_lines()
            .iter()
            .map(|line| line.to_string().len() + 1)
            .sum()
    }

    /// Decode this work's entry of an aggregate response.
    fn handle_bulk_item(&self, item: &BulkItem<'_>) -> Result<DocumentWriteResult>;
}

/// What a document write did, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Updated,
    Deleted,
    NotFound,
    Noop,
}

impl WriteOutcome {
    fn parse(result: &str) -> Option<Self> {
        match result {
            "created" => Some(WriteOutcome::Created),
            "updated" => Some(WriteOutcome::Updated),
            "deleted" => Some(WriteOutcome::Deleted),
            "not_found" => Some(WriteOutcome::NotFound),
            "noop" => Some(WriteOutcome::Noop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWriteResult {
    /// Physical index that applied the write
    pub index: String,
    pub id: String,
    pub version: Option<i64>,
    pub outcome: WriteOutcome,
    pub status: u16,
}

/// Engine-side rejection of one document operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DocumentRejection {
    pub index: String,
    pub id: String,
    pub status: u16,
    pub error_type: String,
    pub reason: String,
}

impl DocumentRejection {
    pub(crate) fn into_item_failure(self) -> Error {
        Error::ItemFailure {
            index: self.index,
            id: self.id,
            status: self.status,
            error_type: self.error_type,
            reason: self.reason,
        }
    }

    pub(crate) fn into_engine_error(self) -> Error {
        Error::Engine {
            status: self.status,
            error_type: self.error_type,
            reason: format!("{}/{}: {}", self.index, self.id, self.reason),
        }
    }
}

/// Decode a document write response (single request or one bulk item).
///
/// Deleting a missing document is not a failure: it reports `NotFound`.
pub(crate) fn parse_document_response(
    operation: BulkOperation,
    fallback_index: &str,
    fallback_id: &str,
    status: u16,
    body: &Value,
) -> std::result::Result<DocumentWriteResult, DocumentRejection> {
    let index = body
        .get("_index")
        .and_then(Value::as_str)
        .unwrap_or(fallback_index)
        .to_string();
    let id = body
        .get("_id")
        .and_then(Value::as_str)
        .unwrap_or(fallback_id)
        .to_string();

    if body.get("error").is_some() || (status >= 300 && status != 404) {
        let (error_type, reason) = crate::transport::error_details(body);
        return Err(DocumentRejection {
            index,
            id,
            status,
            error_type,
            reason,
        });
    }

    let outcome = body
        .get("result")
        .and_then(Value::as_str)
        .and_then(WriteOutcome::parse)
        .unwrap_or_else(|| match operation {
            BulkOperation::Delete => {
                if status == 404 || body.get("found") == Some(&Value::Bool(false)) {
                    WriteOutcome::NotFound
                } else {
                    WriteOutcome::Deleted
                }
            }
            BulkOperation::Index | BulkOperation::Create => {
                if status == 201 {
                    WriteOutcome::Created
                } else {
                    WriteOutcome::Updated
                }
            }
        });

    if status == 404 && !(operation == BulkOperation::Delete && outcome == WriteOutcome::NotFound) {
        let (error_type, reason) = crate::transport::error_details(body);
        return Err(DocumentRejection {
            index,
            id,
            status,
            error_type,
            reason,
        });
    }

    Ok(DocumentWriteResult {
        index,
        id,
        version: body.get("_version").and_then(Value::as_i64),
        outcome,
        status,
    })
}

/// Engine error carried by a non-2xx response.
pub(crate) fn engine_error(response: &WireResponse) -> Error {
    let (error_type, reason) = response.error_details();
    Error::Engine {
        status: response.status,
        error_type,
        reason,
    }
}

pub(crate) fn ensure_success(response: &WireResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(engine_error(response))
    }
}

/// Fail when the engine reports failed shards for a broadcast operation.
pub(crate) fn ensure_no_shard_failures(response: &WireResponse) -> Result<()> {
    ensure_success(response)?;
    let failed = response
        .body
        .pointer("/_shards/failed")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if failed > 0 {
        let failures = response
            .body
            .pointer("/_shards/failures")
            .map(Value::to_string)
            .unwrap_or_default();
        return Err(Error::Engine {
            status: response.status,
            error_type: "shard_failure".to_string(),
            reason: format!("{} shard(s) failed: {}", failed, failures),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_created() {
        let result = parse_document_response(
            BulkOperation::Index,
            "book-write",
            "1",
            201,
            &json!({"_index": "book-000001", "_id": "1", "_version": 1, "result": "created"}),
        )
        .unwrap();
        assert_eq!(result.index, "book-000001");
        assert_eq!(result.outcome, WriteOutcome::Created);
        assert_eq!(result.version, Some(1));
    }

    #[test]
    fn test_delete_missing_document_is_not_a_failure() {
        let result = parse_document_response(
            BulkOperation::Delete,
            "book-write",
            "42",
            404,
            &json!({"_index": "book-000001", "_id": "42", "result": "not_found"}),
        )
        .unwrap();
        assert_eq!(result.outcome, WriteOutcome::NotFound);
    }

    #[test]
    fn test_missing_index_is_a_rejection() {
        let rejection = parse_document_response(
            BulkOperation::Delete,
            "book-write",
            "42",
            404,
            &json!({"error": {"type": "index_not_found_exception", "reason": "no such index"}}),
        )
        .unwrap_err();
        assert_eq!(rejection.error_type, "index_not_found_exception");
        assert_eq!(rejection.index, "book-write");
    }

    #[test]
    fn test_version_conflict_is_a_rejection() {
        let rejection = parse_document_response(
            BulkOperation::Create,
            "book-write",
            "1",
            409,
            &json!({
                "_index": "book-000001",
                "_id": "1",
                "status": 409,
                "error": {"type": "version_conflict_engine_exception", "reason": "document already exists"}
            }),
        )
        .unwrap_err();
        assert!(matches!(
            rejection.into_item_failure(),
            Error::ItemFailure { status: 409, .. }
        ));
    }

    #[test]
    fn test_shard_failures_detected() {
        let response = WireResponse::new(
            200,
            json!({"_shards": {"total": 2, "successful": 1, "failed": 1, "failures": []}}),
        );
        assert!(ensure_no_shard_failures(&response).is_err());
    }
}
