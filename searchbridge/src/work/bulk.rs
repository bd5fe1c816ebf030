//! The `_bulk` aggregate request and its per-item results

use super::{BulkableWork, DocumentWriteResult, Work, WorkKind};
use crate::config::RefreshStrategy;
use crate::transport::{HttpMethod, WireRequest, WireResponse};
use crate::{Result, TransportError};
use serde_json::Value;
use std::sync::Arc;

/// Several document writes sent in one round-trip, in queue order.
#[derive(Debug, Clone)]
pub struct BulkWork {
    items: Vec<Arc<dyn BulkableWork>>,
    refresh: RefreshStrategy,
}

impl BulkWork {
    pub(crate) fn new(items: Vec<Arc<dyn BulkableWork>>, refresh: RefreshStrategy) -> Self {
        Self { items, refresh }
    }

    pub fn items(&self) -> &[Arc<dyn BulkableWork>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Work for BulkWork {
    type Output = BulkResult;

    fn kind(&self) -> WorkKind {
        WorkKind::Bulk
    }

    fn request(&self) -> WireRequest {
        let lines = self.items.iter().flat_map(|item| item.bulk_lines()).collect();
        let mut request = WireRequest::new(HttpMethod::Post, "/_bulk");
        if self.refresh == RefreshStrategy::Force {
            request = request.param("refresh", "true");
        }
        request.ndjson(lines)
    }

    fn handle_response(&self, response: WireResponse) -> Result<BulkResult> {
        super::ensure_success(&response)?;
        BulkResult::from_body(response.body, self.items.len())
    }
}

/// One entry of a bulk response: `{"<operation>": {...}}`.
#[derive(Debug, Clone, Copy)]
pub struct BulkItem<'a> {
    pub operation: &'a str,
    pub body: &'a Value,
}

impl<'a> BulkItem<'a> {
    fn parse(entry: &'a Value) -> Option<Self> {
        let object = entry.as_object()?;
        let (operation, body) = object.iter().next()?;
        Some(Self {
            operation: operation.as_str(),
            body,
        })
    }

    pub fn id(&self) -> Option<&'a str> {
        self.body.get("_id").and_then(Value::as_str)
    }

    pub fn status(&self) -> u16 {
        self.body
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(500)
    }

    fn matches(&self, work: &dyn BulkableWork) -> bool {
        self.operation == work.operation().as_str() && self.id() == Some(work.document_id())
    }
}

/// Raw aggregate response of a bulk request.
///
/// [`BulkResult::extract`] is a pure function of the stored response, the
/// work and its submission position: calling it again gives the same answer.
#[derive(Debug, Clone)]
pub struct BulkResult {
    took: u64,
    errors: bool,
    items: Vec<Value>,
}

impl BulkResult {
    fn from_body(mut body: Value, expected_items: usize) -> Result<Self> {
        let items = match body.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(TransportError::MalformedResponse(
                    "bulk response has no 'items' array".to_string(),
                )
                .into())
            }
        };
        if items.len() != expected_items {
            tracing::warn!(
                "Bulk response has {} items for {} operations",
                items.len(),
                expected_items
            );
        }
        Ok(Self {
            took: body.get("took").and_then(Value::as_u64).unwrap_or(0),
            errors: body.get("errors").and_then(Value::as_bool).unwrap_or(false),
            items,
        })
    }

    /// Engine-side processing time in milliseconds
    pub fn took(&self) -> u64 {
        self.took
    }

    /// Whether the engine flagged at least one failed item
    pub fn has_errors(&self) -> bool {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Result of the work submitted at position `index`.
    ///
    /// The entry at `index` is used when it carries the work's operation and
    /// id. Otherwise the entry is looked up by that key, which only succeeds
    /// when exactly one entry matches; if it does not, position decides.
    pub fn extract(&self, work: &dyn BulkableWork, index: usize) -> Result<DocumentWriteResult> {
        let item = self.locate(work, index)?;
        work.handle_bulk_item(&item)
    }

    fn locate(&self, work: &dyn BulkableWork, index: usize) -> Result<BulkItem<'_>> {
        let positional = self.items.get(index).and_then(BulkItem::parse);
        if let Some(item) = positional {
            if item.matches(work) {
                return Ok(item);
            }
        }

        let mut keyed = self
            .items
            .iter()
            .filter_map(BulkItem::parse)
            .filter(|item| item.matches(work));
        if let (Some(item), None) = (keyed.next(), keyed.next()) {
            return Ok(item);
        }

        positional.ok_or_else(|| {
            TransportError::MalformedResponse(format!(
                "bulk response has no usable item at position {} ({} items)",
                index,
                self.items.len()
            ))
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::work::{WorkFactory, WriteOutcome};
    use crate::Error;
    use serde_json::json;

    fn factory() -> WorkFactory {
        WorkFactory::new(DialectKind::Es7.capabilities())
    }

    fn result(items: Value) -> BulkResult {
        BulkResult::from_body(json!({"took": 3, "errors": false, "items": items}), 2).unwrap()
    }

    #[test]
    fn test_request_shape_single_item() {
        let work = factory().index("book-write", "1", None, json!({"title": "Dune"}));
        let item: Arc<dyn BulkableWork> = Arc::new(work);
        let bulk = factory().bulk(vec![item], RefreshStrategy::Force);
        let request = bulk.request();
        assert_eq!(request.path, "/_bulk");
        assert_eq!(request.param_value("refresh"), Some("true"));
        assert_eq!(
            request.body,
            crate::transport::RequestBody::NdJson(vec![
                json!({"index": {"_index": "book-write", "_id": "1"}}),
                json!({"title": "Dune"}),
            ])
        );
    }

    #[test]
    fn test_extract_is_idempotent() {
        let work = factory().index("book-write", "1", None, json!({}));
        let result = result(json!([
            {"index": {"_index": "book-000001", "_id": "1", "status": 201, "result": "created"}}
        ]));
        let first = result.extract(&work, 0).unwrap();
        let second = result.extract(&work, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.outcome, WriteOutcome::Created);
    }

    #[test]
    fn test_extract_resolves_reordered_items_by_key() {
        let a = factory().index("book-write", "a", None, json!({}));
        let b = factory().delete("book-write", "b", None);
        let result = result(json!([
            {"delete": {"_index": "book-000001", "_id": "b", "status": 200, "result": "deleted"}},
            {"index": {"_index": "book-000001", "_id": "a", "status": 200, "result": "updated"}}
        ]));
        assert_eq!(result.extract(&a, 0).unwrap().outcome, WriteOutcome::Updated);
        assert_eq!(result.extract(&b, 1).unwrap().outcome, WriteOutcome::Deleted);
    }

    #[test]
    fn test_extract_falls_back_to_position_without_key() {
        let a = factory().index("book-write", "a", None, json!({}));
        let result = result(json!([
            {"index": {"_index": "book-000001", "status": 201, "result": "created"}}
        ]));
        let extracted = result.extract(&a, 0).unwrap();
        assert_eq!(extracted.id, "a");
    }

    #[test]
    fn test_missing_item_is_malformed() {
        let a = factory().index("book-write", "a", None, json!({}));
        let result = result(json!([]));
        assert!(matches!(
            result.extract(&a, 0),
            Err(Error::Transport(TransportError::MalformedResponse(_)))
        ));
    }

    #[test]
    fn test_missing_items_array_is_malformed() {
        let bulk = factory().bulk(Vec::new(), RefreshStrategy::None);
        let err = bulk
            .handle_response(WireResponse::new(200, json!({"took": 1})))
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
