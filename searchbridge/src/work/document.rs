//! Document writes: index, create, delete

use super::{parse_document_response, BulkItem, BulkableWork, DocumentWriteResult, Work, WorkKind};
use crate::config::RefreshStrategy;
use crate::transport::{HttpMethod, WireRequest, WireResponse};
use crate::Result;
use serde_json::{Map, Value};

/// Bulk action name of a document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkOperation {
    Index,
    Create,
    Delete,
}

impl BulkOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOperation::Index => "index",
            BulkOperation::Create => "create",
            BulkOperation::Delete => "delete",
        }
    }
}

/// Where a document lives and how the dialect addresses it.
#[derive(Debug, Clone)]
pub(crate) struct DocumentTarget {
    pub index: String,
    pub id: String,
    pub routing: Option<String>,
    pub mapping_type: Option<&'static str>,
    pub bulk_routing_member: &'static str,
}

impl DocumentTarget {
    fn path(&self) -> String {
        format!(
            "/{}/{}/{}",
            self.index,
            self.mapping_type.unwrap_or("_doc"),
            self.id
        )
    }

    fn header(&self, operation: BulkOperation) -> Value {
        let mut meta = Map::new();
        meta.insert("_index".into(), Value::String(self.index.clone()));
        if let Some(mapping_type) = self.mapping_type {
            meta.insert("_type".into(), Value::String(mapping_type.to_string()));
        }
        meta.insert("_id".into(), Value::String(self.id.clone()));
        if let Some(routing) = &self.routing {
            meta.insert(self.bulk_routing_member.into(), Value::String(routing.clone()));
        }
        let mut header = Map::new();
        header.insert(operation.as_str().into(), Value::Object(meta));
        Value::Object(header)
    }

    fn request(&self, method: HttpMethod, refresh: RefreshStrategy) -> WireRequest {
        let mut request = WireRequest::new(method, self.path());
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.clone());
        }
        if refresh == RefreshStrategy::Force {
            request = request.param("refresh", "true");
        }
        request
    }
}

/// Add or replace a document (`create` fails when it already exists).
#[derive(Debug, Clone)]
pub struct IndexWork {
    operation: BulkOperation,
    target: DocumentTarget,
    source: Value,
    refresh: RefreshStrategy,
}

impl IndexWork {
    pub(crate) fn new(operation: BulkOperation, target: DocumentTarget, source: Value) -> Self {
        Self {
            operation,
            target,
            source,
            refresh: RefreshStrategy::None,
        }
    }

    /// Refresh behaviour when sent on its own (bulk requests carry their own)
    pub fn with_refresh(mut self, refresh: RefreshStrategy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn routing(&self) -> Option<&str> {
        self.target.routing.as_deref()
    }

    pub fn source(&self) -> &Value {
        &self.source
    }
}

impl Work for IndexWork {
    type Output = DocumentWriteResult;

    fn kind(&self) -> WorkKind {
        WorkKind::Index
    }

    fn request(&self) -> WireRequest {
        let mut request = self.target.request(HttpMethod::Put, self.refresh);
        if self.operation == BulkOperation::Create {
            request = request.param("op_type", "create");
        }
        request.json(self.source.clone())
    }

    fn handle_response(&self, response: WireResponse) -> Result<DocumentWriteResult> {
        parse_document_response(
            self.operation,
            &self.target.index,
            &self.target.id,
            response.status,
            &response.body,
        )
        .map_err(|r| r.into_engine_error())
    }
}

impl BulkableWork for IndexWork {
    fn operation(&self) -> BulkOperation {
        self.operation
    }

    fn target_index(&self) -> &str {
        &self.target.index
    }

    fn document_id(&self) -> &str {
        &self.target.id
    }

    fn bulk_lines(&self) -> Vec<Value> {
        vec![self.target.header(self.operation), self.source.clone()]
    }

    fn handle_bulk_item(&self, item: &BulkItem<'_>) -> Result<DocumentWriteResult> {
        parse_document_response(
            self.operation,
            &self.target.index,
            &self.target.id,
            item.status(),
            item.body,
        )
        .map_err(|r| r.into_item_failure())
    }
}

#[derive(Debug, Clone)]
pub struct DeleteWork {
    target: DocumentTarget,
    refresh: RefreshStrategy,
}

impl DeleteWork {
    pub(crate) fn new(target: DocumentTarget) -> Self {
        Self {
            target,
            refresh: RefreshStrategy::None,
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshStrategy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn routing(&self) -> Option<&str> {
        self.target.routing.as_deref()
    }
}

impl Work for DeleteWork {
    type Output = DocumentWriteResult;

    fn kind(&self) -> WorkKind {
        WorkKind::Delete
    }

    fn request(&self) -> WireRequest {
        self.target.request(HttpMethod::Delete, self.refresh)
    }

    fn handle_response(&self, response: WireResponse) -> Result<DocumentWriteResult> {
        parse_document_response(
            BulkOperation::Delete,
            &self.target.index,
            &self.target.id,
            response.status,
            &response.body,
        )
        .map_err(|r| r.into_engine_error())
    }
}

impl BulkableWork for DeleteWork {
    fn operation(&self) -> BulkOperation {
        BulkOperation::Delete
    }

    fn target_index(&self) -> &str {
        &self.target.index
    }

    fn document_id(&self) -> &str {
        &self.target.id
    }

    fn bulk_lines(&self) -> Vec<Value> {
        vec![self.target.header(BulkOperation::Delete)]
    }

    fn handle_bulk_item(&self, item: &BulkItem<'_>) -> Result<DocumentWriteResult> {
        parse_document_response(
            BulkOperation::Delete,
            &self.target.index,
            &self.target.id,
            item.status(),
            item.body,
        )
        .map_err(|r| r.into_item_failure())
    }
}
