//! Engine dialects
//!
//! Every version-dependent rule lives behind a [`Dialect`], selected once at
//! bootstrap from the detected engine version and shared as `Arc<Dialect>`.
//!
//! | rule                         | Es56      | Es60      | Es64      | Es7                |
//! |------------------------------|-----------|-----------|-----------|--------------------|
//! | mapping type                 | `doc`     | `doc`     | `doc`     | none (`_doc` path) |
//! | `is_write_index` marker      | no        | no        | yes       | yes                |
//! | bulk routing member          | `_routing`| `_routing`| `_routing`| `routing`          |
//! | explain path                 | typed     | typed     | typed     | `/_explain/{id}`   |

mod analysis;
mod query;
mod registry;
mod version;

pub use analysis::AnalysisDefinitionFactory;
pub use query::QueryFactory;
pub use registry::DialectRegistry;
pub use version::{Distribution, EngineVersion};

use crate::lifecycle::SchemaValidator;
use crate::work::WorkFactory;

/// The closed set of supported engine release families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    /// Elasticsearch 5.6
    Es56,
    /// Elasticsearch 6.0 - 6.3
    Es60,
    /// Elasticsearch 6.4 - 6.8
    Es64,
    /// Elasticsearch 7.x / 8.x, OpenSearch 1.x / 2.x
    Es7,
}

impl DialectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialectKind::Es56 => "es-5.6",
            DialectKind::Es60 => "es-6.0",
            DialectKind::Es64 => "es-6.4",
            DialectKind::Es7 => "es-7",
        }
    }

    pub fn capabilities(&self) -> DialectCapabilities {
        match self {
            DialectKind::Es56 | DialectKind::Es60 => DialectCapabilities {
                mapping_type: Some("doc"),
                supports_write_index: false,
                bulk_routing_member: "_routing",
            },
            DialectKind::Es64 => DialectCapabilities {
                mapping_type: Some("doc"),
                supports_write_index: true,
                bulk_routing_member: "_routing",
            },
            DialectKind::Es7 => DialectCapabilities {
                mapping_type: None,
                supports_write_index: true,
                bulk_routing_member: "routing",
            },
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-format facts the factories consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectCapabilities {
    /// Mapping type name, `None` on typeless engines
    pub mapping_type: Option<&'static str>,
    /// Whether aliases accept the `is_write_index` marker
    pub supports_write_index: bool,
    /// Member carrying the routing value in bulk action headers
    pub bulk_routing_member: &'static str,
}

/// All version-dependent behavior for one engine release family.
#[derive(Debug, Clone)]
pub struct Dialect {
    kind: DialectKind,
    version: EngineVersion,
    work_factory: WorkFactory,
    schema_validator: SchemaValidator,
    query_factory: QueryFactory,
    analysis_factory: AnalysisDefinitionFactory,
}

impl Dialect {
    pub(crate) fn new(kind: DialectKind, version: EngineVersion) -> Self {
        let capabilities = kind.capabilities();
        Self {
            kind,
            version,
            work_factory: WorkFactory::new(capabilities),
            schema_validator: SchemaValidator::new(capabilities),
            query_factory: QueryFactory::new(capabilities),
            analysis_factory: AnalysisDefinitionFactory::new(capabilities),
        }
    }

    pub fn kind(&self) -> DialectKind {
        self.kind
    }

    /// The version this dialect was selected for
    pub fn version(&self) -> &EngineVersion {
        &self.version
    }

    pub fn capabilities(&self) -> DialectCapabilities {
        self.kind.capabilities()
    }

    /// The only way to construct works
    pub fn work_factory(&self) -> &WorkFactory {
        &self.work_factory
    }

    pub fn schema_validator(&self) -> &SchemaValidator {
        &self.schema_validator
    }

    pub fn query_factory(&self) -> &QueryFactory {
        &self.query_factory
    }

    pub fn analysis_factory(&self) -> &AnalysisDefinitionFactory {
        &self.analysis_factory
    }
}
