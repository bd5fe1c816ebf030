//! Expected vs. actual schema comparison

use super::ExistingIndexMetadata;
use crate::dialect::DialectCapabilities;
use crate::naming::IndexNames;
use crate::schema::IndexSchema;
use serde::Serialize;
use serde_json::{Map, Value};

/// Mapping attributes compared for every expected property
const MAPPING_ATTRIBUTES: &[&str] = &[
    "type",
    "analyzer",
    "search_analyzer",
    "normalizer",
    "index",
    "store",
    "doc_values",
    "format",
    "null_value",
    "dynamic",
];

/// Value the engine assumes for an attribute it leaves out of a mapping.
///
/// Defaults are omitted when the engine echoes a mapping back, so an index
/// created from a schema that spells them out would otherwise never match.
fn engine_default(attribute: &str, actual_property: &Value) -> Option<Value> {
    let field_type = actual_property.get("type").and_then(Value::as_str);
    match attribute {
        "index" => Some(Value::Bool(true)),
        "store" => Some(Value::Bool(false)),
        "doc_values" => Some(Value::Bool(!matches!(field_type, Some("text") | Some("object") | Some("nested")))),
        "dynamic" => Some(Value::Bool(true)),
        "type" if actual_property.get("properties").is_some() => Some(Value::from("object")),
        "analyzer" if field_type == Some("text") => Some(Value::from("standard")),
        // Search analyzer follows the index analyzer unless set on its own
        "search_analyzer" if field_type == Some("text") => Some(
            actual_property
                .get("analyzer")
                .cloned()
                .unwrap_or_else(|| Value::from("standard")),
        ),
        "format" if matches!(field_type, Some("date") | Some("date_nanos")) => {
            Some(Value::from("strict_date_optional_time||epoch_millis"))
        }
        _ => None,
    }
}

fn attribute_matches(expected: &Value, actual: Option<&Value>, attribute: &str, actual_property: &Value) -> bool {
    match actual {
        Some(actual) => values_match(expected, actual),
        None => engine_default(attribute, actual_property).is_some_and(|d| values_match(expected, &d)),
    }
}

const ANALYSIS_GROUPS: &[&str] = &["analyzer", "normalizer", "tokenizer", "filter", "char_filter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailureKind {
    /// Expected property missing from the actual mapping
    MissingProperty,
    /// Property present with a different attribute value
    AttributeMismatch,
    MissingAnalysisDefinition,
    AnalysisMismatch,
    MissingAlias,
    /// Write alias present without the write marker
    MissingWriteMarker,
}

impl ValidationFailureKind {
    /// Whether the difference can be merged into the live index as-is
    pub fn is_additive(&self) -> bool {
        matches!(self, ValidationFailureKind::MissingProperty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    pub kind: ValidationFailureKind,
    /// Dotted path of the offending element, e.g. `mappings.author.properties.name.type`
    pub path: String,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ValidationFailureKind::MissingProperty => write!(f, "{}: missing property", self.path),
            ValidationFailureKind::MissingAnalysisDefinition => {
                write!(f, "{}: missing analysis definition", self.path)
            }
            ValidationFailureKind::MissingAlias => write!(f, "{}: missing alias", self.path),
            ValidationFailureKind::MissingWriteMarker => {
                write!(f, "{}: alias is not marked as write index", self.path)
            }
            ValidationFailureKind::AttributeMismatch | ValidationFailureKind::AnalysisMismatch => {
                write!(
                    f,
                    "{}: expected {}, found {}",
                    self.path,
                    self.expected.as_ref().map(Value::to_string).unwrap_or_else(|| "nothing".into()),
                    self.actual.as_ref().map(Value::to_string).unwrap_or_else(|| "nothing".into())
                )
            }
        }
    }
}

/// Every difference found between the expected schema and one index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Non-empty and made only of differences an update may merge
    pub fn is_additive(&self) -> bool {
        !self.failures.is_empty() && self.failures.iter().all(|f| f.kind.is_additive())
    }

    fn push(
        &mut self,
        kind: ValidationFailureKind,
        path: String,
        expected: Option<&Value>,
        actual: Option<&Value>,
    ) {
        self.failures.push(ValidationFailure {
            kind,
            path,
            expected: expected.cloned(),
            actual: actual.cloned(),
        });
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "  no differences");
        }
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", failure)?;
        }
        Ok(())
    }
}

/// Scalar equality that tolerates the engine echoing settings as strings.
fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| values_match(e, a))
        }
        (Value::Object(e), Value::Object(a)) => e
            .iter()
            .all(|(k, e)| a.get(k).is_some_and(|a| values_match(e, a))),
        (Value::Bool(e), Value::String(a)) => e.to_string() == *a,
        (Value::Number(e), Value::String(a)) => e.to_string() == *a,
        // A single-element list is often echoed back as a plain string
        (Value::Array(e), Value::String(_)) if e.len() == 1 => values_match(&e[0], actual),
        _ => expected == actual,
    }
}

/// Compares expected mappings, analysis and aliases with what an index has.
///
/// Only what the expected schema mentions is checked: extra actual
/// properties and attributes are ignored.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    capabilities: DialectCapabilities,
}

impl SchemaValidator {
    pub(crate) fn new(capabilities: DialectCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn validate(
        &self,
        expected: &IndexSchema,
        names: &IndexNames,
        actual: &ExistingIndexMetadata,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.validate_mappings(&expected.mappings, &actual.mappings, &mut report);
        self.validate_analysis(expected, actual, &mut report);
        self.validate_aliases(names, actual, &mut report);
        report
    }

    /// Schema validation without alias checks, for indexes outside the alias scheme
    pub fn validate_schema(
        &self,
        expected: &IndexSchema,
        actual: &ExistingIndexMetadata,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.validate_mappings(&expected.mappings, &actual.mappings, &mut report);
        self.validate_analysis(expected, actual, &mut report);
        report
    }

    fn validate_mappings(&self, expected: &Value, actual: &Value, report: &mut ValidationReport) {
        // Typed engines may still hand back the mapping type level
        let actual = match self.capabilities.mapping_type.and_then(|t| actual.get(t)) {
            Some(inner) => inner,
            None => actual,
        };

        if let Some(dynamic) = expected.get("dynamic") {
            let found = actual.get("dynamic");
            if !attribute_matches(dynamic, found, "dynamic", actual) {
                report.push(
                    ValidationFailureKind::AttributeMismatch,
                    "mappings.dynamic".into(),
                    Some(dynamic),
                    found,
                );
            }
        }

        if let Some(properties) = expected.get("properties").and_then(Value::as_object) {
            let actual_properties = actual.get("properties").and_then(Value::as_object);
            self.validate_properties("mappings", properties, actual_properties, report);
        }
    }

    fn validate_properties(
        &self,
        prefix: &str,
        expected: &Map<String, Value>,
        actual: Option<&Map<String, Value>>,
        report: &mut ValidationReport,
    ) {
        for (name, expected_property) in expected {
            let path = format!("{}.{}", prefix, name);
            let Some(actual_property) = actual.and_then(|a| a.get(name)) else {
                report.push(
                    ValidationFailureKind::MissingProperty,
                    path,
                    Some(expected_property),
                    None,
                );
                continue;
            };

            for attribute in MAPPING_ATTRIBUTES {
                let Some(expected_value) = expected_property.get(*attribute) else {
                    continue;
                };
                let actual_value = actual_property.get(*attribute);
                if !attribute_matches(expected_value, actual_value, attribute, actual_property) {
                    report.push(
                        ValidationFailureKind::AttributeMismatch,
                        format!("{}.{}", path, attribute),
                        Some(expected_value),
                        actual_value,
                    );
                }
            }

            for nested in ["properties", "fields"] {
                if let Some(children) = expected_property.get(nested).and_then(Value::as_object) {
                    let actual_children = actual_property.get(nested).and_then(Value::as_object);
                    self.validate_properties(
                        &format!("{}.{}", path, nested),
                        children,
                        actual_children,
                        report,
                    );
                }
            }
        }
    }

    fn validate_analysis(
        &self,
        expected: &IndexSchema,
        actual: &ExistingIndexMetadata,
        report: &mut ValidationReport,
    ) {
        let Some(expected_analysis) = expected
            .settings
            .get("analysis")
            .or_else(|| expected.settings.pointer("/index/analysis"))
        else {
            return;
        };
        let actual_analysis = actual.analysis();

        for group in ANALYSIS_GROUPS {
            let Some(definitions) = expected_analysis.get(*group).and_then(Value::as_object) else {
                continue;
            };
            for (name, definition) in definitions {
                let path = format!("settings.analysis.{}.{}", group, name);
                let found = actual_analysis
                    .and_then(|a| a.get(*group))
                    .and_then(|g| g.get(name));
                match found {
                    None => report.push(
                        ValidationFailureKind::MissingAnalysisDefinition,
                        path,
                        Some(definition),
                        None,
                    ),
                    Some(found) if !values_match(definition, found) => report.push(
                        ValidationFailureKind::AnalysisMismatch,
                        path,
                        Some(definition),
                        Some(found),
                    ),
                    Some(_) => {}
                }
            }
        }
    }

    fn validate_aliases(
        &self,
        names: &IndexNames,
        actual: &ExistingIndexMetadata,
        report: &mut ValidationReport,
    ) {
        match actual.aliases.get(&names.write_alias) {
            None => report.push(
                ValidationFailureKind::MissingAlias,
                format!("aliases.{}", names.write_alias),
                None,
                None,
            ),
            // Absence of the marker only matters where the engine supports it
            Some(alias)
                if self.capabilities.supports_write_index && alias.is_write_index != Some(true) =>
            {
                report.push(
                    ValidationFailureKind::MissingWriteMarker,
                    format!("aliases.{}.is_write_index", names.write_alias),
                    Some(&Value::Bool(true)),
                    alias.is_write_index.map(Value::Bool).as_ref(),
                )
            }
            Some(_) => {}
        }

        if !actual.has_alias(&names.read_alias) {
            report.push(
                ValidationFailureKind::MissingAlias,
                format!("aliases.{}", names.read_alias),
                None,
                None,
            );
        }
    }
}
