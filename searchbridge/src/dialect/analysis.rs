//! Analysis definitions (analyzers, normalizers) rendered per dialect.
//!
//! 7.x dropped the no-op `standard` token filter and the camelCase
//! `nGram` / `edgeNGram` names; older engines accept both spellings.

use super::DialectCapabilities;
use serde_json::{json, Map, Value};

/// Named analysis components, grouped the way index settings expect them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisDefinitions {
    pub analyzers: Map<String, Value>,
    pub normalizers: Map<String, Value>,
    pub tokenizers: Map<String, Value>,
    pub token_filters: Map<String, Value>,
    pub char_filters: Map<String, Value>,
}

impl AnalysisDefinitions {
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
            && self.normalizers.is_empty()
            && self.tokenizers.is_empty()
            && self.token_filters.is_empty()
            && self.char_filters.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisDefinitionFactory {
    capabilities: DialectCapabilities,
}

impl AnalysisDefinitionFactory {
    pub(crate) fn new(capabilities: DialectCapabilities) -> Self {
        Self { capabilities }
    }

    fn typeless(&self) -> bool {
        self.capabilities.mapping_type.is_none()
    }

    fn filter_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        if !self.typeless() {
            return Some(name);
        }
        match name {
            "standard" => None,
            "nGram" => Some("ngram"),
            "edgeNGram" => Some("edge_ngram"),
            other => Some(other),
        }
    }

    pub fn custom_analyzer(&self, tokenizer: &str, filters: &[&str], char_filters: &[&str]) -> Value {
        let tokenizer = match (self.typeless(), tokenizer) {
            (true, "nGram") => "ngram",
            (true, "edgeNGram") => "edge_ngram",
            (_, other) => other,
        };
        let filters: Vec<&str> = filters.iter().filter_map(|f| self.filter_name(f)).collect();
        let mut analyzer = json!({ "type": "custom", "tokenizer": tokenizer });
        if !filters.is_empty() {
            analyzer["filter"] = json!(filters);
        }
        if !char_filters.is_empty() {
            analyzer["char_filter"] = json!(char_filters);
        }
        analyzer
    }

    pub fn custom_normalizer(&self, filters: &[&str], char_filters: &[&str]) -> Value {
        let filters: Vec<&str> = filters.iter().filter_map(|f| self.filter_name(f)).collect();
        let mut normalizer = json!({ "type": "custom" });
        if !filters.is_empty() {
            normalizer["filter"] = json!(filters);
        }
        if !char_filters.is_empty() {
            normalizer["char_filter"] = json!(char_filters);
        }
        normalizer
    }

    /// The `analysis` member of index settings; empty groups are omitted.
    pub fn settings(&self, definitions: &AnalysisDefinitions) -> Value {
        let mut analysis = Map::new();
        let groups = [
            ("analyzer", &definitions.analyzers),
            ("normalizer", &definitions.normalizers),
            ("tokenizer", &definitions.tokenizers),
            ("filter", &definitions.token_filters),
            ("char_filter", &definitions.char_filters),
        ];
        for (key, group) in groups {
            if !group.is_empty() {
                analysis.insert(key.to_string(), Value::Object(group.clone()));
            }
        }
        json!({ "analysis": analysis })
    }
}
