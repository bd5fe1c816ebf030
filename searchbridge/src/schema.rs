//! Expected index schema (mappings + settings)
//!
//! Schemas are plain JSON trees so the same file works across dialects:
//!
//! ```yaml
//! mappings:
//!   dynamic: strict
//!   properties:
//!     title: { type: text, analyzer: english }
//!     isbn: { type: keyword }
//! settings:
//!   analysis:
//!     normalizer:
//!       lowercase: { type: custom, filter: [lowercase] }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    #[serde(default = "empty_mappings")]
    pub mappings: Value,
    #[serde(default = "empty_object")]
    pub settings: Value,
}

fn empty_mappings() -> Value {
    json!({ "properties": {} })
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self {
            mappings: empty_mappings(),
            settings: empty_object(),
        }
    }
}

impl IndexSchema {
    pub fn new(mappings: Value, settings: Value) -> Result<Self> {
        let schema = Self { mappings, settings };
        schema.check()?;
        Ok(schema)
    }

    /// Load a schema from a `.yaml`/`.yml` or `.json` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let schema: IndexSchema = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(Error::Configuration(format!(
                    "unsupported schema file extension: {}",
                    path.display()
                )))
            }
        };
        schema.check().map_err(|e| {
            Error::Configuration(format!("invalid schema {}: {}", path.display(), e))
        })?;
        Ok(schema)
    }

    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.mappings.get("properties").and_then(Value::as_object)
    }

    /// Shape checks done once at the boundary so lifecycle code can rely on them.
    fn check(&self) -> Result<()> {
        if !self.mappings.is_object() {
            return Err(Error::Configuration("mappings must be an object".into()));
        }
        if !self.settings.is_object() {
            return Err(Error::Configuration("settings must be an object".into()));
        }
        if let Some(properties) = self.mappings.get("properties") {
            if !properties.is_object() {
                return Err(Error::Configuration("mappings.properties must be an object".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("book.yaml");
        std::fs::write(
            &yaml,
            "mappings:\n  properties:\n    title: { type: text }\n",
        )
        .unwrap();
        let schema = IndexSchema::load(&yaml).unwrap();
        assert_eq!(schema.properties().unwrap()["title"], json!({"type": "text"}));
        assert_eq!(schema.settings, json!({}));

        let json_path = dir.path().join("book.json");
        std::fs::write(&json_path, r#"{"mappings": {"properties": {"isbn": {"type": "keyword"}}}}"#)
            .unwrap();
        let schema = IndexSchema::load(&json_path).unwrap();
        assert!(schema.properties().unwrap().contains_key("isbn"));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(IndexSchema::new(json!([]), json!({})).is_err());
        assert!(IndexSchema::new(json!({"properties": 3}), json!({})).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.txt");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(IndexSchema::load(&path), Err(Error::Configuration(_))));
    }
}
