//! Physical index and alias naming
//!
//! A logical index `book` lives in physical indexes `book-000001`,
//! `book-000002`, ... and is reached through two aliases:
//! - `book-write` - the single index receiving writes
//! - `book-read` - every index answering searches
//!
//! Alias names never match the physical pattern, so the two namespaces
//! cannot clash on engines that share one namespace for both.

use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Highest generation the 6-digit suffix can hold
pub const MAX_GENERATION: u32 = 999_999;

const MAX_INDEX_NAME_BYTES: usize = 255;
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

fn physical_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+)-(\d{6})$").expect("static pattern is valid"))
}

/// Maps logical index names to physical names and aliases, and back.
pub trait IndexNamingStrategy: Send + Sync + std::fmt::Debug {
    fn create_physical_name(&self, logical_name: &str, generation: u32) -> String;

    fn create_initial_physical_name(&self, logical_name: &str) -> String {
        self.create_physical_name(logical_name, 1)
    }

    fn create_write_alias(&self, logical_name: &str) -> String;

    fn create_read_alias(&self, logical_name: &str) -> String;

    /// Fails for names that do not follow the convention, i.e. foreign indexes.
    fn extract_logical_from_physical(&self, physical_name: &str) -> Result<String>;

    fn extract_logical_from_logical(&self, logical_name: &str) -> String {
        logical_name.to_string()
    }

    fn generation_of(&self, physical_name: &str) -> Result<u32>;

    /// Physical name of the generation following `physical_name`.
    fn next_physical_name(&self, physical_name: &str) -> Result<String> {
        let logical = self.extract_logical_from_physical(physical_name)?;
        let generation = self.generation_of(physical_name)?;
        if generation >= MAX_GENERATION {
            return Err(Error::IndexLifecycle(format!(
                "index '{}' reached the last generation ({})",
                logical, MAX_GENERATION
            )));
        }
        Ok(self.create_physical_name(&logical, generation + 1))
    }

    /// Reject logical names the engine or this convention cannot represent.
    fn validate_logical_name(&self, logical_name: &str) -> Result<()>;
}

/// `<logical>-<6 digit generation>`, `<logical>-write`, `<logical>-read`.
#[derive(Debug, Clone, Default)]
pub struct SimpleIndexNamingStrategy;

impl SimpleIndexNamingStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl IndexNamingStrategy for SimpleIndexNamingStrategy {
    fn create_physical_name(&self, logical_name: &str, generation: u32) -> String {
        format!("{}-{:06}", logical_name, generation)
    }

    fn create_write_alias(&self, logical_name: &str) -> String {
        format!("{}-write", logical_name)
    }

    fn create_read_alias(&self, logical_name: &str) -> String {
        format!("{}-read", logical_name)
    }

    fn extract_logical_from_physical(&self, physical_name: &str) -> Result<String> {
        physical_pattern()
            .captures(physical_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                Error::naming(
                    physical_name,
                    "expected '<logical>-<6 digits>'; the index was not created by this backend",
                )
            })
    }

    fn generation_of(&self, physical_name: &str) -> Result<u32> {
        physical_pattern()
            .captures(physical_name)
            .and_then(|caps| caps.get(2))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| Error::naming(physical_name, "no 6-digit generation suffix"))
    }

    fn validate_logical_name(&self, logical_name: &str) -> Result<()> {
        let reject = |reason: &str| {
            Err(Error::Configuration(format!(
                "invalid logical index name '{}': {}",
                logical_name, reason
            )))
        };

        if logical_name.is_empty() {
            return reject("name is empty");
        }
        if logical_name == "." || logical_name == ".." {
            return reject("'.' and '..' are reserved");
        }
        if logical_name.starts_with(['-', '_', '+']) {
            return reject("must not start with '-', '_' or '+'");
        }
        if logical_name.chars().any(|c| c.is_uppercase()) {
            return reject("must be lowercase");
        }
        if let Some(c) = logical_name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
            return reject(&format!("contains forbidden character '{}'", c));
        }
        if self.create_physical_name(logical_name, MAX_GENERATION).len() > MAX_INDEX_NAME_BYTES {
            return reject("too long once the generation suffix is appended");
        }
        if physical_pattern().is_match(logical_name) {
            return reject("reserved: looks like a physical index name");
        }
        Ok(())
    }
}

/// All names derived from one logical index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNames {
    pub logical: String,
    pub initial_physical: String,
    pub write_alias: String,
    pub read_alias: String,
}

impl IndexNames {
    pub fn new(strategy: &dyn IndexNamingStrategy, logical_name: &str) -> Result<Self> {
        let logical = strategy.extract_logical_from_logical(logical_name);
        strategy.validate_logical_name(&logical)?;
        Ok(Self {
            initial_physical: strategy.create_initial_physical_name(&logical),
            write_alias: strategy.create_write_alias(&logical),
            read_alias: strategy.create_read_alias(&logical),
            logical,
        })
    }
}
