//! Message catalog used by the view.
//!
//! Catalogs are TOML files. Nested tables flatten into dotted keys, so
//!
//! ```toml
//! [errorMessages]
//! networkError = "Network error"
//! ```
//!
//! is looked up as `errorMessages.networkError`. A key with no entry resolves
//! to the key itself, which keeps a missing translation visible on screen
//! instead of rendering nothing.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const ENGLISH: &str = include_str!("../locales/en.toml");

/// Catalog files larger than this are rejected before reading.
const MAX_CATALOG_SIZE: u64 = 1_048_576;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in catalog file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Catalog entry `{0}` must be a string or a table")]
    InvalidEntry(String),

    #[error("Catalog file too large: {0} bytes")]
    TooLarge(u64),
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    /// The built-in English catalog.
    pub fn english() -> Self {
        Self::from_toml_str(ENGLISH).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Built-in catalog is invalid, falling back to keys");
            Self::default()
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let table: toml::Table = content.parse()?;
        let mut messages = HashMap::new();
        flatten("", &table, &mut messages)?;
        Ok(Self { messages })
    }

    /// Loads a catalog file and layers it over the English defaults, so a
    /// partial translation still renders every key.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_CATALOG_SIZE {
            return Err(CatalogError::TooLarge(size));
        }
        let content = std::fs::read_to_string(path)?;
        let overrides = Self::from_toml_str(&content)?;

        let mut catalog = Self::english();
        let count = overrides.messages.len();
        catalog.messages.extend(overrides.messages);
        tracing::info!(path = %path.display(), entries = count, "Loaded message catalog");
        Ok(catalog)
    }

    /// Looks up `key`, falling back to the key itself.
    pub fn t(&self, key: &str) -> String {
        match self.messages.get(key) {
            Some(message) => message.clone(),
            None => {
                tracing::warn!(key = %key, "Missing catalog entry");
                key.to_string()
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }
}

fn flatten(
    prefix: &str,
    table: &toml::Table,
    out: &mut HashMap<String, String>,
) -> Result<(), CatalogError> {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::String(message) => {
                out.insert(full_key, message.clone());
            }
            toml::Value::Table(nested) => flatten(&full_key, nested, out)?,
            _ => return Err(CatalogError::InvalidEntry(full_key)),
        }
    }
    Ok(())
}
