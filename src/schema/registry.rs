//! Schema registry - embedded JSON schemas

use rust_embed::Embed;
use std::collections::HashMap;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Documents the CLI knows how to validate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Recipe,
}

impl SchemaKind {
    pub fn all() -> &'static [SchemaKind] {
        &[SchemaKind::Recipe]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Recipe => "recipe",
        }
    }

    fn file_name(&self) -> String {
        format!("{}.schema.json", self.as_str())
    }
}

/// Registry of JSON schemas for document validation
pub struct SchemaRegistry {
    schemas: HashMap<SchemaKind, String>,
}

impl SchemaRegistry {
    /// Create a new schema registry with embedded schemas
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        for kind in SchemaKind::all() {
            if let Some(file) = EmbeddedSchemas::get(&kind.file_name()) {
                if let Ok(content) = std::str::from_utf8(&file.data) {
                    schemas.insert(*kind, content.to_string());
                }
            }
        }

        Self { schemas }
    }

    pub fn get(&self, kind: SchemaKind) -> Option<&str> {
        self.schemas.get(&kind).map(|s| s.as_str())
    }

    pub fn has_schema(&self, kind: SchemaKind) -> bool {
        self.schemas.contains_key(&kind)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
