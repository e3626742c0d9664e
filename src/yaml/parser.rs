//! YAML parsing with error handling

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::entities::Recipe;
use crate::yaml::diagnostics::{YamlError, YamlSyntaxError};

/// Parse YAML content into a typed value with nice error messages
pub fn parse_yaml<T: DeserializeOwned + 'static>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(content).map_err(|e| {
        YamlError::Syntax(YamlSyntaxError::from_serde_error(&e, content, filename))
    })
}

/// Parse YAML from a file path
pub fn parse_yaml_file<T: DeserializeOwned + 'static>(path: &Path) -> Result<T, YamlError> {
    let content = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();
    parse_yaml(&content, &filename)
}

/// Untyped document tree, as the schema validator sees it
pub fn parse_document(content: &str, filename: &str) -> Result<serde_json::Value, YamlError> {
    parse_yaml(content, filename)
}

/// Load a recipe file. JSON is a subset of YAML, so `.json` recipes work too.
pub fn load_recipe(path: &Path) -> Result<Recipe, YamlError> {
    parse_yaml_file(path)
}
