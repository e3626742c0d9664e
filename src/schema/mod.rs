//! Embedded JSON schemas, validation and recipe templates

pub mod registry;
pub mod template;
pub mod validator;

pub use registry::{SchemaKind, SchemaRegistry};
pub use template::{RecipeTemplate, TemplateError, TemplateGenerator};
pub use validator::{SchemaError, SchemaIssue, SchemaValidator};
