//! # Catalog Errors
//!
//! Error types for mapping-document loading and validation. All catalog
//! errors are fatal at load time: a process never serves with a partially
//! valid mapping.

use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Mapping catalog errors
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Mapping document could not be read
    #[error("Failed to read mapping document '{path}': {detail}")]
    Io { path: String, detail: String },

    /// Mapping document is not valid JSON or has the wrong shape
    #[error("Invalid mapping document: {0}")]
    Parse(String),

    /// A group references a schema that is not declared
    #[error("Group '{group}' references undefined schema '{schema}'")]
    UnknownSchema { group: String, schema: String },

    /// A join predicate is missing, unparseable, or does not connect the
    /// group's main schema to the join target
    #[error("Group '{group}' has an invalid join: {detail}")]
    BadJoin { group: String, detail: String },

    /// The same schema is joined twice within one group
    #[error("Group '{group}' joins schema '{schema}' more than once")]
    DuplicateJoin { group: String, schema: String },

    /// An output alias collides with a join schema's record column
    #[error("Group '{group}' alias '{alias}' collides with join schema of the same name")]
    AliasCollision { group: String, alias: String },

    /// A name does not match the identifier grammar
    #[error("Invalid identifier '{name}' in {context}")]
    InvalidIdentifier { name: String, context: String },

    /// A field reference is not of the form `schema.field`
    #[error("Invalid field reference '{value}' in {context}")]
    InvalidFieldRef { value: String, context: String },

    /// A schema's source format is neither declared nor inferable
    #[error("Schema '{schema}' has no recognizable source format for '{path}'")]
    UnknownFormat { schema: String, path: String },

    /// A group selects nothing
    #[error("Group '{group}' has an empty select map")]
    EmptySelect { group: String },
}

impl CatalogError {
    pub fn io(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self::Parse(detail.into())
    }

    pub fn bad_join(group: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::BadJoin {
            group: group.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_identifier(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            context: context.into(),
        }
    }

    pub fn invalid_field_ref(value: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidFieldRef {
            value: value.into(),
            context: context.into(),
        }
    }
}
