//! # Mapping Catalog
//!
//! Declarative configuration mapping logical schemas to physical columnar
//! files and caller-facing groups to selectable fields, joins, and
//! filterable paths. Loaded and validated once; shared read-only.

pub mod errors;
mod loader;
mod types;

pub use errors::{CatalogError, CatalogResult};
pub use loader::MappingCatalog;
pub use types::{FieldRef, GroupDefinition, JoinSpec, SchemaDescriptor, SourceFormat};
