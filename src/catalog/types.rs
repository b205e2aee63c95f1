//! Mapping catalog types
//!
//! The declarative mapping document names schemas (logical table -> physical
//! columnar file) and groups (what callers may ask for). These types are the
//! validated, in-memory form: join predicates and field paths are parsed at
//! load, never re-parsed per query.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Source file format for a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
    Csv,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Parquet => "parquet",
            SourceFormat::Csv => "csv",
        }
    }

    /// Parse an explicit format tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "parquet" => Some(SourceFormat::Parquet),
            "csv" => Some(SourceFormat::Csv),
            _ => None,
        }
    }

    /// Infer the format from a file extension
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?;
        Self::from_tag(&ext.to_ascii_lowercase())
    }
}

/// A declared schema: one logical table backed by one columnar file
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    /// Logical table name (unique within the catalog)
    pub name: String,
    /// Physical file path, relative to the storage root
    pub path: String,
    /// Source file format
    pub format: SourceFormat,
    /// Fields whose values are raw bytes and must be emitted as base64
    pub binary_fields: Vec<String>,
}

impl SchemaDescriptor {
    pub fn is_binary_field(&self, field: &str) -> bool {
        self.binary_fields.iter().any(|f| f == field)
    }
}

/// A parsed `schema.field` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub schema: String,
    pub field: String,
}

impl FieldRef {
    /// Parse a dotted `schema.field` path. Returns None when the shape is
    /// wrong (missing dot, empty part, extra dots).
    pub fn parse(path: &str) -> Option<Self> {
        let (schema, field) = path.split_once('.')?;
        if schema.is_empty() || field.is_empty() || field.contains('.') {
            return None;
        }
        Some(Self {
            schema: schema.to_string(),
            field: field.to_string(),
        })
    }
}

/// A join from the group's main schema to one related schema
///
/// Parsed from the document's `on` predicate
/// (`main.field = target.field`, either order). Only direct joins to the
/// main schema are representable.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    /// Join target schema (also the record column name in results)
    pub schema: String,
    /// Join key field on the main schema
    pub main_field: String,
    /// Join key field on the target schema
    pub join_field: String,
}

/// A validated group definition
#[derive(Debug, Clone)]
pub struct GroupDefinition {
    pub name: String,
    /// Main schema the group selects from
    pub main_schema: String,
    /// Direct joins, at most one per target schema
    pub joins: Vec<JoinSpec>,
    /// Output alias -> source field (alias order is the output column order)
    pub select: BTreeMap<String, FieldRef>,
    /// Declared-filterable subject key -> resolved column path
    pub filters: BTreeMap<String, FieldRef>,
}

impl GroupDefinition {
    /// The join spec targeting `schema`, if any
    pub fn join(&self, schema: &str) -> Option<&JoinSpec> {
        self.joins.iter().find(|j| j.schema == schema)
    }

    /// Selected (alias, field) pairs sourced from `schema`, in alias order
    pub fn selected_from(&self, schema: &str) -> Vec<(&str, &str)> {
        self.select
            .iter()
            .filter(|(_, src)| src.schema == schema)
            .map(|(alias, src)| (alias.as_str(), src.field.as_str()))
            .collect()
    }

    /// Joins that contribute at least one selected field, in declaration order
    pub fn active_joins(&self) -> Vec<&JoinSpec> {
        self.joins
            .iter()
            .filter(|j| self.select.values().any(|src| src.schema == j.schema))
            .collect()
    }
}

// Raw document shapes, deserialized before validation.

#[derive(Debug, Deserialize)]
pub(crate) struct MappingDocument {
    pub storage: StorageSection,
    pub schemas: BTreeMap<String, RawSchema>,
    pub groups: BTreeMap<String, RawGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StorageSection {
    pub root: String,
    #[serde(default)]
    pub manifest: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSchema {
    pub path: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub binary_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawJoin {
    pub schema: String,
    pub on: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGroup {
    pub from: String,
    #[serde(default)]
    pub join: Vec<RawJoin>,
    #[serde(deserialize_with = "unique_select")]
    pub select: BTreeMap<String, String>,
    #[serde(default)]
    pub where_any: BTreeMap<String, String>,
}

/// Deserialize a select map, rejecting repeated aliases.
///
/// A plain map deserializer keeps only the last entry for a repeated key,
/// which would hide an alias collision in the document.
fn unique_select<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SelectVisitor;

    impl<'de> Visitor<'de> for SelectVisitor {
        type Value = BTreeMap<String, String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of unique select aliases to field paths")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = BTreeMap::new();
            while let Some((alias, path)) = access.next_entry::<String, String>()? {
                if entries.insert(alias.clone(), path).is_some() {
                    return Err(de::Error::custom(format!(
                        "duplicate select alias '{alias}'"
                    )));
                }
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(SelectVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ref_parse() {
        let r = FieldRef::parse("vehicles.car_id").unwrap();
        assert_eq!(r.schema, "vehicles");
        assert_eq!(r.field, "car_id");
    }

    #[test]
    fn test_field_ref_rejects_bad_shapes() {
        assert!(FieldRef::parse("no_dot").is_none());
        assert!(FieldRef::parse(".field").is_none());
        assert!(FieldRef::parse("schema.").is_none());
        assert!(FieldRef::parse("a.b.c").is_none());
    }

    #[test]
    fn test_format_inference() {
        assert_eq!(
            SourceFormat::from_path("cars/vehicles.parquet"),
            Some(SourceFormat::Parquet)
        );
        assert_eq!(SourceFormat::from_path("owners.CSV"), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_path("notes.txt"), None);
    }
}
