//! Mapping catalog loader
//!
//! Parses the mapping document and validates it fail-fast: every schema
//! reference, join predicate, alias, and filter path is checked before the
//! catalog becomes visible. A loaded catalog is immutable; reload builds a
//! fresh one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::query::ident::is_valid_identifier;

use super::errors::{CatalogError, CatalogResult};
use super::types::{
    FieldRef, GroupDefinition, JoinSpec, MappingDocument, RawGroup, SchemaDescriptor, SourceFormat,
};

/// The validated mapping catalog
///
/// Invariants held by construction:
/// - every group's main schema and join targets are declared schemas
/// - join predicates connect the main schema to the join target
/// - all interpolatable names satisfy the identifier grammar
/// - select aliases never collide with join record columns
#[derive(Debug, Clone)]
pub struct MappingCatalog {
    storage_root: PathBuf,
    manifest: Option<String>,
    schemas: BTreeMap<String, SchemaDescriptor>,
    groups: BTreeMap<String, GroupDefinition>,
}

impl MappingCatalog {
    /// Load and validate a mapping document from disk
    pub fn load_from_file(path: &Path) -> CatalogResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CatalogError::io(path.display().to_string(), e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parse and validate a mapping document from a JSON string
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let doc: MappingDocument =
            serde_json::from_str(json).map_err(|e| CatalogError::parse(e.to_string()))?;

        let mut schemas = BTreeMap::new();
        for (name, raw) in &doc.schemas {
            if !is_valid_identifier(name) {
                return Err(CatalogError::invalid_identifier(name, "schema name"));
            }
            let format = match &raw.format {
                Some(tag) => SourceFormat::from_tag(tag),
                None => SourceFormat::from_path(&raw.path),
            }
            .ok_or_else(|| CatalogError::UnknownFormat {
                schema: name.clone(),
                path: raw.path.clone(),
            })?;

            for field in &raw.binary_fields {
                if !is_valid_identifier(field) {
                    return Err(CatalogError::invalid_identifier(
                        field,
                        format!("binary field of schema '{}'", name),
                    ));
                }
            }

            schemas.insert(
                name.clone(),
                SchemaDescriptor {
                    name: name.clone(),
                    path: raw.path.clone(),
                    format,
                    binary_fields: raw.binary_fields.clone(),
                },
            );
        }

        let mut groups = BTreeMap::new();
        for (name, raw) in &doc.groups {
            let group = validate_group(name, raw, &schemas)?;
            groups.insert(name.clone(), group);
        }

        Ok(Self {
            storage_root: PathBuf::from(&doc.storage.root),
            manifest: doc.storage.manifest.clone(),
            schemas,
            groups,
        })
    }

    /// Look up a schema by logical name
    pub fn schema(&self, name: &str) -> Option<&SchemaDescriptor> {
        self.schemas.get(name)
    }

    /// Look up a group by name
    pub fn group(&self, name: &str) -> Option<&GroupDefinition> {
        self.groups.get(name)
    }

    /// All declared schemas, in name order
    pub fn schemas(&self) -> impl Iterator<Item = &SchemaDescriptor> {
        self.schemas.values()
    }

    /// All declared schema names, in name order
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(|s| s.as_str())
    }

    /// All declared group names, in name order
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(|s| s.as_str())
    }

    /// Root directory holding the source files
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Absolute path of a schema's source file
    pub fn source_path(&self, schema: &SchemaDescriptor) -> PathBuf {
        self.storage_root.join(&schema.path)
    }

    /// Path of the integrity manifest, when one is declared
    pub fn manifest_path(&self) -> Option<PathBuf> {
        self.manifest.as_ref().map(|m| self.storage_root.join(m))
    }
}

fn validate_group(
    name: &str,
    raw: &RawGroup,
    schemas: &BTreeMap<String, SchemaDescriptor>,
) -> CatalogResult<GroupDefinition> {
    if !schemas.contains_key(&raw.from) {
        return Err(CatalogError::UnknownSchema {
            group: name.to_string(),
            schema: raw.from.clone(),
        });
    }
    let main_schema = raw.from.clone();

    let mut joins: Vec<JoinSpec> = Vec::with_capacity(raw.join.len());
    for raw_join in &raw.join {
        if !schemas.contains_key(&raw_join.schema) {
            return Err(CatalogError::UnknownSchema {
                group: name.to_string(),
                schema: raw_join.schema.clone(),
            });
        }
        if raw_join.schema == main_schema {
            return Err(CatalogError::bad_join(
                name,
                format!("'{}' cannot join to itself", main_schema),
            ));
        }
        if joins.iter().any(|j| j.schema == raw_join.schema) {
            return Err(CatalogError::DuplicateJoin {
                group: name.to_string(),
                schema: raw_join.schema.clone(),
            });
        }
        joins.push(parse_join(name, &main_schema, &raw_join.schema, &raw_join.on)?);
    }

    if raw.select.is_empty() {
        return Err(CatalogError::EmptySelect {
            group: name.to_string(),
        });
    }

    let mut select = BTreeMap::new();
    for (alias, path) in &raw.select {
        if !is_valid_identifier(alias) {
            return Err(CatalogError::invalid_identifier(
                alias,
                format!("select alias of group '{}'", name),
            ));
        }
        if joins.iter().any(|j| j.schema == *alias) {
            return Err(CatalogError::AliasCollision {
                group: name.to_string(),
                alias: alias.clone(),
            });
        }
        let source = resolve_field(name, path, &main_schema, &joins, "select")?;
        select.insert(alias.clone(), source);
    }

    let mut filters = BTreeMap::new();
    for (key, path) in &raw.where_any {
        for segment in key.split('.') {
            if !is_valid_identifier(segment) {
                return Err(CatalogError::invalid_identifier(
                    key,
                    format!("where_any key of group '{}'", name),
                ));
            }
        }
        let target = resolve_field(name, path, &main_schema, &joins, "where_any")?;
        filters.insert(key.clone(), target);
    }

    Ok(GroupDefinition {
        name: name.to_string(),
        main_schema,
        joins,
        select,
        filters,
    })
}

/// Parse a join predicate into an explicit spec, accepting either operand
/// order but requiring it to connect main schema and join target.
fn parse_join(
    group: &str,
    main_schema: &str,
    target: &str,
    predicate: &str,
) -> CatalogResult<JoinSpec> {
    let (left, right) = predicate
        .split_once('=')
        .ok_or_else(|| CatalogError::bad_join(group, format!("'{}' has no '='", predicate)))?;

    let left = FieldRef::parse(left.trim())
        .ok_or_else(|| CatalogError::invalid_field_ref(left.trim(), format!("join of group '{}'", group)))?;
    let right = FieldRef::parse(right.trim())
        .ok_or_else(|| CatalogError::invalid_field_ref(right.trim(), format!("join of group '{}'", group)))?;

    for field_ref in [&left, &right] {
        if !is_valid_identifier(&field_ref.schema) || !is_valid_identifier(&field_ref.field) {
            return Err(CatalogError::invalid_identifier(
                format!("{}.{}", field_ref.schema, field_ref.field),
                format!("join of group '{}'", group),
            ));
        }
    }

    let (main_side, target_side) = if left.schema == main_schema && right.schema == target {
        (left, right)
    } else if right.schema == main_schema && left.schema == target {
        (right, left)
    } else {
        return Err(CatalogError::bad_join(
            group,
            format!(
                "'{}' must connect '{}' and '{}'",
                predicate, main_schema, target
            ),
        ));
    };

    Ok(JoinSpec {
        schema: target.to_string(),
        main_field: main_side.field,
        join_field: target_side.field,
    })
}

/// Resolve a `schema.field` path against the group's main schema and joins
fn resolve_field(
    group: &str,
    path: &str,
    main_schema: &str,
    joins: &[JoinSpec],
    context: &str,
) -> CatalogResult<FieldRef> {
    let field_ref = FieldRef::parse(path).ok_or_else(|| {
        CatalogError::invalid_field_ref(path, format!("{} of group '{}'", context, group))
    })?;

    if !is_valid_identifier(&field_ref.schema) || !is_valid_identifier(&field_ref.field) {
        return Err(CatalogError::invalid_identifier(
            path,
            format!("{} of group '{}'", context, group),
        ));
    }

    if field_ref.schema != main_schema && !joins.iter().any(|j| j.schema == field_ref.schema) {
        return Err(CatalogError::UnknownSchema {
            group: group.to_string(),
            schema: field_ref.schema.clone(),
        });
    }

    Ok(field_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mapping() -> &'static str {
        r#"{
            "storage": {"root": "/data/cars", "manifest": "manifest.json"},
            "schemas": {
                "vehicles": {"path": "vehicles.parquet", "binary_fields": ["photo"]},
                "owners": {"path": "owners.csv", "format": "csv"}
            },
            "groups": {
                "car_info": {
                    "from": "vehicles",
                    "join": [{"schema": "owners", "on": "vehicles.owner_id = owners.owner_id"}],
                    "select": {
                        "car_id": "vehicles.car_id",
                        "title": "vehicles.title",
                        "full_name": "owners.full_name"
                    },
                    "where_any": {
                        "car_id": "vehicles.car_id",
                        "owners.full_name": "owners.full_name"
                    }
                }
            }
        }"#
    }

    #[test]
    fn test_valid_mapping_loads() {
        let catalog = MappingCatalog::from_json(sample_mapping()).unwrap();

        let vehicles = catalog.schema("vehicles").unwrap();
        assert_eq!(vehicles.format, SourceFormat::Parquet);
        assert!(vehicles.is_binary_field("photo"));

        let group = catalog.group("car_info").unwrap();
        assert_eq!(group.main_schema, "vehicles");
        assert_eq!(group.joins.len(), 1);
        assert_eq!(group.joins[0].main_field, "owner_id");
        assert_eq!(group.joins[0].join_field, "owner_id");
        assert_eq!(group.select.len(), 3);
    }

    #[test]
    fn test_join_predicate_order_is_normalized() {
        let json = sample_mapping().replace(
            "vehicles.owner_id = owners.owner_id",
            "owners.owner_id = vehicles.owner_id",
        );
        let catalog = MappingCatalog::from_json(&json).unwrap();
        let join = &catalog.group("car_info").unwrap().joins[0];
        assert_eq!(join.schema, "owners");
        assert_eq!(join.main_field, "owner_id");
        assert_eq!(join.join_field, "owner_id");
    }

    #[test]
    fn test_dangling_join_schema_rejected() {
        let json = sample_mapping().replace("\"schema\": \"owners\"", "\"schema\": \"ghosts\"");
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownSchema { .. }));
    }

    #[test]
    fn test_unparseable_join_rejected() {
        let json = sample_mapping().replace(
            "vehicles.owner_id = owners.owner_id",
            "vehicles.owner_id owners.owner_id",
        );
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::BadJoin { .. }));
    }

    #[test]
    fn test_join_must_connect_main_and_target() {
        let json = sample_mapping().replace(
            "vehicles.owner_id = owners.owner_id",
            "owners.owner_id = owners.owner_id",
        );
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::BadJoin { .. }));
    }

    #[test]
    fn test_alias_colliding_with_join_schema_rejected() {
        let json = sample_mapping().replace("\"full_name\": \"owners.full_name\"", "\"owners\": \"owners.full_name\"");
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::AliasCollision { .. }));
    }

    #[test]
    fn test_repeated_select_alias_rejected() {
        let json = sample_mapping().replace(
            "\"title\": \"vehicles.title\"",
            "\"title\": \"vehicles.title\", \"title\": \"vehicles.color\"",
        );
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
        assert!(err.to_string().contains("duplicate select alias 'title'"));
    }

    #[test]
    fn test_select_from_undeclared_schema_rejected() {
        let json = sample_mapping().replace("\"full_name\": \"owners.full_name\"", "\"full_name\": \"ghosts.full_name\"");
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownSchema { .. }));
    }

    #[test]
    fn test_bad_identifier_rejected() {
        let json = sample_mapping().replace("\"car_id\": \"vehicles.car_id\"", "\"car id\": \"vehicles.car_id\"");
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let json = sample_mapping().replace("owners.csv\", \"format\": \"csv", "owners.dat\", \"format\": \"dat");
        let err = MappingCatalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownFormat { .. }));
    }

    #[test]
    fn test_manifest_path_is_under_root() {
        let catalog = MappingCatalog::from_json(sample_mapping()).unwrap();
        let manifest = catalog.manifest_path().unwrap();
        assert_eq!(manifest, PathBuf::from("/data/cars/manifest.json"));
    }

    #[test]
    fn test_filters_resolve_to_main_and_join() {
        let catalog = MappingCatalog::from_json(sample_mapping()).unwrap();
        let group = catalog.group("car_info").unwrap();

        let car_id = group.filters.get("car_id").unwrap();
        assert_eq!(car_id.schema, "vehicles");

        let owner_name = group.filters.get("owners.full_name").unwrap();
        assert_eq!(owner_name.schema, "owners");
    }
}
