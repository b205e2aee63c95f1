//! Mapping-to-SQL compiler
//!
//! Pure translation of (group definition, subject filters, filter mode) into
//! one engine statement plus ordered bind parameters. No I/O, no shared
//! state; the executor owns running the result.
//!
//! Shape of a compiled statement:
//!
//! ```sql
//! SELECT main.f AS alias, ..., j.__records AS j
//! FROM main
//! LEFT JOIN (
//!     SELECT j.key AS key, to_json(list(struct_pack(alias := j.f, ...))) AS __records
//!     FROM j [WHERE <filters routed to j>]
//!     GROUP BY j.key
//! ) AS j ON main.key = j.key
//! [WHERE <filters routed to main>]
//! ```
//!
//! Invariants:
//! - filters whose resolved path names a join schema land inside that join's
//!   subquery, never the outer WHERE
//! - subject values only ever appear as `?` placeholders; the parameter list
//!   follows placeholder order in the statement text
//! - only grammar-checked identifiers are interpolated

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::catalog::{FieldRef, GroupDefinition, MappingCatalog};

use super::errors::{CompileError, CompileResult};
use super::ident::is_valid_identifier;

/// Output column carrying a join's packed records inside each subquery
pub const RECORD_COLUMN: &str = "__records";

/// Year, year-month, or year-month-day shape
static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").unwrap());

/// How subject filters are matched and combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Classified matching, all filters must hold (AND): date-shaped strings
    /// as exact-cast prefix, other strings as case-insensitive substring,
    /// non-strings as equality. The lookup endpoint uses this mode.
    FuzzyAll,
    /// Strict equality on every value, any filter may hold (OR).
    ExactAny,
}

impl FilterMode {
    fn combinator(&self) -> &'static str {
        match self {
            FilterMode::FuzzyAll => " AND ",
            FilterMode::ExactAny => " OR ",
        }
    }
}

/// A bind parameter produced by compilation
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    /// Convert a scalar JSON value; None for arrays, objects, and null
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ParamValue::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ParamValue::Int(i))
                } else {
                    n.as_f64().map(ParamValue::Float)
                }
            }
            Value::Bool(b) => Some(ParamValue::Bool(*b)),
            _ => None,
        }
    }
}

/// A compiled, executable lookup statement
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Statement text referencing logical table names only
    pub sql: String,
    /// Bind parameters in placeholder order
    pub params: Vec<ParamValue>,
    /// Logical tables the statement reads (main first, then joins)
    pub sources: Vec<String>,
    /// Output columns holding JSON-packed join records
    pub record_columns: Vec<String>,
    /// Output columns fixing the row order when the statement is paged
    pub order_columns: Vec<String>,
}

/// Compile one group lookup.
///
/// Subject keys with no declared filterable path are ignored. Subject values
/// must be scalars.
pub fn compile(
    catalog: &MappingCatalog,
    group: &GroupDefinition,
    subject: &Map<String, Value>,
    mode: FilterMode,
) -> CompileResult<CompiledQuery> {
    let main = ensure_ident(&group.main_schema)?;
    let active_joins = group.active_joins();

    // Route each subject filter to the outer query or one join subquery.
    let mut outer_filters: Vec<(&FieldRef, &Value)> = Vec::new();
    let mut join_filters: Vec<(&str, Vec<(&FieldRef, &Value)>)> = active_joins
        .iter()
        .map(|j| (j.schema.as_str(), Vec::new()))
        .collect();

    for (key, value) in subject {
        let Some(target) = group.filters.get(key) else {
            continue;
        };
        if ParamValue::from_json(value).is_none() {
            return Err(CompileError::NonScalarSubject(key.clone()));
        }
        if target.schema == group.main_schema {
            outer_filters.push((target, value));
        } else if let Some((_, bucket)) = join_filters
            .iter_mut()
            .find(|(schema, _)| *schema == target.schema)
        {
            bucket.push((target, value));
        }
        // Filters naming a join with no selected fields are dropped: a
        // predicate inside a left-joined aggregate cannot restrict main rows.
    }

    let mut params: Vec<ParamValue> = Vec::new();

    // Output columns: main fields in alias order, then one record column per
    // active join.
    let mut columns: Vec<String> = Vec::new();
    for (alias, field) in group.selected_from(&group.main_schema) {
        columns.push(format!(
            "{main}.{field} AS {alias}",
            field = ensure_ident(field)?,
            alias = ensure_ident(alias)?
        ));
    }

    let mut join_clauses = String::new();
    let mut record_columns = Vec::with_capacity(active_joins.len());
    for join in &active_joins {
        let js = ensure_ident(&join.schema)?;
        let key = ensure_ident(&join.join_field)?;
        let main_key = ensure_ident(&join.main_field)?;

        let mut packed = Vec::new();
        for (alias, field) in group.selected_from(&join.schema) {
            let alias = ensure_ident(alias)?;
            let field = ensure_ident(field)?;
            let expr = if catalog
                .schema(&join.schema)
                .is_some_and(|s| s.is_binary_field(field))
            {
                format!("base64({js}.{field})")
            } else {
                format!("{js}.{field}")
            };
            packed.push(format!("{alias} := {expr}"));
        }

        let filters = join_filters
            .iter()
            .find(|(schema, _)| *schema == join.schema)
            .map(|(_, bucket)| bucket.as_slice())
            .unwrap_or(&[]);
        let mut inner_where = String::new();
        if !filters.is_empty() {
            let mut preds = Vec::with_capacity(filters.len());
            for (target, value) in filters {
                let column = format!("{js}.{field}", field = ensure_ident(&target.field)?);
                preds.push(build_predicate(&column, value, mode, &mut params));
            }
            inner_where = format!(" WHERE {}", preds.join(mode.combinator()));
        }

        join_clauses.push_str(&format!(
            " LEFT JOIN (SELECT {js}.{key} AS {key}, to_json(list(struct_pack({pack}))) AS {rec} \
             FROM {js}{inner_where} GROUP BY {js}.{key}) AS {js} \
             ON {main}.{main_key} = {js}.{key}",
            pack = packed.join(", "),
            rec = RECORD_COLUMN,
        ));

        columns.push(format!("{js}.{rec} AS {js}", rec = RECORD_COLUMN));
        record_columns.push(join.schema.clone());
    }

    let mut outer_where = String::new();
    if !outer_filters.is_empty() {
        let mut preds = Vec::with_capacity(outer_filters.len());
        for (target, value) in &outer_filters {
            let column = format!("{main}.{field}", field = ensure_ident(&target.field)?);
            preds.push(build_predicate(&column, value, mode, &mut params));
        }
        outer_where = format!(" WHERE {}", preds.join(mode.combinator()));
    }

    let sql = format!(
        "SELECT {columns} FROM {main}{join_clauses}{outer_where}",
        columns = columns.join(", "),
    );

    let mut sources = Vec::with_capacity(1 + active_joins.len());
    sources.push(group.main_schema.clone());
    sources.extend(active_joins.iter().map(|j| j.schema.clone()));

    // Every output column participates in the page order: the engine gives
    // no row-order guarantee, and a window over an unordered statement can
    // repeat or drop rows between page executions.
    let mut order_columns: Vec<String> = group
        .selected_from(&group.main_schema)
        .iter()
        .map(|(alias, _)| alias.to_string())
        .collect();
    order_columns.extend(record_columns.iter().cloned());

    Ok(CompiledQuery {
        sql,
        params,
        sources,
        record_columns,
        order_columns,
    })
}

/// Wrap a compiled statement in a row count
pub fn count_statement(compiled: &CompiledQuery) -> String {
    format!("SELECT COUNT(*) FROM ({}) AS lookup_rows", compiled.sql)
}

/// Append a validated page window to a compiled statement.
///
/// The window always carries an ORDER BY over the statement's output
/// columns so re-executions across pages agree on row order.
pub fn paged_statement(compiled: &CompiledQuery, limit: u32, offset: u64) -> String {
    format!(
        "{} ORDER BY {} LIMIT {} OFFSET {}",
        compiled.sql,
        compiled.order_columns.join(", "),
        limit,
        offset
    )
}

fn ensure_ident(name: &str) -> CompileResult<&str> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(CompileError::UnsafeIdentifier(name.to_string()))
    }
}

/// Emit one predicate, pushing its bind parameter.
///
/// The caller guarantees `value` is scalar.
fn build_predicate(
    column: &str,
    value: &Value,
    mode: FilterMode,
    params: &mut Vec<ParamValue>,
) -> String {
    match mode {
        FilterMode::FuzzyAll => match value {
            Value::String(s) if DATE_SHAPE.is_match(s) => {
                params.push(ParamValue::Text(format!("{s}%")));
                format!("CAST({column} AS VARCHAR) LIKE ?")
            }
            Value::String(s) => {
                params.push(ParamValue::Text(format!("%{s}%")));
                format!("CAST({column} AS VARCHAR) ILIKE ?")
            }
            other => {
                // Scalar non-strings filter by equality; substring matching
                // a number would let 1 match 11.
                params.extend(ParamValue::from_json(other));
                format!("{column} = ?")
            }
        },
        FilterMode::ExactAny => {
            params.extend(ParamValue::from_json(value));
            format!("{column} = ?")
        }
    }
}
