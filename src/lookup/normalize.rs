//! Result row normalization
//!
//! Engine values cross the API boundary in exactly one shape per kind:
//! temporal values as ISO-8601 text, blobs as base64 text, JSON-packed
//! join columns as structured arrays, scalars as themselves. Callers never
//! see engine-native encodings.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, SecondsFormat};
use duckdb::types::{TimeUnit, Value as SqlValue};
use serde_json::{Map, Number, Value};

use super::errors::{LookupError, LookupResult};

/// Convert one engine value to its normalized JSON form
pub fn normalize_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Boolean(b) => Value::Bool(b),
        SqlValue::TinyInt(i) => Value::Number(Number::from(i)),
        SqlValue::SmallInt(i) => Value::Number(Number::from(i)),
        SqlValue::Int(i) => Value::Number(Number::from(i)),
        SqlValue::BigInt(i) => Value::Number(Number::from(i)),
        SqlValue::HugeInt(i) => match i64::try_from(i) {
            Ok(fits) => Value::Number(Number::from(fits)),
            // Out of i64 range: decimal text beats silent truncation.
            Err(_) => Value::String(i.to_string()),
        },
        SqlValue::UTinyInt(i) => Value::Number(Number::from(i)),
        SqlValue::USmallInt(i) => Value::Number(Number::from(i)),
        SqlValue::UInt(i) => Value::Number(Number::from(i)),
        SqlValue::UBigInt(i) => Value::Number(Number::from(i)),
        SqlValue::Float(f) => float_value(f as f64),
        SqlValue::Double(f) => float_value(f),
        SqlValue::Decimal(d) => match d.to_string().parse::<f64>() {
            Ok(f) => float_value(f),
            Err(_) => Value::String(d.to_string()),
        },
        SqlValue::Timestamp(unit, raw) => timestamp_value(&unit, raw),
        SqlValue::Date32(days) => date_value(days),
        SqlValue::Time64(unit, raw) => time_value(&unit, raw),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Enum(s) => Value::String(s),
        SqlValue::Blob(bytes) => Value::String(BASE64.encode(bytes)),
        SqlValue::List(items) => {
            Value::Array(items.into_iter().map(normalize_value).collect())
        }
        // Composite values are packed to JSON text upstream; anything else
        // reaching here has no caller-facing representation.
        _ => Value::Null,
    }
}

/// Normalize one result row into a JSON object keyed by output column name.
///
/// Columns listed in `record_columns` hold JSON-packed join records: their
/// text is parsed into a structured array, and a NULL aggregate (left-join
/// miss) becomes an empty list.
pub fn normalize_row(
    names: &[String],
    values: Vec<SqlValue>,
    record_columns: &[String],
) -> LookupResult<Map<String, Value>> {
    let mut row = Map::new();
    for (name, value) in names.iter().zip(values) {
        let normalized = if record_columns.iter().any(|c| c == name) {
            parse_record_column(name, value)?
        } else {
            normalize_value(value)
        };
        row.insert(name.clone(), normalized);
    }
    Ok(row)
}

/// Normalize a full result set into JSON row objects
pub fn rows_to_json(
    names: &[String],
    rows: Vec<Vec<SqlValue>>,
    record_columns: &[String],
) -> LookupResult<Vec<Value>> {
    rows.into_iter()
        .map(|row| normalize_row(names, row, record_columns).map(Value::Object))
        .collect()
}

fn parse_record_column(name: &str, value: SqlValue) -> LookupResult<Value> {
    match value {
        SqlValue::Null => Ok(Value::Array(Vec::new())),
        SqlValue::Text(json) => {
            let parsed: Value = serde_json::from_str(&json)
                .map_err(|e| LookupError::record_parse(name, e.to_string()))?;
            Ok(match parsed {
                Value::Null => Value::Array(Vec::new()),
                other => other,
            })
        }
        other => Ok(normalize_value(other)),
    }
}

fn float_value(f: f64) -> Value {
    match Number::from_f64(f) {
        Some(n) => Value::Number(n),
        None => Value::Null,
    }
}

fn timestamp_value(unit: &TimeUnit, raw: i64) -> Value {
    let micros = match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw.div_euclid(1_000),
    };
    match DateTime::from_timestamp_micros(micros) {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => Value::Null,
    }
}

fn date_value(days: i32) -> Value {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1);
    match epoch.and_then(|e| e.checked_add_signed(chrono::Duration::days(days as i64))) {
        Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        None => Value::Null,
    }
}

fn time_value(unit: &TimeUnit, raw: i64) -> Value {
    let micros = match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw.div_euclid(1_000),
    };
    let seconds = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    if !(0..86_400).contains(&seconds) {
        return Value::Null;
    }
    match chrono::NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, nanos) {
        Some(time) => Value::String(time.format("%H:%M:%S%.f").to_string()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(normalize_value(SqlValue::Null), Value::Null);
        assert_eq!(normalize_value(SqlValue::Boolean(true)), json!(true));
        assert_eq!(normalize_value(SqlValue::Int(42)), json!(42));
        assert_eq!(normalize_value(SqlValue::BigInt(-7)), json!(-7));
        assert_eq!(normalize_value(SqlValue::Double(1.5)), json!(1.5));
        assert_eq!(
            normalize_value(SqlValue::Text("corolla".to_string())),
            json!("corolla")
        );
    }

    #[test]
    fn test_huge_int_beyond_i64_becomes_text() {
        assert_eq!(normalize_value(SqlValue::HugeInt(5)), json!(5));
        let big = i128::from(i64::MAX) + 1;
        assert_eq!(normalize_value(SqlValue::HugeInt(big)), json!(big.to_string()));
    }

    #[test]
    fn test_blob_becomes_base64() {
        let value = normalize_value(SqlValue::Blob(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(value, json!("3q2+7w=="));
    }

    #[test]
    fn test_timestamp_becomes_rfc3339() {
        assert_eq!(
            normalize_value(SqlValue::Timestamp(TimeUnit::Microsecond, 0)),
            json!("1970-01-01T00:00:00Z")
        );
        assert_eq!(
            normalize_value(SqlValue::Timestamp(TimeUnit::Second, 86_400)),
            json!("1970-01-02T00:00:00Z")
        );
        assert_eq!(
            normalize_value(SqlValue::Timestamp(TimeUnit::Millisecond, 1_500)),
            json!("1970-01-01T00:00:01.500Z")
        );
    }

    #[test]
    fn test_date_becomes_iso_day() {
        assert_eq!(normalize_value(SqlValue::Date32(0)), json!("1970-01-01"));
        assert_eq!(normalize_value(SqlValue::Date32(1)), json!("1970-01-02"));
    }

    #[test]
    fn test_time_becomes_clock_text() {
        assert_eq!(
            normalize_value(SqlValue::Time64(TimeUnit::Microsecond, 0)),
            json!("00:00:00")
        );
        assert_eq!(
            normalize_value(SqlValue::Time64(TimeUnit::Second, 3_661)),
            json!("01:01:01")
        );
    }

    #[test]
    fn test_list_normalizes_elements() {
        let value = normalize_value(SqlValue::List(vec![
            SqlValue::Int(1),
            SqlValue::Text("two".to_string()),
        ]));
        assert_eq!(value, json!([1, "two"]));
    }

    #[test]
    fn test_record_column_parses_packed_json() {
        let names = vec!["car_id".to_string(), "owners".to_string()];
        let values = vec![
            SqlValue::Int(1),
            SqlValue::Text(r#"[{"full_name":"Ada Smith"}]"#.to_string()),
        ];

        let row = normalize_row(&names, values, &["owners".to_string()]).unwrap();
        assert_eq!(row["car_id"], json!(1));
        assert_eq!(row["owners"], json!([{"full_name": "Ada Smith"}]));
    }

    #[test]
    fn test_record_column_null_becomes_empty_list() {
        let names = vec!["owners".to_string()];

        let row = normalize_row(&names, vec![SqlValue::Null], &["owners".to_string()]).unwrap();
        assert_eq!(row["owners"], json!([]));

        let row = normalize_row(
            &names,
            vec![SqlValue::Text("null".to_string())],
            &["owners".to_string()],
        )
        .unwrap();
        assert_eq!(row["owners"], json!([]));
    }

    #[test]
    fn test_record_column_rejects_broken_json() {
        let names = vec!["owners".to_string()];
        let err = normalize_row(
            &names,
            vec![SqlValue::Text("{broken".to_string())],
            &["owners".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, LookupError::RecordParse { .. }));
    }

    #[test]
    fn test_rows_to_json_keeps_row_order() {
        let names = vec!["n".to_string()];
        let rows = vec![
            vec![SqlValue::Int(1)],
            vec![SqlValue::Int(2)],
            vec![SqlValue::Int(3)],
        ];

        let out = rows_to_json(&names, rows, &[]).unwrap();
        assert_eq!(out, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    }
}
