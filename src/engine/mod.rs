//! # Embedded Engine
//!
//! Thin wrapper over in-process DuckDB. The engine is an opaque executor:
//! it mounts columnar files as tables under their logical names and runs
//! compiled statements with bound parameters. All callers share one
//! connection behind a mutex; critical sections are one statement long.

pub mod errors;

use std::path::Path;
use std::sync::Mutex;

use duckdb::types::Value as SqlValue;
use duckdb::{params_from_iter, Connection};

use crate::catalog::SourceFormat;
use crate::query::ParamValue;

pub use errors::{EngineError, EngineResult};

/// Column names plus row values for one executed statement
pub type RowSet = (Vec<String>, Vec<Vec<SqlValue>>);

/// Shared handle to the embedded engine
pub struct Engine {
    conn: Mutex<Connection>,
}

impl Engine {
    /// Open a transient in-memory engine
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EngineError::Unavailable(format!("failed to open in-memory engine: {e}"))
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a persistent engine database at `path`
    pub fn open(path: &Path) -> EngineResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            EngineError::Unavailable(format!("failed to open engine at {}: {e}", path.display()))
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Names of tables currently present in the engine namespace
    pub fn table_names(&self) -> EngineResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'main' ORDER BY table_name",
            )
            .map_err(EngineError::statement)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(EngineError::statement)?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(EngineError::statement)?);
        }
        Ok(names)
    }

    /// (Re)load one columnar file as a table under its logical name.
    ///
    /// `table` must already satisfy the identifier grammar; the file path is
    /// quoted as a SQL string literal.
    pub fn load_table(&self, table: &str, format: SourceFormat, source: &Path) -> EngineResult<()> {
        let reader = match format {
            SourceFormat::Parquet => "read_parquet",
            SourceFormat::Csv => "read_csv_auto",
        };
        let literal = escape_literal(&source.display().to_string());

        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; \
             CREATE TABLE {table} AS SELECT * FROM {reader}('{literal}');"
        ))
        .map_err(EngineError::statement)
    }

    /// Drop a table if present
    pub fn drop_table(&self, table: &str) -> EngineResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))
            .map_err(EngineError::statement)
    }

    /// Run a statement with bound parameters, returning names and rows
    pub fn query_rows(&self, sql: &str, params: &[ParamValue]) -> EngineResult<RowSet> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(EngineError::statement)?;

        let column_count = stmt.column_count();
        let column_names: Vec<String> = (0..column_count)
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| "?".to_string())
            })
            .collect();

        let rows = stmt
            .query_map(params_from_iter(bind_values(params)), |row| {
                let mut record = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    record.push(row.get::<_, SqlValue>(i)?);
                }
                Ok(record)
            })
            .map_err(EngineError::statement)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EngineError::statement)?);
        }
        Ok((column_names, out))
    }

    /// Run a single-value count statement with bound parameters
    pub fn query_count(&self, sql: &str, params: &[ParamValue]) -> EngineResult<i64> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(EngineError::statement)?;
        stmt.query_row(params_from_iter(bind_values(params)), |row| {
            row.get::<_, i64>(0)
        })
        .map_err(EngineError::statement)
    }

    fn lock(&self) -> EngineResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EngineError::Unavailable(e.to_string()))
    }
}

fn bind_values(params: &[ParamValue]) -> Vec<SqlValue> {
    params
        .iter()
        .map(|p| match p {
            ParamValue::Text(s) => SqlValue::Text(s.clone()),
            ParamValue::Int(i) => SqlValue::BigInt(*i),
            ParamValue::Float(f) => SqlValue::Double(*f),
            ParamValue::Bool(b) => SqlValue::Boolean(*b),
        })
        .collect()
}

fn escape_literal(path: &str) -> String {
    path.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine_with_owners_csv() -> (TempDir, Engine) {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("owners.csv");
        fs::write(&csv, "owner_id,full_name\n1,Ada Smith\n2,Grace Jones\n").unwrap();

        let engine = Engine::open_in_memory().unwrap();
        engine
            .load_table("owners", SourceFormat::Csv, &csv)
            .unwrap();
        (dir, engine)
    }

    #[test]
    fn test_load_table_and_list_names() {
        let (_dir, engine) = engine_with_owners_csv();
        assert_eq!(engine.table_names().unwrap(), vec!["owners"]);

        engine.drop_table("owners").unwrap();
        assert!(engine.table_names().unwrap().is_empty());
    }

    #[test]
    fn test_load_table_is_idempotent() {
        let (dir, engine) = engine_with_owners_csv();
        let csv = dir.path().join("owners.csv");

        engine
            .load_table("owners", SourceFormat::Csv, &csv)
            .unwrap();
        let (_, rows) = engine.query_rows("SELECT * FROM owners", &[]).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_query_rows_returns_names_and_values() {
        let (_dir, engine) = engine_with_owners_csv();

        let (names, rows) = engine
            .query_rows(
                "SELECT owner_id, full_name FROM owners WHERE full_name ILIKE ?",
                &[ParamValue::Text("%smith%".to_string())],
            )
            .unwrap();

        assert_eq!(names, vec!["owner_id", "full_name"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], SqlValue::BigInt(1));
        assert_eq!(rows[0][1], SqlValue::Text("Ada Smith".to_string()));
    }

    #[test]
    fn test_query_count() {
        let (_dir, engine) = engine_with_owners_csv();
        let total = engine
            .query_count("SELECT COUNT(*) FROM owners", &[])
            .unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_missing_table_reports_drift() {
        let engine = Engine::open_in_memory().unwrap();
        let err = engine.query_rows("SELECT * FROM ghosts", &[]).unwrap_err();
        assert!(err.is_missing_relation(), "{err}");
    }

    #[test]
    fn test_parquet_source_loads() {
        let dir = TempDir::new().unwrap();
        let parquet = dir.path().join("vehicles.parquet");

        // Author a parquet fixture through a scratch connection.
        let scratch = Connection::open_in_memory().unwrap();
        scratch
            .execute_batch(&format!(
                "COPY (SELECT 1 AS car_id, 'corolla' AS title) TO '{}' (FORMAT PARQUET);",
                parquet.display()
            ))
            .unwrap();

        let engine = Engine::open_in_memory().unwrap();
        engine
            .load_table("vehicles", SourceFormat::Parquet, &parquet)
            .unwrap();

        let (names, rows) = engine
            .query_rows("SELECT car_id, title FROM vehicles", &[])
            .unwrap();
        assert_eq!(names, vec!["car_id", "title"]);
        assert_eq!(rows[0][1], SqlValue::Text("corolla".to_string()));
    }
}
