//! CLI command implementations
//!
//! `serve` loads configuration, wires the service context, and runs the
//! HTTP server. `verify` runs the snapshot integrity check and exits
//! non-zero on any mismatch.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::catalog::MappingCatalog;
use crate::config::ServiceConfig;
use crate::engine::Engine;
use crate::http_server::HttpServer;
use crate::observability::Logger;
use crate::service::ServiceContext;
use crate::snapshot::SnapshotManager;
use crate::trust::{BearerVerifier, ResponseSigner};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::Verify { config } => verify(&config),
    }
}

/// Build the catalog, engine, and snapshot manager shared by both commands
fn build_snapshot_stack(
    config: &ServiceConfig,
) -> CliResult<(Arc<MappingCatalog>, Arc<Engine>, Arc<SnapshotManager>)> {
    let catalog = MappingCatalog::load_from_file(config.mapping_path())
        .map_err(|e| CliError::config_error(e.to_string()))?;
    let catalog = Arc::new(catalog);

    let engine = match config.engine_cache_path() {
        Some(path) => Engine::open(path),
        None => Engine::open_in_memory(),
    }
    .map_err(|e| CliError::boot_failed(format!("Failed to open engine: {}", e)))?;
    let engine = Arc::new(engine);

    let snapshots = Arc::new(SnapshotManager::new(catalog.clone(), engine.clone()));

    Ok((catalog, engine, snapshots))
}

/// Start the lookup gateway server
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    let (catalog, engine, snapshots) = build_snapshot_stack(&config)?;

    // Build snapshots up front; a degraded catalog still serves what it can
    match snapshots.rebuild() {
        Ok(report) => Logger::info(
            "BOOT_SNAPSHOT_READY",
            &[
                ("loaded", &report.loaded.len().to_string()),
                ("skipped", &report.skipped.len().to_string()),
            ],
        ),
        Err(e) => Logger::error("BOOT_SNAPSHOT_DEGRADED", &[("detail", &e.to_string())]),
    }

    let verifier = BearerVerifier::from_pem_file(config.auth_public_key_path())
        .map_err(|e| CliError::boot_failed(e.to_string()))?;

    let signer = match config.signing_key_path() {
        Some(path) => Some(
            ResponseSigner::from_pem_file(path, config.response_token_ttl_secs)
                .map_err(|e| CliError::boot_failed(e.to_string()))?,
        ),
        None => None,
    };

    let context = Arc::new(ServiceContext::new(
        catalog,
        engine,
        snapshots,
        verifier,
        signer,
        config.default_source_id.clone(),
    ));

    let server = HttpServer::new(&config.listen_addr, context);

    // Start the async runtime and run the server
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}

/// Verify cached snapshots against the checksum manifest
pub fn verify(config_path: &Path) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    let (_catalog, _engine, snapshots) = build_snapshot_stack(&config)?;

    let report = snapshots
        .verify_integrity()
        .map_err(|e| CliError::verify_failed(e.to_string()))?;

    let body = json!({
        "status": if report.ok { "pass" } else { "fail" },
        "message": &report.message,
        "checked": report.checked,
        "first_mismatch": &report.first_mismatch,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !report.ok {
        return Err(CliError::verify_failed(report.message));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_fixture(root: &Path) -> std::path::PathBuf {
        let mapping = json!({
            "storage": { "root": root.to_string_lossy(), "manifest": "manifest.json" },
            "schemas": {
                "things": { "path": "things.csv" }
            },
            "groups": {
                "things": {
                    "from": "things",
                    "select": { "id": "things.id" },
                    "where_any": { "id": "things.id" }
                }
            }
        });
        std::fs::write(root.join("mapping.json"), mapping.to_string()).unwrap();
        std::fs::write(root.join("things.csv"), "id\n1\n").unwrap();

        let manifest = crate::snapshot::SnapshotManifest::from_files(
            root,
            &["things.csv".to_string()],
        )
        .unwrap();
        manifest.write_to_file(&root.join("manifest.json")).unwrap();

        let config = json!({
            "mapping": root.join("mapping.json").to_string_lossy(),
            "auth_public_key": root.join("auth.pub.pem").to_string_lossy()
        });
        let config_path = root.join("snapgate.json");
        std::fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_verify_passes_on_clean_snapshot() {
        let dir = TempDir::new().unwrap();
        let config_path = write_fixture(dir.path());

        verify(&config_path).unwrap();
    }

    #[test]
    fn test_verify_fails_on_tampered_source() {
        let dir = TempDir::new().unwrap();
        let config_path = write_fixture(dir.path());
        std::fs::write(dir.path().join("things.csv"), "id\n2\n").unwrap();

        let err = verify(&config_path).unwrap_err();
        assert_eq!(err.code_str(), "SNAPGATE_CLI_VERIFY_FAILED");
    }

    #[test]
    fn test_missing_config_is_config_error() {
        let err = verify(Path::new("/nonexistent/snapgate.json")).unwrap_err();
        assert_eq!(err.code_str(), "SNAPGATE_CLI_CONFIG_ERROR");
    }
}
