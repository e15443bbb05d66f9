//! Config loading and validation tests for metastore-config.
// crates/metastore-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate defaults, section constraints, and file loading.
// Purpose: Ensure configuration fails closed on invalid or oversized input.
// =============================================================================

use std::fs;
use std::path::PathBuf;

use metastore_config::ConfigError;
use metastore_config::MetastoreConfig;
use metastore_config::StoreType;
use metastore_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

type TestResult = Result<(), String>;

fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

fn ensure(condition: bool, message: &str) -> TestResult {
    if condition { Ok(()) } else { Err(message.to_string()) }
}

#[test]
fn empty_config_uses_defaults() -> TestResult {
    let config = MetastoreConfig::from_toml("").map_err(|err| err.to_string())?;
    ensure(config.store.store_type == StoreType::Memory, "default store is memory")?;
    ensure(config.store.sqlite_config().is_none(), "memory store has no sqlite config")?;
    ensure(config.store.resource_table == "resource_mapper", "default resource table")?;
    ensure(config.schemas.directory == PathBuf::from("schemas"), "default schema dir")?;
    ensure(config.schemas.max_schema_bytes == 1024 * 1024, "default schema limit")?;
    ensure(config.catalog.catalog_schema_id().as_str() == "catalog", "default catalog")?;
    ensure(config.catalog.dataset_schema_id().as_str() == "dataset", "default dataset")?;
    ensure(
        config.catalog.distribution_schema_id().as_str() == "distribution",
        "default distribution",
    )?;
    ensure(config.logging.level == "info", "default log level")?;
    Ok(())
}

#[test]
fn sqlite_store_maps_to_sqlite_config() -> TestResult {
    let config = MetastoreConfig::from_toml(
        r#"
        [store]
        type = "sqlite"
        path = "data/metastore.db"
        sync_mode = "normal"
        busy_timeout_ms = 250
        "#,
    )
    .map_err(|err| err.to_string())?;
    let sqlite = config.store.sqlite_config().ok_or("sqlite config missing")?;
    ensure(sqlite.path == PathBuf::from("data/metastore.db"), "sqlite path")?;
    ensure(sqlite.sync_mode == SqliteSyncMode::Normal, "sync mode")?;
    ensure(sqlite.busy_timeout_ms == 250, "busy timeout")?;
    Ok(())
}

#[test]
fn memory_store_rejects_path() -> TestResult {
    assert_invalid(
        MetastoreConfig::from_toml("[store]\npath = \"metastore.db\"\n"),
        "memory store must not set path",
    )
}

#[test]
fn sqlite_store_requires_path() -> TestResult {
    assert_invalid(
        MetastoreConfig::from_toml("[store]\ntype = \"sqlite\"\n"),
        "sqlite store requires path",
    )
}

#[test]
fn schema_limit_is_bounded() -> TestResult {
    assert_invalid(
        MetastoreConfig::from_toml("[schemas]\nmax_schema_bytes = 0\n"),
        "schemas.max_schema_bytes",
    )?;
    assert_invalid(
        MetastoreConfig::from_toml("[schemas]\nmax_schema_bytes = 104857600\n"),
        "schemas.max_schema_bytes",
    )
}

#[test]
fn catalog_schema_ids_are_checked() -> TestResult {
    assert_invalid(
        MetastoreConfig::from_toml("[catalog]\ndataset_schema = \"../dataset\"\n"),
        "catalog.dataset_schema contains invalid characters",
    )?;
    assert_invalid(
        MetastoreConfig::from_toml("[catalog]\ncatalog_schema = \"dataset\"\n"),
        "must differ",
    )
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    match MetastoreConfig::from_toml("[store]\nflavour = \"sqlite\"\n") {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got ok={}", other.is_ok())),
    }
}

#[test]
fn blank_log_level_is_rejected() -> TestResult {
    assert_invalid(
        MetastoreConfig::from_toml("[logging]\nlevel = \"  \"\n"),
        "logging.level must be non-empty",
    )
}

#[test]
fn load_reads_explicit_path() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("metastore.toml");
    fs::write(&path, "[logging]\nlevel = \"debug\"\n").map_err(|err| err.to_string())?;
    let config = MetastoreConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    ensure(config.logging.level == "debug", "level loaded")?;
    ensure(config.source_path.as_deref() == Some(path.as_path()), "source path recorded")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("metastore.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    assert_invalid(MetastoreConfig::load(Some(&path)), "config file exceeds size limit")
}

#[test]
fn load_reports_missing_file_as_io() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    match MetastoreConfig::load(Some(&dir.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got ok={}", other.is_ok())),
    }
}
