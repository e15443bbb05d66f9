// crates/metastore-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, wiring, and bounded reads.
// Purpose: Pin the command surface and fail closed on oversized bodies.
// Dependencies: metastore-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Checks the clap definition, path anchoring, body size limits, store
//! selection, and one dispatch over a `SQLite` store.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use clap::CommandFactory;
use clap::Parser;
use metastore_config::MetastoreConfig;
use metastore_config::StoreType;
use serde_json::json;

use super::Cli;
use super::CliError;
use super::Commands;
use super::MEMORY_STORE_REFUSED;
use super::anchor_path;
use super::build_api;
use super::dispatch;
use super::read_limited;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn list_accepts_paging_and_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "metastore",
        "list",
        "dataset",
        "--start",
        "1",
        "--length",
        "2",
        "--show-reference-ids",
        "--config",
        "alt.toml",
    ])
    .unwrap();
    assert!(cli.show_reference_ids);
    assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    assert_eq!(
        cli.command,
        Commands::List {
            schema: "dataset".to_string(),
            start: Some(1),
            length: Some(2),
        }
    );
}

#[test]
fn negative_start_is_rejected_by_parser() {
    assert!(Cli::try_parse_from(["metastore", "list", "dataset", "--start", "-1"]).is_err());
}

#[test]
fn relative_paths_anchor_to_config_directory() {
    let base = Path::new("/etc/metastore");
    assert_eq!(
        anchor_path(Some(base), Path::new("schemas")),
        PathBuf::from("/etc/metastore/schemas")
    );
    assert_eq!(anchor_path(Some(base), Path::new("/srv/db.sqlite")), PathBuf::from("/srv/db.sqlite"));
    assert_eq!(anchor_path(None, Path::new("schemas")), PathBuf::from("schemas"));
}

#[test]
fn read_limited_allows_body_at_limit() {
    let body = read_limited(&b"{\"a\":1}"[..], 7).unwrap();
    assert_eq!(body, "{\"a\":1}");
}

#[test]
fn read_limited_rejects_oversized_body() {
    let err = read_limited(&b"{\"a\":12}"[..], 7).unwrap_err();
    assert!(matches!(err, CliError::Input(message) if message.contains("exceeds 7 bytes")));
}

#[test]
fn read_limited_rejects_non_utf8() {
    let err = read_limited(&[0xff, 0xfe][..], 16).unwrap_err();
    assert!(matches!(err, CliError::Input(message) if message == "body must be utf-8"));
}

#[test]
fn build_api_refuses_memory_store() {
    let config = MetastoreConfig::from_toml("").unwrap();
    assert_eq!(config.store.store_type, StoreType::Memory);
    let err = build_api(&config).err().expect("memory store refused");
    assert!(matches!(err, CliError::Config(message) if message == MEMORY_STORE_REFUSED));
}

#[test]
fn dispatch_posts_through_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let schemas = dir.path().join("schemas");
    fs::create_dir_all(&schemas).unwrap();
    fs::write(schemas.join("dataset.json"), json!({"type": "object"}).to_string()).unwrap();
    let body_path = dir.path().join("dataset.json");
    fs::write(&body_path, json!({"identifier": "d1", "title": "Roads"}).to_string()).unwrap();

    let mut config = MetastoreConfig::from_toml("").unwrap();
    config.schemas.directory = schemas;
    config.store.store_type = StoreType::Sqlite;
    config.store.path = Some(dir.path().join("metastore.db"));
    let api = build_api(&config).unwrap();

    let command = Commands::Post {
        schema: "dataset".to_string(),
        body: body_path.display().to_string(),
    };
    let response = dispatch(&api, &command, false).unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(
        response.body,
        json!({"endpoint": "/api/1/metastore/schemas/dataset/items/d1", "identifier": "d1"})
    );

    let missing = Commands::Post {
        schema: "dataset".to_string(),
        body: dir.path().join("absent.json").display().to_string(),
    };
    assert!(matches!(dispatch(&api, &missing, false), Err(CliError::Input(_))));
}
