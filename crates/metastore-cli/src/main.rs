// crates/metastore-cli/src/main.rs
// ============================================================================
// Module: Metastore CLI Entry Point
// Description: Command dispatcher over the metastore web-service boundary.
// Purpose: Drive every API operation against a configured store from a shell.
// Dependencies: clap, metastore-api, metastore-config, metastore-core,
//               metastore-store-sqlite, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! `metastore` loads `metastore.toml`, wires the schema directory and the
//! configured store into a [`WebServiceApi`], runs one operation, and prints
//! the response body as JSON on stdout. Non-2xx responses exit with a failure
//! code. Logs go to stderr so stdout stays machine-readable.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use metastore_api::ApiRequest;
use metastore_api::ApiResponse;
use metastore_api::LENGTH_PARAM;
use metastore_api::SHOW_REFERENCE_IDS_PARAMS;
use metastore_api::START_PARAM;
use metastore_api::WebServiceApi;
use metastore_config::MetastoreConfig;
use metastore_config::StoreType;
use metastore_core::DirectorySchemaRetriever;
use metastore_core::KeyedTable;
use metastore_core::MetastoreService;
use metastore_core::ResourceCleanup;
use metastore_core::ResourceMapper;
use metastore_core::StorageFactory;
use metastore_store_sqlite::MAX_RECORD_BYTES;
use metastore_store_sqlite::SqliteStore;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a request body read from a file or stdin.
const MAX_BODY_BYTES: usize = MAX_RECORD_BYTES;
/// URI prefix used to build `endpoint` values.
const API_BASE_URI: &str = "/api/1/metastore";
/// Body source naming stdin.
const STDIN_SOURCE: &str = "-";
/// Log directive used when neither `RUST_LOG` nor the config parses.
const FALLBACK_LOG_DIRECTIVE: &str = "info";
/// Error raised when the config selects the non-persistent store.
const MEMORY_STORE_REFUSED: &str =
    "memory store does not persist between invocations; set [store] type = \"sqlite\"";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "metastore", disable_help_subcommand = true)]
struct Cli {
    /// Path to `metastore.toml` (overrides `METASTORE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Expand reference sidecars instead of stripping them from read output.
    #[arg(long = "show-reference-ids", global = true)]
    show_reference_ids: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// List every schema keyed by id.
    Schemas,
    /// Show one schema.
    Schema {
        /// Schema id.
        schema: String,
    },
    /// List published records of a schema.
    List {
        /// Schema id.
        schema: String,
        /// Zero-based offset into the identifier-ordered records.
        #[arg(long)]
        start: Option<usize>,
        /// Maximum number of records to return.
        #[arg(long)]
        length: Option<usize>,
    },
    /// Show the published revision of a record.
    Get {
        /// Schema id.
        schema: String,
        /// Record identifier.
        id: String,
    },
    /// Show the distribution entries of a record.
    Resources {
        /// Schema id.
        schema: String,
        /// Record identifier.
        id: String,
    },
    /// Create a record.
    Post {
        /// Schema id.
        schema: String,
        /// Body file, or `-` for stdin.
        body: String,
    },
    /// Create or replace a record.
    Put {
        /// Schema id.
        schema: String,
        /// Record identifier.
        id: String,
        /// Body file, or `-` for stdin.
        body: String,
    },
    /// Apply a JSON Merge Patch to a record.
    Patch {
        /// Schema id.
        schema: String,
        /// Record identifier.
        id: String,
        /// Patch file, or `-` for stdin.
        body: String,
    },
    /// Publish the latest revision of a record.
    Publish {
        /// Schema id.
        schema: String,
        /// Record identifier.
        id: String,
    },
    /// Delete a record.
    Delete {
        /// Schema id.
        schema: String,
        /// Record identifier.
        id: String,
    },
    /// Show the assembled catalog.
    Catalog,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures raised before or after the API call.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
    /// The configured store could not be opened.
    #[error("store error: {0}")]
    Store(String),
    /// A request body could not be read.
    #[error("input error: {0}")]
    Input(String),
    /// The response could not be written.
    #[error("output error: {0}")]
    Output(String),
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Loads configuration, runs the selected command, and prints the response.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = MetastoreConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::Config(err.to_string()))?;
    init_logging(&config.logging.level);
    let api = build_api(&config)?;
    let response = dispatch(&api, &cli.command, cli.show_reference_ids)?;
    debug!(status = response.status, "request handled");
    write_response(&response)?;
    if response.is_success() { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Installs the stderr subscriber; `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LOG_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Builds the API over the configured schema directory and store.
fn build_api(config: &MetastoreConfig) -> CliResult<WebServiceApi> {
    let base = config_base_dir(config);
    let schema_root = anchor_path(base, &config.schemas.directory);
    let max_schema_bytes = config.schemas.max_schema_bytes;
    let retriever = Arc::new(DirectorySchemaRetriever::with_limit(schema_root, max_schema_bytes));
    let (storage_factory, resource_table) = open_store(config, base)?;
    let service = MetastoreService::new(retriever, storage_factory).with_catalog_schemas(
        config.catalog.catalog_schema_id(),
        config.catalog.dataset_schema_id(),
    );
    let mapper = Arc::new(ResourceMapper::new(resource_table));
    let cleanup = ResourceCleanup::new(mapper)
        .with_distribution_schema(config.catalog.distribution_schema_id());
    Ok(WebServiceApi::new(Arc::new(service)).with_resource_cleanup(cleanup))
}

/// Opens the record storage and the resource table for the configured store.
fn open_store(
    config: &MetastoreConfig,
    base: Option<&Path>,
) -> CliResult<(Arc<dyn StorageFactory>, Arc<dyn KeyedTable>)> {
    if config.store.store_type == StoreType::Memory {
        return Err(CliError::Config(MEMORY_STORE_REFUSED.to_string()));
    }
    let Some(mut sqlite) = config.store.sqlite_config() else {
        return Err(CliError::Config("sqlite store requires path".to_string()));
    };
    sqlite.path = anchor_path(base, &sqlite.path);
    let store = SqliteStore::open(sqlite).map_err(|err| CliError::Store(err.to_string()))?;
    let factory: Arc<dyn StorageFactory> = Arc::new(store.storage_factory());
    let table: Arc<dyn KeyedTable> = Arc::new(store.keyed_table(&config.store.resource_table));
    Ok((factory, table))
}

/// Returns the directory holding the loaded config file, if any.
fn config_base_dir(config: &MetastoreConfig) -> Option<&Path> {
    config.source_path.as_deref().and_then(Path::parent).filter(|dir| !dir.as_os_str().is_empty())
}

/// Resolves a relative config path against the config file's directory.
fn anchor_path(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Runs one command against the API.
fn dispatch(
    api: &WebServiceApi,
    command: &Commands,
    show_reference_ids: bool,
) -> CliResult<ApiResponse> {
    let request = |uri: String| {
        let request = ApiRequest::new(uri);
        if show_reference_ids {
            request.with_query(SHOW_REFERENCE_IDS_PARAMS[0], "")
        } else {
            request
        }
    };
    let response = match command {
        Commands::Schemas => api.get_schemas(&request(format!("{API_BASE_URI}/schemas"))),
        Commands::Schema {
            schema,
        } => api.get_schema(&request(format!("{API_BASE_URI}/schemas/{schema}")), schema),
        Commands::List {
            schema,
            start,
            length,
        } => {
            let mut list = request(items_uri(schema));
            if let Some(start) = start {
                list = list.with_query(START_PARAM, start.to_string());
            }
            if let Some(length) = length {
                list = list.with_query(LENGTH_PARAM, length.to_string());
            }
            api.get_all(&list, schema)
        }
        Commands::Get {
            schema,
            id,
        } => api.get(&request(item_uri(schema, id)), schema, id),
        Commands::Resources {
            schema,
            id,
        } => api.get_resources(&request(format!("{}/resources", item_uri(schema, id))), schema, id),
        Commands::Post {
            schema,
            body,
        } => api.post(&request(items_uri(schema)).with_body(read_body(body)?), schema),
        Commands::Put {
            schema,
            id,
            body,
        } => api.put(&request(item_uri(schema, id)).with_body(read_body(body)?), schema, id),
        Commands::Patch {
            schema,
            id,
            body,
        } => api.patch(&request(item_uri(schema, id)).with_body(read_body(body)?), schema, id),
        Commands::Publish {
            schema,
            id,
        } => api.publish(&request(format!("{}/publish", item_uri(schema, id))), schema, id),
        Commands::Delete {
            schema,
            id,
        } => api.delete(&request(item_uri(schema, id)), schema, id),
        Commands::Catalog => api.get_catalog(&request(format!("{API_BASE_URI}/catalog"))),
    };
    Ok(response)
}

/// Returns the collection URI of a schema.
fn items_uri(schema: &str) -> String {
    format!("{API_BASE_URI}/schemas/{schema}/items")
}

/// Returns the URI of one record.
fn item_uri(schema: &str, id: &str) -> String {
    format!("{}/{id}", items_uri(schema))
}

// ============================================================================
// SECTION: Input
// ============================================================================

/// Reads a request body from a file path or stdin.
fn read_body(source: &str) -> CliResult<String> {
    if source == STDIN_SOURCE {
        return read_limited(std::io::stdin().lock(), MAX_BODY_BYTES);
    }
    let path = Path::new(source);
    let file = File::open(path)
        .map_err(|err| CliError::Input(format!("{}: {err}", path.display())))?;
    read_limited(file, MAX_BODY_BYTES)
}

/// Reads at most `max_bytes` of UTF-8 text, failing when the input is larger.
fn read_limited(reader: impl Read, max_bytes: usize) -> CliResult<String> {
    let read_limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    reader
        .take(read_limit)
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::Input(err.to_string()))?;
    if bytes.len() > max_bytes {
        return Err(CliError::Input(format!("body exceeds {max_bytes} bytes")));
    }
    String::from_utf8(bytes).map_err(|_| CliError::Input("body must be utf-8".to_string()))
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes the response body as pretty JSON to stdout.
fn write_response(response: &ApiResponse) -> CliResult<()> {
    let text = serde_json::to_string_pretty(&response.body)
        .map_err(|err| CliError::Output(err.to_string()))?;
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{text}").map_err(|err| CliError::Output(err.to_string()))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
