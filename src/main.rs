use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use bioinsight_api::{AppState, RestApi};
use bioinsight_core::ModelContext;
use bioinsight_storage::StorageManager;

/// Bioactivity prediction and search server
#[derive(Parser, Debug)]
#[command(name = "bioinsight")]
#[command(about = "Serve bioactivity predictions, explanations and compound search", long_about = None)]
struct Args {
    /// Directory holding scaler.json, logistic_regression.json and xgboost.json
    #[arg(short, long, env = "BIOINSIGHT_MODEL_DIR", default_value = "./models")]
    model_dir: PathBuf,

    /// Bioactivity dataset: a .json array of rows or a binary snapshot
    #[arg(short, long, env = "BIOINSIGHT_DATA_FILE", default_value = "./data/bioactivity.json")]
    data_file: PathBuf,

    /// Address to bind the HTTP API to
    #[arg(long, env = "BIOINSIGHT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP API port
    #[arg(long, env = "BIOINSIGHT_HTTP_PORT", default_value_t = 8000)]
    http_port: u16,

    /// Log level, overridden by RUST_LOG when set
    #[arg(long, env = "BIOINSIGHT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Write the loaded dataset to this path as a binary snapshot and exit
    #[arg(long, value_name = "PATH")]
    write_snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting BioInsight v{}", env!("CARGO_PKG_VERSION"));
    info!("Model directory: {:?}", args.model_dir);
    info!("Data file: {:?}", args.data_file);

    if let Some(snapshot) = &args.write_snapshot {
        let store = StorageManager::load(&args.data_file)?;
        store.save_snapshot(snapshot)?;
        info!("Snapshot written; start the server with --data-file {:?}", snapshot);
        return Ok(());
    }

    // refuse to serve anything without the full model set
    let models = Arc::new(ModelContext::load(&args.model_dir)?);
    info!("Models loaded");

    let store = Arc::new(StorageManager::load(&args.data_file)?);
    info!("Storage initialized with {} records", store.len());

    let state = AppState::new(models, store);
    let host = args.host.clone();
    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on {}:{}", host, http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, &host, http_port).await {
                error!("HTTP server error: {}", e);
            }
        })
    });

    info!("BioInsight started successfully");
    info!("HTTP API: http://{}:{}/", args.host, args.http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
