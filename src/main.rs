use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use filebay::file::{FileService, FileStorage, UploadPolicy};
use filebay::web::WebServer;
use filebay::{Config, Database, IdGenerator};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = filebay::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        filebay::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    info!("filebay - file upload service");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let storage = FileStorage::new(&config.files.upload_path);
    if let Err(e) = storage.ensure_dir().await {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let files = FileService::new(db, storage, Arc::new(IdGenerator::new()))
        .with_policy(UploadPolicy::from_config(&config.files));

    let server = match WebServer::new(&config, files) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server configured on {}", server.addr());
    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
