//! `tablyd` — the Tably terminal server binary.
//!
//! Usage:
//!   tablyd -c <config-name-or-path> [--listen <addr>]
//!
//! The config name resolves to `/etc/tably/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tably_core::Module;
use tracing::info;

use config::ServerConfig;

/// Tably terminal server.
#[derive(Parser, Debug)]
#[command(name = "tablyd", about = "Tably terminal server")]
struct Cli {
    /// Config name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    server_config.verify()?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = tably_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn tably_sql::SQLStore> = Arc::new(
        tably_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    let licensing_config = licensing::service::LicensingConfig {
        jwt_secret: server_config.jwt.secret.clone(),
        token_ttl_secs: server_config.jwt.expire_secs,
    };
    let licensing_module = licensing::LicensingModule::new(Arc::clone(&sql), licensing_config)?;
    info!("Licensing module initialized");

    let module_routes = vec![(licensing_module.name(), licensing_module.routes())];

    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("Tably server listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
