use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::Arc;
use table_browser::{
    BrowserLayer, MySqlBackend, MySqlSettings, ProxyBackend, ProxySettings, QueryBackend,
    SqliteBackend, StaticToken,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

mod demo;
mod settings;

use settings::{BackendKind, ServerConfig};

#[derive(Clone)]
struct ApplicationState {
    backend: Arc<dyn QueryBackend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log.to_lowercase())),
        )
        .init();

    info!("Starting browser-server v{}", env!("CARGO_PKG_VERSION"));

    let backend = build_backend(&config).await?;
    info!(backend = backend.kind(), "Backend ready");

    let application_state = ApplicationState {
        backend: backend.clone(),
    };

    // BrowserLayer returns a stateless Router, so it is merged after with_state()
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .with_state(application_state)
        .merge(BrowserLayer::new(config.base_path.clone(), backend).into_router());

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    let address = listener.local_addr()?;

    info!("Server running at http://{address}");
    info!("Health check at http://{address}/api/health");
    info!("Table browser API at http://{address}{}/api", config.base_path.trim_end_matches('/'));

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn build_backend(config: &ServerConfig) -> Result<Arc<dyn QueryBackend>> {
    let backend: Arc<dyn QueryBackend> = match config.backend.kind {
        BackendKind::Sqlite => {
            let sqlite = &config.backend.sqlite;
            let mut default_database = sqlite.default_database.clone();

            if sqlite.seed_demo {
                demo::ensure_demo_database(&sqlite.directory)
                    .await
                    .context("Failed to create the demo database")?;
                default_database.get_or_insert_with(|| demo::DEMO_DATABASE.to_string());
            } else if !sqlite.directory.is_dir() {
                warn!(directory = %sqlite.directory.display(), "SQLite directory does not exist");
            }

            Arc::new(SqliteBackend::new(sqlite.directory.clone(), default_database))
        }
        BackendKind::Mysql => {
            let mysql = &config.backend.mysql;
            Arc::new(MySqlBackend::new(MySqlSettings {
                host: mysql.host.clone(),
                port: mysql.port,
                user: mysql.user.clone(),
                password: mysql.password.clone(),
                database: mysql.database.clone(),
            }))
        }
        BackendKind::Proxy => {
            let proxy = &config.backend.proxy;
            let settings = ProxySettings {
                endpoint: proxy.endpoint.clone().unwrap_or_default(),
                project_id: proxy.project_id.clone(),
                dataset_id: proxy.dataset_id.clone(),
                timeout: proxy.timeout(),
            };
            let token = StaticToken::new(proxy.token.clone().unwrap_or_default());
            Arc::new(ProxyBackend::new(settings, Arc::new(token)).context("Failed to create the proxy client")?)
        }
    };
    Ok(backend)
}

async fn root_handler() -> &'static str {
    "Welcome to browser-server"
}

async fn health_handler(
    State(state): State<ApplicationState>,
) -> Result<(StatusCode, &'static str), StatusCode> {
    // Listing databases is the cheapest call every backend supports
    state
        .backend
        .list_databases()
        .await
        .map_err(|error| {
            warn!(%error, "Health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    Ok((StatusCode::OK, "Server is healthy"))
}
