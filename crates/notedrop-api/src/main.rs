//! notedrop-api - HTTP API server for notedrop

mod error;
mod handlers;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use notedrop_db::{Database, FilesystemBackend, StorageBackend};
use notedrop_ingest::BotClient;

use services::kv::KvStore;

/// Maximum request body size: 50 MB, sized for file uploads.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Generates UUID request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Static server configuration from the environment.
pub struct AppConfig {
    pub admin_username: String,
    pub admin_password: String,
    pub telegram_webhook_secret: Option<String>,
    pub telegram_allowed_user: Option<i64>,
}

impl AppConfig {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            admin_username: std::env::var("ADMIN_USERNAME")
                .map_err(|_| anyhow::anyhow!("ADMIN_USERNAME is required"))?,
            admin_password: std::env::var("ADMIN_PASSWORD")
                .map_err(|_| anyhow::anyhow!("ADMIN_PASSWORD is required"))?,
            telegram_webhook_secret: std::env::var("TELEGRAM_WEBHOOK_SECRET").ok(),
            telegram_allowed_user: std::env::var("TELEGRAM_ALLOWED_USER")
                .ok()
                .and_then(|v| v.parse().ok()),
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: Arc<dyn StorageBackend>,
    pub kv: KvStore,
    pub config: Arc<AppConfig>,
    /// Telegram client; `None` when no bot token is configured.
    pub bot: Option<BotClient>,
}

/// Parse allowed CORS origins from a comma-separated environment variable.
///
/// Defaults to localhost dev origins when unset.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:8787".to_string());

    origins
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

/// Build the application router.
fn app(state: AppState) -> Router {
    use handlers::*;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Public share routes (no session)
        .route("/share/:public_id", get(share::share_page_redirect))
        .route("/api/public/note/:public_id", get(share::public_note))
        .route(
            "/api/public/note/raw/:public_id",
            get(share::public_raw_note),
        )
        .route("/api/public/file/:public_id", get(share::public_file))
        // Telegram ingestion (authorized by secret path / sender allow-list)
        .route("/api/tg-media-proxy/:file_id", get(telegram::media_proxy))
        .route("/api/telegram_webhook/:secret", post(telegram::webhook))
        // Auth
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        // Notes
        .route("/api/notes", get(notes::list_notes).post(notes::create_note))
        .route("/api/notes/merge", post(notes::merge_notes))
        .route("/api/notes/timeline", get(stats::timeline))
        .route(
            "/api/notes/:id",
            axum::routing::put(notes::update_note).delete(notes::delete_note),
        )
        .route(
            "/api/notes/:id/share",
            post(share::share_note).delete(share::unshare_note),
        )
        .route(
            "/api/notes/:note_id/files/:file_id/share",
            post(share::share_file),
        )
        // Search, tags, stats
        .route("/api/search", get(notes::search_notes))
        .route("/api/tags", get(stats::list_tags))
        .route("/api/stats", get(stats::stats))
        // Files and images
        .route("/api/files/:note_id/:file_id", get(files::serve_note_file))
        .route("/api/upload/image", post(files::upload_image))
        .route("/api/images/:image_id", get(files::serve_image))
        .route("/api/attachments", get(files::list_attachments))
        .route("/api/proxy/upload/imgur", post(files::imgur_proxy_upload))
        // Docs tree
        .route("/api/docs/tree", get(docs::docs_tree))
        .route("/api/docs/node", post(docs::create_node))
        .route("/api/docs/node/:id/rename", post(docs::rename_node))
        .route(
            "/api/docs/node/:id",
            get(docs::get_node)
                .put(docs::update_node)
                .patch(docs::move_node)
                .delete(docs::delete_node),
        )
        // Settings
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins()))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        // Both limits: axum's default body cap is 2 MB, far too small for
        // file uploads.
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   RUST_LOG    - standard env filter (default: "notedrop_api=debug,tower_http=debug")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notedrop_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(path) = log_file {
        let file_dir = std::path::Path::new(&path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(&path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notedrop-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = Arc::new(AppConfig::from_env()?);

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?;
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;

    let storage_path =
        std::env::var("BLOB_STORAGE_PATH").unwrap_or_else(|_| "./data/blobs".to_string());
    let storage = FilesystemBackend::new(&storage_path);
    storage
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("blob storage validation failed: {}", e))?;

    let kv = KvStore::from_env().await?;

    let bot = std::env::var("TELEGRAM_BOT_TOKEN").ok().map(BotClient::new);
    if bot.is_none() {
        info!("TELEGRAM_BOT_TOKEN not set; telegram ingestion disabled");
    }

    let state = AppState {
        db,
        storage: Arc::new(storage),
        kv,
        config,
        bot,
    };

    let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8787".to_string())
        .parse()?;

    info!(%bind_addr, storage_path = %storage_path, "starting notedrop-api");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
