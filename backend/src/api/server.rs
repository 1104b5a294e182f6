//! HTTP server for the sales dashboard.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                 |
//! |--------|-------------------|---------------------------------------------|
//! | GET    | `/health`         | Health check                                |
//! | GET    | `/api/dashboard`  | KPIs, charts and rows for a filter          |
//! | GET    | `/api/sales`      | Filtered rows only                          |
//! | GET    | `/api/logs`       | SSE stream for real-time logs               |
//! | POST   | `/api/upload`     | Upload a raw CSV, then clean and load it    |
//!
//! Dashboard reads go through a [`SalesCache`]; an upload invalidates it.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, Stage, LOG_BROADCASTER};
use super::types::{error_response, DashboardQuery, UploadResponse};
use crate::cache::SalesCache;
use crate::config::{DbConfig, MAX_UPLOAD_SIZE};
use crate::dashboard::{apply_filter, build_view, fetch_sales, DashboardView, FilterOptions};
use crate::error::{ExtractError, PipelineError, ServerError, ServerResult, StoreError};
use crate::load::LoadOptions;
use crate::models::StoredSale;
use crate::pipeline::ingest_bytes;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DbConfig>,
    pub cache: Arc<Mutex<SalesCache>>,
}

impl AppState {
    pub fn new(config: DbConfig, cache: SalesCache) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Persisted rows, from the cache when fresh.
    async fn sales(&self) -> ServerResult<Arc<Vec<StoredSale>>> {
        let mut cache = self.cache.lock().await;
        if let Some(rows) = cache.get() {
            return Ok(rows);
        }
        let rows = fetch_sales(&self.config).await?;
        Ok(cache.put(rows))
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/sales", get(sales))
        .route("/api/upload", post(upload_csv))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, config: DbConfig) -> Result<(), Box<dyn std::error::Error>> {
    let description = config.describe();
    let app = router(AppState::new(config, SalesCache::default()));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Salesflow dashboard running on http://localhost:{}", port);
    println!("   Database: {}", description);
    println!("   GET  /api/dashboard - KPIs and charts");
    println!("   GET  /api/sales     - Filtered rows");
    println!("   POST /api/upload    - Upload raw sales CSV");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Extract(ExtractError::Schema { .. }))
            | ServerError::Pipeline(PipelineError::Extract(ExtractError::Read(_)))
            | ServerError::Pipeline(PipelineError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Store(StoreError::Connection(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        log_error(Stage::Server, self.to_string());
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "salesflow",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.config.backend,
        "endpoints": {
            "dashboard": "GET /api/dashboard",
            "sales": "GET /api/sales",
            "upload": "POST /api/upload",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ServerResult<Json<DashboardView>> {
    let filter = query.into_filter()?;
    let rows = state.sales().await?;
    Ok(Json(build_view(&rows, &filter)))
}

async fn sales(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ServerResult<Json<Vec<StoredSale>>> {
    let filter = query.into_filter()?;
    let rows = state.sales().await?;
    let applied = filter.resolve(&FilterOptions::from_rows(&rows));
    Ok(Json(apply_filter(&rows, &applied)))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip the missed entries.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
///
/// Multipart fields: `file` (required) and `truncate` (`true` to replace
/// the table contents).
async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = LoadOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "truncate" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                options.truncate = value.trim().eq_ignore_ascii_case("true");
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    log_info(
        Stage::Server,
        format!(
            "New upload: {} ({} bytes)",
            file_name.as_deref().unwrap_or("unknown"),
            bytes.len()
        ),
    );

    let summary = ingest_bytes(&bytes, &state.config, options).await?;
    state.cache.lock().await.invalidate();
    log_success(
        Stage::Server,
        format!("Upload loaded: {} rows, table now {}", summary.load.inserted, summary.load.total_rows),
    );

    Ok(Json(UploadResponse::new(summary, file_name)))
}
