//! Region lookup server for OCR'd page scans.
//!
//! Provides the HTTP API that turns a page URI plus free-text search terms
//! into the word regions Solr has indexed for that page, for viewers that
//! highlight matches on the scanned image.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use vellum::solr::SolrClient;

mod config;
mod regions;

use config::Config;
use regions::{encode_body, execute_lookup, parse_target_uri, CoordFormat};

const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
const DEFAULT_SOLR_URL: &str = "http://localhost:8983/solr";
const DEFAULT_CORE: &str = "ocr";

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "OCR region lookup server")]
struct Args {
    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Solr base URL
    #[arg(long)]
    solr_url: Option<String>,

    /// Solr core holding the OCR word index
    #[arg(long)]
    core: Option<String>,

    /// Optional TOML settings file; explicit flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    solr: SolrClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let file = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    let listen = args
        .listen
        .or(file.listen)
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let solr_url = args
        .solr_url
        .or(file.solr_url)
        .unwrap_or_else(|| DEFAULT_SOLR_URL.to_string());
    let core = args
        .core
        .or(file.core)
        .unwrap_or_else(|| DEFAULT_CORE.to_string());

    info!("Vellum region lookup server");
    info!("Using Solr at {} (core '{}')", solr_url, core);

    let solr = SolrClient::new(&solr_url, &core)?;
    match solr.ping().await {
        Ok(true) => info!("Solr core is responding"),
        Ok(false) => warn!("Solr core ping returned an error status"),
        Err(e) => warn!("Solr core is unreachable: {}", e),
    }

    let state = Arc::new(AppState { solr });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/regions", get(regions_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let healthy = state.solr.ping().await.unwrap_or(false);

    Ok(Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        solr: healthy,
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    solr: bool,
}

/// Word-region lookup for one page scan
async fn regions_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionQueryParams>,
) -> Result<Response, (StatusCode, String)> {
    debug!("Region lookup params: {:?}", params);

    let target_uri = require_param(params.target_uri.as_deref(), "targetUri")?;
    let search_terms = require_param(params.search_terms.as_deref(), "searchTerms")?;

    let page = parse_target_uri(target_uri)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("targetUri: {:#}", e)))?;
    let format = CoordFormat::from_param(params.coord_format.as_deref());

    let payload = execute_lookup(&state.solr, &page, search_terms, format)
        .await
        .map_err(|e| {
            tracing::error!("Region lookup failed: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                "search backend unavailable".to_string(),
            )
        })?;

    let (body, content_type) = encode_body(&payload, params.callback.as_deref())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// Reject missing or blank required parameters as client errors.
fn require_param<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, (StatusCode, String)> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err((
            StatusCode::BAD_REQUEST,
            format!("missing required parameter: {}", name),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct RegionQueryParams {
    /// URI of the page within the collection/item/sequence hierarchy
    #[serde(rename = "targetUri")]
    target_uri: Option<String>,
    /// Free-text search terms, whitespace-separated
    #[serde(rename = "searchTerms")]
    search_terms: Option<String>,
    /// JSONP callback name
    callback: Option<String>,
    /// "openLayers" selects OpenLayers coordinates
    #[serde(rename = "coordFormat")]
    coord_format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_param() {
        assert_eq!(require_param(Some("/a/b"), "targetUri").unwrap(), "/a/b");

        let err = require_param(None, "targetUri").unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = require_param(Some("   "), "searchTerms").unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
