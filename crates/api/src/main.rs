use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockai_core::ingest::provider::{MarketDataProvider, YahooFinanceProvider};
use stockai_core::llm::RecommendationRequester;
use stockai_core::pipeline::{AnalysisError, Analyzer};

mod page;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockai_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let market = YahooFinanceProvider::from_settings(&settings)?;
    let requester = match RecommendationRequester::from_settings(&settings) {
        Ok(requester) => Ok(Arc::new(requester)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, provider = %settings.llm_provider, "LLM client not configured; analysis requests will fail");
            Err(format!("{e:#}"))
        }
    };

    let state = AppState {
        market: Arc::new(market),
        requester,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/analyze", get(analyze_page))
        .route("/api/analyze/:symbol", get(analyze_json))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "web ui listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    market: Arc<dyn MarketDataProvider>,
    /// `Err` holds the configuration error shown to users instead of calling the model.
    requester: Result<Arc<RecommendationRequester>, String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    symbol: String,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index() -> Html<String> {
    Html(page::render_index())
}

async fn analyze_page(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
) -> Response {
    if params.symbol.trim().is_empty() {
        return Html(page::render_index()).into_response();
    }

    let requester = match &state.requester {
        Ok(r) => r.clone(),
        Err(config_err) => {
            let html = page::render_error(&params.symbol, "Configuration error", config_err);
            return (StatusCode::SERVICE_UNAVAILABLE, Html(html)).into_response();
        }
    };

    let analyzer = Analyzer::new(state.market.as_ref(), requester.as_ref());
    match analyzer.analyze(&params.symbol).await {
        Ok(report) => Html(page::render_report(&report)).into_response(),
        Err(err) => {
            let status = status_for(&err);
            let html = page::render_error(&params.symbol, "Analysis failed", &err.to_string());
            (status, Html(html)).into_response()
        }
    }
}

async fn analyze_json(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    let requester = match &state.requester {
        Ok(r) => r.clone(),
        Err(config_err) => {
            return error_json(StatusCode::SERVICE_UNAVAILABLE, config_err);
        }
    };

    let analyzer = Analyzer::new(state.market.as_ref(), requester.as_ref());
    match analyzer.analyze(&symbol).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_json(status_for(&err), &err.to_string()),
    }
}

fn status_for(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::InvalidSymbol { .. } => StatusCode::BAD_REQUEST,
        AnalysisError::NoData { .. } => StatusCode::NOT_FOUND,
        AnalysisError::MarketData { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stockai_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
