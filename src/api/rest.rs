// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. CORS is permissive; the dashboard is
// expected to be served from a different origin during development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analytics::SessionStats;
use crate::app_state::AppState;
use crate::export::{export_csv, export_filename};
use crate::market_data::PointSample;
use crate::types::{Interval, Period, Selection};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/prices", get(prices))
        .route("/api/v1/history/:symbol", get(history))
        .route("/api/v1/chart", get(chart))
        .route("/api/v1/chart/export", get(chart_export))
        .route("/api/v1/selection", get(get_selection))
        .route("/api/v1/selection", post(set_selection))
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Snapshots
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

async fn prices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.prices.read().clone())
}

#[derive(Serialize)]
struct HistoryResponse {
    symbol: String,
    capacity: usize,
    samples: Vec<PointSample>,
    stats: SessionStats<PointSample>,
}

/// Sparkline window for one symbol. Unknown symbols return an empty window.
async fn history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    let symbol = symbol.to_uppercase();
    let samples = state.sparkline(&symbol);
    let stats = SessionStats::compute(&samples);
    Json(HistoryResponse {
        capacity: state.history.read().capacity(),
        symbol,
        samples,
        stats,
    })
}

async fn chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.chart.read().clone() {
        Some(view) => Json(view).into_response(),
        None => {
            let body = serde_json::json!({
                "chart": null,
                "selection": state.selection(),
                "message": "No chart data available yet",
            });
            Json(body).into_response()
        }
    }
}

/// CSV download of the current chart records.
async fn chart_export(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (symbol, body) = match state.chart.read().as_ref() {
        Some(view) => (view.selection.symbol.clone(), export_csv(&view.records)),
        None => (state.selection().symbol, export_csv(&[])),
    };

    let disposition = format!("attachment; filename=\"{}\"", export_filename(&symbol));
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
}

// =============================================================================
// Selection
// =============================================================================

async fn get_selection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.selection())
}

#[derive(Deserialize)]
struct SelectionUpdate {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    period: Option<Period>,
    #[serde(default)]
    interval: Option<Interval>,
}

#[derive(Serialize)]
struct SelectionResponse {
    selection: Selection,
    effective_interval: Interval,
    generation: u64,
}

/// Change any subset of symbol / period / interval and trigger a chart
/// refresh for the result.
async fn set_selection(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SelectionUpdate>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let mut selection = state.selection();

    if let Some(symbol) = update.symbol {
        let symbol = symbol.trim().to_uppercase();
        if !state.is_tracked(&symbol) {
            warn!(symbol = %symbol, "selection rejected: symbol not tracked");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("Unknown symbol: '{symbol}'"),
                })),
            ));
        }
        selection.symbol = symbol;
    }
    if let Some(period) = update.period {
        selection.period = period;
    }
    if let Some(interval) = update.interval {
        selection.interval = interval;
    }

    let request = state.select(selection);
    info!(
        selection = %request.selection,
        generation = request.generation,
        "chart selection changed via API"
    );

    Ok(Json(SelectionResponse {
        effective_interval: request.selection.effective_interval(),
        selection: request.selection,
        generation: request.generation,
    }))
}
