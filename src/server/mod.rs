use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::data::{BreakSide, Inebriated};
use crate::pipeline::ModelStore;
use crate::predict::{predict_match_now, PredictionRequest};

#[derive(Clone)]
pub struct AppState {
    pub store: ModelStore,
    pub overround: f64,
}

/// Build the Axum router for the prediction API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", get(predict_handler))
        .route("/players", get(players_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

fn default_inebriated() -> Inebriated {
    Inebriated::Yes
}

#[derive(Debug, Deserialize)]
struct PredictQuery {
    #[serde(rename = "playerA")]
    player_a: String,
    #[serde(rename = "playerB")]
    player_b: String,
    break_side: BreakSide,
    #[serde(default = "default_inebriated")]
    inebriated: Inebriated,
    #[serde(default)]
    vig: bool,
}

/// GET /predict?playerA=..&playerB=..&break_side=Window%20Side&inebriated=Yes&vig=false
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let player_a = query.player_a.trim();
    let player_b = query.player_b.trim();
    if player_a.is_empty() || player_b.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "player names must not be empty".into()));
    }
    if player_a == player_b {
        return Err((
            StatusCode::BAD_REQUEST,
            "playerA and playerB must be different players".into(),
        ));
    }

    let request = PredictionRequest {
        player_a: player_a.to_string(),
        player_b: player_b.to_string(),
        break_side: query.break_side,
        inebriated: query.inebriated,
        apply_vig: query.vig,
    };
    let bundle = state.store.current();
    for player in [player_a, player_b] {
        if !bundle.encoder.knows_player(player) {
            debug!("No history for '{}'; pricing from shared features only", player);
        }
    }
    debug!("Predicting {} vs {} (vig={})", player_a, player_b, query.vig);
    Ok(Json(predict_match_now(&bundle, &request, state.overround)))
}

/// GET /players
async fn players_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.current().players.clone())
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    trained_rows: usize,
    skipped_rows: usize,
    players: usize,
    margin_std_dev: f64,
    trained_at: DateTime<Utc>,
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let bundle = state.store.current();
    Json(Health {
        status: "ok",
        trained_rows: bundle.trained_rows(),
        skipped_rows: bundle.skipped_rows,
        players: bundle.players.len(),
        margin_std_dev: bundle.margin_std_dev,
        trained_at: bundle.trained_at,
    })
}
