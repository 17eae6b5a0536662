//! Prediction API. Asks the mind reader for a guess and reports real moves.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use mindreader::{Confidence, LearnOutcome, MindReader, Symbol};
use serde::{Deserialize, Serialize};

use crate::{AppState, ServerError};

/// Adds the prediction API to the given router.
pub fn add_to_router(api_router: Router<AppState>) -> Router<AppState> {
    api_router
        .route("/predict", post(predict))
        .route("/learn", post(learn))
}

#[derive(Deserialize)]
pub struct PredictRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub prediction: u8,
    pub confidence: Confidence,
}

#[derive(Deserialize)]
pub struct LearnRequest {
    pub session_id: String,
    /// Wider than a move on purpose so that out of range values reach the
    /// validation instead of failing deserialization.
    pub user_move: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LearnResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<f32>,
}

impl From<LearnOutcome> for LearnResponse {
    fn from(outcome: LearnOutcome) -> Self {
        let (status, loss) = match outcome {
            LearnOutcome::GatheringData => ("Gathering Data", None),
            LearnOutcome::NeedMoreContext => ("Need more context", None),
            LearnOutcome::Learned { loss } => ("Learned", Some(loss)),
        };
        LearnResponse {
            status: status.to_string(),
            loss,
        }
    }
}

/// The forward pass is cheap, but it may wait on a training step holding the
/// model lock. That wait must not block the async runtime.
async fn predict(
    State(mind_reader): State<Arc<MindReader>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ServerError> {
    let session_id = request.session_id;
    let prediction =
        tokio::task::spawn_blocking(move || mind_reader.predict(&session_id)).await?;

    Ok(Json(PredictResponse {
        prediction: prediction.symbol.into(),
        confidence: prediction.confidence,
    }))
}

async fn learn(
    State(mind_reader): State<Arc<MindReader>>,
    Json(request): Json<LearnRequest>,
) -> Result<Json<LearnResponse>, ServerError> {
    let symbol = Symbol::try_from(request.user_move)?;
    let session_id = request.session_id;

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = mind_reader.learn(&session_id, symbol);
        if let LearnOutcome::Learned { loss } = outcome {
            debug!("Session {} learned {} with loss {:.4}", session_id, symbol, loss);
        }
        outcome
    })
    .await?;

    Ok(Json(outcome.into()))
}
