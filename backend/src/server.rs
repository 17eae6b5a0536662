//! This module implements the server for the backend.
//! We are using Axum as the web framework.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use mindreader::MindReader;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::{prediction, AppState};

pub async fn run(state: AppState) -> anyhow::Result<()> {
    let app: Router<AppState> = prediction::add_to_router(Router::new());
    let app: Router = app
        .route("/", get(index))
        .with_state(state.clone())
        // The game client is served from anywhere.
        .layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(&state.config.bind).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct Status {
    status: &'static str,
    sessions: usize,
}

async fn index(State(mind_reader): State<Arc<MindReader>>) -> Json<Status> {
    Json(Status {
        status: "Mind Reader API is Online",
        sessions: mind_reader.sessions().len(),
    })
}
