#[macro_use]
extern crate log;
extern crate simplelog;

mod config;
mod prediction;
mod server;

use std::fs::File;
use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use config::EnvironmentConfig;
use mindreader::{random::seeded_rng, weights, AdamConfig, MindReader, OnlineTrainer, Parameters};

/// This enum holds all errors that can be returned by the API.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid input: {0}")]
    BadRequest(#[from] mindreader::MindReaderError),
    #[error("Background task failed")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::BadRequest(mindreader::MindReaderError::InvalidSymbol(_)) => {
                debug!("Rejected request: {}", self);
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            _ => {
                error!("Server Error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub mind_reader: Arc<MindReader>,
}

impl FromRef<AppState> for EnvironmentConfig {
    fn from_ref(app_state: &AppState) -> EnvironmentConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<MindReader> {
    fn from_ref(app_state: &AppState) -> Arc<MindReader> {
        Arc::clone(&app_state.mind_reader)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Set up logging //////////////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

fn init_logger(log_file: &str) -> anyhow::Result<()> {
    use simplelog::*;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(log_file)?),
    ])?;

    debug!("Logger successfully initialized");
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Load the brain //////////////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

/// Loads the pretrained weights. A missing or broken weight file must not keep
/// the server from starting, we fall back to a fresh random brain instead.
fn load_brain(config: &EnvironmentConfig) -> Parameters {
    match weights::load(&config.weights_path) {
        Ok(params) => {
            info!("Pre-trained brain loaded from {}.", config.weights_path);
            params
        }
        Err(e) => {
            warn!(
                "Could not load brain from {}: {}. Using a raw random brain.",
                config.weights_path, e
            );
            Parameters::random(&mut seeded_rng(config.seed))
        }
    }
}

fn init_mind_reader(config: &EnvironmentConfig) -> MindReader {
    let trainer = OnlineTrainer::new(
        AdamConfig::with_learning_rate(config.learning_rate),
        config.fresh_optimizer_per_step,
    );
    MindReader::new(load_brain(config), trainer, config.seed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config();
    init_logger(&config.log_file)?;

    let mind_reader = Arc::new(init_mind_reader(&config));

    info!("Starting server on {}", config.bind);
    server::run(AppState {
        config,
        mind_reader,
    })
    .await
}
