//! This module is in charge of defining the configuration format with types
//! and reading the configuration.

use serde::Deserialize;
use std::{env, fs};

#[derive(Clone, Debug, Deserialize)]
pub struct EnvironmentConfig {
    pub bind: String,
    /// Weight blob written by the offline trainer. If it can't be read, the
    /// server starts with a fresh random model.
    pub weights_path: String,
    pub log_file: String,
    /// Learning rate for the per-move training step.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Reset a session's optimizer before every training step.
    #[serde(default)]
    pub fresh_optimizer_per_step: bool,
    /// Fixes the random source for guesses and a fresh model.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_learning_rate() -> f32 {
    0.01
}

/// Determines from the first command line argument which config file to load.
/// Then it loads the config file, parses the toml into a EnvironmentConfig
/// struct and returns it.
/// If no argument is provided, it will load the default config file. This is
/// useful for development.
pub fn load_config() -> EnvironmentConfig {
    match load_config_inner() {
        Ok(config) => config,
        Err(err) => {
            // The logger is configured from this file, so it isn't running yet.
            println!("Error loading config: {err}");
            std::process::exit(1);
        }
    }
}

/// Inner method to unify error handling
fn load_config_inner() -> Result<EnvironmentConfig, String> {
    let args: Vec<String> = env::args().collect();

    let config_filename = match args.len() {
        1 => "dev-config.toml".to_string(),
        2 => args[1].clone(),
        _ => {
            return Err(format!("Usage: {} [config_file]", args[0]));
        }
    };

    let config_file = fs::read_to_string(&config_filename)
        .map_err(|_| format!("Could not read config file at path: {config_filename}"))?;

    parse_config(&config_file).map_err(|e| {
        format!(
            "Could not parse config file at path: {}\nCaused by: {}",
            config_filename, e
        )
    })
}

pub fn parse_config(config_file: &str) -> Result<EnvironmentConfig, String> {
    let config: EnvironmentConfig = toml::from_str(config_file).map_err(|e| format!("{e:?}"))?;

    if !(config.learning_rate > 0.0 && config.learning_rate.is_finite()) {
        return Err(format!(
            "learning_rate must be a positive number, got {}",
            config.learning_rate
        ));
    }
    Ok(config)
}
