//! Bootstraps a starting brain for the server. Generates a long synthetic
//! keypad walk, trains on it in full batches and writes the weight file.

#[macro_use]
extern crate log;

use anyhow::Context;
use clap::Parser;
use mindreader::{
    bootstrap::{bulk_train, KeypadWalker, SequenceGenerator},
    random::seeded_rng,
    weights, AdamConfig, Parameters,
};

#[derive(Parser, Debug)]
#[command(about = r#"Pretrains the mind reader on synthetic keypad walks.

The resulting file is loaded by the server on startup."#)]
struct Cli {
    #[arg(long, default_value_t = 2000, help = "Number of moves in the walk.")]
    length: usize,

    #[arg(long, default_value_t = 100, help = "Full batch optimizer steps.")]
    epochs: usize,

    #[arg(long, default_value_t = 0.01)]
    learning_rate: f32,

    #[arg(long, help = "Fixes the walk and the initial weights.")]
    seed: Option<u64>,

    #[arg(long, default_value = "human_brain_v1.bin")]
    output: String,
}

fn init_logger() -> anyhow::Result<()> {
    use simplelog::*;

    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger()?;

    let mut rng = seeded_rng(cli.seed);
    let mut params = Parameters::random(&mut rng);
    let sequence = KeypadWalker::new(rng).generate(cli.length);
    info!("Generated {} synthetic moves.", sequence.len());

    let config = AdamConfig::with_learning_rate(cli.learning_rate);
    let losses = bulk_train(&mut params, &sequence, cli.epochs, &config, |progress, loss| {
        if progress.is_milestone(20) {
            info!("{}, loss {:.4}", progress, loss);
        }
    });
    if let (Some(first), Some(last)) = (losses.first(), losses.last()) {
        info!("Loss went from {:.4} to {:.4}.", first, last);
    }

    weights::save(&params, &cli.output)
        .with_context(|| format!("Could not write weights to {}", cli.output))?;
    info!("Brain saved to {}.", cli.output);
    Ok(())
}
