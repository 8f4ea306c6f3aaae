//! Session conversion entrypoint: `train` builds the model bundle from raw clickstream files,
//! `predict` scores feature maps from a JSON file, `serve` exposes scoring over HTTP.

use clap::{Parser, Subcommand};
use session_conversion::{
    config::AppConfig,
    data,
    logging::StructuredLogger,
    model::{Trainer, TrainedModel},
    scoring::Scorer,
    server::{self, AppState},
    ModelError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "session-conversion")]
#[command(about = "Predict target conversions of website sessions")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON); overrides CONVERSION_CONFIG_PATH
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on the configured sessions/hits files and save the model bundle
    Train {
        /// Retrain even if a bundle already exists at the model path
        #[arg(long)]
        force: bool,
    },

    /// Score a JSON file holding one feature map or an array of them
    Predict {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Serve the HTTP API
    Serve,
}

fn load_scorer(config: &AppConfig) -> Result<Scorer, ModelError> {
    if !config.model_path.exists() {
        warn!(path = %config.model_path.display(), "model not found; scoring disabled");
        return Ok(Scorer::unloaded(config.scoring.clone()));
    }
    let model = TrainedModel::load(&config.model_path)?;
    Ok(Scorer::new(Some(Arc::new(model)), config.scoring.clone()))
}

fn train(config: &AppConfig, force: bool) -> Result<(), BoxError> {
    if !force && config.model_path.exists() {
        match TrainedModel::<session_conversion::RandomForest>::load(&config.model_path) {
            Ok(_) => {
                info!(path = %config.model_path.display(), "existing model is valid; use --force to retrain");
                return Ok(());
            }
            Err(e) => warn!(error = %e, "existing model unusable; retraining"),
        }
    }

    let sessions = data::load_sessions(&config.data.sessions_path)?;
    let hits = data::load_hits(&config.data.hits_path)?;
    let outcome = Trainer::new(config.training.clone()).run(&sessions, &hits)?;
    outcome.model.save(&config.model_path)?;

    let roc_auc = outcome.report.holdout.roc_auc.unwrap_or(f64::NAN);
    info!(
        roc_auc,
        target_met = roc_auc >= 0.65,
        "training complete"
    );
    StructuredLogger::emit_json(&outcome.report, &mut std::io::stdout())?;
    Ok(())
}

fn predict(config: &AppConfig, input: &Path) -> Result<(), BoxError> {
    let scorer = load_scorer(config)?;
    let body: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let mut out = std::io::stdout();
    match body.as_array() {
        Some(items) => {
            for r in scorer.score_batch(items) {
                StructuredLogger::emit_json(&r, &mut out)?;
            }
        }
        None => StructuredLogger::emit_json(&scorer.score(&body)?, &mut out)?,
    }
    Ok(())
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var("CONVERSION_CONFIG_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let config = AppConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), "session-conversion starting");

    match cli.command {
        Commands::Train { force } => train(&config, force),
        Commands::Predict { input } => predict(&config, &input),
        Commands::Serve => {
            let scorer = Arc::new(load_scorer(&config)?);
            let state = AppState::new(scorer, config.server.max_batch_size);
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            rt.block_on(server::serve(state, &config.server.bind))?;
            info!("server stopped");
            Ok(())
        }
    }
}
