//! agrotwin-ai - soil analysis microservice
//!
//! Serves per-sample analysis and the daily aggregate pipeline over HTTP,
//! and runs the daily auto analysis in the background.

use agrotwin_ai::config::{AiConfig, CliOverrides};
use agrotwin_ai::registry::ModelRegistry;
use agrotwin_ai::services::auto_analyzer::parse_run_at;
use agrotwin_ai::services::recommendations::AdviceRenderer;
use agrotwin_ai::services::{
    AutoAnalyzer, DailyAggregator, DailyAnalysisService, InsightPersister, LedgerPublisher,
    RecommendationEngine, SoilAnalyzer, TemplateRenderer,
};
use agrotwin_ai::{build_router, AppState};
use agrotwin_common::config::{
    default_config_path, RootFolderInitializer, RootFolderResolver,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MODULE_NAME: &str = "agrotwin-ai";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "agrotwin-ai")]
#[command(about = "AgroTwin soil analysis service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "AGROTWIN_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database and model artifacts
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Predictor artifact directory
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Ledger bridge base URL
    #[arg(long)]
    bridge_url: Option<String>,

    /// Do not publish daily insights to the ledger
    #[arg(long)]
    no_ledger: bool,

    /// Do not run the daily auto analysis
    #[arg(long)]
    no_scheduler: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind_address: self.bind_address.clone(),
            port: self.port,
            models_dir: self.models_dir.clone(),
            bridge_url: self.bridge_url.clone(),
            no_ledger: self.no_ledger,
            no_scheduler: self.no_scheduler,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME))
        .unwrap_or_else(|| PathBuf::from(format!("{}.toml", MODULE_NAME)));
    let mut config = AiConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    config.apply_env().context("Invalid AGROTWIN_* environment value")?;
    config.apply_cli(&args.overrides());

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "agrotwin_ai={level},agrotwin_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} v{}", MODULE_NAME, env!("CARGO_PKG_VERSION"));
    info!("Config file: {}", config_path.display());

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_value(config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = agrotwin_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let renderer: Arc<dyn AdviceRenderer> = match &config.advice.templates {
        Some(path) => Arc::new(
            TemplateRenderer::from_file(path)
                .with_context(|| format!("Failed to load advice templates {}", path.display()))?,
        ),
        None => Arc::new(TemplateRenderer::builtin()),
    };

    let paths = config.artifact_paths(&initializer);
    info!("Models directory: {}", paths.models_dir.display());
    let registry = Arc::new(ModelRegistry::new(paths));
    let analyzer = SoilAnalyzer::new(Arc::clone(&registry), RecommendationEngine::new(renderer));

    let publisher = if config.ledger.enabled {
        let publisher = LedgerPublisher::new(
            pool.clone(),
            &config.ledger.bridge_url,
            config.ledger_timeout(),
        )
        .context("Failed to build ledger client")?;
        info!("Ledger publishing to {}", publisher.endpoint());
        Some(Arc::new(publisher))
    } else {
        warn!("Ledger publishing disabled; insights stay pending");
        None
    };

    let daily = Arc::new(DailyAnalysisService::new(
        DailyAggregator::new(pool.clone(), config.aggregation_timeout()),
        analyzer.clone(),
        InsightPersister::new(pool.clone()),
        publisher,
    ));

    let state = AppState::new(analyzer, Arc::clone(&daily));

    // Eager load; failures are reported by /health and retried lazily
    {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = state.registry.load().await {
                error!("Initial model load failed: {}", e);
                state.record_error(Some(e.to_string())).await;
            }
        });
    }

    if config.scheduler.enabled {
        let run_at = parse_run_at(&config.scheduler.run_at).context("Invalid scheduler config")?;
        Arc::new(AutoAnalyzer::new(pool.clone(), Arc::clone(&daily), run_at)).spawn();
    } else {
        info!("Auto analyzer disabled");
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(publisher) = daily.publisher() {
        let outstanding = publisher.in_flight();
        if outstanding > 0 {
            warn!(
                outstanding,
                "Shutting down with ledger publishes in flight; rows stay pending until the next auto analysis"
            );
        }
    }
    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
