mod cli;

use crate::cli::Cli;
use clap::Parser;
use melodytube_core::{
    CatalogLookup, CoreError, LoggingConfig, LookupBackend, LookupService, MelodyTubeConfig,
    TrackLookup,
};
use melodytube_lookup_api::{ApiLookup, ApiProviderConfig, API_CONFIG_TEMPLATE};
use melodytube_lookup_scrape::{ScrapeLookup, ScrapeProviderConfig, SCRAPE_CONFIG_TEMPLATE};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code used when Ctrl+C interrupts a command
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(MelodyTubeConfig::config_path);

    // Logging settings are read before the full config so config errors get logged too
    init_tracing(&peek_logging_config(&config_path));

    // Load config or create template on first run
    let provider_templates: &[&str] = &[SCRAPE_CONFIG_TEMPLATE, API_CONFIG_TEMPLATE];
    let mut config = match MelodyTubeConfig::load_or_create_at(&config_path, Some(provider_templates)) {
        Ok(config) => config,
        Err(CoreError::ConfigParseError(parse_error)) => {
            error!(
                "Config file {} has a syntax error: {parse_error}",
                config_path.display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    if let Some(backend) = cli.backend {
        config.lookup.backend = backend;
    }
    if let Some(limit) = cli.limit {
        config.lookup.max_results = limit;
    }

    let backend = match create_backend(&config) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to initialize {} lookup backend: {e}", config.lookup.backend);
            std::process::exit(1);
        }
    };
    let lookup = LookupService::new(backend).with_max_results(config.lookup.max_results);
    info!(
        "Using {} lookup backend (max results: {})",
        lookup.backend_name(),
        config.lookup.max_results
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, cancelling...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let exit_code = runtime.block_on(async {
        tokio::select! {
            () = cancel_token.cancelled() => EXIT_INTERRUPTED,
            code = cli::run(&cli.command, &lookup, &config.player.widget) => code,
        }
    });

    std::process::exit(exit_code);
}

/// Create the lookup backend selected in config
fn create_backend(config: &MelodyTubeConfig) -> Result<Box<dyn TrackLookup>, CoreError> {
    match config.lookup.backend {
        LookupBackend::Scrape => {
            let provider_config =
                ScrapeProviderConfig::from_providers(&config.providers)?.unwrap_or_default();
            info!("Initializing scrape lookup backend ({})", provider_config.base_url);
            Ok(Box::new(ScrapeLookup::with_config(&provider_config)?))
        }
        LookupBackend::Api => {
            let provider_config =
                ApiProviderConfig::from_providers(&config.providers)?.unwrap_or_default();
            info!("Initializing API lookup backend ({})", provider_config.base_url);
            Ok(Box::new(ApiLookup::with_config(&provider_config)?))
        }
        LookupBackend::Catalog => {
            info!("Initializing catalog lookup backend");
            Ok(Box::new(CatalogLookup::new()))
        }
    }
}

/// Read just the `[logging]` section, falling back to defaults on any problem
fn peek_logging_config(config_path: &Path) -> LoggingConfig {
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: LoggingConfig,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return LoggingConfig::default();
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging)
        .unwrap_or_default()
}

/// Initialize tracing with stderr output and optional file logging
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},reqwest_retry=warn", logging.level)));

    // Results go to stdout; keep logs off it
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if logging.file {
        let log_path = melodytube_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
