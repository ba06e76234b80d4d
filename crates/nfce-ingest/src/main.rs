use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};

use nfce_ingest::config::load_config;
use nfce_ingest::error::ConfigError;
use nfce_ingest::logging::init_logging;
use nfce_ingest::worker::ShutdownSignal;
use nfce_ingest::Service;

const CONFIG_ENV: &str = "NFCE_INGEST_CONFIG";

fn config_path() -> Result<PathBuf, ConfigError> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .ok_or(ConfigError::Missing(CONFIG_ENV))
}

fn main() -> ExitCode {
    let config = match config_path().and_then(load_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("nfce-ingest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("nfce-ingest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting nfce-ingest v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = ShutdownSignal::new();
    let handler_signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutdown signal received, finishing current job...");
        handler_signal.trigger();
    }) {
        error!("Failed to install signal handler: {}", e);
        return ExitCode::FAILURE;
    }

    let service = match Service::from_config(config) {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to build service: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.run(&shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Service stopped with error: {}", e);
            ExitCode::FAILURE
        }
    }
}
