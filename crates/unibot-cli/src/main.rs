//! UNIBOT CLI - a command-line client for the UNIBOT university chatbot.
//!
//! Logs in against the UNIBOT API, keeps the token pair in the configured
//! credential store, and prints courses, assignments and chat exchanges.

mod commands;
mod format;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use unibot_core::{
    ApiError, ClientConfig, CredentialStore, FileStore, KeyringStore, Settings, StoreBackend,
    UnibotClient,
};

use commands::Command;

/// Log file name inside the cache directory
const LOG_FILE: &str = "unibot.log";

type Client = UnibotClient<unibot_core::HttpTransport, Box<dyn CredentialStore>>;

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file = Settings::cache_dir().ok().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        let appender = tracing_appender::rolling::never(dir, LOG_FILE);
        Some(tracing_appender::non_blocking(appender))
    });
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn open_store(backend: StoreBackend) -> Result<Box<dyn CredentialStore>> {
    Ok(match backend {
        StoreBackend::File => Box::new(FileStore::new(Settings::credentials_path()?)),
        StoreBackend::Keyring => Box::new(KeyringStore::default()),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n", e);
            eprintln!("{}", commands::USAGE);
            return Ok(ExitCode::from(2));
        }
    };

    let mut settings = Settings::load()?;
    let config = ClientConfig::from_env();
    info!(base_url = config.base_url(), store = %settings.store, "UNIBOT CLI starting");

    let client: Client = UnibotClient::from_config(&config, open_store(settings.store)?)?;

    if let Err(e) = commands::run(command, &client, &mut settings).await {
        eprintln!("Error: {}", user_message(&e));
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Friendlier wording for the failures users hit most.
fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::InvalidCredentials) => "Invalid username or password".to_string(),
        Some(e) if e.is_auth_failure() => {
            "Not logged in or session expired. Run `unibot login`.".to_string()
        }
        Some(ApiError::Network(e)) if e.is_connect() => {
            "Unable to connect to the UNIBOT server. Is it running?".to_string()
        }
        Some(ApiError::Validation { detail, .. }) => {
            format!("The server rejected the request:\n{}", format::validation_detail(detail))
        }
        _ => format!("{:#}", err),
    }
}
