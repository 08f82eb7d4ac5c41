//! Command implementations
//!
//! Every command returns the text to print on stdout; logging goes through
//! `tracing` to stderr.

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::config::Settings;
use crate::errors::CliError;
use serde_json::json;
use std::io::Read;
use std::path::Path;
use symvault_secrets::{
    MemoryReader, Reference, SecretMap, SecretReader, SymlinkResolver, secret_map_from_json,
};
use symvault_vault::VaultReader;
use tokio_util::sync::CancellationToken;

/// Run a parsed command line
///
/// # Errors
///
/// Returns a `CliError` if configuration, input, or resolution fails.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let Cli { command, global } = cli;

    if let Commands::Parse { reference } = &command {
        return parse_reference(reference);
    }

    let settings = Settings::resolve(&global)?;
    tracing::debug!(?settings, "Effective settings");

    let reader = build_reader(&global, &settings)?;
    let ctx = cancellation_token(&settings);

    execute(command, reader.as_ref(), &settings, &ctx).await
}

/// Pick the secret reader: fixtures file when given, Vault otherwise
///
/// # Errors
///
/// Returns a `CliError` if the fixtures cannot be loaded or the Vault client
/// cannot be created.
pub fn build_reader(
    global: &GlobalArgs,
    settings: &Settings,
) -> Result<Box<dyn SecretReader>, CliError> {
    if let Some(path) = &global.fixtures {
        tracing::info!(fixtures = %path.display(), "Reading secrets from fixtures");
        return Ok(Box::new(MemoryReader::from_file(path)?));
    }
    Ok(Box::new(VaultReader::new(settings.vault.clone())?))
}

/// Token cancelled on Ctrl-C or when the configured timeout expires
fn cancellation_token(settings: &Settings) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling secret resolution");
            on_signal.cancel();
        }
    });

    if let Some(timeout) = settings.timeout() {
        let on_timeout = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(timeout_secs = timeout.as_secs(), "Timed out, cancelling secret resolution");
            on_timeout.cancel();
        });
    }

    token
}

/// Execute a command against an already-built reader
///
/// # Errors
///
/// Returns a `CliError` if input is invalid or resolution fails.
pub async fn execute(
    command: Commands,
    reader: &dyn SecretReader,
    settings: &Settings,
    ctx: &CancellationToken,
) -> Result<String, CliError> {
    let resolver = SymlinkResolver::new(reader, settings.resolver.clone());

    let resolved = match command {
        Commands::Resolve { input } => {
            let data = parse_input(&read_input(input.as_deref())?)?;
            resolver.resolve_all(ctx, data).await?
        }
        Commands::Get { path, version } => {
            let version = version.map(|v| v.to_string());
            let data = reader.read_secret(ctx, &path, version.as_deref()).await?;
            resolver.resolve_all(ctx, data).await?
        }
        Commands::Parse { reference } => return parse_reference(&reference),
    };

    render(&resolved)
}

fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            CliError::invalid_input(format!("Failed to read {}: {e}", path.display()))
        }),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| CliError::invalid_input(format!("Failed to read stdin: {e}")))?;
            Ok(buffer)
        }
    }
}

/// Parse a JSON object into a secret mapping
///
/// # Errors
///
/// Returns `CliError::InvalidInput` if the text is not a JSON object.
pub fn parse_input(content: &str) -> Result<SecretMap, CliError> {
    let document: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| CliError::invalid_input(format!("Invalid JSON: {e}")))?;
    secret_map_from_json(document)
        .ok_or_else(|| CliError::invalid_input("expected a JSON object at the top level"))
}

fn render(data: &SecretMap) -> Result<String, CliError> {
    serde_json::to_string_pretty(data)
        .map_err(|e| CliError::invalid_input(format!("Failed to render output: {e}")))
}

fn parse_reference(value: &str) -> Result<String, CliError> {
    let reference = Reference::decode(value).ok_or_else(|| CliError::InvalidReference {
        value: value.to_string(),
    })?;
    let decoded = json!({
        "path": reference.path(),
        "secret": reference.secret(),
        "version": reference.version(),
    });
    serde_json::to_string_pretty(&decoded)
        .map_err(|e| CliError::invalid_input(format!("Failed to render output: {e}")))
}
