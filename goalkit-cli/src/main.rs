//! `goalkit`: developer CLI for the GoalKit session client.

mod wallet;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use goalkit_core::{FileStore, SessionConfig, SessionController};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::wallet::{PresetProvider, PresetWallet};

/// The preset wallet needs no key, but the controller treats a missing key as "no SDK".
const PRESET_WALLET_KEY: &str = "goalkit-cli";

#[derive(Parser)]
#[command(name = "goalkit", version, about)]
struct Cli {
    /// Identity service base URL.
    #[arg(long, env = "GOALKIT_API_URL", global = true)]
    api_url: Option<String>,

    /// JSON config file (same fields as `SessionConfig::from_json`).
    #[arg(long, env = "GOALKIT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the cached session. Defaults to the platform data directory.
    #[arg(long, env = "GOALKIT_STORE_DIR", global = true)]
    store_dir: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with a wallet account and cache the session.
    Login {
        /// XRPL account the wallet is connected to.
        #[arg(long, env = "GOALKIT_ACCOUNT")]
        account: String,
    },
    /// Revalidate the cached session and print it.
    Status,
    /// Clear the cached session.
    Logout,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> eyre::Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
            SessionConfig::from_json(&json)?
        }
        None => SessionConfig::default(),
    };

    if let Some(api_url) = &cli.api_url {
        config.api_base_url.clone_from(api_url);
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = Some(Duration::from_secs(secs));
    }
    if config.wallet_api_key.is_none() {
        config.wallet_api_key = Some(PRESET_WALLET_KEY.to_string());
    }
    config.validate()?;
    Ok(config)
}

fn store_dir(cli: &Cli) -> eyre::Result<PathBuf> {
    if let Some(dir) = &cli.store_dir {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|dir| dir.join("goalkit"))
        .ok_or_else(|| eyre!("no platform data directory; pass --store-dir"))
}

async fn start(
    cli: &Cli,
    account: Option<String>,
) -> eyre::Result<Arc<SessionController<PresetWallet>>> {
    let config = load_config(cli)?;
    let store = FileStore::open(store_dir(cli)?)?;
    tracing::debug!(root = %store.root().display(), "using session store");

    let router = || tracing::warn!("Session is no longer valid; run `goalkit login`");
    let controller = SessionController::start(
        config,
        &PresetProvider { account },
        Arc::new(store),
        Arc::new(router),
    )
    .await?;
    Ok(controller)
}

/// Startup already runs the exchange for the preset account, so its outcome is final.
async fn login(
    cli: &Cli,
    account: &str,
) -> eyre::Result<Arc<SessionController<PresetWallet>>> {
    let controller = start(cli, Some(account.to_string())).await?;
    if !controller.is_authenticated() || controller.account().as_deref() != Some(account) {
        return Err(eyre!("authentication failed for {account}"));
    }
    Ok(controller)
}

fn print_session(controller: &SessionController<PresetWallet>) -> eyre::Result<()> {
    let output = json!({
        "authenticated": controller.is_authenticated(),
        "runtime": controller.runtime_mode().to_string(),
        "account": controller.account(),
        "user": controller.user(),
        "has_token": controller.token().is_some_and(|t| !t.expose_secret().is_empty()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Command::Login { account } => {
            let controller = login(&cli, account).await?;
            print_session(&controller)?;
        }
        Command::Status => {
            let controller = start(&cli, None).await?;
            print_session(&controller)?;
        }
        Command::Logout => {
            let controller = start(&cli, None).await?;
            controller.logout().await;
            println!("Logged out");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_load_config_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goalkit.json");
        std::fs::write(&path, r#"{"api_base_url": "https://api.goals.example"}"#).unwrap();

        let cli = Cli::parse_from([
            "goalkit",
            "--config",
            path.to_str().unwrap(),
            "--timeout-secs",
            "7",
            "status",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.api_base_url, "https://api.goals.example");
        assert_eq!(config.timeout, Some(Duration::from_secs(7)));
        assert_eq!(config.wallet_api_key.as_deref(), Some(PRESET_WALLET_KEY));
    }

    #[test]
    fn test_load_config_rejects_insecure_remote() {
        let cli = Cli::parse_from(["goalkit", "--api-url", "http://api.goals.example", "logout"]);
        assert!(load_config(&cli).is_err());
    }

    #[tokio::test]
    async fn test_status_without_cached_session() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "goalkit",
            "--store-dir",
            dir.path().to_str().unwrap(),
            "status",
        ]);

        let controller = start(&cli, None).await.unwrap();
        assert!(!controller.is_authenticated());
        assert!(controller.token().is_none());
    }

    #[tokio::test]
    async fn test_login_failure_runs_exchange_once() {
        let mut server = mockito::Server::new_async().await;
        let challenge = server
            .mock("POST", "/auth/challenge")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let url = server.url();
        let cli = Cli::parse_from([
            "goalkit",
            "--api-url",
            url.as_str(),
            "--store-dir",
            dir.path().to_str().unwrap(),
            "login",
            "--account",
            "rABC123",
        ]);

        assert!(login(&cli, "rABC123").await.is_err());
        challenge.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut server = mockito::Server::new_async().await;
        let user = json!({
            "id": "user-1",
            "wallet_address": "rABC123",
            "created_at": "2025-06-01T10:00:00",
        });
        let mocks = [
            server
                .mock("POST", "/auth/challenge")
                .with_body(json!({ "challenge": "c-1" }).to_string())
                .expect(1)
                .create_async()
                .await,
            server
                .mock("POST", "/auth/verify")
                .with_body(json!({ "access_token": "jwt-1", "token_type": "bearer" }).to_string())
                .expect(1)
                .create_async()
                .await,
            server
                .mock("GET", "/auth/me")
                .match_header("authorization", "Bearer jwt-1")
                .with_body(user.to_string())
                .expect(1)
                .create_async()
                .await,
        ];
        let dir = tempfile::tempdir().unwrap();
        let url = server.url();
        let cli = Cli::parse_from([
            "goalkit",
            "--api-url",
            url.as_str(),
            "--store-dir",
            dir.path().to_str().unwrap(),
            "status",
        ]);

        let controller = login(&cli, "rABC123").await.unwrap();

        assert_eq!(controller.account().as_deref(), Some("rABC123"));
        for mock in &mocks {
            mock.assert_async().await;
        }
    }
}
