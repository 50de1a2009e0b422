//! stateboardd: the Stateboard daemon.
//!
//! Opens the entity store, builds the API router, and serves it until
//! Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! STATEBOARD_API_KEY=... stateboardd serve --config /etc/stateboard.toml --listen 0.0.0.0:8787
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use stateboard_core::StateboardConfig;
use stateboard_store::{EntityStore, KeyValueStore, RedbStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,stateboardd=debug,stateboard=debug,tower_http=debug";

#[derive(Parser)]
#[command(name = "stateboardd", about = "Stateboard state API daemon", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Path to a stateboard.toml file.
    #[arg(long, env = "STATEBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides `server.listen`).
    #[arg(long, env = "STATEBOARD_LISTEN")]
    listen: Option<SocketAddr>,

    /// Directory for the redb file (overrides `store.data_dir`).
    #[arg(long, env = "STATEBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Shared secret for API access (overrides `auth.api_key`).
    #[arg(long, env = "STATEBOARD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Keep all state in memory; nothing survives a restart.
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve(args) => {
            let config = resolve_config(args)?;
            serve(config).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Layer CLI/env overrides on top of the config file, then validate.
fn resolve_config(args: ServeArgs) -> anyhow::Result<StateboardConfig> {
    let mut config = match &args.config {
        Some(path) => StateboardConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StateboardConfig::default(),
    };

    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(data_dir) = args.data_dir {
        config.store.data_dir = data_dir;
    }
    if let Some(api_key) = args.api_key {
        config.auth.api_key = Some(api_key);
    }
    if args.in_memory {
        config.store.in_memory = true;
    }

    config.validate()?;
    Ok(config)
}

fn open_store(config: &StateboardConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if config.store.in_memory {
        warn!("using in-memory store; state will not persist");
        return Ok(Arc::new(RedbStore::open_in_memory()?));
    }

    std::fs::create_dir_all(&config.store.data_dir)
        .with_context(|| format!("creating {}", config.store.data_dir.display()))?;
    let db_path = config.store.db_path();
    let store = RedbStore::open(&db_path)?;
    info!(path = ?db_path, "entity store opened");
    Ok(Arc::new(store))
}

async fn serve(config: StateboardConfig) -> anyhow::Result<()> {
    info!(service = %config.server.service_name, "Stateboard daemon starting");

    let store = EntityStore::new(open_store(&config)?);
    let state = stateboard_api::AppState::new(store, &config)?;
    let router = stateboard_api::build_router(state)?;

    let addr = config.server.listen;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stateboard daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to install Ctrl-C handler; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve_flags() {
        let cli = Cli::try_parse_from([
            "stateboardd",
            "serve",
            "--listen",
            "127.0.0.1:9999",
            "--api-key",
            "k",
            "--in-memory",
            "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        let Command::Serve(args) = cli.command;
        assert_eq!(args.listen, Some("127.0.0.1:9999".parse().unwrap()));
        assert!(args.in_memory);
    }

    #[test]
    fn overrides_apply_over_defaults() {
        let args = ServeArgs {
            api_key: Some("secret".into()),
            data_dir: Some(PathBuf::from("/tmp/sb")),
            in_memory: true,
            ..Default::default()
        };
        let config = resolve_config(args).unwrap();
        assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/sb"));
        assert!(config.store.in_memory);
    }

    #[test]
    fn missing_secret_fails_validation() {
        assert!(resolve_config(ServeArgs::default()).is_err());
    }

    #[test]
    fn config_file_is_loaded_then_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stateboard.toml");
        std::fs::write(
            &path,
            "[server]\nlisten = \"127.0.0.1:7000\"\n\n[auth]\napi_key = \"from-file\"\n",
        )
        .unwrap();

        let args = ServeArgs {
            config: Some(path.clone()),
            ..Default::default()
        };
        let config = resolve_config(args).unwrap();
        assert_eq!(config.server.listen.port(), 7000);
        assert_eq!(config.auth.api_key.as_deref(), Some("from-file"));

        let args = ServeArgs {
            config: Some(path),
            api_key: Some("from-cli".into()),
            ..Default::default()
        };
        let config = resolve_config(args).unwrap();
        assert_eq!(config.auth.api_key.as_deref(), Some("from-cli"));
    }

    #[test]
    fn in_memory_store_opens() {
        let mut config = StateboardConfig::default();
        config.store.in_memory = true;
        assert!(open_store(&config).is_ok());
    }

    #[test]
    fn on_disk_store_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StateboardConfig::default();
        config.store.data_dir = dir.path().join("nested/data");
        open_store(&config).unwrap();
        assert!(config.store.db_path().exists());
    }
}
