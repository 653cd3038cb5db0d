//! HTTP service command.

use std::{future::Future, net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use sheetaudit_runtime::AppState;
use tokio::signal;
use tracing::info;

use super::{TokenArgs, load_config};

#[derive(Args)]
pub struct ServeArgs {
    /// Path to the sheetaudit config file (defaults to `sheetaudit.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind, overriding `server.addr`.
    #[arg(short = 'a', long)]
    pub addr: Option<String>,

    /// Token used for requests that carry none of their own.
    #[command(flatten)]
    pub token: TokenArgs,
}

pub async fn run(args: &ServeArgs) -> Result<()> {
    let shutdown = async {
        let _ = signal::ctrl_c().await;
        info!("Received shutdown signal");
    };
    run_with_shutdown(args, shutdown).await
}

async fn run_with_shutdown<F>(args: &ServeArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = load_config(args.config.as_deref())?;
    let addr_value = args.addr.as_deref().unwrap_or(&config.server.addr);
    let addr: SocketAddr = addr_value
        .parse()
        .with_context(|| format!("invalid address: {addr_value}"))?;

    let mut state = AppState::from_config(&config).context("failed to create Google API client")?;
    if let Some(session) = args.token.session()? {
        println!(
            "{} Using default access token for unauthenticated requests",
            style("→").cyan()
        );
        state = state.with_default_session(session);
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind server on {addr}"))?;

    println!(
        "{} sheetaudit running on http://{addr}",
        style("✓").green().bold()
    );
    println!("Press Ctrl+C to stop\n");

    sheetaudit_runtime::serve(listener, state, shutdown)
        .await
        .context("server error")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn args(config: Option<PathBuf>, addr: Option<&str>) -> ServeArgs {
        ServeArgs {
            config,
            addr: addr.map(str::to_string),
            token: TokenArgs {
                access_token: Some("test-token".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("sheetaudit.toml");
        std::fs::write(&config, "").unwrap();

        let result = run_with_shutdown(&args(Some(config), Some("127.0.0.1:0")), async {}).await;

        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_serve_rejects_invalid_addr() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("sheetaudit.toml");
        std::fs::write(&config, "").unwrap();

        let err = run_with_shutdown(&args(Some(config), Some("not-an-addr")), async {})
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid address: not-an-addr"));
    }
}
