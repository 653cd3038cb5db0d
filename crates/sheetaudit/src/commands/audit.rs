//! One-shot audit printed to stdout.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Result, bail};
use clap::Args;
use sheetaudit_core::{AuditReport, Auditor, Config, Session};

use super::{TokenArgs, google_client, load_config};

#[derive(Args)]
pub struct AuditArgs {
    /// Path to the sheetaudit config file (defaults to `sheetaudit.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub token: TokenArgs,

    /// Pretty-print the report.
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: &AuditArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let session = args.token.require_session()?;

    let report = audit(&config, &session).await?;
    println!("{}", render_report(&report, args.pretty)?);

    if report.is_failure() {
        bail!("audit failed: spreadsheets could not be listed");
    }
    Ok(())
}

async fn audit(config: &Config, session: &Session) -> Result<AuditReport> {
    let api = Arc::new(google_client(config)?);
    let auditor = Auditor::new(api, config.audit.clone());
    Ok(auditor.run_audit(session).await)
}

fn render_report(report: &AuditReport, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(rendered)
}
