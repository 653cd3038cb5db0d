//! Display listing of spreadsheets.

use std::{fmt::Write as _, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use sheetaudit_google::{DEFAULT_LINK_PAGE_SIZE, SpreadsheetLink};

use super::{TokenArgs, google_client, load_config};

/// Truncates a spreadsheet name to fit the NAME column.
fn truncate_name(name: &str) -> String {
    const MAX_NAME_CHARS: usize = 40;
    const ELLIPSIS: &str = "...";

    let mut chars = name.chars();
    let head: String = chars.by_ref().take(MAX_NAME_CHARS).collect();
    if chars.next().is_none() {
        return head;
    }

    let prefix: String = head.chars().take(MAX_NAME_CHARS - ELLIPSIS.len()).collect();
    format!("{prefix}{ELLIPSIS}")
}

#[derive(Args)]
pub struct ListArgs {
    /// Path to the sheetaudit config file (defaults to `sheetaudit.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of spreadsheets to show (1 to 1000).
    #[arg(long, default_value_t = DEFAULT_LINK_PAGE_SIZE)]
    pub page_size: u32,

    /// Output format: "table" or "json".
    #[arg(short, long, default_value = "table")]
    pub format: String,

    #[command(flatten)]
    pub token: TokenArgs,
}

pub async fn run(args: &ListArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let session = args.token.require_session()?;
    let api = google_client(&config)?;

    let links = api
        .list_spreadsheet_links(&session, args.page_size)
        .await
        .context("failed to fetch spreadsheets")?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&links)?);
    } else if links.is_empty() {
        println!("No spreadsheets found");
    } else {
        print!("{}", render_table(&links));
        println!("\n{} {} spreadsheet(s)", style("✓").green(), links.len());
    }

    Ok(())
}

fn render_table(links: &[SpreadsheetLink]) -> String {
    let mut out = format!(
        "{:<45} {:<40} {}\n",
        style("ID").bold(),
        style("NAME").bold(),
        style("LINK").bold()
    );
    out.push_str(&"-".repeat(100));
    out.push('\n');

    for link in links {
        let _ = writeln!(
            out,
            "{:<45} {:<40} {}",
            link.id,
            truncate_name(&link.name),
            link.web_view_link.as_deref().unwrap_or("-")
        );
    }
    out
}
