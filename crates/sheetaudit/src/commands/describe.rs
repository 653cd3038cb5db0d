//! Shows metadata and tabs of one spreadsheet.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use sheetaudit_google::SpreadsheetDetails;

use super::{TokenArgs, google_client, load_config};

#[derive(Args)]
pub struct DescribeArgs {
    /// Spreadsheet (Drive file) ID.
    pub spreadsheet_id: String,

    /// Path to the sheetaudit config file (defaults to `sheetaudit.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub token: TokenArgs,
}

pub async fn run(args: &DescribeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let session = args.token.require_session()?;
    let api = google_client(&config)?;

    let details = api
        .spreadsheet_details(&session, &args.spreadsheet_id)
        .await
        .with_context(|| format!("failed to describe spreadsheet {}", args.spreadsheet_id))?;

    print!("{}", render_details(&details));
    Ok(())
}

fn render_details(details: &SpreadsheetDetails) -> String {
    let mut lines = vec![
        style("Spreadsheet Details").bold().underlined().to_string(),
        String::new(),
        format!("{}: {}", style("ID").cyan(), details.id),
        format!("{}: {}", style("Name").cyan(), details.name),
    ];

    if let Some(link) = &details.web_view_link {
        lines.push(format!("{}: {link}", style("Link").cyan()));
    }
    if let Some(created) = &details.created_time {
        lines.push(format!("{}: {created}", style("Created").cyan()));
    }
    if let Some(modified) = &details.modified_time {
        lines.push(format!("{}: {modified}", style("Modified").cyan()));
    }

    let owners: Vec<_> = details
        .owners
        .iter()
        .map(|owner| {
            match (
                owner.display_name.is_empty(),
                owner.email_address.is_empty(),
            ) {
                (false, false) => format!("{} <{}>", owner.display_name, owner.email_address),
                (true, _) => owner.email_address.clone(),
                (false, true) => owner.display_name.clone(),
            }
        })
        .collect();
    if !owners.is_empty() {
        lines.push(format!("{}: {}", style("Owners").cyan(), owners.join(", ")));
    }

    lines.push(String::new());
    lines.push(
        style(format!("Tabs ({})", details.sheet_count))
            .bold()
            .underlined()
            .to_string(),
    );
    for tab in &details.tabs {
        lines.push(format!(
            "  {:>3}  {:<40} {} x {}",
            tab.index, tab.title, tab.row_count, tab.column_count
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
