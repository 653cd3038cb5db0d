//! Governance audit for Google Sheets spreadsheets.
//!
//! Usage:
//! ```bash
//! sheetaudit serve                  # Run the HTTP service
//! sheetaudit audit --pretty         # One-shot audit, report on stdout
//! sheetaudit list                   # List spreadsheets, newest first
//! sheetaudit describe <ID>          # Show one spreadsheet's details
//! sheetaudit schema                 # Print the report JSON Schema
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "sheetaudit")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the audit report and file actions over HTTP
    Serve(commands::serve::ServeArgs),

    /// Audit every visible spreadsheet and print the report
    Audit(commands::audit::AuditArgs),

    /// List spreadsheets, most recently modified first
    List(commands::list::ListArgs),

    /// Show metadata and tabs of one spreadsheet
    Describe(commands::describe::DescribeArgs),

    /// Print the JSON Schema of the audit report
    Schema,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serve(_) => f.debug_tuple("Serve").finish(),
            Self::Audit(_) => f.debug_tuple("Audit").finish(),
            Self::List(_) => f.debug_tuple("List").finish(),
            Self::Describe(_) => f.debug_tuple("Describe").finish(),
            Self::Schema => f.write_str("Schema"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Serve(args) => commands::serve::run(args).await,
        Command::Audit(args) => commands::audit::run(args).await,
        Command::List(args) => commands::list::run(args).await,
        Command::Describe(args) => commands::describe::run(args).await,
        Command::Schema => commands::schema::run(),
    }
}
