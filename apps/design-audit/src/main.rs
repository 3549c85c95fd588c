//! Design audit binary
//!
//! Scans templates and stylesheets for design-consistency violations and
//! applies automatic fixes selected from the last report.

use std::path::PathBuf;
use std::process::ExitCode;

use audit_engine::config::{AuditConfig, DEFAULT_CONFIG_FILE};
use clap::{Parser, Subcommand};
use design_audit::commands;
use fix_core::{FixMode, Selector};
use shared_types::Category;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "design-audit")]
#[command(version, about = "Design-consistency audit and repair for templates and stylesheets")]
struct Args {
    /// Configuration file (defaults apply if it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan all documents and write the report
    Scan,

    /// Print the last report
    Report {
        /// Print the Markdown summary instead of JSON
        #[arg(long)]
        markdown: bool,
    },

    /// Fix violations selected from the last report
    Fix {
        /// Fix every violation with this fingerprint
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        fingerprint: Option<String>,

        /// Fix every auto-fixable violation in a category
        #[arg(long, value_parser = parse_category)]
        all: Option<Category>,

        /// Plan edits without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare a previous report with the current one
    Diff {
        previous: PathBuf,

        /// Defaults to the last report
        current: Option<PathBuf>,
    },
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::parse(s).ok_or_else(|| {
        let known: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category '{}', expected one of: {}", s, known.join(", "))
    })
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // stdout carries reports; logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AuditConfig::load_or_default(&args.config)?;

    match args.command {
        Command::Scan => {
            let report = commands::scan(&config)?;
            print!("{}", commands::report_overview(&report));
        }
        Command::Report { markdown } => {
            let report = commands::load_report(&config)?;
            if markdown {
                print!("{}", report.to_markdown());
            } else {
                println!("{}", report.to_json(true)?);
            }
        }
        Command::Fix {
            fingerprint,
            all,
            dry_run,
            json,
        } => {
            let selector = match (fingerprint, all) {
                (Some(fp), _) => Selector::fingerprint(fp),
                (None, Some(category)) => Selector::all(category),
                (None, None) => anyhow::bail!("either --fingerprint or --all is required"),
            };
            let mode = if dry_run { FixMode::DryRun } else { FixMode::Apply };

            let summary = commands::fix(&config, &selector, mode)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.to_text());
            }
            if summary.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Diff { previous, current } => {
            let diff = commands::diff(&config, &previous, current.as_deref())?;
            print!("{}", commands::diff_overview(&diff));
        }
    }

    Ok(ExitCode::SUCCESS)
}
