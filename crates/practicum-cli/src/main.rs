use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use practicum_core::{
    validate_transition, validate_visit_date, ApplicationId, InternshipWindow, VisitLog, VisitLogId, VisitStatus,
    VisitType,
};
use practicum_sync::{expand_path, scenario, SyncConfig};

#[derive(Parser)]
#[command(name = "practicum", version)]
struct Cli {
    /// Directory holding `.practicum/` (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a visit date against an internship window
    CheckDate {
        #[arg(long, value_parser = parse_day)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_day)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_day)]
        end: Option<NaiveDate>,
    },

    /// Check whether a visit log may move between two states
    Transition {
        #[arg(long, value_parser = parse_status)]
        from: VisitStatus,
        #[arg(long, value_parser = parse_status)]
        to: VisitStatus,
        #[arg(long, value_parser = parse_visit_type, default_value = "PHYSICAL")]
        visit_type: VisitType,
        #[arg(long)]
        location: Option<String>,
    },

    /// Replay a scenario file against the in-memory store
    Replay {
        scenario: String,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage `.practicum/sync.toml`
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config (refuses to overwrite)
    Init,
    /// Print the effective config
    Show,
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_status(s: &str) -> Result<VisitStatus, String> {
    VisitStatus::parse(s).ok_or_else(|| format!("unknown visit status: {s}"))
}

fn parse_visit_type(s: &str) -> Result<VisitType, String> {
    VisitType::parse(s).ok_or_else(|| format!("unknown visit type: {s}"))
}

fn probe_log(status: VisitStatus, visit_type: VisitType, location: Option<String>) -> VisitLog {
    VisitLog {
        id: VisitLogId::new(),
        application_id: ApplicationId::new(),
        visit_date: NaiveDateTime::default(),
        status,
        visit_type,
        visit_location: location,
        coordinates: None,
        photos: vec![],
        signed_document_url: None,
        project_fields: Default::default(),
        observation_fields: Default::default(),
        next_visit_date: None,
        follow_up_required: false,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = match &cli.root {
        Some(raw) => expand_path(raw)?,
        None => std::env::current_dir()?,
    };
    let config_path = SyncConfig::config_path(&root);
    let config = SyncConfig::load_or_default(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!(config = %config_path.display(), page_size = config.pagination.page_size, "config loaded");

    match cli.cmd {
        Command::CheckDate { date, start, end } => {
            let window = InternshipWindow::new(start, end);
            match validate_visit_date(date, &window) {
                Ok(()) => println!("OK {date} is inside the internship window"),
                Err(e) => bail!("{e}"),
            }
        }
        Command::Transition { from, to, visit_type, location } => {
            let log = probe_log(from, visit_type, location);
            validate_transition(&log, to)?;
            println!("OK {from} -> {to}");
        }
        Command::Replay { scenario: raw, json } => {
            let path: PathBuf = expand_path(&raw)?;
            let report = scenario::simulate(&path).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Scenario {}", report.name);
                for step in &report.steps {
                    let marker = if step.is_mismatch() { "MISMATCH" } else { "ok" };
                    println!("- [{marker}] #{} {} {:?}", step.index, step.op, step.result);
                }
                println!("Students: {}", report.students.len());
                for s in &report.students.items {
                    println!("  {} {} active={}", s.id, s.name, s.active);
                }
                println!("Visit logs: {}", report.visit_logs.len());
                for v in &report.visit_logs.items {
                    println!("  {} {} {}", v.id, v.visit_date.date(), v.status);
                }
            }
            let mismatches = report.mismatches().len();
            if mismatches > 0 {
                return Err(anyhow!("{mismatches} step(s) did not match their expectation"));
            }
        }
        Command::Config { action: ConfigAction::Init } => {
            if config_path.exists() {
                bail!("{} already exists", config_path.display());
            }
            SyncConfig::default().save_to(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
        Command::Config { action: ConfigAction::Show } => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
