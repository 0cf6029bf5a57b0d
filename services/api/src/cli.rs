use crate::audits;
use crate::demo::{run_demo, DemoArgs};
use crate::infra::{
    parse_answer, parse_answer_assignment, parse_date, parse_gate, parse_note_assignment,
    parse_shift, parse_timestamp,
};
use crate::server;
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use gate_audit::config::AppConfig;
use gate_audit::error::AppError;
use gate_audit::telemetry;
use gate_audit::workflows::audit::{Answer, FilterCriteria, GateType, Shift};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Gate Audit",
    about = "Score, store and report gate-guard shift audits",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score and save a completed audit
    Record(RecordArgs),
    /// List the filtered audits with their ids
    List(ReportArgs),
    /// Site statistics for the filtered audits
    Stats(ReportArgs),
    /// Guard leaderboard with top performers and underperformers
    Leaderboard(ReportArgs),
    /// Write audits or printable documents
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
    /// Inspect or edit question weights and the pass threshold
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Delete every saved audit
    Purge(PurgeArgs),
    /// Seed an in-memory site with sample audits and print the reports
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct RecordArgs {
    #[arg(long)]
    pub(crate) guard: String,
    #[arg(long)]
    pub(crate) auditor: String,
    /// dayshift | nightshift
    #[arg(long, value_parser = parse_shift)]
    pub(crate) shift: Shift,
    /// inbound | outbound
    #[arg(long, value_parser = parse_gate)]
    pub(crate) gate: GateType,
    /// Audit time (RFC 3339 or "YYYY-MM-DD HH:MM" UTC); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) at: Option<DateTime<Utc>>,
    #[arg(long)]
    pub(crate) notes: Option<String>,
    /// Answer every question with one value before applying --answer overrides
    #[arg(long, value_parser = parse_answer)]
    pub(crate) mark_all: Option<Answer>,
    /// QUESTION_ID=pass|fail|na, repeatable
    #[arg(long = "answer", value_parser = parse_answer_assignment)]
    pub(crate) answers: Vec<(String, Answer)>,
    /// QUESTION_ID=TEXT, repeatable
    #[arg(long = "item-note", value_parser = parse_note_assignment)]
    pub(crate) item_notes: Vec<(String, String)>,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct FilterArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) to: Option<NaiveDate>,
    #[arg(long, value_parser = parse_shift)]
    pub(crate) shift: Option<Shift>,
    #[arg(long, value_parser = parse_gate)]
    pub(crate) gate: Option<GateType>,
    /// Case-insensitive substring of the auditor name
    #[arg(long)]
    pub(crate) auditor: Option<String>,
    /// Case-insensitive substring of the guard name
    #[arg(long)]
    pub(crate) guard: Option<String>,
    /// Minutes east of UTC for the --from/--to day boundaries; defaults to the local offset
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) utc_offset_minutes: Option<i32>,
}

impl FilterArgs {
    pub(crate) fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            start: self.from,
            end: self.to,
            shift: self.shift,
            gate_type: self.gate,
            auditor: self.auditor.clone().unwrap_or_default(),
            guard: self.guard.clone().unwrap_or_default(),
            utc_offset_minutes: self
                .utc_offset_minutes
                .unwrap_or_else(local_offset_minutes),
        }
    }
}

fn local_offset_minutes() -> i32 {
    Local::now().offset().local_minus_utc() / 60
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Print JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ExportCommand {
    /// Filtered audits as a JSON array
    Json(ExportArgs),
    /// Filtered audits as CSV with one column per question
    Csv(ExportArgs),
    /// Printable site summary of the filtered audits
    Summary(ExportArgs),
    /// Printable detail sheet for one audit
    Detail(DetailArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// File or directory to write to; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DetailArgs {
    #[arg(long)]
    pub(crate) id: String,
    /// File or directory to write to; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SettingsCommand {
    /// Print the pass threshold and every effective weight
    Show,
    /// Set one question weight (clamped to 0..=10)
    SetWeight {
        id: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Set the pass threshold percentage (clamped to 0..=100)
    SetThreshold {
        #[arg(allow_hyphen_values = true)]
        pct: i64,
    },
    /// Restore default weights; the threshold is kept
    ResetWeights,
}

#[derive(Args, Debug)]
pub(crate) struct PurgeArgs {
    /// Required acknowledgement that every audit will be deleted
    #[arg(long)]
    pub(crate) confirm: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match command {
        Command::Serve(args) => server::run(config, args).await,
        Command::Record(args) => audits::record(&config, args),
        Command::List(args) => audits::list(&config, args),
        Command::Stats(args) => audits::stats(&config, args),
        Command::Leaderboard(args) => audits::leaderboard(&config, args),
        Command::Export { command } => audits::export(&config, command),
        Command::Settings { command } => audits::settings(&config, command),
        Command::Purge(args) => audits::purge(&config, args),
        Command::Demo(args) => run_demo(args),
    }
}
