use crate::cli::{
    DetailArgs, ExportArgs, ExportCommand, PurgeArgs, RecordArgs, ReportArgs, SettingsCommand,
};
use chrono::{Local, Utc};
use gate_audit::config::AppConfig;
use gate_audit::error::AppError;
use gate_audit::workflows::audit::export::{
    audit_detail_file_name, csv_export_file_name, export_csv, export_json,
    json_export_file_name, site_summary_file_name, AuditDetailDocument, DocumentFormatter,
    PlainTextFormatter, SiteSummaryDocument,
};
use gate_audit::workflows::audit::{
    AuditError, AuditRecord, AuditWorkspace, BlobStore, Confirmation, FileBlobStore, GateType,
    Leaderboard, Question, QuestionCategory, ScoringEngine, SiteStatistics, ValidationError,
    WeightConfiguration,
};
use gate_audit::workflows::audit::report::GuardSummary;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn open_workspace(config: &AppConfig) -> AuditWorkspace<FileBlobStore> {
    AuditWorkspace::load(Arc::new(FileBlobStore::new(&config.storage.data_dir)))
}

pub(crate) fn record(config: &AppConfig, args: RecordArgs) -> Result<(), AppError> {
    let RecordArgs {
        guard,
        auditor,
        shift,
        gate,
        at,
        notes,
        mark_all,
        answers,
        item_notes,
    } = args;

    let mut workspace = open_workspace(config);
    let mut draft = workspace.new_draft(gate, shift, at.unwrap_or_else(Utc::now));
    draft.set_guard_name(guard);
    draft.set_auditor_name(auditor);
    if let Some(notes) = notes {
        draft.set_notes(notes);
    }
    if let Some(answer) = mark_all {
        draft.mark_all(answer);
    }
    for (id, answer) in answers {
        draft.set_answer(&id, answer).map_err(AuditError::from)?;
    }
    for (id, note) in item_notes {
        draft.set_item_note(&id, note).map_err(AuditError::from)?;
    }

    let saved = match workspace.save_audit(&draft) {
        Ok(record) => record,
        Err(err) => {
            if matches!(
                err,
                AuditError::Validation(ValidationError::UnansweredQuestions { .. })
            ) {
                let live = draft.live_score(workspace.settings());
                println!(
                    "Live score so far: {}% ({}/{} of {} possible)",
                    live.pct,
                    live.earned,
                    live.total,
                    draft.max_points(workspace.settings())
                );
            }
            return Err(err.into());
        }
    };

    render_saved_record(&saved);
    Ok(())
}

pub(crate) fn list(config: &AppConfig, args: ReportArgs) -> Result<(), AppError> {
    let workspace = open_workspace(config);
    let records = workspace.filtered(&args.filters.criteria());

    if args.json {
        return print_json(&records);
    }

    println!(
        "{} of {} records shown",
        records.len(),
        workspace.records().len()
    );
    for record in records {
        println!(
            "{}  {}  {:<20}  {:<8}  {:>3}%  {}",
            record.id,
            record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.guard_name,
            record.gate_type.label(),
            record.score_pct,
            record.result_label()
        );
    }
    Ok(())
}

pub(crate) fn stats(config: &AppConfig, args: ReportArgs) -> Result<(), AppError> {
    let workspace = open_workspace(config);
    let stats = workspace.statistics(&args.filters.criteria());

    if args.json {
        print_json(&stats)
    } else {
        render_statistics(stats.as_ref());
        Ok(())
    }
}

pub(crate) fn leaderboard(config: &AppConfig, args: ReportArgs) -> Result<(), AppError> {
    let workspace = open_workspace(config);
    let board = workspace.leaderboard(&args.filters.criteria());

    if args.json {
        print_json(&board.summary())
    } else {
        render_leaderboard(&board);
        Ok(())
    }
}

pub(crate) fn export(config: &AppConfig, command: ExportCommand) -> Result<(), AppError> {
    let workspace = open_workspace(config);
    let today = Local::now().date_naive();

    match command {
        ExportCommand::Json(ExportArgs { filters, output }) => {
            let records = workspace.filtered(&filters.criteria());
            let body = export_json(records)?;
            write_output(output, &json_export_file_name(today), body.as_bytes())
        }
        ExportCommand::Csv(ExportArgs { filters, output }) => {
            let records = workspace.filtered(&filters.criteria());
            let body = export_csv(records, workspace.catalog())?;
            write_output(output, &csv_export_file_name(today), body.as_bytes())
        }
        ExportCommand::Summary(ExportArgs { filters, output }) => {
            let stats = workspace.statistics(&filters.criteria());
            let formatter = PlainTextFormatter;
            let document = SiteSummaryDocument::build(stats.as_ref(), Utc::now()).to_document();
            let body = formatter.render(&document)?;
            let file_name = site_summary_file_name(today, formatter.extension());
            write_output(output, &file_name, &body)
        }
        ExportCommand::Detail(DetailArgs { id, output }) => {
            let record = workspace.get(&id)?;
            let formatter = PlainTextFormatter;
            let document = AuditDetailDocument::build(record, workspace.catalog()).to_document();
            let body = formatter.render(&document)?;
            let file_name = audit_detail_file_name(record, formatter.extension());
            write_output(output, &file_name, &body)
        }
    }
}

pub(crate) fn settings(config: &AppConfig, command: SettingsCommand) -> Result<(), AppError> {
    let mut workspace = open_workspace(config);

    match command {
        SettingsCommand::Show => {}
        SettingsCommand::SetWeight { id, value } => workspace.update_weight(&id, value)?,
        SettingsCommand::SetThreshold { pct } => workspace.set_pass_threshold(pct)?,
        SettingsCommand::ResetWeights => workspace.reset_weights()?,
    }

    render_settings(&workspace);
    Ok(())
}

pub(crate) fn purge(config: &AppConfig, args: PurgeArgs) -> Result<(), AppError> {
    let mut workspace = open_workspace(config);
    let confirmation = if args.confirm {
        Confirmation::Confirmed
    } else {
        Confirmation::Declined
    };

    let removed = workspace.clear_all(confirmation)?;
    println!("Deleted {removed} audit(s)");
    Ok(())
}

fn write_output(output: Option<PathBuf>, file_name: &str, body: &[u8]) -> Result<(), AppError> {
    match output {
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(body)?;
            stdout.flush()?;
        }
        Some(path) => {
            let path = if path.is_dir() {
                path.join(file_name)
            } else {
                path
            };
            fs::write(&path, body)?;
            info!(path = %path.display(), bytes = body.len(), "export written");
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value).map_err(AuditError::from)?;
    println!("{json}");
    Ok(())
}

pub(crate) fn render_saved_record(record: &AuditRecord) {
    println!(
        "Saved audit {} for {} ({} / {})",
        record.id,
        record.guard_name,
        record.gate_type.label(),
        record.shift.label()
    );
    println!(
        "  Score {}% ({}/{}) -> {}",
        record.score_pct,
        record.score_earned,
        record.score_total,
        record.result_label()
    );
}

pub(crate) fn render_statistics(stats: Option<&SiteStatistics>) {
    let Some(stats) = stats else {
        println!("No audits match the current filters");
        return;
    };

    println!("Site statistics ({} audits)", stats.total_audits);
    println!("- Average score: {}%", stats.avg_score_pct);
    println!("- Overall pass rate: {}%", stats.overall_pass_rate);
    for entry in &stats.pass_rate_by_gate {
        println!(
            "- {} pass rate: {}% ({} audits)",
            entry.gate_label, entry.pass_rate, entry.audits
        );
    }

    if stats.top_misses.is_empty() {
        println!("Top misses: none");
    } else {
        println!("Top misses:");
        for miss in &stats.top_misses {
            println!("  - {} x{}", miss.label, miss.count);
        }
    }
}

pub(crate) fn render_leaderboard(board: &Leaderboard) {
    if board.is_empty() {
        println!("No audits match the current filters");
        return;
    }

    println!("Guard leaderboard");
    for (rank, guard) in board.guards().iter().enumerate() {
        println!(
            "{:>3}. {} | avg {}% | pass {}% | {} audit(s) | last {} on {}",
            rank + 1,
            guard.guard,
            guard.avg_score_pct,
            guard.pass_rate,
            guard.count,
            guard.last_gate_label,
            guard.last_timestamp.format("%Y-%m-%d")
        );
    }

    let top = board.top_performers();
    println!("Top performers: {}", names_or_none(&top));
    let lagging = board.underperformers();
    println!("Needs coaching: {}", names_or_none(&lagging));
}

fn names_or_none(guards: &[GuardSummary]) -> String {
    if guards.is_empty() {
        "none".to_string()
    } else {
        guards
            .iter()
            .map(|guard| format!("{} ({}%)", guard.guard, guard.avg_score_pct))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn render_settings<S>(workspace: &AuditWorkspace<S>)
where
    S: BlobStore + ?Sized + 'static,
{
    let settings = workspace.settings();
    println!("Pass threshold: {}%", settings.pass_threshold_pct());

    let catalog = workspace.catalog();
    for category in [
        QuestionCategory::General,
        QuestionCategory::InboundSpecific,
        QuestionCategory::OutboundSpecific,
    ] {
        let questions = catalog.questions_for_category(category);
        let points: u32 = questions
            .iter()
            .map(|question| effective_weight(settings, question))
            .sum();
        println!("\n{} questions ({points} pts)", category.label());
        for question in questions {
            let weight = effective_weight(settings, question);
            let marker = if weight == question.default_weight { "" } else { " *" };
            println!("  {weight:>2}  {:<28} {}{marker}", question.id, question.label);
        }
    }

    for gate in GateType::ordered() {
        println!(
            "Max points ({}): {}",
            gate.label(),
            ScoringEngine::new(catalog, settings).max_points(gate)
        );
    }
}

fn effective_weight(settings: &WeightConfiguration, question: &Question) -> u32 {
    settings.weight(question.id).unwrap_or(question.default_weight)
}
