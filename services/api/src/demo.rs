use crate::audits::{render_leaderboard, render_saved_record, render_statistics};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use clap::Args;
use gate_audit::error::AppError;
use gate_audit::workflows::audit::export::{
    AuditDetailDocument, DocumentFormatter, PlainTextFormatter, SiteSummaryDocument,
};
use gate_audit::workflows::audit::{
    Answer, AuditError, AuditWorkspace, FilterCriteria, GateType, InMemoryBlobStore, Shift,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Last day of the seeded week (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the printable documents at the end of the demo.
    #[arg(long)]
    pub(crate) skip_documents: bool,
}

struct SampleAudit {
    days_ago: i64,
    hour: u32,
    guard: &'static str,
    shift: Shift,
    gate_type: GateType,
    fails: &'static [&'static str],
    not_applicable: &'static [&'static str],
    notes: &'static str,
}

const SAMPLE_AUDITS: &[SampleAudit] = &[
    SampleAudit {
        days_ago: 6,
        hour: 7,
        guard: "Maria Lopez",
        shift: Shift::Dayshift,
        gate_type: GateType::Inbound,
        fails: &[],
        not_applicable: &["in_reefer_temp_gauge", "in_understand_temp_range"],
        notes: "Dry van only this morning",
    },
    SampleAudit {
        days_ago: 5,
        hour: 22,
        guard: "Devon Price",
        shift: Shift::Nightshift,
        gate_type: GateType::Outbound,
        fails: &[
            "out_yms_route_number",
            "out_check_fuel_gauge",
            "out_verify_all_seals_against_trip_sheet",
            "out_no_missed_gate_outs",
        ],
        not_applicable: &[],
        notes: "Two trailers left without gate-out",
    },
    SampleAudit {
        days_ago: 4,
        hour: 9,
        guard: "Maria Lopez",
        shift: Shift::Dayshift,
        gate_type: GateType::Outbound,
        fails: &["out_check_rear_store_number"],
        not_applicable: &[],
        notes: "",
    },
    SampleAudit {
        days_ago: 3,
        hour: 23,
        guard: "Devon Price",
        shift: Shift::Nightshift,
        gate_type: GateType::Inbound,
        fails: &[
            "gen_on_time",
            "in_yms_po",
            "in_one_network_accuracy",
            "in_check_seal_matches_bol",
        ],
        not_applicable: &[],
        notes: "Arrived 25 minutes late",
    },
    SampleAudit {
        days_ago: 2,
        hour: 14,
        guard: "Sam Okafor",
        shift: Shift::Dayshift,
        gate_type: GateType::Inbound,
        fails: &["in_yms_po", "in_take_required_pics"],
        not_applicable: &["in_yms_vehicle_status"],
        notes: "",
    },
    SampleAudit {
        days_ago: 1,
        hour: 21,
        guard: "Sam Okafor",
        shift: Shift::Nightshift,
        gate_type: GateType::Outbound,
        fails: &["out_yms_route_number"],
        not_applicable: &["out_yms_load_type"],
        notes: "Route board was not updated",
    },
];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        skip_documents,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Gate audit demo ({} sample audits ending {today})", SAMPLE_AUDITS.len());
    let mut workspace = AuditWorkspace::load(Arc::new(InMemoryBlobStore::default()));

    for sample in SAMPLE_AUDITS {
        let at = sample_timestamp(today, sample);
        let mut draft = workspace.new_draft(sample.gate_type, sample.shift, at);
        draft.set_guard_name(sample.guard);
        draft.set_auditor_name("Site Manager");
        draft.set_notes(sample.notes);
        draft.mark_all(Answer::Pass);
        for id in sample.fails {
            draft.set_answer(id, Answer::Fail).map_err(AuditError::from)?;
        }
        for id in sample.not_applicable {
            draft.set_answer(id, Answer::NotApplicable).map_err(AuditError::from)?;
        }
        if let Some(first_fail) = sample.fails.first() {
            draft
                .set_item_note(first_fail, "coached on the spot")
                .map_err(AuditError::from)?;
        }

        let saved = workspace.save_audit(&draft)?;
        render_saved_record(&saved);
    }

    let everything = FilterCriteria::default();
    let stats = workspace.statistics(&everything);
    println!();
    render_statistics(stats.as_ref());

    println!();
    render_leaderboard(&workspace.leaderboard(&everything));

    let night_only = FilterCriteria {
        shift: Some(Shift::Nightshift),
        ..FilterCriteria::default()
    };
    println!("\nNightshift only");
    render_statistics(workspace.statistics(&night_only).as_ref());

    if skip_documents {
        return Ok(());
    }

    let formatter = PlainTextFormatter;
    let summary = SiteSummaryDocument::build(stats.as_ref(), Utc::now()).to_document();
    println!("\n{}", String::from_utf8_lossy(&formatter.render(&summary)?));

    if let Some(latest) = workspace.records().first() {
        let detail = AuditDetailDocument::build(latest, workspace.catalog()).to_document();
        println!("{}", String::from_utf8_lossy(&formatter.render(&detail)?));
    }

    Ok(())
}

fn sample_timestamp(today: NaiveDate, sample: &SampleAudit) -> DateTime<Utc> {
    let day = today - Duration::days(sample.days_ago);
    let time = NaiveTime::from_hms_opt(sample.hour, 15, 0).unwrap_or(NaiveTime::MIN);
    day.and_time(time).and_utc()
}
