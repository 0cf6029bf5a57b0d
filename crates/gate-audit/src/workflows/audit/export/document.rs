use super::super::catalog::QuestionCatalog;
use super::super::domain::{AuditRecord, GateType};
use super::super::report::SiteStatistics;
use super::ExportError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

const SITE_SUMMARY_TITLE: &str = "Gate Audit - Site Summary";
const AUDIT_DETAIL_TITLE: &str = "Gate Audit - Detail";
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Table with an optional header row. Every row has the same arity as the header when one
/// is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentTable {
    pub head: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DocumentTable {
    fn new<const N: usize>(head: [&str; N], rows: Vec<Vec<String>>) -> Self {
        Self {
            head: head.iter().map(|cell| cell.to_string()).collect(),
            rows,
        }
    }

    fn headless(rows: Vec<Vec<String>>) -> Self {
        Self {
            head: Vec::new(),
            rows,
        }
    }
}

/// Layout-neutral printable document handed to a [`DocumentFormatter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub subtitle: Option<String>,
    pub tables: Vec<DocumentTable>,
}

/// Renders a [`Document`] into bytes. A PDF renderer plugs in here.
pub trait DocumentFormatter {
    /// File extension without the leading dot.
    fn extension(&self) -> &'static str;
    fn render(&self, document: &Document) -> Result<Vec<u8>, ExportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSummaryDocument {
    pub generated_at: DateTime<Utc>,
    pub total_audits: usize,
    pub avg_score_pct: u8,
    pub pass_rate: u8,
    pub inbound_pass_rate: u8,
    pub outbound_pass_rate: u8,
    pub top_misses: Vec<(String, usize)>,
}

impl SiteSummaryDocument {
    /// Missing statistics render as zeros with no miss table.
    pub fn build(stats: Option<&SiteStatistics>, generated_at: DateTime<Utc>) -> Self {
        match stats {
            Some(stats) => Self {
                generated_at,
                total_audits: stats.total_audits,
                avg_score_pct: stats.avg_score_pct,
                pass_rate: stats.overall_pass_rate,
                inbound_pass_rate: stats.pass_rate_for(GateType::Inbound),
                outbound_pass_rate: stats.pass_rate_for(GateType::Outbound),
                top_misses: stats
                    .top_misses
                    .iter()
                    .map(|miss| (miss.label.clone(), miss.count))
                    .collect(),
            },
            None => Self {
                generated_at,
                total_audits: 0,
                avg_score_pct: 0,
                pass_rate: 0,
                inbound_pass_rate: 0,
                outbound_pass_rate: 0,
                top_misses: Vec::new(),
            },
        }
    }

    pub fn to_document(&self) -> Document {
        let mut tables = vec![DocumentTable::new(
            [
                "Total Audits",
                "Avg Score",
                "Pass Rate",
                "Inbound Pass",
                "Outbound Pass",
            ],
            vec![vec![
                self.total_audits.to_string(),
                percent(self.avg_score_pct),
                percent(self.pass_rate),
                percent(self.inbound_pass_rate),
                percent(self.outbound_pass_rate),
            ]],
        )];

        if !self.top_misses.is_empty() {
            tables.push(DocumentTable::new(
                ["Top Misses", "Count"],
                self.top_misses
                    .iter()
                    .map(|(label, count)| vec![label.clone(), count.to_string()])
                    .collect(),
            ));
        }

        Document {
            title: SITE_SUMMARY_TITLE.to_string(),
            subtitle: Some(format!(
                "Generated: {}",
                self.generated_at.format(DISPLAY_TIME_FORMAT)
            )),
            tables,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditDetailItem {
    pub label: String,
    pub weight: u32,
    pub result: &'static str,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditDetailDocument {
    pub metadata: Vec<(&'static str, String)>,
    pub items: Vec<AuditDetailItem>,
    pub notes: Option<String>,
    pub file_name_stem: String,
}

impl AuditDetailDocument {
    /// Item rows come from the record's own weight snapshot, so weights shown are the ones
    /// the record was scored with.
    pub fn build(record: &AuditRecord, catalog: &QuestionCatalog) -> Self {
        let metadata = vec![
            (
                "Date/Time",
                record.timestamp.format(DISPLAY_TIME_FORMAT).to_string(),
            ),
            ("Guard", record.guard_name.clone()),
            ("Auditor", record.auditor_name.clone()),
            ("Shift", record.shift.label().to_string()),
            ("Gate", record.gate_type.label().to_string()),
            (
                "Score",
                format!(
                    "{}% ({}/{})",
                    record.score_pct, record.score_earned, record.score_total
                ),
            ),
            ("Result", record.result_label().to_string()),
        ];

        let items = catalog
            .resolve(record.gate_type, &record.weights_snapshot)
            .into_iter()
            .map(|question| AuditDetailItem {
                label: question.label.to_string(),
                weight: question.weight,
                // unanswered rows only occur in hand-edited blobs
                result: record
                    .answer(question.id)
                    .map(|answer| answer.label())
                    .unwrap_or("N/A"),
                note: record.item_note(question.id).unwrap_or_default().to_string(),
            })
            .collect();

        let notes = Some(record.notes.trim())
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);

        Self {
            metadata,
            items,
            notes,
            file_name_stem: audit_detail_stem(record),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut tables = vec![
            DocumentTable::headless(
                self.metadata
                    .iter()
                    .map(|(key, value)| vec![key.to_string(), value.clone()])
                    .collect(),
            ),
            DocumentTable::new(
                ["Checklist Item", "Weight", "Result", "Note"],
                self.items
                    .iter()
                    .map(|item| {
                        vec![
                            item.label.clone(),
                            item.weight.to_string(),
                            item.result.to_string(),
                            item.note.clone(),
                        ]
                    })
                    .collect(),
            ),
        ];

        if let Some(notes) = &self.notes {
            tables.push(DocumentTable::new(["Overall Notes"], vec![vec![notes.clone()]]));
        }

        Document {
            title: AUDIT_DETAIL_TITLE.to_string(),
            subtitle: None,
            tables,
        }
    }
}

pub fn site_summary_file_name(date: NaiveDate, extension: &str) -> String {
    format!("gate_site_summary_{}.{extension}", date.format("%Y-%m-%d"))
}

pub fn audit_detail_file_name(record: &AuditRecord, extension: &str) -> String {
    format!("{}.{extension}", audit_detail_stem(record))
}

fn audit_detail_stem(record: &AuditRecord) -> String {
    format!(
        "gate_audit_{}_{}",
        safe_file_component(&record.guard_name),
        record.timestamp.format("%Y-%m-%d")
    )
}

// Each run of characters outside [A-Za-z0-9_-] collapses to one underscore.
fn safe_file_component(raw: &str) -> String {
    let mut safe = String::with_capacity(raw.len());
    let mut in_run = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            safe.push(ch);
            in_run = false;
        } else if !in_run {
            safe.push('_');
            in_run = true;
        }
    }
    safe
}

fn percent(value: u8) -> String {
    format!("{value}%")
}

/// Fixed-width text rendering used by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextFormatter;

impl DocumentFormatter for PlainTextFormatter {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &Document) -> Result<Vec<u8>, ExportError> {
        let mut out = String::new();
        out.push_str(&document.title);
        out.push('\n');
        if let Some(subtitle) = &document.subtitle {
            out.push_str(subtitle);
            out.push('\n');
        }

        for table in &document.tables {
            out.push('\n');
            render_table(&mut out, table);
        }
        Ok(out.into_bytes())
    }
}

fn render_table(out: &mut String, table: &DocumentTable) {
    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.head.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&table.head).chain(table.rows.iter()) {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    if !table.head.is_empty() {
        push_row(out, &table.head, &widths);
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        push_row(out, &rule, &widths);
    }
    for row in &table.rows {
        push_row(out, row, &widths);
    }
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let cells: Vec<String> = row
        .iter()
        .enumerate()
        .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
        .collect();
    out.push_str(cells.join("  ").trim_end());
    out.push('\n');
}
