use super::super::catalog::QuestionCatalog;
use super::super::domain::{format_timestamp, AuditRecord};
use super::ExportError;
use chrono::NaiveDate;

const BASE_COLUMNS: [&str; 8] = [
    "Date/Time", "Guard", "Auditor", "Shift", "Gate", "Score%", "Pass", "Notes",
];

/// Pretty-printed JSON array of the records, unchanged.
pub fn export_json<'a, I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    let records: Vec<&AuditRecord> = records.into_iter().collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// One row per record with a result column for every catalog question, in catalog order.
/// Question cells hold `1`, `0`, `NA`, or nothing when the question was not answered.
/// The header row is written even when there are no records.
pub fn export_csv<'a, I>(records: I, catalog: &QuestionCatalog) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    let header = BASE_COLUMNS
        .iter()
        .copied()
        .chain(catalog.questions().iter().map(|question| question.id));
    writer.write_record(header)?;

    for record in records {
        let mut row = vec![
            format_timestamp(&record.timestamp),
            record.guard_name.clone(),
            record.auditor_name.clone(),
            record.shift.label().to_string(),
            record.gate_type.label().to_string(),
            record.score_pct.to_string(),
            if record.passed { "1" } else { "0" }.to_string(),
            record.notes.clone(),
        ];
        row.extend(catalog.questions().iter().map(|question| {
            record
                .answer(question.id)
                .map(|answer| answer.export_code().to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| ExportError::Buffer(err.to_string()))
}

pub fn json_export_file_name(date: NaiveDate) -> String {
    format!("gate_audits_{}.json", date.format("%Y-%m-%d"))
}

pub fn csv_export_file_name(date: NaiveDate) -> String {
    format!("gate_audits_{}.csv", date.format("%Y-%m-%d"))
}
