use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gate_audit::workflows::audit::{Answer, AuditWorkspace, BlobStore, GateType, Shift};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<dyn BlobStore>,
}

impl AppState {
    /// Fresh view of the persisted audits, so writes made by the CLI are visible.
    pub(crate) fn workspace(&self) -> AuditWorkspace<dyn BlobStore> {
        AuditWorkspace::load(self.store.clone())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM` interpreted as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|err| {
            format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD HH:MM ({err})")
        })
}

pub(crate) fn parse_shift(raw: &str) -> Result<Shift, String> {
    Shift::parse(raw).ok_or_else(|| format!("unknown shift '{raw}' (dayshift | nightshift)"))
}

pub(crate) fn parse_gate(raw: &str) -> Result<GateType, String> {
    GateType::parse(raw).ok_or_else(|| format!("unknown gate type '{raw}' (inbound | outbound)"))
}

pub(crate) fn parse_answer(raw: &str) -> Result<Answer, String> {
    Answer::parse(raw).ok_or_else(|| format!("unknown answer '{raw}' (pass | fail | na)"))
}

/// `ID=pass|fail|na`
pub(crate) fn parse_answer_assignment(raw: &str) -> Result<(String, Answer), String> {
    let (id, value) = split_assignment(raw)?;
    Ok((id, parse_answer(&value)?))
}

/// `ID=TEXT`
pub(crate) fn parse_note_assignment(raw: &str) -> Result<(String, String), String> {
    split_assignment(raw)
}

fn split_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => {
            Ok((id.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected QUESTION_ID=VALUE, got '{raw}'")),
    }
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
