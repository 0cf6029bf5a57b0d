use super::super::domain::GateType;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatePassRateEntry {
    pub gate_type: GateType,
    pub gate_label: &'static str,
    pub audits: usize,
    pub pass_rate: u8,
}

/// Question failed across the filtered records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissEntry {
    pub id: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteStatistics {
    pub total_audits: usize,
    pub avg_score_pct: u8,
    pub overall_pass_rate: u8,
    pub pass_rate_by_gate: Vec<GatePassRateEntry>,
    pub top_misses: Vec<MissEntry>,
}

impl SiteStatistics {
    pub fn pass_rate_for(&self, gate_type: GateType) -> u8 {
        self.pass_rate_by_gate
            .iter()
            .find(|entry| entry.gate_type == gate_type)
            .map(|entry| entry.pass_rate)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardSummary {
    pub guard: String,
    pub count: usize,
    pub avg_score_pct: u8,
    pub pass_rate: u8,
    pub last_gate_type: GateType,
    pub last_gate_label: &'static str,
    #[serde(serialize_with = "super::super::domain::serialize_millis")]
    pub last_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaderboardSummary {
    pub guards: Vec<GuardSummary>,
    pub top_performers: Vec<GuardSummary>,
    pub underperformers: Vec<GuardSummary>,
}
