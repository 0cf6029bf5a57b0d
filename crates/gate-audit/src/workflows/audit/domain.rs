use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Gate variant; decides which specialized question block applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateType {
    Inbound,
    Outbound,
}

impl GateType {
    pub const fn ordered() -> [Self; 2] {
        [Self::Inbound, Self::Outbound]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Inbound => "Inbound",
            Self::Outbound => "Outbound",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inbound" | "in" => Some(Self::Inbound),
            "outbound" | "out" => Some(Self::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Dayshift,
    Nightshift,
}

impl Shift {
    pub const fn ordered() -> [Self; 2] {
        [Self::Dayshift, Self::Nightshift]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dayshift => "Dayshift",
            Self::Nightshift => "Nightshift",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dayshift" | "day" => Some(Self::Dayshift),
            "nightshift" | "night" => Some(Self::Nightshift),
            _ => None,
        }
    }
}

/// Catalog block a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    General,
    InboundSpecific,
    OutboundSpecific,
}

impl QuestionCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::InboundSpecific => "Inbound",
            Self::OutboundSpecific => "Outbound",
        }
    }

    pub const fn applies_to(self, gate_type: GateType) -> bool {
        match self {
            Self::General => true,
            Self::InboundSpecific => matches!(gate_type, GateType::Inbound),
            Self::OutboundSpecific => matches!(gate_type, GateType::Outbound),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "fail")]
    Fail,
    #[serde(rename = "na")]
    NotApplicable,
}

impl Answer {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::NotApplicable => "N/A",
        }
    }

    /// Cell value used by the tabular export.
    pub const fn export_code(self) -> &'static str {
        match self {
            Self::Pass => "1",
            Self::Fail => "0",
            Self::NotApplicable => "NA",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pass" | "p" | "yes" | "1" => Some(Self::Pass),
            "fail" | "f" | "no" | "0" => Some(Self::Fail),
            "na" | "n/a" | "not-applicable" | "not_applicable" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Immutable checklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub id: &'static str,
    pub label: &'static str,
    pub category: QuestionCategory,
    pub default_weight: u32,
}

/// Question with the weight that applies for a given configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedQuestion {
    pub id: &'static str,
    pub label: &'static str,
    pub weight: u32,
}

pub type WeightMap = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub String);

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static AUDIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_audit_id(now: DateTime<Utc>) -> AuditId {
    let seq = AUDIT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AuditId(format!("{}_{seq:06}", now.timestamp_millis()))
}

/// Finalized, scored audit. Score fields are frozen at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    pub guard_name: String,
    pub auditor_name: String,
    pub shift: Shift,
    pub gate_type: GateType,
    #[serde(default)]
    pub notes: String,
    pub answers: BTreeMap<String, Answer>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub item_notes: BTreeMap<String, String>,
    pub score_earned: u32,
    pub score_total: u32,
    pub score_pct: u8,
    pub passed: bool,
    #[serde(default)]
    pub weights_snapshot: WeightMap,
}

impl AuditRecord {
    pub fn answer(&self, question_id: &str) -> Option<Answer> {
        self.answers.get(question_id).copied()
    }

    pub fn item_note(&self, question_id: &str) -> Option<&str> {
        self.item_notes
            .get(question_id)
            .map(String::as_str)
            .filter(|note| !note.trim().is_empty())
    }

    pub fn result_label(&self) -> &'static str {
        if self.passed {
            "PASS"
        } else {
            "FAIL"
        }
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn serialize_millis<S>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(timestamp))
}
