use super::domain::{AuditRecord, GateType, Shift};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Record predicates applied before aggregation and export. Every field is optional and
/// the predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Inclusive, from 00:00:00 local time.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Inclusive, through 23:59:59.999 local time.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub shift: Option<Shift>,
    #[serde(default)]
    pub gate_type: Option<GateType>,
    #[serde(default)]
    pub auditor: String,
    #[serde(default)]
    pub guard: String,
    /// Offset used to place the date boundaries; UTC when zero.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.shift.is_none()
            && self.gate_type.is_none()
            && self.auditor.is_empty()
            && self.guard.is_empty()
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    fn lower_bound(&self) -> Option<DateTime<Utc>> {
        let start = self.start?;
        to_utc(self.offset(), start.and_hms_opt(0, 0, 0)?)
    }

    fn upper_bound(&self) -> Option<DateTime<Utc>> {
        let end = self.end?;
        to_utc(self.offset(), end.and_hms_milli_opt(23, 59, 59, 999)?)
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.compile().matches(record)
    }

    fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            lower: self.lower_bound(),
            upper: self.upper_bound(),
            shift: self.shift,
            gate_type: self.gate_type,
            auditor: normalize_needle(&self.auditor),
            guard: normalize_needle(&self.guard),
        }
    }
}

/// Returns the records matching `criteria`, preserving input order.
pub fn apply_filters<'a, I>(records: I, criteria: &FilterCriteria) -> Vec<&'a AuditRecord>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    let filter = criteria.compile();
    records
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect()
}

struct CompiledFilter {
    lower: Option<DateTime<Utc>>,
    upper: Option<DateTime<Utc>>,
    shift: Option<Shift>,
    gate_type: Option<GateType>,
    auditor: Option<String>,
    guard: Option<String>,
}

impl CompiledFilter {
    fn matches(&self, record: &AuditRecord) -> bool {
        if self.lower.is_some_and(|lower| record.timestamp < lower) {
            return false;
        }
        if self.upper.is_some_and(|upper| record.timestamp > upper) {
            return false;
        }
        if self.shift.is_some_and(|shift| record.shift != shift) {
            return false;
        }
        if self.gate_type.is_some_and(|gate| record.gate_type != gate) {
            return false;
        }
        if !contains_ignoring_case(&record.auditor_name, self.auditor.as_deref()) {
            return false;
        }
        contains_ignoring_case(&record.guard_name, self.guard.as_deref())
    }
}

fn to_utc(offset: FixedOffset, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&local)
        .single()
        .map(|moment| moment.with_timezone(&Utc))
}

// Only an empty needle disables the predicate; surrounding spaces are part of the match.
fn normalize_needle(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_lowercase())
}

fn contains_ignoring_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(needle),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn record(guard: &str, auditor: &str, timestamp: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            id: super::super::domain::AuditId(format!("{guard}-{}", timestamp.timestamp())),
            timestamp,
            guard_name: guard.to_string(),
            auditor_name: auditor.to_string(),
            shift: Shift::Dayshift,
            gate_type: GateType::Inbound,
            notes: String::new(),
            answers: BTreeMap::new(),
            item_notes: BTreeMap::new(),
            score_earned: 0,
            score_total: 0,
            score_pct: 0,
            passed: false,
            weights_snapshot: BTreeMap::new(),
        }
    }

    fn at(date: (i32, u32, u32), hms: (u32, u32, u32)) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(date.0, date.1, date.2, hms.0, hms.1, hms.2)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn empty_criteria_keep_everything_in_order() {
        let records = vec![
            record("Jane Doe", "Site Manager", at((2025, 3, 2), (8, 0, 0))),
            record("John Roe", "Shift Lead", at((2025, 3, 1), (8, 0, 0))),
        ];
        let criteria = FilterCriteria::default();
        assert!(criteria.is_empty());

        let filtered = apply_filters(&records, &criteria);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].guard_name, "Jane Doe");
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 4).expect("date");
        let records = vec![
            record("a", "x", at((2025, 3, 4), (0, 0, 0))),
            record("b", "x", at((2025, 3, 4), (23, 59, 59)) + Duration::milliseconds(999)),
            record("c", "x", at((2025, 3, 5), (0, 0, 0))),
            record("d", "x", at((2025, 3, 3), (23, 59, 59))),
        ];
        let criteria = FilterCriteria {
            start: Some(day),
            end: Some(day),
            ..FilterCriteria::default()
        };

        let guards: Vec<_> = apply_filters(&records, &criteria)
            .into_iter()
            .map(|record| record.guard_name.as_str())
            .collect();
        assert_eq!(guards, vec!["a", "b"]);
    }

    #[test]
    fn offset_moves_the_day_boundaries() {
        let records = vec![record("late", "x", at((2025, 3, 5), (3, 0, 0)))];
        let criteria = FilterCriteria {
            end: NaiveDate::from_ymd_opt(2025, 3, 4),
            utc_offset_minutes: -5 * 60,
            ..FilterCriteria::default()
        };
        assert_eq!(apply_filters(&records, &criteria).len(), 1);

        let utc = FilterCriteria {
            utc_offset_minutes: 0,
            ..criteria
        };
        assert!(apply_filters(&records, &utc).is_empty());
    }

    #[test]
    fn names_match_case_insensitive_substrings() {
        let records = vec![
            record("Jane Doe", "Site Manager", at((2025, 3, 2), (8, 0, 0))),
            record("John Roe", "Shift Lead", at((2025, 3, 1), (8, 0, 0))),
        ];
        let criteria = FilterCriteria {
            guard: "DOE".to_string(),
            auditor: "manager".to_string(),
            ..FilterCriteria::default()
        };
        let filtered = apply_filters(&records, &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].guard_name, "Jane Doe");
    }

    #[test]
    fn name_needles_are_not_trimmed() {
        let records = vec![
            record("Jane Doe", "x", at((2025, 3, 2), (8, 0, 0))),
            record("Janet Roe", "x", at((2025, 3, 1), (8, 0, 0))),
        ];
        let criteria = FilterCriteria {
            guard: "jane ".to_string(),
            ..FilterCriteria::default()
        };
        assert!(!criteria.is_empty());

        let guards: Vec<_> = apply_filters(&records, &criteria)
            .into_iter()
            .map(|record| record.guard_name.as_str())
            .collect();
        assert_eq!(guards, vec!["Jane Doe"]);
    }

    #[test]
    fn shift_and_gate_predicates_are_anded() {
        let mut night_outbound = record("Jane Doe", "x", at((2025, 3, 2), (22, 0, 0)));
        night_outbound.shift = Shift::Nightshift;
        night_outbound.gate_type = GateType::Outbound;
        let mut night_inbound = night_outbound.clone();
        night_inbound.gate_type = GateType::Inbound;
        let records = vec![night_outbound, night_inbound];

        let criteria = FilterCriteria {
            shift: Some(Shift::Nightshift),
            gate_type: Some(GateType::Outbound),
            ..FilterCriteria::default()
        };
        let filtered = apply_filters(&records, &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].gate_type, GateType::Outbound);
        assert!(criteria.matches(filtered[0]));
    }
}
