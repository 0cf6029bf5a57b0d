use super::super::domain::AuditRecord;
use super::super::scoring::{rounded_mean, rounded_percentage};
use super::views::{GuardSummary, LeaderboardSummary};

/// Bucket for records saved without a guard name.
pub const UNSPECIFIED_GUARD: &str = "(unspecified)";
pub const TOP_PERFORMER_MIN_AVG: u8 = 85;
pub const UNDERPERFORMER_MAX_AVG: u8 = 75;
const MIN_AUDITS_FOR_RANKING: usize = 2;
const RANKING_LIMIT: usize = 5;

/// Per-guard summaries sorted by average score, best first. Equal averages are ordered by
/// guard name so the ranking is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    guards: Vec<GuardSummary>,
}

pub fn leaderboard<'a, I>(records: I) -> Leaderboard
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    Leaderboard::from_records(records)
}

impl Leaderboard {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AuditRecord>,
    {
        let mut groups: Vec<(String, Vec<&AuditRecord>)> = Vec::new();
        for record in records {
            let guard = guard_key(&record.guard_name);
            match groups.iter_mut().find(|(name, _)| *name == guard) {
                Some((_, members)) => members.push(record),
                None => groups.push((guard, vec![record])),
            }
        }

        let mut guards: Vec<GuardSummary> = groups
            .into_iter()
            .filter_map(|(guard, members)| summarize(guard, &members))
            .collect();
        guards.sort_by(|left, right| {
            right
                .avg_score_pct
                .cmp(&left.avg_score_pct)
                .then_with(|| left.guard.cmp(&right.guard))
        });

        Self { guards }
    }

    pub fn guards(&self) -> &[GuardSummary] {
        &self.guards
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn top_performers(&self) -> Vec<GuardSummary> {
        self.guards
            .iter()
            .filter(|guard| is_ranked(guard) && guard.avg_score_pct >= TOP_PERFORMER_MIN_AVG)
            .take(RANKING_LIMIT)
            .cloned()
            .collect()
    }

    /// Worst first.
    pub fn underperformers(&self) -> Vec<GuardSummary> {
        let mut lagging: Vec<GuardSummary> = self
            .guards
            .iter()
            .filter(|guard| is_ranked(guard) && guard.avg_score_pct < UNDERPERFORMER_MAX_AVG)
            .cloned()
            .collect();
        lagging.sort_by(|left, right| {
            left.avg_score_pct
                .cmp(&right.avg_score_pct)
                .then_with(|| left.guard.cmp(&right.guard))
        });
        lagging.truncate(RANKING_LIMIT);
        lagging
    }

    pub fn summary(&self) -> LeaderboardSummary {
        LeaderboardSummary {
            guards: self.guards.clone(),
            top_performers: self.top_performers(),
            underperformers: self.underperformers(),
        }
    }
}

fn guard_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNSPECIFIED_GUARD.to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_ranked(guard: &GuardSummary) -> bool {
    guard.count >= MIN_AUDITS_FOR_RANKING
}

fn summarize(guard: String, members: &[&AuditRecord]) -> Option<GuardSummary> {
    let (first, rest) = members.split_first()?;
    // First record wins on equal timestamps.
    let mut latest: &AuditRecord = first;
    for &record in rest {
        if record.timestamp > latest.timestamp {
            latest = record;
        }
    }
    let passed = members.iter().filter(|record| record.passed).count();

    Some(GuardSummary {
        guard,
        count: members.len(),
        avg_score_pct: rounded_mean(members.iter().map(|record| record.score_pct)),
        pass_rate: rounded_percentage(passed as u64, members.len() as u64),
        last_gate_type: latest.gate_type,
        last_gate_label: latest.gate_type.label(),
        last_timestamp: latest.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::audit::domain::{AuditId, GateType, Shift};
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(guard: &str, score_pct: u8, day: u32, gate_type: GateType) -> AuditRecord {
        let timestamp: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 3, day, 8, 0, 0).unwrap();
        AuditRecord {
            id: AuditId(format!("{guard}_{day}_{score_pct}")),
            timestamp,
            guard_name: guard.to_string(),
            auditor_name: "Site Manager".to_string(),
            shift: Shift::Dayshift,
            gate_type,
            notes: String::new(),
            answers: BTreeMap::new(),
            item_notes: BTreeMap::new(),
            score_earned: score_pct as u32,
            score_total: 100,
            score_pct,
            passed: score_pct >= 80,
            weights_snapshot: BTreeMap::new(),
        }
    }

    #[test]
    fn summary_json_uses_record_timestamp_format() {
        let records = vec![record("Jane Doe", 90, 2, GateType::Outbound)];
        let json = serde_json::to_value(leaderboard(&records).summary()).expect("serializes");

        assert_eq!(
            json["guards"][0]["last_timestamp"],
            "2025-03-02T08:00:00.000Z"
        );
    }

    #[test]
    fn guards_are_grouped_on_trimmed_names() {
        let records = vec![
            record("Jane Doe", 90, 2, GateType::Outbound),
            record(" Jane Doe ", 80, 1, GateType::Inbound),
        ];
        let board = leaderboard(&records);

        assert_eq!(board.guards().len(), 1);
        let jane = &board.guards()[0];
        assert_eq!(jane.guard, "Jane Doe");
        assert_eq!(jane.count, 2);
        assert_eq!(jane.avg_score_pct, 85);
        assert_eq!(jane.pass_rate, 100);
        assert_eq!(jane.last_gate_type, GateType::Outbound);
        assert_eq!(board.top_performers().len(), 1);
    }

    #[test]
    fn blank_names_share_the_unspecified_bucket() {
        let records = vec![
            record("", 50, 1, GateType::Inbound),
            record("   ", 70, 2, GateType::Inbound),
        ];
        let board = leaderboard(&records);
        assert_eq!(board.guards()[0].guard, UNSPECIFIED_GUARD);
        assert_eq!(board.guards()[0].count, 2);
    }

    #[test]
    fn ranking_is_descending_with_name_tiebreak() {
        let records = vec![
            record("Zed", 70, 1, GateType::Inbound),
            record("Amy", 70, 1, GateType::Inbound),
            record("Bob", 95, 1, GateType::Inbound),
        ];
        let guards: Vec<String> = leaderboard(&records)
            .guards()
            .iter()
            .map(|guard| guard.guard.clone())
            .collect();
        assert_eq!(guards, vec!["Bob", "Amy", "Zed"]);
    }

    #[test]
    fn single_audits_never_rank() {
        let records = vec![
            record("Solo", 100, 1, GateType::Inbound),
            record("Low", 10, 1, GateType::Inbound),
        ];
        let board = leaderboard(&records);
        assert!(board.top_performers().is_empty());
        assert!(board.underperformers().is_empty());
    }

    #[test]
    fn underperformers_are_worst_first_and_capped() {
        let mut records = Vec::new();
        for (index, guard) in ["A", "B", "C", "D", "E", "F"].iter().enumerate() {
            let score = 40 + index as u8 * 5;
            records.push(record(guard, score, 1, GateType::Inbound));
            records.push(record(guard, score, 2, GateType::Inbound));
        }
        let underperformers = leaderboard(&records).underperformers();
        let names: Vec<&str> = underperformers.iter().map(|guard| guard.guard.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn equal_timestamps_keep_first_record_as_latest() {
        let first = record("Jane Doe", 90, 3, GateType::Outbound);
        let second = record("Jane Doe", 90, 3, GateType::Inbound);
        let board = leaderboard([&first, &second]);
        assert_eq!(board.guards()[0].last_gate_type, GateType::Outbound);
    }

    #[test]
    fn empty_input_yields_empty_board() {
        let records: Vec<AuditRecord> = Vec::new();
        let board = leaderboard(&records);
        assert!(board.is_empty());
        assert_eq!(board.summary(), LeaderboardSummary::default());
    }
}
