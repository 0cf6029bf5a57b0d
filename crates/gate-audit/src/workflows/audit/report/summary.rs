use super::super::catalog::QuestionCatalog;
use super::super::domain::{Answer, AuditRecord, GateType};
use super::super::scoring::{rounded_mean, rounded_percentage};
use super::views::{GatePassRateEntry, MissEntry, SiteStatistics};
use std::collections::HashMap;

pub const TOP_MISS_LIMIT: usize = 8;

/// Site-wide statistics for a filtered record set; `None` when the set is empty.
///
/// Misses are counted over each record's own question set, resolved from its weight snapshot,
/// so a record never contributes failures for questions that did not apply to it.
pub fn aggregate<'a, I>(records: I, catalog: &QuestionCatalog) -> Option<SiteStatistics>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    let records: Vec<&AuditRecord> = records.into_iter().collect();
    if records.is_empty() {
        return None;
    }

    let total_audits = records.len();
    let passed = records.iter().filter(|record| record.passed).count();

    let pass_rate_by_gate = GateType::ordered()
        .into_iter()
        .map(|gate_type| {
            let subset: Vec<&&AuditRecord> = records
                .iter()
                .filter(|record| record.gate_type == gate_type)
                .collect();
            let subset_passed = subset.iter().filter(|record| record.passed).count();
            GatePassRateEntry {
                gate_type,
                gate_label: gate_type.label(),
                audits: subset.len(),
                pass_rate: rounded_percentage(subset_passed as u64, subset.len() as u64),
            }
        })
        .collect();

    Some(SiteStatistics {
        total_audits,
        avg_score_pct: rounded_mean(records.iter().map(|record| record.score_pct)),
        overall_pass_rate: rounded_percentage(passed as u64, total_audits as u64),
        pass_rate_by_gate,
        top_misses: top_misses(&records, catalog),
    })
}

fn top_misses(records: &[&AuditRecord], catalog: &QuestionCatalog) -> Vec<MissEntry> {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for record in records {
        for question in catalog.resolve(record.gate_type, &record.weights_snapshot) {
            if record.answer(question.id) == Some(Answer::Fail) {
                *counts.entry(question.id).or_default() += 1;
            }
        }
    }

    let mut misses: Vec<(&'static str, usize)> = counts.into_iter().collect();
    misses.sort_by(|(left_id, left), (right_id, right)| {
        right
            .cmp(left)
            .then_with(|| catalog.position(left_id).cmp(&catalog.position(right_id)))
    });

    misses
        .into_iter()
        .take(TOP_MISS_LIMIT)
        .map(|(id, count)| MissEntry {
            id: id.to_string(),
            label: catalog.label_for(id).to_string(),
            count,
        })
        .collect()
}
