use super::catalog::QuestionCatalog;
use super::domain::{Answer, AuditRecord, GateType, ResolvedQuestion, WeightMap};
use super::settings::WeightConfiguration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weighted points for one answer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub earned: u32,
    pub total: u32,
    pub pct: u8,
}

/// Score plus the pass decision against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub earned: u32,
    pub total: u32,
    pub pct: u8,
    pub passed: bool,
    pub threshold_pct: u8,
}

/// Stateless scorer binding the catalog to a weight configuration.
///
/// Live previews and saved records both go through [`ScoringEngine::score`], so the value
/// a user sees while filling in an audit is the value that gets frozen.
pub struct ScoringEngine<'a> {
    catalog: &'a QuestionCatalog,
    config: &'a WeightConfiguration,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(catalog: &'a QuestionCatalog, config: &'a WeightConfiguration) -> Self {
        Self { catalog, config }
    }

    pub fn resolve(&self, gate_type: GateType) -> Vec<ResolvedQuestion> {
        self.catalog.resolve(gate_type, self.config.weights())
    }

    pub fn score(&self, gate_type: GateType, answers: &BTreeMap<String, Answer>) -> ScoreCard {
        let questions = self.resolve(gate_type);
        let breakdown = tally(&questions, answers);
        let threshold_pct = self.config.pass_threshold_pct();

        ScoreCard {
            earned: breakdown.earned,
            total: breakdown.total,
            pct: breakdown.pct,
            passed: breakdown.pct >= threshold_pct,
            threshold_pct,
        }
    }

    /// Weighted maximum for the gate type, ignoring any N/A answers.
    pub fn max_points(&self, gate_type: GateType) -> u32 {
        self.resolve(gate_type)
            .iter()
            .map(|question| question.weight)
            .sum()
    }
}

/// Scores `answers` against the standard catalog and `config`.
pub fn score(
    answers: &BTreeMap<String, Answer>,
    gate_type: GateType,
    config: &WeightConfiguration,
) -> ScoreCard {
    ScoringEngine::new(QuestionCatalog::standard(), config).score(gate_type, answers)
}

/// Scores against an explicit weight map, e.g. a record's frozen snapshot.
pub fn score_with_weights(
    catalog: &QuestionCatalog,
    gate_type: GateType,
    weights: &WeightMap,
    answers: &BTreeMap<String, Answer>,
) -> ScoreBreakdown {
    tally(&catalog.resolve(gate_type, weights), answers)
}

impl AuditRecord {
    /// Recomputes the score from this record's own weight snapshot. Current settings are
    /// never consulted, so the result matches the stored score fields.
    pub fn recompute(&self, catalog: &QuestionCatalog) -> ScoreBreakdown {
        score_with_weights(catalog, self.gate_type, &self.weights_snapshot, &self.answers)
    }
}

// N/A drops a question from both sides of the ratio; an unanswered question still counts
// toward the total so a half-filled form previews as a low score.
fn tally(questions: &[ResolvedQuestion], answers: &BTreeMap<String, Answer>) -> ScoreBreakdown {
    let mut earned: u32 = 0;
    let mut total: u32 = 0;

    for question in questions {
        match answers.get(question.id) {
            Some(Answer::NotApplicable) => continue,
            Some(Answer::Pass) => {
                total = total.saturating_add(question.weight);
                earned = earned.saturating_add(question.weight);
            }
            Some(Answer::Fail) | None => {
                total = total.saturating_add(question.weight);
            }
        }
    }

    ScoreBreakdown {
        earned,
        total,
        pct: rounded_percentage(earned as u64, total as u64),
    }
}

/// `round(100 * part / whole)` with halves rounded up; zero when `whole` is zero.
pub(crate) fn rounded_percentage(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (200 * part + whole) / (2 * whole);
    pct.min(100) as u8
}

/// Mean of integer percentages, rounded half up.
pub(crate) fn rounded_mean<I>(values: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), value| (sum + value as u64, count + 1));
    if count == 0 {
        return 0;
    }
    ((2 * sum + count) / (2 * count)).min(100) as u8
}
