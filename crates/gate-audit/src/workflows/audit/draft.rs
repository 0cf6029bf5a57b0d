use super::catalog::QuestionCatalog;
use super::domain::{next_audit_id, Answer, AuditRecord, GateType, ResolvedQuestion, Shift};
use super::scoring::{ScoreCard, ScoringEngine};
use super::settings::WeightConfiguration;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::BTreeMap;

const MISSING_LABEL_LIMIT: usize = 3;

/// Audit being filled in. Nothing here is persisted until [`AuditDraft::finalize`] succeeds.
#[derive(Debug, Clone)]
pub struct AuditDraft {
    catalog: &'static QuestionCatalog,
    timestamp: DateTime<Utc>,
    guard_name: String,
    auditor_name: String,
    shift: Shift,
    gate_type: GateType,
    notes: String,
    answers: BTreeMap<String, Answer>,
    item_notes: BTreeMap<String, String>,
}

impl AuditDraft {
    pub fn new(gate_type: GateType, shift: Shift, timestamp: DateTime<Utc>) -> Self {
        Self::with_catalog(QuestionCatalog::standard(), gate_type, shift, timestamp)
    }

    pub fn with_catalog(
        catalog: &'static QuestionCatalog,
        gate_type: GateType,
        shift: Shift,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            catalog,
            timestamp: timestamp.trunc_subsecs(3),
            guard_name: String::new(),
            auditor_name: String::new(),
            shift,
            gate_type,
            notes: String::new(),
            answers: BTreeMap::new(),
            item_notes: BTreeMap::new(),
        }
    }

    pub fn gate_type(&self) -> GateType {
        self.gate_type
    }

    pub fn shift(&self) -> Shift {
        self.shift
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn answers(&self) -> &BTreeMap<String, Answer> {
        &self.answers
    }

    pub fn item_notes(&self) -> &BTreeMap<String, String> {
        &self.item_notes
    }

    pub fn set_guard_name(&mut self, name: impl Into<String>) {
        self.guard_name = name.into();
    }

    pub fn set_auditor_name(&mut self, name: impl Into<String>) {
        self.auditor_name = name.into();
    }

    pub fn set_shift(&mut self, shift: Shift) {
        self.shift = shift;
    }

    /// Kept at millisecond precision, the precision records are persisted with.
    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp.trunc_subsecs(3);
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Switching gate type invalidates every answer and item note, since the applicable
    /// question set differs.
    pub fn set_gate_type(&mut self, gate_type: GateType) {
        if self.gate_type != gate_type {
            self.answers.clear();
            self.item_notes.clear();
        }
        self.gate_type = gate_type;
    }

    pub fn set_answer(&mut self, question_id: &str, answer: Answer) -> Result<(), ValidationError> {
        self.ensure_applicable(question_id)?;
        self.answers.insert(question_id.to_string(), answer);
        Ok(())
    }

    pub fn set_item_note(
        &mut self,
        question_id: &str,
        note: impl Into<String>,
    ) -> Result<(), ValidationError> {
        self.ensure_applicable(question_id)?;
        let note = note.into();
        if note.trim().is_empty() {
            self.item_notes.remove(question_id);
        } else {
            self.item_notes.insert(question_id.to_string(), note);
        }
        Ok(())
    }

    /// Answers every question of the current gate type with `answer`.
    pub fn mark_all(&mut self, answer: Answer) {
        self.answers = self
            .catalog
            .resolve(self.gate_type, &BTreeMap::new())
            .into_iter()
            .map(|question| (question.id.to_string(), answer))
            .collect();
    }

    pub fn questions(&self, config: &WeightConfiguration) -> Vec<ResolvedQuestion> {
        ScoringEngine::new(self.catalog, config).resolve(self.gate_type)
    }

    pub fn live_score(&self, config: &WeightConfiguration) -> ScoreCard {
        ScoringEngine::new(self.catalog, config).score(self.gate_type, &self.answers)
    }

    pub fn max_points(&self, config: &WeightConfiguration) -> u32 {
        ScoringEngine::new(self.catalog, config).max_points(self.gate_type)
    }

    pub fn validate(&self, config: &WeightConfiguration) -> Result<(), ValidationError> {
        if self.guard_name.trim().is_empty() {
            return Err(ValidationError::MissingGuardName);
        }
        if self.auditor_name.trim().is_empty() {
            return Err(ValidationError::MissingAuditorName);
        }

        let unanswered: Vec<&'static str> = self
            .questions(config)
            .into_iter()
            .filter(|question| !self.answers.contains_key(question.id))
            .map(|question| question.label)
            .collect();

        if unanswered.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::UnansweredQuestions {
                missing: unanswered.len(),
                labels: unanswered.into_iter().take(MISSING_LABEL_LIMIT).collect(),
            })
        }
    }

    /// Validates, scores with `config` and freezes the result into a record. The draft is
    /// left intact on error.
    pub fn finalize(&self, config: &WeightConfiguration) -> Result<AuditRecord, ValidationError> {
        self.validate(config)?;

        let questions = self.questions(config);
        let card = self.live_score(config);

        let answers = questions
            .iter()
            .filter_map(|question| {
                self.answers
                    .get(question.id)
                    .map(|answer| (question.id.to_string(), *answer))
            })
            .collect();
        let item_notes = questions
            .iter()
            .filter_map(|question| {
                self.item_notes
                    .get(question.id)
                    .map(|note| (question.id.to_string(), note.trim().to_string()))
            })
            .collect();

        Ok(AuditRecord {
            id: next_audit_id(Utc::now()),
            timestamp: self.timestamp,
            guard_name: self.guard_name.trim().to_string(),
            auditor_name: self.auditor_name.trim().to_string(),
            shift: self.shift,
            gate_type: self.gate_type,
            notes: self.notes.trim().to_string(),
            answers,
            item_notes,
            score_earned: card.earned,
            score_total: card.total,
            score_pct: card.pct,
            passed: card.passed,
            weights_snapshot: config.weights().clone(),
        })
    }

    /// Clears the form after a successful save; shift and gate type are kept.
    pub fn reset(&mut self, timestamp: DateTime<Utc>) {
        self.set_timestamp(timestamp);
        self.guard_name.clear();
        self.auditor_name.clear();
        self.notes.clear();
        self.answers.clear();
        self.item_notes.clear();
    }

    fn ensure_applicable(&self, question_id: &str) -> Result<(), ValidationError> {
        let applicable = self
            .catalog
            .find(question_id)
            .map(|question| question.category.applies_to(self.gate_type))
            .unwrap_or(false);
        if applicable {
            Ok(())
        } else {
            Err(ValidationError::QuestionNotApplicable {
                question_id: question_id.to_string(),
                gate_type: self.gate_type,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please enter the guard's name")]
    MissingGuardName,
    #[error("please enter the auditor's name")]
    MissingAuditorName,
    #[error("please answer all questions (missing: {})", describe_missing(.labels, .missing))]
    UnansweredQuestions {
        labels: Vec<&'static str>,
        missing: usize,
    },
    #[error("question {question_id} is not on the {gate_type:?} checklist")]
    QuestionNotApplicable {
        question_id: String,
        gate_type: GateType,
    },
}

fn describe_missing(labels: &[&'static str], missing: &usize) -> String {
    let mut listed = labels.join(", ");
    if *missing > labels.len() {
        listed.push_str(", ...");
    }
    listed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> AuditDraft {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 4, 6, 30, 0).unwrap();
        let mut draft = AuditDraft::new(GateType::Inbound, Shift::Dayshift, timestamp);
        draft.set_guard_name("  Jane Doe ");
        draft.set_auditor_name("Site Manager");
        draft
    }

    #[test]
    fn missing_names_are_reported_before_answers() {
        let config = WeightConfiguration::standard();
        let mut draft = draft();
        draft.set_guard_name("   ");
        assert_eq!(draft.validate(&config), Err(ValidationError::MissingGuardName));

        draft.set_guard_name("Jane Doe");
        draft.set_auditor_name("");
        assert_eq!(draft.finalize(&config), Err(ValidationError::MissingAuditorName));
    }

    #[test]
    fn unanswered_questions_list_first_three_labels() {
        let config = WeightConfiguration::standard();
        let mut draft = draft();
        draft.set_answer("gen_on_time", Answer::Pass).expect("applicable");

        let error = draft.finalize(&config).expect_err("unanswered questions");
        match &error {
            ValidationError::UnansweredQuestions { labels, missing } => {
                assert_eq!(*missing, 25);
                assert_eq!(labels.len(), 3);
                assert_eq!(labels[0], "Is the guard wearing the proper uniform and hi-vis vest?");
            }
            other => panic!("expected unanswered questions, got {other:?}"),
        }
        assert!(error.to_string().ends_with(", ...)"));
        assert_eq!(draft.answers().len(), 1, "draft preserved");
    }

    #[test]
    fn switching_gate_type_clears_answers_and_notes() {
        let mut draft = draft();
        draft.mark_all(Answer::Pass);
        draft
            .set_item_note("in_yms_po", "missed second PO")
            .expect("applicable");

        draft.set_gate_type(GateType::Inbound);
        assert!(!draft.answers().is_empty(), "same gate keeps answers");

        draft.set_gate_type(GateType::Outbound);
        assert!(draft.answers().is_empty());
        assert!(draft.item_notes().is_empty());
    }

    #[test]
    fn answers_for_other_gate_are_rejected() {
        let mut draft = draft();
        let error = draft
            .set_answer("out_check_fuel_gauge", Answer::Pass)
            .expect_err("outbound question on inbound draft");
        assert!(matches!(error, ValidationError::QuestionNotApplicable { .. }));
    }

    #[test]
    fn finalize_trims_and_freezes_weights() {
        let config = WeightConfiguration::standard().with_pass_threshold(80);
        let mut draft = draft();
        draft.mark_all(Answer::Pass);
        draft.set_answer("in_yms_po", Answer::Fail).expect("applicable");
        draft
            .set_item_note("in_yms_po", "  PO keyed twice  ")
            .expect("applicable");
        draft.set_notes(" busy shift ");

        let record = draft.finalize(&config).expect("record");
        assert_eq!(record.guard_name, "Jane Doe");
        assert_eq!(record.notes, "busy shift");
        assert_eq!(record.item_note("in_yms_po"), Some("PO keyed twice"));
        assert_eq!(record.weights_snapshot, *config.weights());
        assert_eq!(record.score_pct, draft.live_score(&config).pct);
        assert_eq!(record.score_total, draft.max_points(&config));
        assert_eq!(record.score_earned, record.score_total - 4);
    }

    #[test]
    fn reset_clears_form_but_keeps_selectors() {
        let mut draft = draft();
        draft.mark_all(Answer::Fail);
        let later = Utc.with_ymd_and_hms(2025, 3, 4, 18, 0, 0).unwrap();
        draft.reset(later);
        assert!(draft.answers().is_empty());
        assert_eq!(draft.gate_type(), GateType::Inbound);
        assert_eq!(draft.timestamp(), later);
    }
}
