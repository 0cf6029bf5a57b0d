use super::catalog::QuestionCatalog;
use super::domain::{Answer, AuditRecord, GateType, Shift};
use super::draft::{AuditDraft, ValidationError};
use super::filter::{apply_filters, FilterCriteria};
use super::report::{aggregate, Leaderboard, SiteStatistics};
use super::scoring::{ScoreCard, ScoringEngine};
use super::settings::{SettingsError, WeightConfiguration};
use super::store::{BlobStore, StoreError, AUDITS_KEY, SETTINGS_KEY};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Explicit acknowledgement required by destructive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to persist audit data: {0}")]
    Store(#[from] StoreError),
    #[error("failed to encode audit data: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("bulk delete requires explicit confirmation")]
    NotConfirmed,
    #[error("no audit with id {0}")]
    UnknownAudit(String),
}

/// Owns the saved records and the weight configuration for one site.
///
/// Every mutation builds the replacement value, writes it to the store, and only then swaps
/// it in. A failed write leaves the in-memory state exactly as it was.
pub struct AuditWorkspace<S: ?Sized> {
    store: Arc<S>,
    catalog: &'static QuestionCatalog,
    settings: WeightConfiguration,
    records: Vec<AuditRecord>,
}

impl<S> AuditWorkspace<S>
where
    S: BlobStore + ?Sized + 'static,
{
    pub fn load(store: Arc<S>) -> Self {
        Self::load_with_catalog(store, QuestionCatalog::standard())
    }

    /// Reads both blobs. An absent or unreadable blob falls back to defaults; the failure is
    /// logged and never surfaced.
    pub fn load_with_catalog(store: Arc<S>, catalog: &'static QuestionCatalog) -> Self {
        let records = read_blob(store.as_ref(), AUDITS_KEY, |bytes| {
            serde_json::from_slice::<Vec<AuditRecord>>(bytes)
        })
        .unwrap_or_default();

        let settings = read_blob(store.as_ref(), SETTINGS_KEY, |bytes| {
            WeightConfiguration::from_persisted(catalog, bytes)
        })
        .unwrap_or_else(|| WeightConfiguration::defaults(catalog));

        debug!(
            records = records.len(),
            pass_threshold_pct = settings.pass_threshold_pct(),
            "audit workspace loaded"
        );

        Self {
            store,
            catalog,
            settings,
            records,
        }
    }

    pub fn catalog(&self) -> &'static QuestionCatalog {
        self.catalog
    }

    pub fn settings(&self) -> &WeightConfiguration {
        &self.settings
    }

    /// Newest first.
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn find(&self, id: &str) -> Option<&AuditRecord> {
        self.records.iter().find(|record| record.id.0 == id)
    }

    pub fn get(&self, id: &str) -> Result<&AuditRecord, AuditError> {
        self.find(id).ok_or_else(|| AuditError::UnknownAudit(id.to_string()))
    }

    pub fn new_draft(&self, gate_type: GateType, shift: Shift, at: DateTime<Utc>) -> AuditDraft {
        AuditDraft::with_catalog(self.catalog, gate_type, shift, at)
    }

    pub fn filtered(&self, criteria: &FilterCriteria) -> Vec<&AuditRecord> {
        apply_filters(&self.records, criteria)
    }

    pub fn statistics(&self, criteria: &FilterCriteria) -> Option<SiteStatistics> {
        aggregate(self.filtered(criteria), self.catalog)
    }

    pub fn leaderboard(&self, criteria: &FilterCriteria) -> Leaderboard {
        Leaderboard::from_records(self.filtered(criteria))
    }

    /// Scores an answer set with the current settings without saving anything.
    pub fn preview(&self, gate_type: GateType, answers: &BTreeMap<String, Answer>) -> ScoreCard {
        ScoringEngine::new(self.catalog, &self.settings).score(gate_type, answers)
    }

    /// Validates and scores `draft` with the current settings, then prepends the frozen record.
    pub fn save_audit(&mut self, draft: &AuditDraft) -> Result<AuditRecord, AuditError> {
        let record = draft.finalize(&self.settings)?;

        let mut next = Vec::with_capacity(self.records.len() + 1);
        next.push(record.clone());
        next.extend(self.records.iter().cloned());

        self.persist_records(&next)?;
        self.records = next;

        info!(
            audit_id = %record.id,
            gate_type = record.gate_type.label(),
            score_pct = record.score_pct,
            passed = record.passed,
            "audit saved"
        );
        Ok(record)
    }

    pub fn update_weight(&mut self, question_id: &str, value: i64) -> Result<(), AuditError> {
        let next = self.settings.with_weight(self.catalog, question_id, value)?;
        self.replace_settings(next)
    }

    pub fn set_pass_threshold(&mut self, pct: i64) -> Result<(), AuditError> {
        let next = self.settings.with_pass_threshold(pct);
        self.replace_settings(next)
    }

    /// Restores catalog default weights; the pass threshold is kept.
    pub fn reset_weights(&mut self) -> Result<(), AuditError> {
        let next = self.settings.with_default_weights(self.catalog);
        self.replace_settings(next)
    }

    /// Deletes every saved record and returns how many were removed. Settings are kept.
    pub fn clear_all(&mut self, confirmation: Confirmation) -> Result<usize, AuditError> {
        if confirmation != Confirmation::Confirmed {
            return Err(AuditError::NotConfirmed);
        }

        self.store.remove(AUDITS_KEY)?;
        let removed = self.records.len();
        self.records.clear();

        warn!(removed, "all audit records deleted");
        Ok(removed)
    }

    fn persist_records(&self, records: &[AuditRecord]) -> Result<(), AuditError> {
        let bytes = serde_json::to_vec(records)?;
        self.store.set(AUDITS_KEY, &bytes)?;
        Ok(())
    }

    fn replace_settings(&mut self, next: WeightConfiguration) -> Result<(), AuditError> {
        let bytes = next.to_persisted()?;
        self.store.set(SETTINGS_KEY, &bytes)?;
        self.settings = next;

        info!(
            pass_threshold_pct = self.settings.pass_threshold_pct(),
            "audit settings updated"
        );
        Ok(())
    }
}

fn read_blob<S, T, E, F>(store: &S, key: &str, parse: F) -> Option<T>
where
    S: BlobStore + ?Sized,
    E: std::fmt::Display,
    F: FnOnce(&[u8]) -> Result<T, E>,
{
    let bytes = match store.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, error = %err, "failed to read blob; using defaults");
            return None;
        }
    };

    match parse(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "unreadable blob; using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::audit::store::InMemoryBlobStore;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 7, 15, 0).unwrap()
    }

    fn passing_draft<S: BlobStore + 'static>(
        workspace: &AuditWorkspace<S>,
        guard: &str,
    ) -> AuditDraft {
        let mut draft = workspace.new_draft(GateType::Inbound, Shift::Dayshift, at(4));
        draft.set_guard_name(guard);
        draft.set_auditor_name("Site Manager");
        draft.mark_all(Answer::Pass);
        draft
    }

    /// Store whose writes can be switched off to simulate a full disk.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryBlobStore,
        fail_writes: AtomicBool,
    }

    impl BlobStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn empty_store_loads_defaults() {
        let workspace = AuditWorkspace::load(Arc::new(InMemoryBlobStore::default()));
        assert!(workspace.records().is_empty());
        assert_eq!(*workspace.settings(), WeightConfiguration::standard());
    }

    #[test]
    fn corrupt_blobs_degrade_to_defaults() {
        let store = Arc::new(InMemoryBlobStore::default());
        store.set(AUDITS_KEY, b"not json").expect("seed");
        store.set(SETTINGS_KEY, b"[1, 2").expect("seed");

        let workspace = AuditWorkspace::load(store);
        assert!(workspace.records().is_empty());
        assert_eq!(workspace.settings().pass_threshold_pct(), 80);
    }

    #[test]
    fn saved_audits_are_prepended_and_persisted() {
        let store = Arc::new(InMemoryBlobStore::default());
        let mut workspace = AuditWorkspace::load(store.clone());

        let first = workspace
            .save_audit(&passing_draft(&workspace, "Jane Doe"))
            .expect("first save");
        let second = workspace
            .save_audit(&passing_draft(&workspace, "John Roe"))
            .expect("second save");

        assert_eq!(workspace.records()[0].id, second.id);
        assert_eq!(workspace.records()[1].id, first.id);

        let reloaded = AuditWorkspace::load(store);
        assert_eq!(reloaded.records(), workspace.records());
        assert!(reloaded.find(&first.id.0).is_some());
        assert!(matches!(
            reloaded.get("1700000000000_000999"),
            Err(AuditError::UnknownAudit(id)) if id == "1700000000000_000999"
        ));
    }

    #[test]
    fn invalid_draft_persists_nothing() {
        let store = Arc::new(InMemoryBlobStore::default());
        let mut workspace = AuditWorkspace::load(store.clone());
        let mut draft = passing_draft(&workspace, "");
        draft.set_guard_name("");

        let error = workspace.save_audit(&draft).expect_err("missing guard");
        assert!(matches!(
            error,
            AuditError::Validation(ValidationError::MissingGuardName)
        ));
        assert!(workspace.records().is_empty());
        assert!(store.get(AUDITS_KEY).expect("get").is_none());
    }

    #[test]
    fn failed_write_leaves_state_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let mut workspace = AuditWorkspace::load(store.clone());
        workspace
            .save_audit(&passing_draft(&workspace, "Jane Doe"))
            .expect("save");

        store.fail_writes.store(true, Ordering::SeqCst);
        let draft = passing_draft(&workspace, "John Roe");
        assert!(matches!(
            workspace.save_audit(&draft),
            Err(AuditError::Store(_))
        ));
        assert_eq!(workspace.records().len(), 1);

        assert!(workspace.set_pass_threshold(95).is_err());
        assert_eq!(workspace.settings().pass_threshold_pct(), 80);
    }

    #[test]
    fn sub_millisecond_timestamps_survive_a_reload() {
        let store = Arc::new(InMemoryBlobStore::default());
        let mut workspace = AuditWorkspace::load(store.clone());
        let precise = at(4) + chrono::Duration::nanoseconds(123_456_789);

        let mut draft = passing_draft(&workspace, "Jane Doe");
        draft.set_timestamp(precise);
        let saved = workspace.save_audit(&draft).expect("save");
        assert_eq!(
            saved.timestamp,
            at(4) + chrono::Duration::milliseconds(123)
        );

        let reloaded = AuditWorkspace::load(store);
        assert_eq!(reloaded.records(), workspace.records());

        let fresh = workspace.new_draft(GateType::Outbound, Shift::Nightshift, precise);
        assert_eq!(fresh.timestamp(), saved.timestamp);
    }

    #[test]
    fn weight_changes_never_touch_saved_scores() {
        let mut workspace = AuditWorkspace::load(Arc::new(InMemoryBlobStore::default()));
        let mut draft = passing_draft(&workspace, "Jane Doe");
        draft.set_answer("gen_on_time", Answer::Fail).expect("applicable");
        let saved = workspace.save_audit(&draft).expect("save");

        workspace.update_weight("gen_on_time", 10).expect("update");
        workspace.set_pass_threshold(100).expect("threshold");

        let stored = &workspace.records()[0];
        assert_eq!(stored.score_pct, saved.score_pct);
        assert_eq!(stored.passed, saved.passed);
        assert_eq!(stored.recompute(workspace.catalog()).pct, saved.score_pct);
        assert_eq!(stored.weights_snapshot.get("gen_on_time"), Some(&5));
    }

    #[test]
    fn settings_round_trip_and_reset_keeps_threshold() {
        let store = Arc::new(InMemoryBlobStore::default());
        let mut workspace = AuditWorkspace::load(store.clone());
        workspace.update_weight("in_yms_po", 12).expect("update");
        workspace.set_pass_threshold(70).expect("threshold");

        let reloaded = AuditWorkspace::load(store.clone());
        assert_eq!(reloaded.settings().weight("in_yms_po"), Some(10));
        assert_eq!(reloaded.settings().pass_threshold_pct(), 70);

        workspace.reset_weights().expect("reset");
        assert_eq!(workspace.settings().weight("in_yms_po"), Some(4));
        assert_eq!(workspace.settings().pass_threshold_pct(), 70);
    }

    #[test]
    fn unknown_question_weight_is_rejected() {
        let mut workspace = AuditWorkspace::load(Arc::new(InMemoryBlobStore::default()));
        assert!(matches!(
            workspace.update_weight("nope", 3),
            Err(AuditError::Settings(SettingsError::UnknownQuestion(_)))
        ));
    }

    #[test]
    fn bulk_delete_requires_confirmation() {
        let store = Arc::new(InMemoryBlobStore::default());
        let mut workspace = AuditWorkspace::load(store.clone());
        workspace
            .save_audit(&passing_draft(&workspace, "Jane Doe"))
            .expect("save");

        assert!(matches!(
            workspace.clear_all(Confirmation::Declined),
            Err(AuditError::NotConfirmed)
        ));
        assert_eq!(workspace.records().len(), 1);

        assert_eq!(workspace.clear_all(Confirmation::Confirmed).expect("clear"), 1);
        assert!(workspace.records().is_empty());
        assert!(store.get(AUDITS_KEY).expect("get").is_none());
    }

    #[test]
    fn preview_matches_saved_score() {
        let mut workspace = AuditWorkspace::load(Arc::new(InMemoryBlobStore::default()));
        let mut draft = passing_draft(&workspace, "Jane Doe");
        draft.set_answer("in_yms_seal", Answer::NotApplicable).expect("applicable");

        let preview = workspace.preview(draft.gate_type(), draft.answers());
        let saved = workspace.save_audit(&draft).expect("save");
        assert_eq!(preview.pct, saved.score_pct);
        assert_eq!(preview.total, saved.score_total);
    }
}
