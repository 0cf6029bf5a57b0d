mod catalog;
pub mod domain;
mod draft;
pub mod export;
mod filter;
pub mod report;
mod scoring;
mod settings;
pub mod store;
mod workspace;

pub use catalog::QuestionCatalog;
pub use domain::{
    format_timestamp, Answer, AuditId, AuditRecord, GateType, Question, QuestionCategory,
    ResolvedQuestion, Shift, WeightMap,
};
pub use draft::{AuditDraft, ValidationError};
pub use filter::{apply_filters, FilterCriteria};
pub use report::{aggregate, leaderboard, Leaderboard, SiteStatistics};
pub use scoring::{score, score_with_weights, ScoreBreakdown, ScoreCard, ScoringEngine};
pub use settings::{
    SettingsError, WeightConfiguration, DEFAULT_PASS_THRESHOLD_PCT, MAX_WEIGHT,
};
pub use store::{BlobStore, FileBlobStore, InMemoryBlobStore, StoreError};
pub use workspace::{AuditError, AuditWorkspace, Confirmation};
