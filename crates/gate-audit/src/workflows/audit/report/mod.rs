mod leaderboard;
mod summary;
pub mod views;

pub use leaderboard::{
    leaderboard, Leaderboard, TOP_PERFORMER_MIN_AVG, UNDERPERFORMER_MAX_AVG, UNSPECIFIED_GUARD,
};
pub use summary::{aggregate, TOP_MISS_LIMIT};
pub use views::{GatePassRateEntry, GuardSummary, LeaderboardSummary, MissEntry, SiteStatistics};
