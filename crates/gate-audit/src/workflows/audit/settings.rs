use super::catalog::QuestionCatalog;
use super::domain::WeightMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_WEIGHT: u32 = 10;
pub const DEFAULT_PASS_THRESHOLD_PCT: u8 = 80;

/// Per-question weight overrides plus the pass threshold.
///
/// Values are replaced wholesale: every `with_*` method returns a new configuration and
/// leaves the receiver untouched, so a caller can persist the replacement before adopting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeightConfiguration {
    pass_threshold_pct: u8,
    weights_by_id: WeightMap,
}

impl WeightConfiguration {
    pub fn defaults(catalog: &QuestionCatalog) -> Self {
        Self {
            pass_threshold_pct: DEFAULT_PASS_THRESHOLD_PCT,
            weights_by_id: catalog.default_weights(),
        }
    }

    pub fn standard() -> Self {
        Self::defaults(QuestionCatalog::standard())
    }

    /// Parses a persisted settings blob. Keys missing from the blob are backfilled from the
    /// catalog so questions added after the blob was written pick up their default weight.
    pub fn from_persisted(
        catalog: &QuestionCatalog,
        bytes: &[u8],
    ) -> Result<Self, serde_json::Error> {
        let persisted: PersistedSettings = serde_json::from_slice(bytes)?;

        let mut weights_by_id = catalog.default_weights();
        for (id, raw) in persisted.weights_by_id.unwrap_or_default() {
            weights_by_id.insert(id, clamp_weight(raw));
        }

        let pass_threshold_pct = persisted
            .pass_threshold_pct
            .map(clamp_threshold)
            .unwrap_or(DEFAULT_PASS_THRESHOLD_PCT);

        Ok(Self {
            pass_threshold_pct,
            weights_by_id,
        })
    }

    pub fn to_persisted(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn pass_threshold_pct(&self) -> u8 {
        self.pass_threshold_pct
    }

    pub fn weights(&self) -> &WeightMap {
        &self.weights_by_id
    }

    pub fn weight(&self, id: &str) -> Option<u32> {
        self.weights_by_id.get(id).copied()
    }

    pub fn passes(&self, pct: u8) -> bool {
        pct >= self.pass_threshold_pct
    }

    pub fn with_weight(
        &self,
        catalog: &QuestionCatalog,
        id: &str,
        value: i64,
    ) -> Result<Self, SettingsError> {
        if catalog.find(id).is_none() {
            return Err(SettingsError::UnknownQuestion(id.to_string()));
        }
        let mut next = self.clone();
        next.weights_by_id.insert(id.to_string(), clamp_weight(value as f64));
        Ok(next)
    }

    pub fn with_pass_threshold(&self, pct: i64) -> Self {
        let mut next = self.clone();
        next.pass_threshold_pct = clamp_threshold(pct as f64);
        next
    }

    /// Restores catalog defaults for every weight; the threshold is kept.
    pub fn with_default_weights(&self, catalog: &QuestionCatalog) -> Self {
        Self {
            pass_threshold_pct: self.pass_threshold_pct,
            weights_by_id: catalog.default_weights(),
        }
    }
}

impl Default for WeightConfiguration {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Deserialize)]
struct PersistedSettings {
    #[serde(default)]
    pass_threshold_pct: Option<f64>,
    #[serde(default)]
    weights_by_id: Option<BTreeMap<String, f64>>,
}

fn clamp_weight(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, MAX_WEIGHT as f64) as u32
}

fn clamp_threshold(raw: f64) -> u8 {
    if raw.is_nan() {
        return DEFAULT_PASS_THRESHOLD_PCT;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("question {0} is not part of the checklist")]
    UnknownQuestion(String),
}
