//! Engine tuning knobs, read from the package manifest's `[engine]` table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const DEFAULT_MAPPING_THRESHOLD: f64 = 0.5;
pub const DEFAULT_SAMPLE_SIZE: usize = 50;
pub const DEFAULT_UNMAPPED_PREFIX: &str = "raw_";

/// How to settle several columns qualifying for the same field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Lowest source column index wins.
    #[default]
    Leftmost,
    /// None of the contenders are mapped.
    LeaveUnmapped,
    /// Highest score wins; equal scores fall back to leftmost.
    BestScore,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leftmost => "leftmost",
            Self::LeaveUnmapped => "leave_unmapped",
            Self::BestScore => "best_score",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "leftmost" => Some(Self::Leftmost),
            "leave_unmapped" => Some(Self::LeaveUnmapped),
            "best_score" => Some(Self::BestScore),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub mapping_threshold: f64,
    pub conflict_policy: ConflictPolicy,
    pub append_unmapped: bool,
    pub unmapped_prefix: String,
    pub sample_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mapping_threshold: DEFAULT_MAPPING_THRESHOLD,
            conflict_policy: ConflictPolicy::default(),
            append_unmapped: true,
            unmapped_prefix: DEFAULT_UNMAPPED_PREFIX.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.mapping_threshold.is_finite() {
            return Err(EngineError::config(format!(
                "engine.mapping_threshold must be finite, got {}",
                self.mapping_threshold
            )));
        }
        if self.sample_size == 0 {
            return Err(EngineError::config(
                "engine.sample_size must be at least 1",
            ));
        }
        Ok(())
    }

    /// Applies caller overrides, then validates the result.
    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Result<Self, EngineError> {
        if let Some(threshold) = overrides.mapping_threshold {
            self.mapping_threshold = threshold;
        }
        if let Some(policy) = overrides.conflict_policy {
            self.conflict_policy = policy;
        }
        if let Some(append) = overrides.append_unmapped {
            self.append_unmapped = append;
        }
        self.validate()?;
        Ok(self)
    }
}

/// Per-run settings that take precedence over the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverrides {
    pub mapping_threshold: Option<f64>,
    pub conflict_policy: Option<ConflictPolicy>,
    pub append_unmapped: Option<bool>,
}

impl SettingsOverrides {
    pub fn is_empty(&self) -> bool {
        self.mapping_threshold.is_none()
            && self.conflict_policy.is_none()
            && self.append_unmapped.is_none()
    }
}
