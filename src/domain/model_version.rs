// ============================================================
// Layer 3 — Registered Model Versions
// ============================================================
// A registered model is addressed by name plus a selector:
//
//   latest      → highest version number
//   <stage>     → highest version currently in that stage
//   <number>    → exactly that version
//
// Stages are the registry's lifecycle labels. Serving normally
// pins "Staging" or "Production".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown selector '{0}': expected None, Staging, Production, Archived, latest or a version number")]
pub struct ParseSelectorError(String);

/// Lifecycle label of a registered version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    None,
    Staging,
    Production,
    Archived,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::None       => "None",
            Stage::Staging    => "Staging",
            Stage::Production => "Production",
            Stage::Archived   => "Archived",
        }
    }

    /// Only one version per model may hold an exclusive stage.
    pub fn is_exclusive(self) -> bool {
        matches!(self, Stage::Staging | Stage::Production)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none"       => Ok(Stage::None),
            "staging"    => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived"   => Ok(Stage::Archived),
            _ => Err(ParseSelectorError(s.to_string())),
        }
    }
}

/// Version-selection policy used when loading a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelector {
    Latest,
    Stage(Stage),
    Version(u32),
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSelector::Latest     => f.write_str("latest"),
            ModelSelector::Stage(s)   => write!(f, "{s}"),
            ModelSelector::Version(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for ModelSelector {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(ModelSelector::Latest);
        }
        if let Ok(version) = trimmed.parse::<u32>() {
            return Ok(ModelSelector::Version(version));
        }
        trimmed.parse::<Stage>().map(ModelSelector::Stage)
    }
}

/// Identifies one tracked training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRef {
    pub experiment: String,
    pub run_id:     String,
}

/// Metadata of one registered version (`version.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name:       String,
    pub version:    u32,
    pub stage:      Stage,
    /// Estimator family of the registered pipeline, e.g. "RandomForest".
    pub model_kind: String,
    /// Run the pipeline came from, when the tracker recorded one.
    pub run:        Option<RunRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
