use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifier of a platform user (job owner or API caller).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What kind of scope a cluster identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    /// A document project owning pipeline jobs.
    Project,
    /// A recognition model being trained.
    TrainingModel,
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKind::Project => write!(f, "project"),
            ClusterKind::TrainingModel => write!(f, "training_model"),
        }
    }
}

impl FromStr for ClusterKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(ClusterKind::Project),
            "training_model" | "model" => Ok(ClusterKind::TrainingModel),
            other => Err(CoreError::InvalidClusterRef(format!("unknown cluster kind '{}'", other))),
        }
    }
}

/// Tagged association between a job and the scope that owns it.
///
/// Authorization and grouping resolve rights for the `(kind, id)` pair;
/// nothing about the owning entity is known beyond that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterRef {
    pub kind: ClusterKind,
    pub id: String,
}

impl ClusterRef {
    pub fn new(kind: ClusterKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self::new(ClusterKind::Project, id)
    }

    pub fn training_model(id: impl Into<String>) -> Self {
        Self::new(ClusterKind::TrainingModel, id)
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for ClusterRef {
    type Err = CoreError;

    /// Parses the `kind:id` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidClusterRef(format!("expected 'kind:id', got '{}'", s)))?;
        if id.is_empty() {
            return Err(CoreError::InvalidClusterRef(format!("empty id in '{}'", s)));
        }
        Ok(Self::new(kind.parse()?, id))
    }
}
