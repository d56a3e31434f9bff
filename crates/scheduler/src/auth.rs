//! Caller authorization for scheduler queries and mutations.
//!
//! Rights are resolved per `(user, cluster)` pair through a [`RightsLookup`].
//! Coordinators bypass every per-cluster check.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use docsched_core::{ClusterRef, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::view::{Inclusion, Scope};

/// Access a user holds on one cluster. Ordered: a higher level implies the lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    None,
    /// See the cluster's jobs.
    Read,
    /// Cancel the cluster's jobs.
    Write,
    /// Reorder the cluster's jobs against others.
    Admin,
}

/// External source of truth for user rights.
pub trait RightsLookup: Send + Sync {
    fn is_coordinator(&self, user: &UserId) -> bool;

    fn access(&self, user: &UserId, cluster: &ClusterRef) -> AccessLevel;

    /// Every cluster where `user` holds at least `min`.
    fn clusters(&self, user: &UserId, min: AccessLevel) -> Vec<ClusterRef>;
}

/// In-memory rights table.
#[derive(Debug, Clone, Default)]
pub struct StaticRights {
    coordinators: HashSet<UserId>,
    grants: HashMap<UserId, HashMap<ClusterRef, AccessLevel>>,
}

impl StaticRights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinator(mut self, user: impl Into<UserId>) -> Self {
        self.coordinators.insert(user.into());
        self
    }

    pub fn grant(mut self, user: impl Into<UserId>, cluster: ClusterRef, level: AccessLevel) -> Self {
        self.grants.entry(user.into()).or_default().insert(cluster, level);
        self
    }
}

impl RightsLookup for StaticRights {
    fn is_coordinator(&self, user: &UserId) -> bool {
        self.coordinators.contains(user)
    }

    fn access(&self, user: &UserId, cluster: &ClusterRef) -> AccessLevel {
        self.grants
            .get(user)
            .and_then(|g| g.get(cluster))
            .copied()
            .unwrap_or(AccessLevel::None)
    }

    fn clusters(&self, user: &UserId, min: AccessLevel) -> Vec<ClusterRef> {
        self.grants
            .get(user)
            .map(|g| {
                g.iter()
                    .filter(|&(_, &level)| level >= min && level > AccessLevel::None)
                    .map(|(c, _)| c.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The caller of one scheduler operation, resolved once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: UserId,
    pub coordinator: bool,
}

/// Single authorization capability shared by every scheduler entry point.
#[derive(Clone)]
pub struct Authorizer {
    rights: Arc<dyn RightsLookup>,
}

impl Authorizer {
    pub fn new(rights: Arc<dyn RightsLookup>) -> Self {
        Self { rights }
    }

    pub fn principal(&self, user: &UserId) -> Principal {
        Principal {
            user: user.clone(),
            coordinator: self.rights.is_coordinator(user),
        }
    }

    pub fn allows(&self, principal: &Principal, cluster: &ClusterRef, level: AccessLevel) -> bool {
        principal.coordinator || self.rights.access(&principal.user, cluster) >= level
    }

    pub fn require(&self, principal: &Principal, cluster: &ClusterRef, level: AccessLevel) -> Result<()> {
        if self.allows(principal, cluster, level) {
            Ok(())
        } else {
            Err(SchedulerError::Unauthorized(format!(
                "user '{}' lacks {:?} access on {}",
                principal.user, level, cluster
            )))
        }
    }

    pub fn require_coordinator(&self, principal: &Principal) -> Result<()> {
        if principal.coordinator {
            Ok(())
        } else {
            Err(SchedulerError::Unauthorized(format!(
                "user '{}' is not a scheduler coordinator",
                principal.user
            )))
        }
    }

    /// The clusters whose jobs `principal` may see at `level`.
    pub fn scope(&self, principal: &Principal, level: AccessLevel) -> Scope {
        if principal.coordinator {
            Scope::All
        } else {
            Scope::Clusters(self.rights.clusters(&principal.user, level).into_iter().collect())
        }
    }

    /// Narrow a snapshot inclusion to what `principal` may read. Returns
    /// `None` when nothing of it remains.
    ///
    /// `OwnedBy` only ever names the caller (coordinators may name anyone);
    /// `TrainingModels` keeps the model ids the caller can read.
    pub fn restrict(&self, principal: &Principal, inclusion: Inclusion) -> Option<Inclusion> {
        if principal.coordinator {
            return Some(inclusion);
        }
        match inclusion {
            Inclusion::OwnedBy(user) => (user == principal.user).then_some(Inclusion::OwnedBy(user)),
            Inclusion::TrainingModels(ids) => {
                let readable: HashSet<String> = ids
                    .into_iter()
                    .filter(|id| {
                        self.allows(principal, &ClusterRef::training_model(id.as_str()), AccessLevel::Read)
                    })
                    .collect();
                (!readable.is_empty()).then_some(Inclusion::TrainingModels(readable))
            }
        }
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer").finish_non_exhaustive()
    }
}
