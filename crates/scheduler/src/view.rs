//! Authorization-scoped snapshots of the scheduler.

use std::collections::HashSet;

use docsched_core::{ClusterKind, ClusterRef, UserId};
use serde::Serialize;

use crate::job::Job;

/// Which clusters a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Clusters(HashSet<ClusterRef>),
}

impl Scope {
    pub fn contains(&self, cluster: &ClusterRef) -> bool {
        match self {
            Scope::All => true,
            Scope::Clusters(set) => set.contains(cluster),
        }
    }
}

/// Extra predicates that widen a snapshot beyond its scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inclusion {
    /// Jobs training one of these model ids.
    TrainingModels(HashSet<String>),
    /// Jobs created by this user.
    OwnedBy(UserId),
}

impl Inclusion {
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            Inclusion::TrainingModels(ids) => {
                job.cluster.kind == ClusterKind::TrainingModel && ids.contains(&job.cluster.id)
            }
            Inclusion::OwnedBy(user) => &job.owner == user,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotQuery {
    pub scope: Scope,
    pub extra: Vec<Inclusion>,
}

impl SnapshotQuery {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            extra: Vec::new(),
        }
    }

    pub fn all() -> Self {
        Self::new(Scope::All)
    }

    pub fn include(mut self, inclusion: Inclusion) -> Self {
        self.extra.push(inclusion);
        self
    }

    /// Scope match OR any extra predicate: inclusions only ever add jobs.
    pub fn matches(&self, job: &Job) -> bool {
        self.scope.contains(&job.cluster) || self.extra.iter().any(|i| i.matches(job))
    }
}

/// Filtered view of the scheduler at one instant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Container {
    /// Queue order.
    pub scheduled: Vec<Job>,
    /// Most recently started first.
    pub running: Vec<Job>,
    /// Most recently finished first.
    pub done: Vec<Job>,
}

impl Container {
    pub fn scheduled_ids(&self) -> Vec<u64> {
        self.scheduled.iter().map(|j| j.id).collect()
    }

    pub fn running_ids(&self) -> Vec<u64> {
        self.running.iter().map(|j| j.id).collect()
    }

    pub fn done_ids(&self) -> Vec<u64> {
        self.done.iter().map(|j| j.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty() && self.running.is_empty() && self.done.is_empty()
    }
}

/// Assemble a container from the three collections. `scheduled` must already
/// be in queue order; the other two are sorted here.
pub fn build<'a>(
    query: &SnapshotQuery,
    scheduled: impl Iterator<Item = &'a Job>,
    running: impl Iterator<Item = &'a Job>,
    done: impl Iterator<Item = &'a Job>,
) -> Container {
    let scheduled: Vec<Job> = scheduled.filter(|j| query.matches(j)).cloned().collect();
    let mut running: Vec<Job> = running.filter(|j| query.matches(j)).cloned().collect();
    let mut done: Vec<Job> = done.filter(|j| query.matches(j)).cloned().collect();

    running.sort_by(|a, b| b.started.cmp(&a.started).then(b.id.cmp(&a.id)));
    done.sort_by(|a, b| b.ended.cmp(&a.ended).then(b.id.cmp(&a.id)));

    Container {
        scheduled,
        running,
        done,
    }
}

/// Whether a job belongs to one of the given clusters.
pub fn is_target(job: &Job, clusters: &[ClusterRef]) -> bool {
    clusters.iter().any(|c| c == &job.cluster)
}
