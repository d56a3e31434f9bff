//! Ordered queue of jobs that have not started yet.
//!
//! Order is dispatch priority (front = next to run). It is FIFO; the only
//! ways to change it are `move_to_front`, `move_to_back` and `swap`.

use std::collections::VecDeque;

use crate::job::{Job, JobId};

#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    pub fn pop_front(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Remove a job, keeping the relative order of the others.
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let pos = self.position(id)?;
        self.jobs.remove(pos)
    }

    /// Returns false if the job is not queued.
    pub fn move_to_front(&mut self, id: JobId) -> bool {
        match self.remove(id) {
            Some(job) => {
                self.jobs.push_front(job);
                true
            }
            None => false,
        }
    }

    /// Returns false if the job is not queued.
    pub fn move_to_back(&mut self, id: JobId) -> bool {
        match self.remove(id) {
            Some(job) => {
                self.jobs.push_back(job);
                true
            }
            None => false,
        }
    }

    /// Exchange the positions of two queued jobs. Swapping a job with itself
    /// is a no-op. Returns false if either id is not queued.
    pub fn swap(&mut self, a: JobId, b: JobId) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(pa), Some(pb)) => {
                self.jobs.swap(pa, pb);
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
