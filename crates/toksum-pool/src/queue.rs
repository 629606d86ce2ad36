//! Pending jobs and the bounded job queue

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::time::Instant;

use toksum_core::TokenCount;

use crate::protocol::CorrelationId;

/// Where a job's result goes once resolved.
///
/// Resolution is at-most-once by construction: resolving consumes the reply.
pub(crate) enum JobReply {
    Single(oneshot::Sender<TokenCount>),
    BatchMember {
        batch: Arc<Mutex<BatchState>>,
        index: usize,
    },
}

impl JobReply {
    /// Deliver the terminal result for this job.
    pub(crate) fn resolve(self, result: TokenCount) {
        match self {
            JobReply::Single(tx) => {
                // Caller may have dropped its future; that's fine.
                let _ = tx.send(result);
            }
            JobReply::BatchMember { batch, index } => {
                let mut state = match batch.lock() {
                    Ok(state) => state,
                    Err(poisoned) => poisoned.into_inner(),
                };
                state.set(index, result);
            }
        }
    }
}

/// Shared bookkeeping for one batch: results indexed by submission order,
/// resolved to the caller only when every member has settled.
pub(crate) struct BatchState {
    results: Vec<Option<TokenCount>>,
    remaining: usize,
    reply: Option<oneshot::Sender<Vec<TokenCount>>>,
}

impl BatchState {
    pub(crate) fn new(len: usize, reply: oneshot::Sender<Vec<TokenCount>>) -> Self {
        Self {
            results: vec![None; len],
            remaining: len,
            reply: Some(reply),
        }
    }

    fn set(&mut self, index: usize, result: TokenCount) {
        if self.results[index].replace(result).is_none() {
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            if let Some(tx) = self.reply.take() {
                // remaining == 0 guarantees every slot is Some
                let results = self.results.iter().copied().flatten().collect();
                let _ = tx.send(results);
            }
        }
    }
}

/// One pending token-count request.
pub(crate) struct Job {
    pub id: CorrelationId,
    pub text: Arc<str>,
    /// Character count, captured at submission so fallback estimation never
    /// re-walks a large input.
    pub chars: usize,
    pub reply: JobReply,
    pub submitted_at: Instant,
    pub deadline: Instant,
}

/// Bounded FIFO of jobs awaiting a free unit. When full, new submissions are
/// load-shed by the pool rather than queued.
pub(crate) struct JobQueue {
    jobs: VecDeque<Job>,
    capacity: usize,
}

impl JobQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            capacity,
        }
    }

    /// Enqueue, or hand the job back when at capacity.
    pub(crate) fn push(&mut self, job: Job) -> Result<(), Job> {
        if self.jobs.len() >= self.capacity {
            Err(job)
        } else {
            self.jobs.push_back(job);
            Ok(())
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Remove and return every job whose deadline has passed.
    pub(crate) fn remove_expired(&mut self, now: Instant) -> Vec<Job> {
        let mut kept = VecDeque::with_capacity(self.jobs.len());
        let mut expired = Vec::new();
        for job in self.jobs.drain(..) {
            if job.deadline <= now {
                expired.push(job);
            } else {
                kept.push_back(job);
            }
        }
        self.jobs = kept;
        expired
    }

    pub(crate) fn drain(&mut self) -> Vec<Job> {
        self.jobs.drain(..).collect()
    }

    pub(crate) fn earliest_deadline(&self) -> Option<Instant> {
        // FIFO with uniform timeouts: the head expires first
        self.jobs.front().map(|job| job.deadline)
    }
}
