//! Thread-safe, insertion-ordered, optionally capped candidate set.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Candidate;

#[derive(Debug, Default)]
struct Inner {
    seen: HashSet<Candidate>,
    order: Vec<(Candidate, usize)>,
}

/// Deduplicating accumulator shared by concurrently searched terms.
///
/// Each accepted candidate carries a tag (the index of the term that first
/// produced it). Membership is by candidate identity only, so the first tag
/// wins.
#[derive(Debug, Default)]
pub struct Accumulator {
    inner: Mutex<Inner>,
    cap: Option<usize>,
}

impl Accumulator {
    /// Creates an uncapped accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an accumulator that stops accepting at `cap` candidates.
    #[must_use]
    pub fn with_cap(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            cap: Some(cap),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds untagged candidates, returning how many were newly accepted.
    pub fn add<I>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Candidate>,
    {
        self.add_tagged(0, candidates)
    }

    /// Adds candidates attributed to `tag`, returning how many were newly accepted.
    pub fn add_tagged<I>(&self, tag: usize, candidates: I) -> usize
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut inner = self.lock();
        let mut accepted = 0;
        for candidate in candidates {
            if self.cap.is_some_and(|cap| inner.order.len() >= cap) {
                break;
            }
            if inner.seen.insert(candidate.clone()) {
                inner.order.push((candidate, tag));
                accepted += 1;
            }
        }
        accepted
    }

    /// Returns the number of distinct candidates held.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().order.len()
    }

    /// Returns whether the cap has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cap.is_some_and(|cap| self.size() >= cap)
    }

    /// Returns up to `limit` candidates in first-seen order.
    #[must_use]
    pub fn drain(&self, limit: usize) -> Vec<Candidate> {
        self.drain_tagged(limit)
            .into_iter()
            .map(|(candidate, _)| candidate)
            .collect()
    }

    /// Returns up to `limit` candidates with their tags, in first-seen order.
    ///
    /// The accumulator is emptied.
    #[must_use]
    pub fn drain_tagged(&self, limit: usize) -> Vec<(Candidate, usize)> {
        let mut inner = self.lock();
        inner.seen.clear();
        let mut items = std::mem::take(&mut inner.order);
        items.truncate(limit);
        items
    }
}
