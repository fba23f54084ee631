//! Per-destination locks for extraction jobs.
//!
//! Two requests that would write to the same cloud folder run one after the
//! other. A job's keys are claimed together, so jobs with overlapping key sets
//! cannot deadlock. Blocking is plain thread blocking and works from any
//! context, including inside an async runtime.

use crate::storage::normalize_cloud_path;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Default)]
pub struct DestinationLocks {
    held: Mutex<HashSet<String>>,
    cv: Condvar,
}

/// Claim on every key of one job, released on drop.
#[derive(Debug)]
pub struct DestinationGuard<'a> {
    locks: &'a DestinationLocks,
    keys: Vec<String>,
}

impl DestinationGuard<'_> {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl Drop for DestinationGuard<'_> {
    fn drop(&mut self) {
        {
            let mut held = self.locks.held_set();
            for key in &self.keys {
                held.remove(key);
            }
        }
        self.locks.cv.notify_all();
    }
}

impl std::fmt::Debug for DestinationLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationLocks")
            .field("held", &self.len())
            .finish()
    }
}

impl DestinationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn held_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claims all `keys`, waiting until none of them is held elsewhere.
    /// Keys are normalized and deduplicated.
    pub fn lock_many<I, S>(&self, keys: I) -> DestinationGuard<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys: Vec<String> = keys
            .into_iter()
            .map(|key| normalize_cloud_path(key.as_ref()))
            .collect();
        keys.sort();
        keys.dedup();

        let mut held = self.held_set();
        while keys.iter().any(|key| held.contains(key)) {
            log::debug!("Waiting for destination lock on {:?}", keys);
            held = self.cv.wait(held).unwrap_or_else(|e| e.into_inner());
        }
        held.extend(keys.iter().cloned());
        drop(held);

        DestinationGuard { locks: self, keys }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.held_set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
