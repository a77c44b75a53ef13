//! Decoding schedule cache keyed by erasure pattern
//!
//! Entries are created on first use and live as long as the cache. Lookups
//! and generation happen under one lock, so a pattern is never generated
//! twice and no caller sees a half-built entry.

use super::decoding::DecodingSchedule;
use crate::erasure::{ErasurePattern, ErasureSet};
use crate::error::Result;
use log::debug;
use rustc_hash::FxHashMap as HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct ScheduleCache {
    entries: Mutex<HashMap<ErasurePattern, Arc<DecodingSchedule>>>,
    generated: AtomicUsize,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached schedule for `erasures`, or build and store it
    pub fn get_or_generate<F>(
        &self,
        erasures: &ErasureSet,
        generate: F,
    ) -> Result<Arc<DecodingSchedule>>
    where
        F: FnOnce(&ErasureSet) -> Result<DecodingSchedule>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(schedule) = entries.get(erasures.pattern()) {
            debug!("found decode schedule for pattern {}", erasures.pattern());
            return Ok(Arc::clone(schedule));
        }

        debug!("new decode schedule for pattern {}", erasures.pattern());
        let schedule = Arc::new(generate(erasures)?);
        self.generated.fetch_add(1, Ordering::Relaxed);
        entries.insert(erasures.pattern().clone(), Arc::clone(&schedule));
        Ok(schedule)
    }

    pub fn contains(&self, pattern: &ErasurePattern) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(pattern)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many schedules have been generated over the cache's lifetime
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::Relaxed)
    }
}
