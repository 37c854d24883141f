//! Process-level bookkeeping that outlives a single SCF run.

use std::collections::HashSet;

/// Explicitly owned run state: one-time messages and a run counter.
///
/// Created by the caller and passed where needed; [`Session::reset`] returns
/// it to the freshly-constructed state.
#[derive(Debug, Default)]
pub struct Session {
    announced: HashSet<String>,
    runs: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `key` is seen in this session.
    pub fn first_time(&mut self, key: &str) -> bool {
        self.announced.insert(key.to_string())
    }

    pub fn record_run(&mut self) -> usize {
        self.runs += 1;
        self.runs
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn reset(&mut self) {
        self.announced.clear();
        self.runs = 0;
    }
}
