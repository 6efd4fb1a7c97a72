//! Bookkeeping of sync health: last success, online flag, recent errors.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Number of errors kept.
pub const MAX_RECENT_ERRORS: usize = 10;

/// One recorded sync failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncErrorRecord {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Sync health as seen by this process.
#[derive(Debug, Clone)]
pub struct SyncTracker {
    last_sync: Option<DateTime<Utc>>,
    online: bool,
    errors: VecDeque<SyncErrorRecord>,
}

impl Default for SyncTracker {
    fn default() -> Self {
        Self {
            last_sync: None,
            online: true,
            errors: VecDeque::with_capacity(MAX_RECENT_ERRORS),
        }
    }
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A round trip with the backend succeeded.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_sync = Some(at);
        self.online = true;
    }

    /// Records a failure; the oldest entry is dropped past the limit.
    pub fn record_error(&mut self, at: DateTime<Utc>, message: impl Into<String>) {
        if self.errors.len() == MAX_RECENT_ERRORS {
            self.errors.pop_front();
        }
        self.errors.push_back(SyncErrorRecord {
            at,
            message: message.into(),
        });
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Recent errors, oldest first.
    pub fn errors(&self) -> impl Iterator<Item = &SyncErrorRecord> {
        self.errors.iter()
    }

    pub fn last_error(&self) -> Option<&SyncErrorRecord> {
        self.errors.back()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}
