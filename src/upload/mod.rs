//! Upload orchestration: admission, previews and per-session batches.

pub mod admission;
pub mod batch;
pub mod preview;

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::UploadConfig;

pub use admission::{Admission, AdmissionPolicy, Rejection};
pub use batch::{BatchError, BatchReport, BatchState, FileStatus, FileView, Submission, UploadBatch};
pub use preview::{Preview, PreviewHandle, PreviewRegistry};

/// Staged batches of every session, plus the shared preview registry.
pub struct Uploads {
    policy: AdmissionPolicy,
    previews: Arc<PreviewRegistry>,
    batches: DashMap<String, Arc<Mutex<UploadBatch>>>,
}

impl Uploads {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            policy: AdmissionPolicy::new(config),
            previews: PreviewRegistry::new(),
            batches: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.previews
    }

    /// The batch of a session, created on first use.
    pub fn batch(&self, session_id: &str) -> Arc<Mutex<UploadBatch>> {
        self.batches
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UploadBatch::new(self.previews.clone()))))
            .clone()
    }

    /// The batch of a session, if one was ever staged. Never creates one.
    pub fn existing(&self, session_id: &str) -> Option<Arc<Mutex<UploadBatch>>> {
        self.batches.get(session_id).map(|batch| batch.clone())
    }

    pub fn active_batches(&self) -> usize {
        self.batches.len()
    }

    /// Keep only the batches of sessions for which `keep` holds; returns how
    /// many were dropped.
    pub fn retain_sessions<F>(&self, keep: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.batches.len();
        self.batches.retain(|session_id, _| keep(session_id));
        before.saturating_sub(self.batches.len())
    }

    /// Forget a session's batch. A submission still running keeps the batch
    /// alive until it settles.
    pub fn discard(&self, session_id: &str) {
        self.batches.remove(session_id);
    }
}
