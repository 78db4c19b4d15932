//! Staged upload batches.
//!
//! A batch collects admitted files, then uploads all of them at once with
//! shared metadata. The mutex around a batch is only held for bookkeeping:
//! [`UploadBatch::begin`] snapshots the work into a [`Submission`] that runs
//! without the lock, and [`UploadBatch::settle`] folds the outcome back in.

use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::preview::{PreviewHandle, PreviewRegistry};
use crate::error::ValidationErrors;
use crate::models::{MediaMetadata, UploadFile, UploadMetadata};
use crate::services::{MediaUploader, ProgressFn};

pub const UPLOAD_FAILED: &str = "Upload failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileStatus {
    Queued,
    Uploading { progress: u8 },
    Succeeded,
    Failed { error: String },
}

impl FileStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Queued => "queued",
            FileStatus::Uploading { .. } => "uploading",
            FileStatus::Succeeded => "succeeded",
            FileStatus::Failed { .. } => "failed",
        }
    }
}

/// Per-file status shared between a running submission and page renders.
#[derive(Debug, Clone, Default)]
pub struct ProgressBoard {
    statuses: Arc<DashMap<Uuid, FileStatus>>,
}

impl ProgressBoard {
    pub fn set(&self, id: Uuid, status: FileStatus) {
        self.statuses.insert(id, status);
    }

    pub fn get(&self, id: &Uuid) -> FileStatus {
        self.statuses
            .get(id)
            .map(|status| status.clone())
            .unwrap_or(FileStatus::Queued)
    }

    fn forget(&self, id: &Uuid) {
        self.statuses.remove(id);
    }

    fn reset(&self) {
        self.statuses.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("An upload is in progress")]
    Running,
    #[error("Please select at least one file")]
    Empty,
    #[error("{0}")]
    Invalid(ValidationErrors),
}

struct StagedFile {
    file: UploadFile,
    preview: PreviewHandle,
}

/// Read-only view of a staged file
#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub preview_url: String,
    pub status: FileStatus,
}

/// Outcome of one file of a submission
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub id: Uuid,
    pub name: String,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct UploadBatch {
    previews: Arc<PreviewRegistry>,
    files: Vec<StagedFile>,
    board: ProgressBoard,
    state: BatchState,
    last_report: Option<BatchReport>,
}

impl UploadBatch {
    pub fn new(previews: Arc<PreviewRegistry>) -> Self {
        Self {
            previews,
            files: Vec::new(),
            board: ProgressBoard::default(),
            state: BatchState::Idle,
            last_report: None,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BatchState::Running
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.files.iter().any(|f| &f.preview.id() == id)
    }

    pub fn last_report(&self) -> Option<&BatchReport> {
        self.last_report.as_ref()
    }

    /// Stage admitted files, each with its own preview.
    pub fn add(&mut self, files: Vec<UploadFile>) -> Result<Vec<Uuid>, BatchError> {
        if self.is_running() {
            return Err(BatchError::Running);
        }
        let ids = files
            .into_iter()
            .map(|file| {
                let preview = self.previews.acquire(&file);
                let id = preview.id();
                self.board.set(id, FileStatus::Queued);
                self.files.push(StagedFile { file, preview });
                id
            })
            .collect();
        Ok(ids)
    }

    /// Unstage a file. Returns false if it was not in the batch.
    pub fn remove(&mut self, id: &Uuid) -> Result<bool, BatchError> {
        if self.is_running() {
            return Err(BatchError::Running);
        }
        let Some(index) = self.files.iter().position(|f| &f.preview.id() == id) else {
            return Ok(false);
        };
        let staged = self.files.remove(index);
        self.board.forget(id);
        staged.preview.release();
        Ok(true)
    }

    /// Drop every staged file and its preview.
    pub fn clear(&mut self) -> Result<(), BatchError> {
        if self.is_running() {
            return Err(BatchError::Running);
        }
        self.files.clear();
        self.board.reset();
        self.state = BatchState::Idle;
        self.last_report = None;
        Ok(())
    }

    /// Start uploading every staged file with the shared metadata.
    pub fn begin(&mut self, metadata: &UploadMetadata) -> Result<Submission, BatchError> {
        if self.is_running() {
            return Err(BatchError::Running);
        }
        if self.files.is_empty() {
            return Err(BatchError::Empty);
        }
        metadata.validate().map_err(BatchError::Invalid)?;

        let jobs = self
            .files
            .iter()
            .map(|staged| {
                let id = staged.preview.id();
                self.board.set(id, FileStatus::Queued);
                UploadJob {
                    id,
                    metadata: metadata.for_file(&staged.file.name),
                    file: staged.file.clone(),
                }
            })
            .collect();

        self.state = BatchState::Running;
        self.last_report = None;

        Ok(Submission {
            jobs,
            board: self.board.clone(),
        })
    }

    /// Fold a finished submission back in: succeeded files leave the batch,
    /// failed ones stay flagged for another attempt.
    pub fn settle(&mut self, report: BatchReport) {
        for outcome in report.outcomes.iter().filter(|o| o.succeeded) {
            if let Some(index) = self.files.iter().position(|f| f.preview.id() == outcome.id) {
                let staged = self.files.remove(index);
                self.board.forget(&outcome.id);
                staged.preview.release();
            }
        }
        self.state = BatchState::Finished;
        self.last_report = Some(report);
    }

    pub fn snapshot(&self) -> Vec<FileView> {
        self.files
            .iter()
            .map(|staged| FileView {
                id: staged.preview.id(),
                name: staged.file.name.clone(),
                size: staged.file.size(),
                content_type: staged.file.content_type.clone(),
                preview_url: staged.preview.url(),
                status: self.board.get(&staged.preview.id()),
            })
            .collect()
    }
}

struct UploadJob {
    id: Uuid,
    file: UploadFile,
    metadata: MediaMetadata,
}

/// The work of one batch submission, detached from the batch lock.
pub struct Submission {
    jobs: Vec<UploadJob>,
    board: ProgressBoard,
}

impl Submission {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Upload every file concurrently. A failed file never stops its siblings.
    pub async fn run(self, uploader: &dyn MediaUploader) -> BatchReport {
        let board = self.board;
        let total = self.jobs.len();

        let uploads = self.jobs.into_iter().map(|job| {
            let board = board.clone();
            async move {
                board.set(job.id, FileStatus::Uploading { progress: 0 });

                let progress: ProgressFn = {
                    let board = board.clone();
                    let id = job.id;
                    Arc::new(move |p: u8| board.set(id, FileStatus::Uploading { progress: p }))
                };

                let succeeded = match uploader.upload(&job.file, &job.metadata, progress).await {
                    Ok(()) => {
                        board.set(job.id, FileStatus::Succeeded);
                        true
                    }
                    Err(e) => {
                        warn!(file = %job.file.name, error = %e, "Upload failed");
                        board.set(
                            job.id,
                            FileStatus::Failed {
                                error: UPLOAD_FAILED.to_string(),
                            },
                        );
                        false
                    }
                };

                FileOutcome {
                    id: job.id,
                    name: job.file.name,
                    succeeded,
                }
            }
        });

        let report = BatchReport {
            outcomes: join_all(uploads).await,
        };

        info!(
            files = total,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Upload batch finished"
        );
        report
    }
}
