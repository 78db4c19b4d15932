//! Transient previews of staged files.
//!
//! A preview lives exactly as long as its [`PreviewHandle`]. Handles are not
//! `Clone`, so every staged file owns exactly one and the registry entry is
//! released when that file leaves the batch, whichever way it leaves.

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::UploadFile;

#[derive(Debug, Clone)]
pub struct Preview {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct PreviewRegistry {
    entries: DashMap<Uuid, Preview>,
}

impl PreviewRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn acquire(self: &Arc<Self>, file: &UploadFile) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            Preview {
                content_type: file.content_type.clone(),
                bytes: file.bytes.clone(),
            },
        );
        PreviewHandle {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Preview> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    /// Number of previews currently held
    pub fn live(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    registry: Arc<PreviewRegistry>,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> String {
        format!("/admin/upload/previews/{}", self.id)
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.entries.remove(&self.id);
    }
}
