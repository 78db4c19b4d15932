use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tracing::{debug, info};

use super::api_client::{segment, ApiClient};
use crate::auth::SessionAuthority;
use crate::error::ServiceError;
use crate::models::{MediaItem, MediaMetadata, UploadFile};

/// Receives the upload percentage (0 to 100) of a single file.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

const CHUNK_SIZE: usize = 64 * 1024;
const UPLOAD_PATH: &str = "/admin/media";

/// Sends one file with its metadata to the gallery.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(
        &self,
        file: &UploadFile,
        metadata: &MediaMetadata,
        on_progress: ProgressFn,
    ) -> Result<(), ServiceError>;
}

pub struct MediaService {
    api: ApiClient,
    session: Arc<dyn SessionAuthority>,
}

impl MediaService {
    pub fn new(api: ApiClient, session: Arc<dyn SessionAuthority>) -> Self {
        Self { api, session }
    }

    pub async fn list_by_category(&self, category_id: &str) -> Result<Vec<MediaItem>, ServiceError> {
        let token = self.session.bearer_token()?;
        self.api
            .get(&token, &format!("/admin/media/{}", segment(category_id)))
            .await
    }
}

#[async_trait]
impl MediaUploader for MediaService {
    async fn upload(
        &self,
        file: &UploadFile,
        metadata: &MediaMetadata,
        on_progress: ProgressFn,
    ) -> Result<(), ServiceError> {
        let token = self.session.bearer_token()?;

        let transport = |source| ServiceError::Transport {
            path: UPLOAD_PATH.to_string(),
            source,
        };

        let metadata_json = serde_json::to_string(metadata).map_err(|source| ServiceError::Encode {
            path: UPLOAD_PATH.to_string(),
            source,
        })?;

        let file_part = Part::stream_with_length(progress_body(file.bytes.clone(), on_progress), file.size())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(transport)?;
        let metadata_part = Part::text(metadata_json)
            .mime_str("application/json")
            .map_err(transport)?;

        let form = Form::new()
            .part("file", file_part)
            .part("metadata", metadata_part);

        debug!(file = %file.name, size = file.size(), "Uploading media");
        self.api.post_multipart(&token, UPLOAD_PATH, form).await?;
        info!(file = %file.name, category = %metadata.category_id, "Media uploaded");
        Ok(())
    }
}

/// Rounded share of `sent` over `total`, in percent.
fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as f64 * 100.0 / total as f64).round() as u64).min(100) as u8
}

/// Stream the file in chunks, reporting progress as each chunk is handed to
/// the transport.
fn progress_body(bytes: Bytes, on_progress: ProgressFn) -> reqwest::Body {
    let total = bytes.len();
    if total == 0 {
        on_progress(100);
        return reqwest::Body::from(bytes);
    }

    let chunks: Vec<Bytes> = (0..total)
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(total)))
        .collect();

    let mut sent = 0;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        on_progress(percent(sent, total));
        Ok::<_, std::io::Error>(chunk)
    });

    reqwest::Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadMetadata;
    use crate::testing::{viewer, FakeApi};
    use parking_lot::Mutex;

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Arc::new(move |p: u8| sink.lock().push(p)), seen)
    }

    fn shared() -> UploadMetadata {
        UploadMetadata {
            category_id: "cat-1".to_string(),
            title: "Summer".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[tokio::test]
    async fn test_upload_reports_progress_up_to_100() {
        let fake = FakeApi::start().await;
        let service = MediaService::new(ApiClient::new(&fake.base_url), viewer());
        let file = UploadFile::new("beach.jpg", Some("image/jpeg"), Bytes::from(vec![7u8; 200 * 1024]));
        let (progress, seen) = recorder();

        service
            .upload(&file, &shared().for_file(&file.name), progress)
            .await
            .unwrap();

        let seen = seen.lock().clone();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));

        let uploads = fake.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].filename, "beach.jpg");
        assert_eq!(uploads[0].category_id, "cat-1");
    }

    #[tokio::test]
    async fn test_upload_failure_propagates() {
        let fake = FakeApi::start().await;
        let service = MediaService::new(ApiClient::new(&fake.base_url), viewer());
        let file = UploadFile::new("fail.png", None, Bytes::from_static(b"png"));
        let (progress, _) = recorder();

        let err = service
            .upload(&file, &shared().for_file(&file.name), progress)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Api { .. }));
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let fake = FakeApi::start().await;
        let service = MediaService::new(ApiClient::new(&fake.base_url), viewer());
        let file = UploadFile::new("a.webp", None, Bytes::from_static(b"webp"));
        let (progress, _) = recorder();
        service
            .upload(&file, &shared().for_file(&file.name), progress)
            .await
            .unwrap();

        let items = service.list_by_category("cat-1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].filename.as_deref(), Some("a.webp"));
        assert!(service.list_by_category("cat-2").await.unwrap().is_empty());
    }
}
