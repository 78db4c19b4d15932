use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An in-memory file dropped into the console.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    /// Build a file, guessing the content type from the name when the
    /// browser sent none or a generic one.
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Bytes) -> Self {
        let name = name.into();
        let content_type = match content_type {
            Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
            _ => mime_guess::from_path(&name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        };
        Self {
            name,
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Metadata shared by every file of an upload batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub category_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UploadMetadata {
    pub fn for_file(&self, filename: &str) -> MediaMetadata {
        MediaMetadata {
            category_id: self.category_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            filename: filename.to_string(),
        }
    }
}

/// The JSON `metadata` part sent along with each uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub category_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub filename: String,
}

/// A media entry listed by the API. The API does not pin its shape down,
/// so everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}
