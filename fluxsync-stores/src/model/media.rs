use fluxsync::{LocalId, RemoteId};
use serde::{Deserialize, Serialize};

use super::site_scoped_model;

/// Upload progress recorded on the media row itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaUploadState {
    /// Created locally, nothing sent yet
    Queued,
    Uploading,
    #[default]
    Uploaded,
    Failed,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    pub local_id: LocalId,
    pub local_site_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub title: String,
    pub caption: String,
    pub alt: String,
    pub url: String,

    /// Path of the file on disk; required to upload
    pub file_path: Option<String>,
    pub mime_type: Option<String>,
    pub upload_state: MediaUploadState,
}

site_scoped_model!(Media, remote_id);

impl Media {
    /// A file waiting to be uploaded to `site`
    pub fn local_file(
        site: LocalId,
        file_path: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            local_site_id: site,
            file_path: Some(file_path.into()),
            mime_type: Some(mime_type.into()),
            upload_state: MediaUploadState::Queued,
            ..Default::default()
        }
    }

    /// Path and mime type both present and non-empty
    pub fn is_uploadable(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.file_path) && present(&self.mime_type)
    }
}
