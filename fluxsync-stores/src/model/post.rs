use fluxsync::{LocalId, RemoteId};
use serde::{Deserialize, Serialize};

use super::site_scoped_model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    #[default]
    Post,
    Page,
    /// Jetpack portfolio project
    #[serde(rename = "jetpack-portfolio")]
    Portfolio,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Post => "post",
            PostKind::Page => "page",
            PostKind::Portfolio => "jetpack-portfolio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub local_id: LocalId,
    pub local_site_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub kind: PostKind,
    pub title: String,
    pub content: String,
    /// `publish`, `draft`, `private`, ...
    pub status: String,

    /// Edited locally since the last sync; refreshes never overwrite it
    pub is_locally_changed: bool,
}

site_scoped_model!(Post, remote_id);

impl Post {
    /// A local draft for `site`
    pub fn draft(site: LocalId, kind: PostKind) -> Self {
        Self {
            local_site_id: site,
            kind,
            status: "draft".to_string(),
            is_locally_changed: true,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Never uploaded
    pub fn is_local_draft(&self) -> bool {
        self.remote_id.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}
