use fluxsync::{LocalId, RemoteId};
use serde::{Deserialize, Serialize};

use super::site_scoped_model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    #[default]
    Approved,
    Unapproved,
    Spam,
    Trash,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub local_id: LocalId,
    pub local_site_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub remote_post_id: Option<RemoteId>,
    pub author_name: String,
    pub content: String,
    pub status: CommentStatus,
}

site_scoped_model!(Comment, remote_id);

impl Comment {
    /// A reply to `post` that has not been pushed yet
    pub fn new(site: LocalId, post: RemoteId, content: impl Into<String>) -> Self {
        Self {
            local_site_id: site,
            remote_post_id: Some(post),
            content: content.into(),
            ..Default::default()
        }
    }
}
