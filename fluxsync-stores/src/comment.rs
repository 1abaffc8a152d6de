//! Comments on posts

use std::collections::HashSet;
use std::sync::Arc;

use fluxsync::{Action, ChangeError, ChangeEvent, LocalId, MemoryTable, Persistence, Reaction, RemoteId, Slice};
use tracing::debug;

use crate::client::{CommentClient, NetworkResult};
use crate::model::{Comment, Site};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCommentsPayload {
    pub site: Site,
    /// Zero refreshes the site's comments; anything else appends
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedCommentsPayload {
    pub site: Site,
    pub offset: usize,
    pub result: NetworkResult<Vec<Comment>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCommentPayload {
    pub site: Site,
    pub comment: Comment,
}

impl RemoteCommentPayload {
    pub fn new(site: Site, comment: Comment) -> Self {
        Self { site, comment }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentResponsePayload {
    pub site: Site,
    pub comment: Comment,
    pub result: NetworkResult<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedCommentPayload {
    pub site: Site,
    pub comment: Comment,
    pub result: NetworkResult<()>,
}

#[derive(Action, Clone, Debug, PartialEq)]
pub enum CommentAction {
    FetchComments(FetchCommentsPayload),
    FetchComment(RemoteCommentPayload),
    PushComment(RemoteCommentPayload),
    DeleteComment(RemoteCommentPayload),

    FetchedComments(FetchedCommentsPayload),
    FetchedComment(CommentResponsePayload),
    PushedComment(CommentResponsePayload),
    DeletedComment(DeletedCommentPayload),

    UpdateComment(Comment),
    RemoveComment(Comment),
    RemoveCommentsForSite(LocalId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentChange {
    Fetched {
        site: LocalId,
        count: usize,
        can_load_more: bool,
    },
    Updated {
        local_id: LocalId,
    },
    Removed {
        count: usize,
    },
}

type CommentReaction = Reaction<CommentAction, CommentChange>;

pub struct Comments {
    rows: MemoryTable<Comment>,
    client: Arc<dyn CommentClient>,
    per_page: usize,
}

impl Comments {
    pub fn new(client: Arc<dyn CommentClient>, per_page: usize) -> Self {
        Self {
            rows: MemoryTable::new(),
            client,
            per_page,
        }
    }

    pub fn comments_for_site(&self, site: LocalId) -> Vec<Comment> {
        self.rows.get_all_for_site(site)
    }

    pub fn comments_for_post(&self, site: LocalId, post: RemoteId) -> Vec<Comment> {
        self.rows
            .iter()
            .filter(|c| c.local_site_id == site && c.remote_post_id == Some(post))
            .cloned()
            .collect()
    }

    pub fn comment_by_local_id(&self, id: LocalId) -> Option<Comment> {
        self.rows.get_by_id(id)
    }

    pub fn comment_by_remote_id(&self, site: LocalId, remote: RemoteId) -> Option<Comment> {
        self.rows.get_by_remote_id(site, remote)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn store_remote(&mut self, site: LocalId, mut comment: Comment) -> LocalId {
        comment.local_id = comment
            .remote_id
            .and_then(|remote| self.rows.get_by_remote_id(site, remote))
            .map(|c| c.local_id)
            .unwrap_or_default();
        comment.local_site_id = site;
        self.rows.upsert(comment)
    }

    fn unknown(cause: CommentActionType) -> CommentReaction {
        Reaction::unchanged().emit(ChangeEvent::failed(
            cause,
            ChangeError::validation("unknown_comment", "Comment has not been uploaded"),
        ))
    }

    fn fetch_comment(&self, payload: RemoteCommentPayload) -> CommentReaction {
        let Some(remote_id) = payload.comment.remote_id else {
            return Self::unknown(CommentActionType::FetchComment);
        };
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "FetchComment", local_id = %payload.comment.local_id, %remote_id, "requesting comment");

        Reaction::unchanged().request(async move {
            let result = client.fetch_comment(&payload.site, remote_id).await;
            CommentAction::FetchedComment(CommentResponsePayload {
                site: payload.site,
                comment: payload.comment,
                result,
            })
        })
    }

    fn push_comment(&self, payload: RemoteCommentPayload) -> CommentReaction {
        if payload.comment.content.trim().is_empty() {
            return Reaction::unchanged().emit(ChangeEvent::failed(
                CommentActionType::PushComment,
                ChangeError::validation("empty_content", "Comment content is empty"),
            ));
        }
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "PushComment", local_id = %payload.comment.local_id, "pushing comment");

        Reaction::unchanged().request(async move {
            let result = client.push_comment(&payload.site, &payload.comment).await;
            CommentAction::PushedComment(CommentResponsePayload {
                site: payload.site,
                comment: payload.comment,
                result,
            })
        })
    }

    fn delete_comment(&self, payload: RemoteCommentPayload) -> CommentReaction {
        let Some(remote_id) = payload.comment.remote_id else {
            return Self::unknown(CommentActionType::DeleteComment);
        };
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "DeleteComment", local_id = %payload.comment.local_id, %remote_id, "deleting comment");

        Reaction::unchanged().request(async move {
            let result = client.delete_comment(&payload.site, remote_id).await;
            CommentAction::DeletedComment(DeletedCommentPayload {
                site: payload.site,
                comment: payload.comment,
                result,
            })
        })
    }

    fn fetched_comments(&mut self, payload: FetchedCommentsPayload) -> CommentReaction {
        let comments = match payload.result {
            Ok(comments) => comments,
            Err(error) => {
                return Reaction::unchanged()
                    .emit(ChangeEvent::failed(CommentActionType::FetchedComments, error))
            }
        };
        let site = payload.site.local_id;
        if payload.offset == 0 {
            let returned: HashSet<RemoteId> = comments.iter().filter_map(|c| c.remote_id).collect();
            self.rows.remove_where(|c| {
                c.local_site_id == site && c.remote_id.is_some_and(|id| !returned.contains(&id))
            });
        }
        let count = comments.len();
        for comment in comments {
            self.store_remote(site, comment);
        }
        Reaction::changed().emit(ChangeEvent::ok(
            CommentActionType::FetchedComments,
            CommentChange::Fetched {
                site,
                count,
                can_load_more: count == self.per_page,
            },
        ))
    }

    fn comment_response(
        &mut self,
        cause: CommentActionType,
        payload: CommentResponsePayload,
    ) -> CommentReaction {
        match payload.result {
            Ok(mut remote) => {
                // The local row keeps its id whether it was fetched or pushed
                remote.local_id = payload.comment.local_id;
                remote.local_site_id = payload.site.local_id;
                let local_id = if self.rows.get_by_id(remote.local_id).is_some() {
                    self.rows.upsert(remote)
                } else {
                    self.store_remote(payload.site.local_id, remote)
                };
                Reaction::changed().emit(ChangeEvent::ok(cause, CommentChange::Updated { local_id }))
            }
            Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
        }
    }
}

impl Slice for Comments {
    type Action = CommentAction;
    type Change = CommentChange;
    const NAME: &'static str = "comments";
    const DOMAIN: &'static str = CommentActionType::DOMAIN;

    fn reduce(&mut self, action: CommentAction) -> CommentReaction {
        match action {
            CommentAction::FetchComments(payload) => {
                let client = self.client.clone();
                let number = self.per_page;
                debug!(store = Self::NAME, action = "FetchComments", site = %payload.site.local_id, offset = payload.offset, "requesting comments");
                Reaction::unchanged().request(async move {
                    let result = client
                        .fetch_comments(&payload.site, payload.offset, number)
                        .await;
                    CommentAction::FetchedComments(FetchedCommentsPayload {
                        site: payload.site,
                        offset: payload.offset,
                        result,
                    })
                })
            }
            CommentAction::FetchComment(payload) => self.fetch_comment(payload),
            CommentAction::PushComment(payload) => self.push_comment(payload),
            CommentAction::DeleteComment(payload) => self.delete_comment(payload),

            CommentAction::FetchedComments(payload) => self.fetched_comments(payload),
            CommentAction::FetchedComment(payload) => {
                self.comment_response(CommentActionType::FetchedComment, payload)
            }
            CommentAction::PushedComment(payload) => {
                self.comment_response(CommentActionType::PushedComment, payload)
            }
            CommentAction::DeletedComment(payload) => match payload.result {
                Ok(()) => {
                    let count = usize::from(self.rows.remove_by_id(payload.comment.local_id).is_some());
                    Reaction::changed().emit(ChangeEvent::ok(
                        CommentActionType::DeletedComment,
                        CommentChange::Removed { count },
                    ))
                }
                Err(error) => Reaction::unchanged()
                    .emit(ChangeEvent::failed(CommentActionType::DeletedComment, error)),
            },

            CommentAction::UpdateComment(comment) => {
                let local_id = self.rows.upsert(comment);
                Reaction::changed().emit(ChangeEvent::ok(
                    CommentActionType::UpdateComment,
                    CommentChange::Updated { local_id },
                ))
            }
            CommentAction::RemoveComment(comment) => {
                let count = usize::from(self.rows.remove_by_id(comment.local_id).is_some());
                Reaction::changed().emit(ChangeEvent::ok(
                    CommentActionType::RemoveComment,
                    CommentChange::Removed { count },
                ))
            }
            CommentAction::RemoveCommentsForSite(site) => {
                let count = self.rows.remove_all_for_site(site);
                Reaction::changed().emit(ChangeEvent::ok(
                    CommentActionType::RemoveCommentsForSite,
                    CommentChange::Removed { count },
                ))
            }
        }
    }
}
