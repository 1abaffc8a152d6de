//! Posts and pages

use std::collections::HashSet;
use std::sync::Arc;

use fluxsync::{Action, ChangeError, ChangeEvent, LocalId, MemoryTable, Persistence, Reaction, RemoteId, Slice};
use tracing::debug;

use crate::client::{NetworkResult, PostClient};
use crate::model::{Post, PostKind, Site};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchPostsPayload {
    pub site: Site,
    pub kind: PostKind,
    /// Append the next page instead of refreshing the first one
    pub load_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPostsPayload {
    pub site: Site,
    pub kind: PostKind,
    pub load_more: bool,
    pub result: NetworkResult<Vec<Post>>,
}

/// A single post to fetch, push or delete
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePostPayload {
    pub site: Site,
    pub post: Post,
}

impl RemotePostPayload {
    pub fn new(site: Site, post: Post) -> Self {
        Self { site, post }
    }
}

/// Outcome of a single-post request; `post` is the local copy it was made for
#[derive(Debug, Clone, PartialEq)]
pub struct PostResponsePayload {
    pub site: Site,
    pub post: Post,
    pub result: NetworkResult<Post>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedPostPayload {
    pub site: Site,
    pub post: Post,
    pub result: NetworkResult<()>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPostsPayload {
    pub site: Site,
    pub query: String,
    pub kind: PostKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchedPostsPayload {
    pub search: SearchPostsPayload,
    pub result: NetworkResult<Vec<Post>>,
}

#[derive(Action, Clone, Debug, PartialEq)]
pub enum PostAction {
    // Remote requests
    FetchPosts(FetchPostsPayload),
    FetchPost(RemotePostPayload),
    PushPost(RemotePostPayload),
    DeletePost(RemotePostPayload),
    SearchPosts(SearchPostsPayload),

    // Remote responses
    FetchedPosts(FetchedPostsPayload),
    FetchedPost(PostResponsePayload),
    PushedPost(PostResponsePayload),
    DeletedPost(DeletedPostPayload),
    SearchedPosts(SearchedPostsPayload),

    // Local
    UpdatePost(Post),
    RemovePost(Post),
    RemoveAllPosts,
}

/// Data carried by post change events
#[derive(Debug, Clone, PartialEq)]
pub enum PostChange {
    Fetched {
        site: LocalId,
        kind: PostKind,
        count: usize,
        load_more: bool,
        can_load_more: bool,
    },
    Updated {
        local_id: LocalId,
    },
    Removed {
        local_id: LocalId,
    },
    Cleared {
        count: usize,
    },
    /// Search results are handed out, never stored
    Searched {
        query: String,
        kind: PostKind,
        posts: Vec<Post>,
        can_load_more: bool,
        loaded_more: bool,
    },
}

type PostReaction = Reaction<PostAction, PostChange>;

pub struct Posts {
    rows: MemoryTable<Post>,
    client: Arc<dyn PostClient>,
    per_page: usize,
}

impl Posts {
    pub fn new(client: Arc<dyn PostClient>, per_page: usize) -> Self {
        Self {
            rows: MemoryTable::new(),
            client,
            per_page,
        }
    }

    // ===== Reads =====

    pub fn posts_for_site(&self, site: LocalId) -> Vec<Post> {
        self.of_kind(site, PostKind::Post)
    }

    pub fn pages_for_site(&self, site: LocalId) -> Vec<Post> {
        self.of_kind(site, PostKind::Page)
    }

    pub fn portfolios_for_site(&self, site: LocalId) -> Vec<Post> {
        self.of_kind(site, PostKind::Portfolio)
    }

    pub fn post_by_local_id(&self, id: LocalId) -> Option<Post> {
        self.rows.get_by_id(id)
    }

    pub fn post_by_remote_id(&self, site: LocalId, remote: RemoteId) -> Option<Post> {
        self.rows.get_by_remote_id(site, remote)
    }

    pub fn post_count_for_site(&self, site: LocalId, kind: PostKind) -> usize {
        self.rows
            .iter()
            .filter(|p| p.local_site_id == site && p.kind == kind)
            .count()
    }

    /// Posts of `kind` that exist on the server; this is the paging offset
    pub fn uploaded_post_count_for_site(&self, site: LocalId, kind: PostKind) -> usize {
        self.rows
            .iter()
            .filter(|p| p.local_site_id == site && p.kind == kind && !p.is_local_draft())
            .count()
    }

    pub fn local_drafts_for_site(&self, site: LocalId) -> Vec<Post> {
        self.rows
            .iter()
            .filter(|p| p.local_site_id == site && p.is_local_draft())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn of_kind(&self, site: LocalId, kind: PostKind) -> Vec<Post> {
        self.rows
            .get_all_for_site(site)
            .into_iter()
            .filter(|p| p.kind == kind)
            .collect()
    }

    // ===== Handlers =====

    fn fetch_posts(&self, payload: FetchPostsPayload) -> PostReaction {
        let offset = if payload.load_more {
            self.uploaded_post_count_for_site(payload.site.local_id, payload.kind)
        } else {
            0
        };
        let number = self.per_page;
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "FetchPosts", site = %payload.site.local_id, offset, "requesting posts");

        Reaction::unchanged().request(async move {
            let result = client
                .fetch_posts(&payload.site, payload.kind, offset, number)
                .await;
            PostAction::FetchedPosts(FetchedPostsPayload {
                site: payload.site,
                kind: payload.kind,
                load_more: payload.load_more,
                result,
            })
        })
    }

    fn fetched_posts(&mut self, payload: FetchedPostsPayload) -> PostReaction {
        let FetchedPostsPayload {
            site,
            kind,
            load_more,
            result,
        } = payload;
        let posts = match result {
            Ok(posts) => posts,
            Err(error) => {
                debug!(store = Self::NAME, action = "FetchedPosts", %error, "fetch failed");
                return Reaction::unchanged()
                    .emit(ChangeEvent::failed(PostActionType::FetchedPosts, error));
            }
        };

        let site_id = site.local_id;
        if !load_more {
            // Refresh: drop synced rows the server no longer returns
            let returned: HashSet<RemoteId> = posts.iter().filter_map(|p| p.remote_id).collect();
            self.rows.remove_where(|p| {
                p.local_site_id == site_id
                    && p.kind == kind
                    && !p.is_locally_changed
                    && p.remote_id.is_some_and(|id| !returned.contains(&id))
            });
        }

        let count = posts.len();
        for mut post in posts {
            post.kind = kind;
            self.merge_remote(site_id, post, false);
        }

        Reaction::changed().emit(ChangeEvent::ok(
            PostActionType::FetchedPosts,
            PostChange::Fetched {
                site: site_id,
                kind,
                count,
                load_more,
                can_load_more: count == self.per_page,
            },
        ))
    }

    /// Store a post as the server sent it, reusing the row already holding
    /// its remote id. Rows with unsynced local edits are left alone unless
    /// `overwrite` is set.
    fn merge_remote(&mut self, site: LocalId, mut post: Post, overwrite: bool) -> LocalId {
        let existing = post
            .remote_id
            .and_then(|remote| self.rows.get_by_remote_id(site, remote));
        if let Some(existing) = &existing {
            if existing.is_locally_changed && !overwrite {
                return existing.local_id;
            }
        }
        post.local_id = existing.map(|p| p.local_id).unwrap_or_default();
        post.local_site_id = site;
        post.is_locally_changed = false;
        self.rows.upsert(post)
    }

    fn fetch_post(&self, payload: RemotePostPayload) -> PostReaction {
        let Some(remote_id) = payload.post.remote_id else {
            return Reaction::unchanged().emit(ChangeEvent::failed(
                PostActionType::FetchPost,
                ChangeError::validation("unknown_post", "Post has not been uploaded"),
            ));
        };
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "FetchPost", local_id = %payload.post.local_id, %remote_id, "requesting post");

        Reaction::unchanged().request(async move {
            let result = client.fetch_post(&payload.site, remote_id).await;
            PostAction::FetchedPost(PostResponsePayload {
                site: payload.site,
                post: payload.post,
                result,
            })
        })
    }

    fn fetched_post(&mut self, payload: PostResponsePayload) -> PostReaction {
        match payload.result {
            Ok(mut remote) => {
                remote.kind = payload.post.kind;
                let local_id = self.merge_remote(payload.site.local_id, remote, true);
                Reaction::changed().emit(ChangeEvent::ok(
                    PostActionType::FetchedPost,
                    PostChange::Updated { local_id },
                ))
            }
            Err(error) => {
                Reaction::unchanged().emit(ChangeEvent::failed(PostActionType::FetchedPost, error))
            }
        }
    }

    fn push_post(&self, payload: RemotePostPayload) -> PostReaction {
        if payload.post.is_empty() {
            debug!(store = Self::NAME, action = "PushPost", local_id = %payload.post.local_id, "rejected empty post");
            return Reaction::unchanged().emit(ChangeEvent::failed(
                PostActionType::PushPost,
                ChangeError::validation("empty_post", "Post has neither title nor content"),
            ));
        }
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "PushPost", local_id = %payload.post.local_id, "pushing post");

        Reaction::unchanged().request(async move {
            let result = client.push_post(&payload.site, &payload.post).await;
            PostAction::PushedPost(PostResponsePayload {
                site: payload.site,
                post: payload.post,
                result,
            })
        })
    }

    fn pushed_post(&mut self, payload: PostResponsePayload) -> PostReaction {
        match payload.result {
            Ok(mut remote) => {
                remote.local_id = payload.post.local_id;
                remote.local_site_id = payload.site.local_id;
                remote.kind = payload.post.kind;
                remote.is_locally_changed = false;
                let local_id = self.rows.upsert(remote);
                Reaction::changed().emit(ChangeEvent::ok(
                    PostActionType::PushedPost,
                    PostChange::Updated { local_id },
                ))
            }
            Err(error) => {
                Reaction::unchanged().emit(ChangeEvent::failed(PostActionType::PushedPost, error))
            }
        }
    }

    fn delete_post(&self, payload: RemotePostPayload) -> PostReaction {
        let Some(remote_id) = payload.post.remote_id else {
            return Reaction::unchanged().emit(ChangeEvent::failed(
                PostActionType::DeletePost,
                ChangeError::validation("unknown_post", "Post has not been uploaded"),
            ));
        };
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "DeletePost", local_id = %payload.post.local_id, %remote_id, "deleting post");

        Reaction::unchanged().request(async move {
            let result = client.delete_post(&payload.site, remote_id).await;
            PostAction::DeletedPost(DeletedPostPayload {
                site: payload.site,
                post: payload.post,
                result,
            })
        })
    }

    fn deleted_post(&mut self, payload: DeletedPostPayload) -> PostReaction {
        if let Err(error) = payload.result {
            return Reaction::unchanged()
                .emit(ChangeEvent::failed(PostActionType::DeletedPost, error));
        }
        let local_id = payload
            .post
            .remote_id
            .and_then(|remote| self.rows.get_by_remote_id(payload.site.local_id, remote))
            .map(|p| p.local_id)
            .unwrap_or(payload.post.local_id);
        self.rows.remove_by_id(local_id);
        Reaction::changed().emit(ChangeEvent::ok(
            PostActionType::DeletedPost,
            PostChange::Removed { local_id },
        ))
    }

    fn search_posts(&self, search: SearchPostsPayload) -> PostReaction {
        let client = self.client.clone();
        let number = self.per_page;
        debug!(store = Self::NAME, action = "SearchPosts", query = %search.query, offset = search.offset, "searching posts");

        Reaction::unchanged().request(async move {
            let result = client
                .search_posts(&search.site, &search.query, search.kind, search.offset, number)
                .await;
            PostAction::SearchedPosts(SearchedPostsPayload { search, result })
        })
    }

    fn searched_posts(&self, payload: SearchedPostsPayload) -> PostReaction {
        let SearchedPostsPayload { search, result } = payload;
        match result {
            Ok(posts) => Reaction::unchanged().emit(ChangeEvent::ok(
                PostActionType::SearchedPosts,
                PostChange::Searched {
                    can_load_more: posts.len() == self.per_page,
                    loaded_more: search.offset > 0,
                    query: search.query,
                    kind: search.kind,
                    posts,
                },
            )),
            Err(error) => {
                Reaction::unchanged().emit(ChangeEvent::failed(PostActionType::SearchedPosts, error))
            }
        }
    }
}

impl Slice for Posts {
    type Action = PostAction;
    type Change = PostChange;
    const NAME: &'static str = "posts";
    const DOMAIN: &'static str = PostActionType::DOMAIN;

    fn reduce(&mut self, action: PostAction) -> PostReaction {
        match action {
            PostAction::FetchPosts(payload) => self.fetch_posts(payload),
            PostAction::FetchPost(payload) => self.fetch_post(payload),
            PostAction::PushPost(payload) => self.push_post(payload),
            PostAction::DeletePost(payload) => self.delete_post(payload),
            PostAction::SearchPosts(payload) => self.search_posts(payload),

            PostAction::FetchedPosts(payload) => self.fetched_posts(payload),
            PostAction::FetchedPost(payload) => self.fetched_post(payload),
            PostAction::PushedPost(payload) => self.pushed_post(payload),
            PostAction::DeletedPost(payload) => self.deleted_post(payload),
            PostAction::SearchedPosts(payload) => self.searched_posts(payload),

            PostAction::UpdatePost(post) => {
                let local_id = self.rows.upsert(post);
                debug!(store = Self::NAME, action = "UpdatePost", %local_id, "post updated");
                Reaction::changed().emit(ChangeEvent::ok(
                    PostActionType::UpdatePost,
                    PostChange::Updated { local_id },
                ))
            }
            PostAction::RemovePost(post) => {
                let removed = self.rows.remove_by_id(post.local_id).is_some();
                let reaction = if removed {
                    Reaction::changed()
                } else {
                    Reaction::unchanged()
                };
                reaction.emit(ChangeEvent::ok(
                    PostActionType::RemovePost,
                    PostChange::Removed {
                        local_id: post.local_id,
                    },
                ))
            }
            PostAction::RemoveAllPosts => {
                let count = self.rows.len();
                self.rows.clear();
                Reaction::changed().emit(ChangeEvent::ok(
                    PostActionType::RemoveAllPosts,
                    PostChange::Cleared { count },
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;
    use crate::test_util::{settle, test_site};
    use fluxsync::{ActionKind, ActionType, ErrorKind, NetworkError};

    fn posts(server: &Arc<MockServer>, per_page: usize) -> Posts {
        Posts::new(server.clone(), per_page)
    }

    fn published(title: &str) -> Post {
        Post {
            title: title.to_string(),
            content: "body".to_string(),
            status: "publish".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_action_kinds() {
        assert_eq!(PostActionType::DOMAIN, "post");
        assert_eq!(PostActionType::FetchPosts.kind(), ActionKind::Request);
        assert_eq!(PostActionType::SearchedPosts.kind(), ActionKind::Response);
        assert_eq!(PostActionType::RemoveAllPosts.kind(), ActionKind::Local);
    }

    #[test]
    fn test_update_post_is_immediate() {
        let server = MockServer::new();
        let mut slice = posts(&server, 20);
        let site = test_site(1);

        let draft = Post::draft(site.local_id, PostKind::Post).with_title("hello");
        let reaction = slice.reduce(PostAction::UpdatePost(draft));

        assert!(reaction.changed);
        assert!(!reaction.has_effects());
        let local_id = match &reaction.events[0].data {
            Some(PostChange::Updated { local_id }) => *local_id,
            other => panic!("unexpected change: {:?}", other),
        };
        let stored = slice.post_by_local_id(local_id).unwrap();
        assert_eq!(stored.title, "hello");
        assert_eq!(slice.local_drafts_for_site(site.local_id).len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_keeps_local_drafts() {
        let server = MockServer::new();
        let site = test_site(1);
        server.add_post(&site, published("one"));
        server.add_post(&site, published("two"));
        let mut slice = posts(&server, 20);

        slice.reduce(PostAction::UpdatePost(
            Post::draft(site.local_id, PostKind::Post).with_title("draft"),
        ));
        let events = settle(
            &mut slice,
            PostAction::FetchPosts(FetchPostsPayload {
                site: site.clone(),
                kind: PostKind::Post,
                load_more: false,
            }),
        )
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cause, PostActionType::FetchedPosts);
        assert_eq!(
            events[0].data,
            Some(PostChange::Fetched {
                site: site.local_id,
                kind: PostKind::Post,
                count: 2,
                load_more: false,
                can_load_more: false,
            })
        );
        assert_eq!(slice.posts_for_site(site.local_id).len(), 3);
        assert_eq!(slice.uploaded_post_count_for_site(site.local_id, PostKind::Post), 2);
    }

    #[tokio::test]
    async fn test_fetch_portfolios_leaves_posts_alone() {
        let server = MockServer::new();
        let site = test_site(1);
        server.add_post(&site, published("blog"));
        server.add_post(
            &site,
            Post {
                kind: PostKind::Portfolio,
                ..published("project")
            },
        );
        let mut slice = posts(&server, 20);
        let fetch = |kind| {
            PostAction::FetchPosts(FetchPostsPayload {
                site: site.clone(),
                kind,
                load_more: false,
            })
        };

        settle(&mut slice, fetch(PostKind::Post)).await;
        let events = settle(&mut slice, fetch(PostKind::Portfolio)).await;

        assert!(matches!(
            events[0].data,
            Some(PostChange::Fetched {
                kind: PostKind::Portfolio,
                count: 1,
                ..
            })
        ));
        let portfolios = slice.portfolios_for_site(site.local_id);
        assert_eq!(portfolios.len(), 1);
        assert_eq!(portfolios[0].title, "project");
        assert_eq!(slice.posts_for_site(site.local_id).len(), 1);
        assert_eq!(PostKind::Portfolio.as_str(), "jetpack-portfolio");
    }

    #[tokio::test]
    async fn test_load_more_uses_stored_count_as_offset() {
        let server = MockServer::new();
        let site = test_site(1);
        for n in 0..5 {
            server.add_post(&site, published(&format!("post {n}")));
        }
        let mut slice = posts(&server, 2);
        let fetch = |load_more| {
            PostAction::FetchPosts(FetchPostsPayload {
                site: site.clone(),
                kind: PostKind::Post,
                load_more,
            })
        };

        let first = settle(&mut slice, fetch(false)).await;
        assert!(matches!(
            first[0].data,
            Some(PostChange::Fetched { can_load_more: true, .. })
        ));
        settle(&mut slice, fetch(true)).await;
        let last = settle(&mut slice, fetch(true)).await;

        assert!(matches!(
            last[0].data,
            Some(PostChange::Fetched { count: 1, can_load_more: false, .. })
        ));
        let titles: Vec<_> = slice
            .posts_for_site(site.local_id)
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["post 0", "post 1", "post 2", "post 3", "post 4"]);
    }

    #[tokio::test]
    async fn test_refetch_is_idempotent() {
        let server = MockServer::new();
        let site = test_site(1);
        server.add_post(&site, published("same"));
        let mut slice = posts(&server, 20);
        let fetch = PostAction::FetchPosts(FetchPostsPayload {
            site: site.clone(),
            kind: PostKind::Post,
            load_more: true,
        });

        settle(&mut slice, fetch.clone()).await;
        let before = slice.posts_for_site(site.local_id);
        // load_more with nothing new still leaves one row per remote post
        let response = PostAction::FetchedPosts(FetchedPostsPayload {
            site: site.clone(),
            kind: PostKind::Post,
            load_more: true,
            result: Ok(vec![published_with_id(&before[0])]),
        });
        slice.reduce(response.clone());
        slice.reduce(response);

        assert_eq!(slice.posts_for_site(site.local_id), before);
    }

    fn published_with_id(post: &Post) -> Post {
        Post {
            local_id: LocalId::default(),
            local_site_id: LocalId::default(),
            ..post.clone()
        }
    }

    #[tokio::test]
    async fn test_push_empty_post_is_rejected_without_network() {
        let server = MockServer::new();
        let site = test_site(1);
        let mut slice = posts(&server, 20);

        let events = settle(
            &mut slice,
            PostAction::PushPost(RemotePostPayload::new(
                site.clone(),
                Post::draft(site.local_id, PostKind::Post),
            )),
        )
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cause, PostActionType::PushPost);
        let error = events[0].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Validation);
        assert_eq!(error.code, "empty_post");
        assert_eq!(server.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_push_assigns_remote_id_to_same_row() {
        let server = MockServer::new();
        let site = test_site(1);
        let mut slice = posts(&server, 20);

        let reaction = slice.reduce(PostAction::UpdatePost(
            Post::draft(site.local_id, PostKind::Page).with_content("text"),
        ));
        let Some(PostChange::Updated { local_id }) = reaction.events[0].data.clone() else {
            panic!("expected update");
        };
        let draft = slice.post_by_local_id(local_id).unwrap();

        let events = settle(
            &mut slice,
            PostAction::PushPost(RemotePostPayload::new(site.clone(), draft)),
        )
        .await;

        assert_eq!(events[0].cause, PostActionType::PushedPost);
        assert_eq!(events[0].data, Some(PostChange::Updated { local_id }));
        let pushed = slice.post_by_local_id(local_id).unwrap();
        assert!(pushed.remote_id.is_some());
        assert!(!pushed.is_locally_changed);
        assert_eq!(pushed.kind, PostKind::Page);
        assert_eq!(slice.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state() {
        let server = MockServer::new();
        let site = test_site(1);
        let mut slice = posts(&server, 20);
        slice.reduce(PostAction::UpdatePost(published("kept")));
        server.fail_with(NetworkError::Timeout);

        let events = settle(
            &mut slice,
            PostAction::FetchPosts(FetchPostsPayload {
                site,
                kind: PostKind::Post,
                load_more: false,
            }),
        )
        .await;

        assert_eq!(events[0].cause, PostActionType::FetchedPosts);
        assert_eq!(events[0].error.as_ref().unwrap().kind, ErrorKind::Network);
        assert_eq!(slice.len(), 1);
    }

    #[tokio::test]
    async fn test_search_results_not_persisted() {
        let server = MockServer::new();
        let site = test_site(1);
        server.add_post(&site, published("Rust in production"));
        server.add_post(&site, published("Gardening"));
        let mut slice = posts(&server, 20);

        let events = settle(
            &mut slice,
            PostAction::SearchPosts(SearchPostsPayload {
                site,
                query: "rust".into(),
                kind: PostKind::Post,
                offset: 0,
            }),
        )
        .await;

        match &events[0].data {
            Some(PostChange::Searched {
                posts,
                loaded_more,
                ..
            }) => {
                assert_eq!(posts.len(), 1);
                assert!(!loaded_more);
            }
            other => panic!("unexpected change: {:?}", other),
        }
        assert!(slice.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let server = MockServer::new();
        let site = test_site(1);
        server.add_post(&site, published("doomed"));
        let mut slice = posts(&server, 20);
        settle(
            &mut slice,
            PostAction::FetchPosts(FetchPostsPayload {
                site: site.clone(),
                kind: PostKind::Post,
                load_more: false,
            }),
        )
        .await;
        let post = slice.posts_for_site(site.local_id).remove(0);

        let events = settle(
            &mut slice,
            PostAction::DeletePost(RemotePostPayload::new(site.clone(), post.clone())),
        )
        .await;

        assert_eq!(
            events[0].data,
            Some(PostChange::Removed {
                local_id: post.local_id
            })
        );
        assert!(slice.is_empty());
        assert_eq!(server.post_count(&site), 0);
    }
}
