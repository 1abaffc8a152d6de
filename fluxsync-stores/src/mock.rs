//! In-memory server implementing every client trait
//!
//! Seed it with content, optionally make every call fail or hold uploads at
//! a gate, and hand the same `Arc<MockServer>` to each store as its client.
//! Designed for tests and demos; nothing leaves the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fluxsync::{NetworkError, RemoteId};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::client::{
    AccountClient, CommentClient, MediaClient, NetworkResult, PostClient, ProductClient,
    SiteClient, StatsClient, WooCommerceClient,
};
use crate::model::{
    Account, Comment, CommentInsights, Media, MediaUploadState, OrderStatsV4, Post,
    PostDetailStats, PostKind, Product, ProductReview, ProductVariation, Site, StatsGranularity,
    UsernameAction, WcSettings, WcSimpleSite,
};

#[derive(Debug, Default)]
struct ServerState {
    next_remote_id: i64,
    posts: Vec<(i64, Post)>,
    comments: Vec<(i64, Comment)>,
    media: Vec<(i64, Media)>,
    users: HashMap<String, String>,
    token: Option<String>,
    account: Option<Account>,
    sites: Vec<Site>,
    api_versions: HashMap<i64, String>,
    settings: HashMap<i64, WcSettings>,
    simple_sites: Vec<WcSimpleSite>,
    products: Vec<(i64, Product)>,
    variations: Vec<(i64, ProductVariation)>,
    reviews: Vec<(i64, ProductReview)>,
    post_stats: HashMap<(i64, RemoteId), PostDetailStats>,
    comment_insights: HashMap<i64, CommentInsights>,
    order_stats: HashMap<(i64, StatsGranularity), OrderStatsV4>,
}

impl ServerState {
    fn allocate(&mut self) -> RemoteId {
        self.next_remote_id += 1;
        RemoteId(self.next_remote_id)
    }
}

/// Mock backend for every domain
#[derive(Debug, Default)]
pub struct MockServer {
    state: Mutex<ServerState>,
    failure: Mutex<Option<NetworkError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    upload_gate: Mutex<Option<Arc<Semaphore>>>,
    delay: Mutex<Duration>,
}

fn site_key(site: &Site) -> i64 {
    site.site_id.map(|id| id.0).unwrap_or_default()
}

fn page<T: Clone>(rows: impl Iterator<Item = T>, offset: usize, number: usize) -> Vec<T> {
    rows.skip(offset).take(number).collect()
}

impl MockServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ===== Behavior =====

    /// Fail every subsequent call with `error` until cleared
    pub fn fail_with(&self, error: NetworkError) {
        *self.failure.lock() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Simulated latency for every call
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Hold uploads until [`release_uploads`](Self::release_uploads) lets them through
    pub fn hold_uploads(&self) {
        *self.upload_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_uploads(&self, count: usize) {
        if let Some(gate) = self.upload_gate.lock().as_ref() {
            gate.add_permits(count);
        }
    }

    /// How many times `method` was called
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().get(method).copied().unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    async fn call(&self, method: &'static str) -> NetworkResult<()> {
        *self.calls.lock().entry(method).or_default() += 1;
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // ===== Seeding =====

    /// Store a post on the server, returning its remote id
    pub fn add_post(&self, site: &Site, mut post: Post) -> RemoteId {
        let mut state = self.state.lock();
        let id = post.remote_id.unwrap_or_else(|| state.allocate());
        post.remote_id = Some(id);
        post.is_locally_changed = false;
        state.posts.push((site_key(site), post));
        id
    }

    pub fn add_comment(&self, site: &Site, mut comment: Comment) -> RemoteId {
        let mut state = self.state.lock();
        let id = comment.remote_id.unwrap_or_else(|| state.allocate());
        comment.remote_id = Some(id);
        state.comments.push((site_key(site), comment));
        id
    }

    pub fn add_media(&self, site: &Site, mut media: Media) -> RemoteId {
        let mut state = self.state.lock();
        let id = media.remote_id.unwrap_or_else(|| state.allocate());
        media.remote_id = Some(id);
        media.upload_state = MediaUploadState::Uploaded;
        state.media.push((site_key(site), media));
        id
    }

    pub fn add_user(&self, username: &str, password: &str, account: Account) {
        let mut state = self.state.lock();
        state.users.insert(username.to_string(), password.to_string());
        state.account = Some(account);
    }

    pub fn add_site(&self, site: Site) {
        self.state.lock().sites.push(site);
    }

    pub fn set_api_version(&self, site: &Site, version: &str) {
        self.state
            .lock()
            .api_versions
            .insert(site_key(site), version.to_string());
    }

    pub fn set_settings(&self, site: &Site, settings: WcSettings) {
        self.state.lock().settings.insert(site_key(site), settings);
    }

    pub fn add_simple_site(&self, site: WcSimpleSite) {
        self.state.lock().simple_sites.push(site);
    }

    pub fn add_product(&self, site: &Site, product: Product) {
        self.state.lock().products.push((site_key(site), product));
    }

    pub fn add_variation(&self, site: &Site, variation: ProductVariation) {
        self.state.lock().variations.push((site_key(site), variation));
    }

    pub fn add_review(&self, site: &Site, review: ProductReview) {
        self.state.lock().reviews.push((site_key(site), review));
    }

    /// Unset stats are answered with an empty body
    pub fn set_post_stats(&self, site: &Site, post_id: RemoteId, stats: PostDetailStats) {
        self.state.lock().post_stats.insert((site_key(site), post_id), stats);
    }

    pub fn set_comment_insights(&self, site: &Site, insights: CommentInsights) {
        self.state.lock().comment_insights.insert(site_key(site), insights);
    }

    pub fn set_order_stats(&self, site: &Site, stats: OrderStatsV4) {
        self.state
            .lock()
            .order_stats
            .insert((site_key(site), stats.granularity), stats);
    }

    // ===== Inspection =====

    pub fn post_count(&self, site: &Site) -> usize {
        let key = site_key(site);
        self.state.lock().posts.iter().filter(|(s, _)| *s == key).count()
    }

    pub fn media_count(&self, site: &Site) -> usize {
        let key = site_key(site);
        self.state.lock().media.iter().filter(|(s, _)| *s == key).count()
    }

    fn not_found(kind: &str) -> NetworkError {
        NetworkError::api(format!("unknown_{kind}"), format!("{kind} not found"))
    }
}

#[async_trait]
impl PostClient for MockServer {
    async fn fetch_posts(
        &self,
        site: &Site,
        kind: PostKind,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Post>> {
        self.call("fetch_posts").await?;
        let key = site_key(site);
        let state = self.state.lock();
        let rows = state
            .posts
            .iter()
            .filter(|(s, p)| *s == key && p.kind == kind)
            .map(|(_, p)| p.clone());
        Ok(page(rows, offset, number))
    }

    async fn fetch_post(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<Post> {
        self.call("fetch_post").await?;
        let key = site_key(site);
        self.state
            .lock()
            .posts
            .iter()
            .find(|(s, p)| *s == key && p.remote_id == Some(remote_id))
            .map(|(_, p)| p.clone())
            .ok_or_else(|| Self::not_found("post"))
    }

    async fn push_post(&self, site: &Site, post: &Post) -> NetworkResult<Post> {
        self.call("push_post").await?;
        let key = site_key(site);
        let mut state = self.state.lock();
        let mut stored = post.clone();
        stored.is_locally_changed = false;
        match post.remote_id {
            Some(id) => {
                let row = state
                    .posts
                    .iter_mut()
                    .find(|(s, p)| *s == key && p.remote_id == Some(id))
                    .ok_or_else(|| Self::not_found("post"))?;
                row.1 = stored.clone();
            }
            None => {
                stored.remote_id = Some(state.allocate());
                if stored.status == "draft" {
                    stored.status = "publish".to_string();
                }
                state.posts.push((key, stored.clone()));
            }
        }
        Ok(stored)
    }

    async fn delete_post(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<()> {
        self.call("delete_post").await?;
        let key = site_key(site);
        let mut state = self.state.lock();
        let before = state.posts.len();
        state
            .posts
            .retain(|(s, p)| !(*s == key && p.remote_id == Some(remote_id)));
        if state.posts.len() == before {
            return Err(Self::not_found("post"));
        }
        Ok(())
    }

    async fn search_posts(
        &self,
        site: &Site,
        query: &str,
        kind: PostKind,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Post>> {
        self.call("search_posts").await?;
        let key = site_key(site);
        let needle = query.to_lowercase();
        let state = self.state.lock();
        let rows = state
            .posts
            .iter()
            .filter(|(s, p)| {
                *s == key
                    && p.kind == kind
                    && (p.title.to_lowercase().contains(&needle)
                        || p.content.to_lowercase().contains(&needle))
            })
            .map(|(_, p)| p.clone());
        Ok(page(rows, offset, number))
    }
}

#[async_trait]
impl CommentClient for MockServer {
    async fn fetch_comments(
        &self,
        site: &Site,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Comment>> {
        self.call("fetch_comments").await?;
        let key = site_key(site);
        let state = self.state.lock();
        let rows = state
            .comments
            .iter()
            .filter(|(s, _)| *s == key)
            .map(|(_, c)| c.clone());
        Ok(page(rows, offset, number))
    }

    async fn fetch_comment(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<Comment> {
        self.call("fetch_comment").await?;
        let key = site_key(site);
        self.state
            .lock()
            .comments
            .iter()
            .find(|(s, c)| *s == key && c.remote_id == Some(remote_id))
            .map(|(_, c)| c.clone())
            .ok_or_else(|| Self::not_found("comment"))
    }

    async fn push_comment(&self, site: &Site, comment: &Comment) -> NetworkResult<Comment> {
        self.call("push_comment").await?;
        let key = site_key(site);
        let mut state = self.state.lock();
        let mut stored = comment.clone();
        match comment.remote_id {
            Some(id) => {
                let row = state
                    .comments
                    .iter_mut()
                    .find(|(s, c)| *s == key && c.remote_id == Some(id))
                    .ok_or_else(|| Self::not_found("comment"))?;
                row.1 = stored.clone();
            }
            None => {
                stored.remote_id = Some(state.allocate());
                state.comments.push((key, stored.clone()));
            }
        }
        Ok(stored)
    }

    async fn delete_comment(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<()> {
        self.call("delete_comment").await?;
        let key = site_key(site);
        let mut state = self.state.lock();
        let before = state.comments.len();
        state
            .comments
            .retain(|(s, c)| !(*s == key && c.remote_id == Some(remote_id)));
        if state.comments.len() == before {
            return Err(Self::not_found("comment"));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaClient for MockServer {
    async fn fetch_media_list(
        &self,
        site: &Site,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Media>> {
        self.call("fetch_media_list").await?;
        let key = site_key(site);
        let state = self.state.lock();
        let rows = state
            .media
            .iter()
            .filter(|(s, _)| *s == key)
            .map(|(_, m)| m.clone());
        Ok(page(rows, offset, number))
    }

    async fn fetch_media(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<Media> {
        self.call("fetch_media").await?;
        let key = site_key(site);
        self.state
            .lock()
            .media
            .iter()
            .find(|(s, m)| *s == key && m.remote_id == Some(remote_id))
            .map(|(_, m)| m.clone())
            .ok_or_else(|| Self::not_found("media"))
    }

    async fn push_media(&self, site: &Site, media: &Media) -> NetworkResult<Media> {
        self.call("push_media").await?;
        let key = site_key(site);
        let mut state = self.state.lock();
        let row = state
            .media
            .iter_mut()
            .find(|(s, m)| *s == key && m.remote_id.is_some() && m.remote_id == media.remote_id)
            .ok_or_else(|| Self::not_found("media"))?;
        row.1.title = media.title.clone();
        row.1.caption = media.caption.clone();
        row.1.alt = media.alt.clone();
        Ok(row.1.clone())
    }

    async fn upload_media(&self, site: &Site, media: &Media) -> NetworkResult<Media> {
        let gate = self.upload_gate.lock().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| NetworkError::GenericNetwork("upload gate closed".into()))?;
            permit.forget();
        }
        self.call("upload_media").await?;

        let key = site_key(site);
        let mut state = self.state.lock();
        let mut stored = media.clone();
        let id = state.allocate();
        stored.remote_id = Some(id);
        stored.upload_state = MediaUploadState::Uploaded;
        stored.url = format!(
            "https://media.example/{}/{}",
            key,
            media.file_path.as_deref().unwrap_or_default()
        );
        state.media.push((key, stored.clone()));
        Ok(stored)
    }

    async fn delete_media(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<()> {
        self.call("delete_media").await?;
        let key = site_key(site);
        let mut state = self.state.lock();
        let before = state.media.len();
        state
            .media
            .retain(|(s, m)| !(*s == key && m.remote_id == Some(remote_id)));
        if state.media.len() == before {
            return Err(Self::not_found("media"));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountClient for MockServer {
    async fn authenticate(&self, username: &str, password: &str) -> NetworkResult<String> {
        self.call("authenticate").await?;
        let mut state = self.state.lock();
        if state.users.get(username).map(String::as_str) != Some(password) {
            return Err(NetworkError::Auth("incorrect username or password".into()));
        }
        let token = format!("token-{username}");
        state.token = Some(token.clone());
        Ok(token)
    }

    async fn fetch_account(&self, token: &str) -> NetworkResult<Account> {
        self.call("fetch_account").await?;
        let state = self.state.lock();
        if state.token.as_deref() != Some(token) {
            return Err(NetworkError::Auth("invalid token".into()));
        }
        state.account.clone().ok_or_else(|| Self::not_found("account"))
    }

    async fn push_username(
        &self,
        token: &str,
        username: &str,
        _action: UsernameAction,
    ) -> NetworkResult<()> {
        self.call("push_username").await?;
        let mut state = self.state.lock();
        if state.token.as_deref() != Some(token) {
            return Err(NetworkError::Auth("invalid token".into()));
        }
        if let Some(account) = state.account.as_mut() {
            account.username = username.to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl SiteClient for MockServer {
    async fn fetch_sites(&self) -> NetworkResult<Vec<Site>> {
        self.call("fetch_sites").await?;
        Ok(self.state.lock().sites.clone())
    }
}

#[async_trait]
impl WooCommerceClient for MockServer {
    async fn fetch_api_version(&self, site: &Site) -> NetworkResult<String> {
        self.call("fetch_api_version").await?;
        Ok(self
            .state
            .lock()
            .api_versions
            .get(&site_key(site))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_site_settings(&self, site: &Site) -> NetworkResult<Option<WcSettings>> {
        self.call("fetch_site_settings").await?;
        Ok(self.state.lock().settings.get(&site_key(site)).cloned())
    }

    async fn fetch_woo_simple_sites(&self) -> NetworkResult<Vec<WcSimpleSite>> {
        self.call("fetch_woo_simple_sites").await?;
        Ok(self.state.lock().simple_sites.clone())
    }
}

#[async_trait]
impl ProductClient for MockServer {
    async fn fetch_single_product(
        &self,
        site: &Site,
        remote_product_id: RemoteId,
    ) -> NetworkResult<Product> {
        self.call("fetch_single_product").await?;
        let key = site_key(site);
        self.state
            .lock()
            .products
            .iter()
            .find(|(s, p)| *s == key && p.remote_product_id == Some(remote_product_id))
            .map(|(_, p)| p.clone())
            .ok_or_else(|| Self::not_found("product"))
    }

    async fn fetch_single_product_variation(
        &self,
        site: &Site,
        remote_product_id: RemoteId,
        remote_variation_id: RemoteId,
    ) -> NetworkResult<ProductVariation> {
        self.call("fetch_single_product_variation").await?;
        let key = site_key(site);
        self.state
            .lock()
            .variations
            .iter()
            .find(|(s, v)| {
                *s == key
                    && v.remote_product_id == Some(remote_product_id)
                    && v.remote_variation_id == Some(remote_variation_id)
            })
            .map(|(_, v)| v.clone())
            .ok_or_else(|| Self::not_found("variation"))
    }

    async fn fetch_product_variations(
        &self,
        site: &Site,
        remote_product_id: RemoteId,
    ) -> NetworkResult<Vec<ProductVariation>> {
        self.call("fetch_product_variations").await?;
        let key = site_key(site);
        Ok(self
            .state
            .lock()
            .variations
            .iter()
            .filter(|(s, v)| *s == key && v.remote_product_id == Some(remote_product_id))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn fetch_product_reviews(
        &self,
        site: &Site,
        offset: usize,
        number: usize,
        product_ids: &[RemoteId],
        statuses: &[String],
    ) -> NetworkResult<Vec<ProductReview>> {
        self.call("fetch_product_reviews").await?;
        let key = site_key(site);
        let state = self.state.lock();
        let rows = state
            .reviews
            .iter()
            .filter(|(s, r)| {
                *s == key
                    && (product_ids.is_empty()
                        || r.remote_product_id.is_some_and(|id| product_ids.contains(&id)))
                    && (statuses.is_empty() || statuses.contains(&r.status))
            })
            .map(|(_, r)| r.clone());
        Ok(page(rows, offset, number))
    }

    async fn fetch_product_review(
        &self,
        site: &Site,
        remote_review_id: RemoteId,
    ) -> NetworkResult<ProductReview> {
        self.call("fetch_product_review").await?;
        let key = site_key(site);
        self.state
            .lock()
            .reviews
            .iter()
            .find(|(s, r)| *s == key && r.remote_review_id == Some(remote_review_id))
            .map(|(_, r)| r.clone())
            .ok_or_else(|| Self::not_found("review"))
    }

    async fn update_product_review_status(
        &self,
        site: &Site,
        remote_review_id: RemoteId,
        status: &str,
    ) -> NetworkResult<ProductReview> {
        self.call("update_product_review_status").await?;
        let key = site_key(site);
        let mut state = self.state.lock();
        let row = state
            .reviews
            .iter_mut()
            .find(|(s, r)| *s == key && r.remote_review_id == Some(remote_review_id))
            .ok_or_else(|| Self::not_found("review"))?;
        row.1.status = status.to_string();
        Ok(row.1.clone())
    }
}

#[async_trait]
impl StatsClient for MockServer {
    async fn fetch_post_stats(
        &self,
        site: &Site,
        post_id: RemoteId,
        _forced: bool,
    ) -> NetworkResult<Option<PostDetailStats>> {
        self.call("fetch_post_stats").await?;
        Ok(self.state.lock().post_stats.get(&(site_key(site), post_id)).cloned())
    }

    async fn fetch_comment_insights(
        &self,
        site: &Site,
        _forced: bool,
    ) -> NetworkResult<Option<CommentInsights>> {
        self.call("fetch_comment_insights").await?;
        Ok(self.state.lock().comment_insights.get(&site_key(site)).cloned())
    }

    async fn fetch_order_stats_v4(
        &self,
        site: &Site,
        granularity: StatsGranularity,
        _forced: bool,
    ) -> NetworkResult<Option<OrderStatsV4>> {
        self.call("fetch_order_stats_v4").await?;
        Ok(self
            .state
            .lock()
            .order_stats
            .get(&(site_key(site), granularity))
            .cloned())
    }
}
