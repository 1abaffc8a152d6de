//! Network collaborators, one trait per domain
//!
//! Implementations execute a single request and complete with the decoded
//! result. They never touch store state; the owning store turns the result
//! into a response action.

use async_trait::async_trait;
use fluxsync::{NetworkError, RemoteId};

use crate::model::{
    Account, Comment, CommentInsights, Media, OrderStatsV4, Post, PostDetailStats, PostKind,
    Product, ProductReview, ProductVariation, Site, StatsGranularity, UsernameAction, WcSettings,
    WcSimpleSite,
};

pub type NetworkResult<T> = Result<T, NetworkError>;

#[async_trait]
pub trait PostClient: Send + Sync {
    async fn fetch_posts(
        &self,
        site: &Site,
        kind: PostKind,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Post>>;

    async fn fetch_post(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<Post>;

    /// Create or update; returns the post as the server stored it
    async fn push_post(&self, site: &Site, post: &Post) -> NetworkResult<Post>;

    async fn delete_post(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<()>;

    async fn search_posts(
        &self,
        site: &Site,
        query: &str,
        kind: PostKind,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Post>>;
}

#[async_trait]
pub trait CommentClient: Send + Sync {
    async fn fetch_comments(
        &self,
        site: &Site,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Comment>>;

    async fn fetch_comment(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<Comment>;

    async fn push_comment(&self, site: &Site, comment: &Comment) -> NetworkResult<Comment>;

    async fn delete_comment(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<()>;
}

#[async_trait]
pub trait MediaClient: Send + Sync {
    async fn fetch_media_list(
        &self,
        site: &Site,
        offset: usize,
        number: usize,
    ) -> NetworkResult<Vec<Media>>;

    async fn fetch_media(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<Media>;

    /// Update metadata (title, caption, alt) of uploaded media
    async fn push_media(&self, site: &Site, media: &Media) -> NetworkResult<Media>;

    /// Send the file at `media.file_path`; returns the server's record
    async fn upload_media(&self, site: &Site, media: &Media) -> NetworkResult<Media>;

    async fn delete_media(&self, site: &Site, remote_id: RemoteId) -> NetworkResult<()>;
}

#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Exchange credentials for an access token
    async fn authenticate(&self, username: &str, password: &str) -> NetworkResult<String>;

    async fn fetch_account(&self, token: &str) -> NetworkResult<Account>;

    async fn push_username(
        &self,
        token: &str,
        username: &str,
        action: UsernameAction,
    ) -> NetworkResult<()>;
}

#[async_trait]
pub trait SiteClient: Send + Sync {
    async fn fetch_sites(&self) -> NetworkResult<Vec<Site>>;
}

#[async_trait]
pub trait WooCommerceClient: Send + Sync {
    /// Highest supported WooCommerce API namespace, e.g. `wc/v3`.
    /// Empty when the site has no WooCommerce API.
    async fn fetch_api_version(&self, site: &Site) -> NetworkResult<String>;

    async fn fetch_site_settings(&self, site: &Site) -> NetworkResult<Option<WcSettings>>;

    async fn fetch_woo_simple_sites(&self) -> NetworkResult<Vec<WcSimpleSite>>;
}

#[async_trait]
pub trait ProductClient: Send + Sync {
    async fn fetch_single_product(
        &self,
        site: &Site,
        remote_product_id: RemoteId,
    ) -> NetworkResult<Product>;

    async fn fetch_single_product_variation(
        &self,
        site: &Site,
        remote_product_id: RemoteId,
        remote_variation_id: RemoteId,
    ) -> NetworkResult<ProductVariation>;

    async fn fetch_product_variations(
        &self,
        site: &Site,
        remote_product_id: RemoteId,
    ) -> NetworkResult<Vec<ProductVariation>>;

    /// `statuses` is sent as a comma separated filter; empty means `all`
    async fn fetch_product_reviews(
        &self,
        site: &Site,
        offset: usize,
        number: usize,
        product_ids: &[RemoteId],
        statuses: &[String],
    ) -> NetworkResult<Vec<ProductReview>>;

    async fn fetch_product_review(
        &self,
        site: &Site,
        remote_review_id: RemoteId,
    ) -> NetworkResult<ProductReview>;

    async fn update_product_review_status(
        &self,
        site: &Site,
        remote_review_id: RemoteId,
        status: &str,
    ) -> NetworkResult<ProductReview>;
}

/// Stats endpoints answer `None` when the body could not be decoded
#[async_trait]
pub trait StatsClient: Send + Sync {
    /// `forced` asks the server to skip its own cache
    async fn fetch_post_stats(
        &self,
        site: &Site,
        post_id: RemoteId,
        forced: bool,
    ) -> NetworkResult<Option<PostDetailStats>>;

    async fn fetch_comment_insights(
        &self,
        site: &Site,
        forced: bool,
    ) -> NetworkResult<Option<CommentInsights>>;

    async fn fetch_order_stats_v4(
        &self,
        site: &Site,
        granularity: StatsGranularity,
        forced: bool,
    ) -> NetworkResult<Option<OrderStatsV4>>;
}
