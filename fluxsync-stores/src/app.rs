//! Application-wide action stream and store wiring
//!
//! Every domain action converts into [`AppAction`], and every domain change
//! into [`Changed`], so callers hold one dispatcher and observe one event type.

use std::sync::Arc;
use std::time::Duration;

use fluxsync::{Action, ActionSummary, ChangeEvent, DispatchError, Dispatcher, Store};
use tokio::runtime::Handle;
use tracing::info;

use crate::account::{AccountAction, AccountChange, AccountSession};
use crate::client::{
    AccountClient, CommentClient, MediaClient, PostClient, ProductClient, SiteClient,
    StatsClient, WooCommerceClient,
};
use crate::comment::{CommentAction, CommentChange, Comments};
use crate::config::SyncConfig;
use crate::media::{MediaAction, MediaChange, MediaLibrary};
use crate::mock::MockServer;
use crate::post::{PostAction, PostChange, Posts};
use crate::site::{SiteAction, SiteChange, Sites};
use crate::stats::{SiteStats, StatsAction, StatsChange};
use crate::wc_core::{WcCoreAction, WcCoreChange, WooCommerce};
use crate::wc_product::{Products, WcProductAction, WcProductChange};

#[derive(Action, Clone, Debug, PartialEq)]
#[action(compose)]
pub enum AppAction {
    Post(PostAction),
    Comment(CommentAction),
    Media(MediaAction),
    Account(AccountAction),
    Site(SiteAction),
    WcCore(WcCoreAction),
    WcProduct(WcProductAction),
    Stats(StatsAction),
}

/// Change data of every store
#[derive(Debug, Clone, PartialEq)]
pub enum Changed {
    Post(PostChange),
    Comment(CommentChange),
    Media(MediaChange),
    Account(AccountChange),
    Site(SiteChange),
    WcCore(WcCoreChange),
    WcProduct(WcProductChange),
    Stats(StatsChange),
}

macro_rules! impl_from_change {
    ($($change:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$change> for Changed {
                fn from(change: $change) -> Self {
                    Changed::$variant(change)
                }
            }
        )*
    };
}

impl_from_change! {
    PostChange => Post,
    CommentChange => Comment,
    MediaChange => Media,
    AccountChange => Account,
    SiteChange => Site,
    WcCoreChange => WcCore,
    WcProductChange => WcProduct,
    StatsChange => Stats,
}

impl ActionSummary for AppAction {
    fn summary(&self) -> String {
        use crate::account::AccountAction as Acc;
        use crate::media::MediaAction as M;
        use crate::post::PostAction as P;

        match self {
            AppAction::Account(Acc::UpdateAccessToken(_)) => "UpdateAccessToken".to_string(),
            AppAction::Account(Acc::Authenticated(p)) => format!(
                "Authenticated {{ username: {:?}, ok: {} }}",
                p.username,
                p.result.is_ok()
            ),
            AppAction::Post(P::FetchedPosts(p)) => format!(
                "FetchedPosts {{ site: {}, kind: {}, count: {} }}",
                p.site.local_id,
                p.kind.as_str(),
                p.result.as_ref().map_or(0, Vec::len)
            ),
            AppAction::Post(P::UpdatePost(post)) => {
                format!("UpdatePost {{ local_id: {} }}", post.local_id)
            }
            AppAction::Media(M::UploadMedia(p)) => format!(
                "UploadMedia {{ local_id: {}, file: {:?} }}",
                p.media.local_id, p.media.file_path
            ),
            AppAction::Media(M::UploadedMedia(p)) => format!(
                "UploadedMedia {{ local_id: {}, ok: {} }}",
                p.media.local_id,
                p.result.is_ok()
            ),
            AppAction::Media(M::FetchedMediaList(p)) => format!(
                "FetchedMediaList {{ site: {}, count: {} }}",
                p.site.local_id,
                p.result.as_ref().map_or(0, Vec::len)
            ),
            other => format!("{:?}", other),
        }
    }
}

pub type AppDispatcher = Dispatcher<AppAction, Changed>;
pub type AppEvent = ChangeEvent<AppActionType, Changed>;

pub type PostStore = Store<Posts, AppAction, Changed>;
pub type CommentStore = Store<Comments, AppAction, Changed>;
pub type MediaStore = Store<MediaLibrary, AppAction, Changed>;
pub type AccountStore = Store<AccountSession, AppAction, Changed>;
pub type SiteStore = Store<Sites, AppAction, Changed>;
pub type WooCommerceStore = Store<WooCommerce, AppAction, Changed>;
pub type ProductStore = Store<Products, AppAction, Changed>;
pub type StatsStore = Store<SiteStats, AppAction, Changed>;

/// Network collaborators for every store
#[derive(Clone)]
pub struct Clients {
    pub posts: Arc<dyn PostClient>,
    pub comments: Arc<dyn CommentClient>,
    pub media: Arc<dyn MediaClient>,
    pub account: Arc<dyn AccountClient>,
    pub sites: Arc<dyn SiteClient>,
    pub woocommerce: Arc<dyn WooCommerceClient>,
    pub products: Arc<dyn ProductClient>,
    pub stats: Arc<dyn StatsClient>,
}

impl Clients {
    /// Back every store with the same in-memory server
    pub fn mock(server: Arc<MockServer>) -> Self {
        Self {
            posts: server.clone(),
            comments: server.clone(),
            media: server.clone(),
            account: server.clone(),
            sites: server.clone(),
            woocommerce: server.clone(),
            products: server.clone(),
            stats: server,
        }
    }
}

/// One store per domain, ready to register on an [`AppDispatcher`]
#[derive(Debug)]
pub struct SyncStores {
    pub posts: Arc<PostStore>,
    pub comments: Arc<CommentStore>,
    pub media: Arc<MediaStore>,
    pub account: Arc<AccountStore>,
    pub sites: Arc<SiteStore>,
    pub woocommerce: Arc<WooCommerceStore>,
    pub products: Arc<ProductStore>,
    pub stats: Arc<StatsStore>,
}

impl SyncStores {
    pub fn new(clients: Clients, config: &SyncConfig, runtime: Handle) -> Self {
        Self {
            posts: Arc::new(Store::new(
                Posts::new(clients.posts, config.posts_per_fetch),
                runtime.clone(),
            )),
            comments: Arc::new(Store::new(
                Comments::new(clients.comments, config.comments_per_fetch),
                runtime.clone(),
            )),
            media: Arc::new(Store::new(
                MediaLibrary::new(clients.media, config.media_per_fetch),
                runtime.clone(),
            )),
            account: Arc::new(Store::new(AccountSession::new(clients.account), runtime.clone())),
            sites: Arc::new(Store::new(Sites::new(clients.sites), runtime.clone())),
            woocommerce: Arc::new(Store::new(
                WooCommerce::new(clients.woocommerce),
                runtime.clone(),
            )),
            products: Arc::new(Store::new(
                Products::new(clients.products, config.reviews_per_fetch),
                runtime.clone(),
            )),
            stats: Arc::new(Store::new(
                SiteStats::new(clients.stats, Duration::from_secs(config.stats_max_age_secs)),
                runtime,
            )),
        }
    }

    /// Register every store, in domain order
    pub fn register(&self, dispatcher: &AppDispatcher) -> Result<(), DispatchError> {
        dispatcher.register(self.posts.clone())?;
        dispatcher.register(self.comments.clone())?;
        dispatcher.register(self.media.clone())?;
        dispatcher.register(self.account.clone())?;
        dispatcher.register(self.sites.clone())?;
        dispatcher.register(self.woocommerce.clone())?;
        dispatcher.register(self.products.clone())?;
        dispatcher.register(self.stats.clone())?;
        info!(stores = 8, "stores registered");
        Ok(())
    }

    /// Abort every request still running in any store.
    ///
    /// Uploads are cancelled through the media reducer first, so each one
    /// still ends with a `Canceled` event.
    pub fn cancel_all(&self, dispatcher: &AppDispatcher) {
        dispatcher.dispatch(MediaAction::CancelAllUploads);
        self.posts.cancel_all();
        self.comments.cancel_all();
        self.media.cancel_all();
        self.account.cancel_all();
        self.sites.cancel_all();
        self.woocommerce.cancel_all();
        self.products.cancel_all();
        self.stats.cancel_all();
    }
}
