//! Persisted records
//!
//! Every model carries its own `local_id` and, once synced, the id the
//! server assigned. Site-scoped models also carry `local_site_id`.

mod account;
mod comment;
mod media;
mod post;
mod site;
mod stats;
mod woocommerce;

pub use account::{Account, UsernameAction};
pub use comment::{Comment, CommentStatus};
pub use media::{Media, MediaUploadState};
pub use post::{Post, PostKind};
pub use site::Site;
pub use stats::{
    CommentAuthor, CommentInsights, CommentedPost, LimitMode, OrderStatsV4, PostDetailStats,
    RevenueInterval, RevenueTotals, StatsGranularity, WeekViews,
};
pub use woocommerce::{
    CurrencyPosition, Product, ProductAttribute, ProductReview, ProductVariation, WcSettings,
    WcSimpleSite,
};

/// Implements `Model` for a struct with `local_id` and `local_site_id` fields
macro_rules! site_scoped_model {
    ($model:ty, $remote:ident) => {
        impl fluxsync::Model for $model {
            fn local_id(&self) -> fluxsync::LocalId {
                self.local_id
            }

            fn set_local_id(&mut self, id: fluxsync::LocalId) {
                self.local_id = id;
            }

            fn remote_id(&self) -> Option<fluxsync::RemoteId> {
                self.$remote
            }

            fn local_site_id(&self) -> fluxsync::LocalId {
                self.local_site_id
            }
        }
    };
}

pub(crate) use site_scoped_model;
