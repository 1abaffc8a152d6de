//! Domain stores for a WordPress/WooCommerce data layer built on fluxsync
//!
//! Each domain gets an action enum, a change enum, a client trait and a
//! [`Slice`](fluxsync::Slice) holding its records. [`app`] composes them into
//! one [`AppAction`](app::AppAction) stream and wires every store onto a
//! single dispatcher.
//!
//! # Example
//! ```no_run
//! use fluxsync_stores::app::{AppDispatcher, Clients, SyncStores};
//! use fluxsync_stores::mock::MockServer;
//! use fluxsync_stores::model::{Post, PostKind, Site};
//! use fluxsync_stores::post::PostAction;
//! use fluxsync_stores::SyncConfig;
//!
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::default();
//! let dispatcher = AppDispatcher::with_middleware(config.action_logger());
//! let stores = SyncStores::new(Clients::mock(MockServer::new()), &config, tokio::runtime::Handle::current());
//! stores.register(&dispatcher)?;
//!
//! let site = Site::new(1, "https://example.com", "Example");
//! dispatcher.dispatch(PostAction::UpdatePost(Post::draft(site.local_id, PostKind::Post)));
//! assert_eq!(stores.posts.read(|p| p.len()), 1);
//! # Ok(()) }
//! ```

pub mod account;
pub mod app;
pub mod client;
pub mod comment;
pub mod config;
pub mod error;
pub mod media;
pub mod mock;
pub mod model;
pub mod post;
pub mod site;
pub mod stats;
pub mod wc_core;
pub mod wc_product;

pub use config::SyncConfig;
pub use error::{ConfigError, Result};
pub use wc_core::format_currency_for_display;

#[cfg(test)]
pub(crate) mod test_util {
    use std::collections::VecDeque;

    use fluxsync::{Action, ChangeEvent, Effect, LocalId, RemoteId, Slice};

    use crate::model::Site;

    /// Reduce `action`, then run every requested effect to completion and
    /// feed the responses back in order. Cancels are ignored.
    pub(crate) async fn settle<S: Slice>(
        slice: &mut S,
        action: S::Action,
    ) -> Vec<ChangeEvent<<S::Action as Action>::Type, S::Change>> {
        let mut queue = VecDeque::from([action]);
        let mut events = Vec::new();
        while let Some(action) = queue.pop_front() {
            let reaction = slice.reduce(action);
            events.extend(reaction.events);
            for effect in reaction.effects {
                if let Effect::Request { future, .. } = effect {
                    queue.push_back(future.await);
                }
            }
        }
        events
    }

    pub(crate) fn test_site(n: u64) -> Site {
        Site {
            local_id: LocalId(n),
            site_id: Some(RemoteId(1000 + n as i64)),
            url: format!("https://site{n}.example"),
            name: format!("Site {n}"),
            ..Default::default()
        }
    }
}
