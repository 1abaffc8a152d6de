//! fluxsync: Flux-style action dispatch for offline-capable data layers
//!
//! One dispatcher, many domain stores. Callers dispatch actions, stores own
//! their state and publish change events, and remote work re-enters only as
//! dispatched response actions.
//!
//! # Example
//! ```ignore
//! use fluxsync::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum PostAction {
//!     FetchPosts(FetchPostsPayload),
//!     FetchedPosts(FetchedPostsPayload),
//!     UpdatePost(Post),
//! }
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(compose)]
//! enum AppAction {
//!     Post(PostAction),
//! }
//!
//! let dispatcher: Dispatcher<AppAction, Changed> = Dispatcher::new();
//! dispatcher.register(Arc::new(Store::new(Posts::new(client), Handle::current())))?;
//! dispatcher.dispatch(PostAction::UpdatePost(post));
//! ```

// Re-export everything from core
pub use fluxsync_core::*;

// Re-export derive macros
pub use fluxsync_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use fluxsync_core::{Action, ActionKind, ActionSummary, ActionType, Nested, Slice};

    // Dispatch
    pub use fluxsync_core::{
        ComposedMiddleware, DispatchError, Dispatcher, Interest, LoggingMiddleware, Middleware,
        NoopMiddleware, Subscriber, SubscriberError,
    };

    // Stores
    pub use fluxsync_core::{Effect, Reaction, Store, TaskKey};
    pub use fluxsync_core::{LocalId, MemoryTable, Model, Persistence, RemoteId};

    // Events
    pub use fluxsync_core::{ChangeError, ChangeEvent, ErrorKind, NetworkError};

    // Debug
    pub use fluxsync_core::debug::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};

    // Derive macros
    pub use fluxsync_macros::Action;
}
