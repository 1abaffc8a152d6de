//! Core traits and types for fluxsync
//!
//! This crate provides the foundational abstractions for a Flux-style data
//! layer: a single dispatcher fans actions out to domain stores, stores
//! mutate their own state and publish change events, and remote work runs on
//! the async runtime and re-enters only as a dispatched response action.
//!
//! # Core Concepts
//!
//! - **Action**: an immutable message; one enum per domain, composed into an
//!   application-wide enum
//! - **Dispatcher**: synchronous, ordered, re-entrant delivery to subscribers
//! - **Store**: a [`Slice`] (state + reducer) registered as a subscriber
//! - **ChangeEvent**: what observers receive after a store handled an action
//!
//! # Request/Response Pattern
//!
//! Remote operations come in pairs. The request's reducer returns an
//! [`Effect`] that runs on the runtime; its output is the response action,
//! which is dispatched like any other:
//!
//! ```ignore
//! fn reduce(&mut self, action: PostAction) -> Reaction<PostAction, PostChange> {
//!     match action {
//!         PostAction::FetchPost(payload) => {
//!             let client = self.client.clone();
//!             Reaction::unchanged().request(async move {
//!                 let result = client.fetch_post(&payload.site, payload.remote_id).await;
//!                 PostAction::FetchedPost(FetchedPostPayload { payload, result })
//!             })
//!         }
//!         PostAction::FetchedPost(response) => {
//!             // merge into persistence, then
//!             Reaction::changed().emit(ChangeEvent::ok(PostActionType::FetchedPost, change))
//!         }
//!     }
//! }
//! ```
//!
//! Responses carry a past-tense name (`FetchedPost`), which is how
//! `#[derive(Action)]` tells them apart from requests.

pub mod action;
pub mod debug;
pub mod dispatcher;
pub mod effect;
pub mod event;
pub mod middleware;
pub mod persistence;
pub mod runtime;
pub mod store;
pub mod tasks;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionKind, ActionSummary, ActionType, Nested};

// Dispatcher exports
pub use dispatcher::{
    DispatchError, Dispatcher, Interest, Subscriber, SubscriberError, SubscriberId,
};
pub use middleware::{ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware};
pub use runtime::ActionQueue;

// Event exports
pub use event::{ChangeError, ChangeEvent, ErrorKind, NetworkError};

// Store exports
pub use effect::{BoxFuture, Effect, Reaction};
pub use store::{Slice, Store};
pub use tasks::{TaskKey, TaskManager};

// Persistence exports
pub use persistence::{LocalId, MemoryTable, Model, Persistence, RemoteId};

// Testing exports
pub use testing::{EventRecorder, TestHarness};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionKind, ActionSummary, ActionType, Nested};
    pub use crate::dispatcher::{Dispatcher, Interest, Subscriber, SubscriberError};
    pub use crate::effect::{Effect, Reaction};
    pub use crate::event::{ChangeError, ChangeEvent, ErrorKind, NetworkError};
    pub use crate::middleware::{ComposedMiddleware, LoggingMiddleware, Middleware};
    pub use crate::persistence::{LocalId, MemoryTable, Model, Persistence, RemoteId};
    pub use crate::store::{Slice, Store};
    pub use crate::tasks::TaskKey;
}
