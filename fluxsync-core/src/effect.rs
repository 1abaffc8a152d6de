//! What a slice hands back after reducing an action
//!
//! A reducer never performs I/O and never dispatches. It returns a
//! [`Reaction`]: whether state changed, the change events to publish, and
//! [`Effect`]s describing remote work. The owning [`Store`](crate::Store)
//! runs the effects after the state lock is released.
//!
//! ```ignore
//! fn reduce(&mut self, action: PostAction) -> Reaction<PostAction, PostChange> {
//!     match action {
//!         PostAction::FetchPost(payload) => {
//!             let client = self.client.clone();
//!             Reaction::unchanged().request(async move {
//!                 PostAction::FetchedPost(client.fetch_post(payload).await)
//!             })
//!         }
//!         PostAction::FetchedPost(result) => {
//!             // update rows
//!             Reaction::changed().emit(ChangeEvent::ok(PostActionType::FetchedPost, change))
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::action::Action;
use crate::event::ChangeEvent;
use crate::tasks::TaskKey;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Declarative side effect requested by a reducer
pub enum Effect<A> {
    /// Run `future` and dispatch the action it resolves to.
    /// A keyed request replaces any request still running under that key.
    Request {
        key: Option<TaskKey>,
        future: BoxFuture<A>,
    },
    /// Abort the request running under this key; its action is never dispatched
    Cancel(TaskKey),
}

impl<A> Effect<A> {
    pub fn request<F>(future: F) -> Self
    where
        F: Future<Output = A> + Send + 'static,
    {
        Effect::Request {
            key: None,
            future: Box::pin(future),
        }
    }

    pub fn keyed<F>(key: impl Into<TaskKey>, future: F) -> Self
    where
        F: Future<Output = A> + Send + 'static,
    {
        Effect::Request {
            key: Some(key.into()),
            future: Box::pin(future),
        }
    }

    pub fn cancel(key: impl Into<TaskKey>) -> Self {
        Effect::Cancel(key.into())
    }
}

impl<A> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Request { key, .. } => f.debug_struct("Request").field("key", key).finish(),
            Effect::Cancel(key) => f.debug_tuple("Cancel").field(key).finish(),
        }
    }
}

/// Result of reducing one action.
///
/// Contains the state change indicator, events to publish and effects to run.
pub struct Reaction<A: Action, C> {
    /// Whether the slice was modified by this action.
    pub changed: bool,
    /// Effects to be processed after the reduce.
    pub effects: Vec<Effect<A>>,
    /// Events to publish, in order.
    pub events: Vec<ChangeEvent<A::Type, C>>,
}

impl<A: Action, C: fmt::Debug> fmt::Debug for Reaction<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("changed", &self.changed)
            .field("effects", &self.effects)
            .field("events", &self.events)
            .finish()
    }
}

impl<A: Action, C> Default for Reaction<A, C> {
    fn default() -> Self {
        Self::unchanged()
    }
}

impl<A: Action, C> Reaction<A, C> {
    #[inline]
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            effects: Vec::new(),
            events: Vec::new(),
        }
    }

    #[inline]
    pub fn changed() -> Self {
        Self {
            changed: true,
            ..Self::unchanged()
        }
    }

    /// Add an effect to this result.
    #[inline]
    pub fn with(mut self, effect: Effect<A>) -> Self {
        self.effects.push(effect);
        self
    }

    /// Shorthand for `with(Effect::request(future))`
    #[inline]
    pub fn request<F>(self, future: F) -> Self
    where
        F: Future<Output = A> + Send + 'static,
    {
        self.with(Effect::request(future))
    }

    /// Queue a change event for publication.
    #[inline]
    pub fn emit(mut self, event: ChangeEvent<A::Type, C>) -> Self {
        self.events.push(event);
        self
    }

    #[inline]
    pub fn mark_changed(mut self) -> Self {
        self.changed = true;
        self
    }

    #[inline]
    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{Ping, PingType};

    #[test]
    fn test_reaction_builders() {
        let r: Reaction<Ping, ()> = Reaction::unchanged();
        assert!(!r.changed);
        assert!(!r.has_effects());
        assert!(r.events.is_empty());

        let r: Reaction<Ping, ()> = Reaction::changed();
        assert!(r.changed);
    }

    #[test]
    fn test_reaction_chaining() {
        let r: Reaction<Ping, u32> = Reaction::unchanged()
            .request(async { Ping::Echoed(1) })
            .with(Effect::cancel("upload-1"))
            .emit(ChangeEvent::ok(PingType::Echo, 1))
            .mark_changed();

        assert!(r.changed);
        assert!(r.has_effects());
        assert_eq!(r.effects.len(), 2);
        assert!(matches!(&r.effects[0], Effect::Request { key: None, .. }));
        assert!(matches!(&r.effects[1], Effect::Cancel(key) if key.name() == "upload-1"));
        assert_eq!(r.events, vec![ChangeEvent::ok(PingType::Echo, 1)]);
    }

    #[test]
    fn test_keyed_effect_debug() {
        let effect = Effect::keyed("upload-7", async { Ping::Hello(7) });
        let rendered = format!("{:?}", effect);
        assert!(rendered.contains("upload-7"));
    }
}
