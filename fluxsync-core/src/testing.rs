//! Test utilities for fluxsync applications
//!
//! - [`EventRecorder`]: a subscriber that records every action and change
//!   event it receives, and lets async tests wait for one to arrive
//! - [`TestHarness`]: a dispatcher with a recorder already registered
//! - Assertion macros for verifying recorded actions and events
//!
//! # Example
//!
//! ```ignore
//! use fluxsync::testing::TestHarness;
//!
//! let harness = TestHarness::<AppAction, Changed>::new();
//! harness.register(posts.clone());
//!
//! harness.dispatch(PostAction::FetchPosts(payload));
//! let event = harness
//!     .wait_for(|e| e.cause == AppActionType::Post(PostActionType::FetchedPosts))
//!     .await
//!     .expect("posts fetched");
//! assert!(event.error.is_none());
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::action::Action;
use crate::dispatcher::{Dispatcher, Interest, Subscriber, SubscriberError};
use crate::event::ChangeEvent;

/// How long [`TestHarness::wait_for`] waits by default
pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

struct Recorded<A: Action, D> {
    actions: Vec<A>,
    events: Vec<ChangeEvent<A::Type, D>>,
}

/// Subscriber that records what it receives
pub struct EventRecorder<A: Action, D> {
    interest: Interest<A::Type>,
    recorded: Mutex<Recorded<A, D>>,
    notify: Notify,
}

impl<A: Action, D> std::fmt::Debug for EventRecorder<A, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let recorded = self.recorded.lock();
        f.debug_struct("EventRecorder")
            .field("actions", &recorded.actions.len())
            .field("events", &recorded.events.len())
            .finish()
    }
}

impl<A: Action, D: Clone + Send + Sync> EventRecorder<A, D> {
    pub fn new(interest: Interest<A::Type>) -> Arc<Self> {
        Arc::new(Self {
            interest,
            recorded: Mutex::new(Recorded {
                actions: Vec::new(),
                events: Vec::new(),
            }),
            notify: Notify::new(),
        })
    }

    /// Record everything
    pub fn all() -> Arc<Self> {
        Self::new(Interest::All)
    }

    pub fn actions(&self) -> Vec<A> {
        self.recorded.lock().actions.clone()
    }

    pub fn events(&self) -> Vec<ChangeEvent<A::Type, D>> {
        self.recorded.lock().events.clone()
    }

    /// Recorded events with the given cause, in arrival order
    pub fn events_for(&self, cause: A::Type) -> Vec<ChangeEvent<A::Type, D>> {
        self.recorded
            .lock()
            .events
            .iter()
            .filter(|e| e.cause == cause)
            .cloned()
            .collect()
    }

    /// Take and clear the recorded events
    pub fn drain_events(&self) -> Vec<ChangeEvent<A::Type, D>> {
        std::mem::take(&mut self.recorded.lock().events)
    }

    pub fn clear(&self) {
        let mut recorded = self.recorded.lock();
        recorded.actions.clear();
        recorded.events.clear();
    }

    /// Wait until a recorded event matches `predicate`.
    ///
    /// Events recorded before the call count. Returns `None` on timeout.
    pub async fn wait_for(
        &self,
        predicate: impl Fn(&ChangeEvent<A::Type, D>) -> bool,
        timeout: Duration,
    ) -> Option<ChangeEvent<A::Type, D>> {
        self.wait_until(timeout, || {
            self.recorded.lock().events.iter().find(|&e| predicate(e)).cloned()
        })
        .await
    }

    /// Wait until at least `count` recorded events match `predicate`.
    /// Returns the matching events, or `None` on timeout.
    pub async fn wait_for_count(
        &self,
        count: usize,
        predicate: impl Fn(&ChangeEvent<A::Type, D>) -> bool,
        timeout: Duration,
    ) -> Option<Vec<ChangeEvent<A::Type, D>>> {
        self.wait_until(timeout, || {
            let matching: Vec<_> = self
                .recorded
                .lock()
                .events
                .iter()
                .filter(|&e| predicate(e))
                .cloned()
                .collect();
            (matching.len() >= count).then_some(matching)
        })
        .await
    }

    async fn wait_until<T>(&self, timeout: Duration, check: impl Fn() -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a record in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(found) = check() {
                return Some(found);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return check();
            }
        }
    }
}

impl<A, D> Subscriber<A, D> for EventRecorder<A, D>
where
    A: Action,
    D: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        "recorder"
    }

    fn interest(&self) -> Interest<A::Type> {
        self.interest.clone()
    }

    fn on_action(&self, action: &A, _: &Dispatcher<A, D>) -> Result<(), SubscriberError> {
        self.recorded.lock().actions.push(action.clone());
        self.notify.notify_waiters();
        Ok(())
    }

    fn on_change(
        &self,
        event: &ChangeEvent<A::Type, D>,
        _: &Dispatcher<A, D>,
    ) -> Result<(), SubscriberError> {
        self.recorded.lock().events.push(event.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

/// A dispatcher with an [`EventRecorder`] registered first
///
/// The recorder is registered before any store, so it sees every action
/// before the stores do and every event the stores publish.
pub struct TestHarness<A: Action, D> {
    pub dispatcher: Dispatcher<A, D>,
    pub recorder: Arc<EventRecorder<A, D>>,
}

impl<A, D> Default for TestHarness<A, D>
where
    A: Action,
    D: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, D> TestHarness<A, D>
where
    A: Action,
    D: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_dispatcher(Dispatcher::new())
    }

    pub fn with_dispatcher(dispatcher: Dispatcher<A, D>) -> Self {
        let recorder = EventRecorder::all();
        // A fresh recorder cannot already be registered
        let _ = dispatcher.register(recorder.clone());
        Self {
            dispatcher,
            recorder,
        }
    }

    /// Register a subscriber, panicking if it already is
    pub fn register<S: Subscriber<A, D> + 'static>(&self, subscriber: Arc<S>) -> Arc<S> {
        if let Err(err) = self.dispatcher.register(subscriber.clone()) {
            panic!("{err}");
        }
        subscriber
    }

    pub fn dispatch(&self, action: impl Into<A>) -> usize {
        self.dispatcher.dispatch(action)
    }

    pub fn actions(&self) -> Vec<A> {
        self.recorder.actions()
    }

    pub fn events(&self) -> Vec<ChangeEvent<A::Type, D>> {
        self.recorder.events()
    }

    pub fn drain_events(&self) -> Vec<ChangeEvent<A::Type, D>> {
        self.recorder.drain_events()
    }

    /// Wait up to [`DEFAULT_WAIT`] for a matching event
    pub fn wait_for<'a>(
        &'a self,
        predicate: impl Fn(&ChangeEvent<A::Type, D>) -> bool + 'a,
    ) -> impl Future<Output = Option<ChangeEvent<A::Type, D>>> + 'a {
        self.recorder.wait_for(predicate, DEFAULT_WAIT)
    }
}

/// Assert that an action or event matching a pattern was recorded.
///
/// # Example
///
/// ```ignore
/// use fluxsync::assert_emitted;
///
/// assert_emitted!(harness.actions(), AppAction::Post(PostAction::FetchPosts(_)));
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {{
        let recorded = $actions;
        assert!(
            recorded.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected item matching `{}` to be recorded, but got: {:?}",
            stringify!($pattern),
            recorded
        );
    }};
}

/// Assert that nothing matching a pattern was recorded.
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {{
        let recorded = $actions;
        assert!(
            !recorded.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected item matching `{}` NOT to be recorded, but it was: {:?}",
            stringify!($pattern),
            recorded
        );
    }};
}

/// Find and return the first recorded item matching a pattern.
///
/// # Example
///
/// ```ignore
/// let events = harness.events();
/// let fetched = find_emitted!(events, ChangeEvent { error: None, .. });
/// ```
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count how many recorded items match a pattern.
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}


#[cfg(test)]
mod tests {
    use super::fixtures::{App, AppType, Ping, PingType, Pong};
    use super::*;

    #[tokio::test]
    async fn test_recorder_waits_for_late_event() {
        let harness = TestHarness::<App, u32>::new();
        let dispatcher = harness.dispatcher.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            dispatcher.publish(ChangeEvent::ok(AppType::Ping(PingType::Echoed), 5));
        });

        let event = harness
            .wait_for(|e| e.cause == AppType::Ping(PingType::Echoed))
            .await
            .expect("event published");
        assert_eq!(event.data, Some(5));
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let recorder = EventRecorder::<App, u32>::all();
        let found = recorder
            .wait_for(|_| true, Duration::from_millis(20))
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_count_sees_earlier_events() {
        let harness = TestHarness::<App, u32>::new();
        for n in 0..3 {
            harness
                .dispatcher
                .publish(ChangeEvent::ok(AppType::Ping(PingType::Hello), n));
        }

        let events = harness
            .recorder
            .wait_for_count(3, |e| e.cause == AppType::Ping(PingType::Hello), DEFAULT_WAIT)
            .await
            .expect("three events");
        assert_eq!(events.len(), 3);
        assert_eq!(harness.recorder.events_for(AppType::Ping(PingType::Hello)).len(), 3);
        assert_eq!(harness.drain_events().len(), 3);
        assert!(harness.events().is_empty());
    }

    #[test]
    fn test_assert_macros() {
        let harness = TestHarness::<App, u32>::new();
        harness.dispatch(Ping::Hello(42));
        harness.dispatch(Pong::Serve);
        let actions = harness.actions();

        assert_emitted!(&actions, App::Ping(Ping::Hello(42)));
        assert_emitted!(&actions, App::Ping(Ping::Hello(n)) if *n > 40);
        assert_not_emitted!(&actions, App::Pong(Pong::Reset));

        assert!(find_emitted!(actions, App::Pong(_)).is_some());
        assert_eq!(count_emitted!(actions, App::Ping(_)), 1);
    }
}
