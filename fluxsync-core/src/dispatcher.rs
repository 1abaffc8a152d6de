//! Central dispatcher delivering actions and change events to subscribers
//!
//! Delivery is synchronous and in registration order. Entry into the
//! delivery loop is serialized: a dispatch from another thread waits until
//! the current one finishes, while a dispatch issued from inside a delivery
//! callback on the same thread runs to completion immediately (depth-first).

use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use thiserror::Error;
use tracing::{trace, warn};

use crate::action::{Action, ActionType};
use crate::event::ChangeEvent;
use crate::middleware::{Middleware, NoopMiddleware};

/// Which action types a subscriber wants to receive
///
/// Matched against the action's type on `dispatch` and against the event's
/// `cause` on `publish`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interest<T: std::hash::Hash + Eq> {
    /// Everything
    All,
    /// Every type in the listed domains
    Domains(Vec<&'static str>),
    /// Exactly these types
    Types(HashSet<T>),
}

impl<T: ActionType> Interest<T> {
    pub fn domain(domain: &'static str) -> Self {
        Interest::Domains(vec![domain])
    }

    pub fn types(types: impl IntoIterator<Item = T>) -> Self {
        Interest::Types(types.into_iter().collect())
    }

    pub fn matches(&self, ty: &T) -> bool {
        match self {
            Interest::All => true,
            Interest::Domains(domains) => domains.contains(&ty.domain()),
            Interest::Types(types) => types.contains(ty),
        }
    }
}

/// Failure raised by a subscriber while handling a delivery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriberError {
    #[error("{0}")]
    Failed(String),

    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

impl SubscriberError {
    pub fn msg(message: impl fmt::Display) -> Self {
        SubscriberError::Failed(message.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("subscriber `{0}` is already registered")]
    AlreadyRegistered(String),
}

/// Handle returned by [`Dispatcher::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Receiver of dispatched actions and published change events
///
/// Stores and UI observers implement this. Both callbacks default to doing
/// nothing, so observers only implement what they need. Returning an error
/// (or panicking) never stops delivery to other subscribers.
pub trait Subscriber<A: Action, D>: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "subscriber"
    }

    /// Captured once, at registration
    fn interest(&self) -> Interest<A::Type> {
        Interest::All
    }

    fn on_action(&self, _action: &A, _dispatcher: &Dispatcher<A, D>) -> Result<(), SubscriberError> {
        Ok(())
    }

    fn on_change(
        &self,
        _event: &ChangeEvent<A::Type, D>,
        _dispatcher: &Dispatcher<A, D>,
    ) -> Result<(), SubscriberError> {
        Ok(())
    }
}

struct Entry<A: Action, D> {
    id: SubscriberId,
    subscriber: Arc<dyn Subscriber<A, D>>,
    interest: Interest<A::Type>,
}

impl<A: Action, D> Clone for Entry<A, D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            subscriber: self.subscriber.clone(),
            interest: self.interest.clone(),
        }
    }
}

struct Inner<A: Action, D> {
    subscribers: RwLock<Vec<Entry<A, D>>>,
    delivery: ReentrantMutex<()>,
    middleware: Mutex<Box<dyn Middleware<A>>>,
    next_id: AtomicU64,
}

/// The central bus
///
/// Cheap to clone; all clones share the same subscriber set. Generic over:
/// - `A`: the action type (usually a composed application action)
/// - `D`: the data carried by change events
pub struct Dispatcher<A: Action, D> {
    inner: Arc<Inner<A, D>>,
}

impl<A: Action, D> Clone for Dispatcher<A, D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Action, D: 'static> fmt::Debug for Dispatcher<A, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl<A: Action, D: 'static> Default for Dispatcher<A, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action, D: 'static> Dispatcher<A, D> {
    pub fn new() -> Self {
        Self::with_middleware(NoopMiddleware)
    }

    pub fn with_middleware<M: Middleware<A> + 'static>(middleware: M) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(Vec::new()),
                delivery: ReentrantMutex::new(()),
                middleware: Mutex::new(Box::new(middleware)),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Add a subscriber to the delivery set
    ///
    /// Identity is the `Arc` allocation: registering the same subscriber
    /// twice fails and leaves the set untouched.
    pub fn register<S>(&self, subscriber: Arc<S>) -> Result<SubscriberId, DispatchError>
    where
        S: Subscriber<A, D> + 'static,
    {
        let subscriber: Arc<dyn Subscriber<A, D>> = subscriber;
        let mut subscribers = self.inner.subscribers.write();
        if subscribers
            .iter()
            .any(|entry| same_subscriber(&entry.subscriber, &subscriber))
        {
            return Err(DispatchError::AlreadyRegistered(subscriber.name().to_string()));
        }

        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        trace!(subscriber = %subscriber.name(), id = id.0, "registered");
        subscribers.push(Entry {
            id,
            interest: subscriber.interest(),
            subscriber,
        });
        Ok(id)
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unregister<S>(&self, subscriber: &Arc<S>) -> bool
    where
        S: Subscriber<A, D> + 'static,
    {
        let subscriber: Arc<dyn Subscriber<A, D>> = subscriber.clone();
        self.remove_where(|entry| same_subscriber(&entry.subscriber, &subscriber))
    }

    /// Remove a subscriber by the id `register` returned
    pub fn unregister_id(&self, id: SubscriberId) -> bool {
        self.remove_where(|entry| entry.id == id)
    }

    fn remove_where(&self, predicate: impl Fn(&Entry<A, D>) -> bool) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|entry| !predicate(entry));
        before != subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an action to every interested subscriber, in registration order
    ///
    /// Returns once every subscriber has been invoked, including any nested
    /// dispatches they issued. Returns the number of subscribers reached.
    pub fn dispatch(&self, action: impl Into<A>) -> usize {
        let action = action.into();
        let _serial = self.inner.delivery.lock();

        self.inner.middleware.lock().before(&action);

        let ty = action.action_type();
        let targets = self.targets(|interest| interest.matches(&ty));
        if targets.is_empty() {
            trace!(action = %action.name(), "no interested subscriber, action dropped");
        }

        for entry in &targets {
            trace!(action = %action.name(), subscriber = %entry.subscriber.name(), "deliver");
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.subscriber.on_action(&action, self)
            }));
            report(entry, action.name(), outcome);
        }

        self.inner.middleware.lock().after(&action, targets.len());
        targets.len()
    }

    /// Deliver a change event to every subscriber interested in its cause
    pub fn publish(&self, event: ChangeEvent<A::Type, D>) -> usize {
        let _serial = self.inner.delivery.lock();

        let targets = self.targets(|interest| interest.matches(&event.cause));
        for entry in &targets {
            trace!(
                cause = %event.cause.name(),
                error = event.is_error(),
                subscriber = %entry.subscriber.name(),
                "publish"
            );
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.subscriber.on_change(&event, self)
            }));
            report(entry, event.cause.name(), outcome);
        }
        targets.len()
    }

    /// Snapshot of matching entries; the lock is released before delivery so
    /// subscribers may register, unregister or dispatch while being called.
    fn targets(&self, matches: impl Fn(&Interest<A::Type>) -> bool) -> Vec<Entry<A, D>> {
        self.inner
            .subscribers
            .read()
            .iter()
            .filter(|entry| matches(&entry.interest))
            .cloned()
            .collect()
    }
}

fn same_subscriber<A: Action, D>(
    a: &Arc<dyn Subscriber<A, D>>,
    b: &Arc<dyn Subscriber<A, D>>,
) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

fn report<A: Action, D>(
    entry: &Entry<A, D>,
    what: &'static str,
    outcome: std::thread::Result<Result<(), SubscriberError>>,
) {
    let error = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(error)) => error,
        Err(payload) => SubscriberError::Panicked(panic_message(payload.as_ref())),
    };
    warn!(
        subscriber = %entry.subscriber.name(),
        action = %what,
        error = %error,
        "subscriber failed, continuing delivery"
    );
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{App, AppType, Ping, PingType, Pong, PongType};
    use std::sync::Mutex as StdMutex;

    type Log = Arc<StdMutex<Vec<String>>>;

    struct Tap {
        label: &'static str,
        interest: Interest<AppType>,
        log: Log,
    }

    impl Tap {
        fn new(label: &'static str, interest: Interest<AppType>, log: &Log) -> Arc<Self> {
            Arc::new(Self {
                label,
                interest,
                log: log.clone(),
            })
        }
    }

    impl Subscriber<App, String> for Tap {
        fn name(&self) -> &str {
            self.label
        }

        fn interest(&self) -> Interest<AppType> {
            self.interest.clone()
        }

        fn on_action(&self, action: &App, _: &Dispatcher<App, String>) -> Result<(), SubscriberError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, action.name()));
            Ok(())
        }

        fn on_change(
            &self,
            event: &ChangeEvent<AppType, String>,
            _: &Dispatcher<App, String>,
        ) -> Result<(), SubscriberError> {
            self.log.lock().unwrap().push(format!(
                "{}:changed:{}",
                self.label,
                event.data.clone().unwrap_or_default()
            ));
            Ok(())
        }
    }

    struct Failing {
        panic: bool,
    }

    impl Subscriber<App, String> for Failing {
        fn on_action(&self, _: &App, _: &Dispatcher<App, String>) -> Result<(), SubscriberError> {
            if self.panic {
                panic!("boom");
            }
            Err(SubscriberError::msg("handler failed"))
        }
    }

    /// Dispatches `Echoed` whenever it sees `Echo`
    struct Echoer {
        log: Log,
    }

    impl Subscriber<App, String> for Echoer {
        fn on_action(&self, action: &App, dispatcher: &Dispatcher<App, String>) -> Result<(), SubscriberError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("echoer:{}", action.name()));
            if let App::Ping(Ping::Echo(n)) = action {
                dispatcher.dispatch(Ping::Echoed(*n));
            }
            Ok(())
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_delivers_in_registration_order_exactly_once() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        dispatcher.register(Tap::new("a", Interest::All, &log)).unwrap();
        dispatcher.register(Tap::new("b", Interest::All, &log)).unwrap();
        dispatcher.register(Tap::new("c", Interest::All, &log)).unwrap();

        assert_eq!(dispatcher.dispatch(Ping::Hello(1)), 3);
        dispatcher.dispatch(Pong::Reset);

        assert_eq!(
            entries(&log),
            vec!["a:Hello", "b:Hello", "c:Hello", "a:Reset", "b:Reset", "c:Reset"]
        );
    }

    #[test]
    fn test_interest_filters_delivery() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        dispatcher
            .register(Tap::new("ping", Interest::domain("ping"), &log))
            .unwrap();
        dispatcher
            .register(Tap::new(
                "reset",
                Interest::types([AppType::Pong(PongType::Reset)]),
                &log,
            ))
            .unwrap();

        assert_eq!(dispatcher.dispatch(Ping::Hello(1)), 1);
        assert_eq!(dispatcher.dispatch(Pong::Reset), 1);
        assert_eq!(dispatcher.dispatch(Pong::Serve), 0);

        assert_eq!(entries(&log), vec!["ping:Hello", "reset:Reset"]);
    }

    #[test]
    fn test_register_twice_fails() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        let tap = Tap::new("a", Interest::All, &log);

        dispatcher.register(tap.clone()).unwrap();
        assert_eq!(
            dispatcher.register(tap.clone()),
            Err(DispatchError::AlreadyRegistered("a".into()))
        );
        assert_eq!(dispatcher.len(), 1);

        dispatcher.dispatch(Ping::Hello(1));
        assert_eq!(entries(&log), vec!["a:Hello"]);
    }

    #[test]
    fn test_unregister() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        let tap = Tap::new("a", Interest::All, &log);
        let other = Tap::new("b", Interest::All, &log);

        assert!(!dispatcher.unregister(&tap));
        dispatcher.register(tap.clone()).unwrap();
        let id = dispatcher.register(other).unwrap();

        assert!(dispatcher.unregister(&tap));
        assert!(dispatcher.unregister_id(id));
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch(Ping::Hello(1)), 0);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_failing_subscriber_is_isolated() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        dispatcher.register(Arc::new(Failing { panic: false })).unwrap();
        dispatcher.register(Arc::new(Failing { panic: true })).unwrap();
        dispatcher.register(Tap::new("after", Interest::All, &log)).unwrap();

        assert_eq!(dispatcher.dispatch(Ping::Hello(7)), 3);
        assert_eq!(entries(&log), vec!["after:Hello"]);
    }

    #[test]
    fn test_reentrant_dispatch_is_depth_first() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        dispatcher.register(Arc::new(Echoer { log: log.clone() })).unwrap();
        dispatcher.register(Tap::new("tail", Interest::All, &log)).unwrap();

        dispatcher.dispatch(Ping::Echo(3));

        // The nested Echoed delivery finishes before the outer loop reaches "tail"
        assert_eq!(
            entries(&log),
            vec!["echoer:Echo", "echoer:Echoed", "tail:Echoed", "tail:Echo"]
        );
    }

    #[test]
    fn test_publish_matches_cause() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        dispatcher
            .register(Tap::new("ping", Interest::domain("ping"), &log))
            .unwrap();
        dispatcher
            .register(Tap::new("pong", Interest::domain("pong"), &log))
            .unwrap();

        let delivered = dispatcher.publish(ChangeEvent::ok(
            AppType::Ping(PingType::Echoed),
            "done".to_string(),
        ));

        assert_eq!(delivered, 1);
        assert_eq!(entries(&log), vec!["ping:changed:done"]);
    }

    #[test]
    fn test_concurrent_dispatch_is_serialized() {
        let log = Log::default();
        let dispatcher: Dispatcher<App, String> = Dispatcher::new();
        dispatcher.register(Tap::new("a", Interest::All, &log)).unwrap();
        dispatcher.register(Tap::new("b", Interest::All, &log)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    dispatcher.dispatch(Ping::Hello(n));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Each dispatch is atomic: "a" is always immediately followed by "b"
        let entries = entries(&log);
        assert_eq!(entries.len(), 16);
        for pair in entries.chunks(2) {
            assert_eq!(pair, ["a:Hello", "b:Hello"]);
        }
    }
}
