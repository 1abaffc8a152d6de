//! Domain stores: a reducer-owned slice wired into the dispatcher

use std::fmt;
use std::marker::PhantomData;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::action::{Action, Nested};
use crate::dispatcher::{Dispatcher, Interest, Subscriber, SubscriberError};
use crate::effect::{Effect, Reaction};
use crate::tasks::{TaskKey, TaskManager};

/// The state and reducer of one domain
///
/// `reduce` is the only place the slice is mutated. It must not block or
/// dispatch; remote work is described with [`Effect`]s and observers are
/// notified through the returned events.
///
/// # Example
/// ```ignore
/// struct Posts { rows: MemoryTable<Post>, client: Arc<dyn PostClient> }
///
/// impl Slice for Posts {
///     type Action = PostAction;
///     type Change = PostChange;
///     const NAME: &'static str = "posts";
///     const DOMAIN: &'static str = "post";
///
///     fn reduce(&mut self, action: PostAction) -> Reaction<PostAction, PostChange> {
///         ..
///     }
/// }
/// ```
pub trait Slice: Send + 'static {
    type Action: Action;
    type Change: Clone + fmt::Debug + Send + Sync + 'static;

    /// Name used in logs
    const NAME: &'static str;

    /// Action domain this slice handles
    const DOMAIN: &'static str;

    fn reduce(&mut self, action: Self::Action) -> Reaction<Self::Action, Self::Change>;
}

/// A [`Slice`] registered as a dispatcher subscriber
///
/// # Type Parameters
/// * `S` - The slice
/// * `A` - The application action, which nests `S::Action`
/// * `D` - The application change data, built from `S::Change`
///
/// The slice lock is held only while reducing. Change events are published
/// and effects started after it is released, so observers may read the
/// store from inside `on_change`.
pub struct Store<S: Slice, A, D> {
    slice: Mutex<S>,
    tasks: Mutex<TaskManager>,
    _marker: PhantomData<fn() -> (A, D)>,
}

impl<S: Slice, A, D> fmt::Debug for Store<S, A, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &S::NAME)
            .field("tasks", &*self.tasks.lock())
            .finish()
    }
}

impl<S: Slice, A, D> Store<S, A, D> {
    /// Create a store whose requests run on `runtime`
    pub fn new(slice: S, runtime: Handle) -> Self {
        Self {
            slice: Mutex::new(slice),
            tasks: Mutex::new(TaskManager::new(runtime)),
            _marker: PhantomData,
        }
    }

    /// Read the slice. Blocks while a reduce is in progress.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.slice.lock())
    }

    /// Number of requests still running
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_running(&self, key: &TaskKey) -> bool {
        self.tasks.lock().is_running(key)
    }

    /// Abort every running request; none of them will dispatch a response.
    ///
    /// This bypasses the slice, so no change event is published and the
    /// slice still believes the requests are pending. Slices that track
    /// their own requests should be cancelled through an action instead.
    pub fn cancel_all(&self) {
        self.tasks.lock().cancel_all();
    }
}

impl<S, A, D> Store<S, A, D>
where
    S: Slice,
    S::Action: Nested<A>,
    A: Action,
    D: From<S::Change> + 'static,
{
    /// Reduce one of this store's actions and carry out the result
    pub fn handle(&self, action: S::Action, dispatcher: &Dispatcher<A, D>) {
        tracing::trace!(store = %S::NAME, action = %action.name(), "reduce");
        let reaction = self.slice.lock().reduce(action);

        let Reaction {
            effects, events, ..
        } = reaction;
        self.run(effects, dispatcher);
        for event in events {
            dispatcher.publish(event.map(<S::Action as Nested<A>>::lift_type, D::from));
        }
    }

    fn run(&self, effects: Vec<Effect<S::Action>>, dispatcher: &Dispatcher<A, D>) {
        if effects.is_empty() {
            return;
        }
        let mut tasks = self.tasks.lock();
        for effect in effects {
            match effect {
                Effect::Request { key, future } => {
                    let key = key.unwrap_or_else(TaskKey::anonymous);
                    tracing::debug!(store = %S::NAME, task = %key.name(), "request started");
                    let dispatcher = dispatcher.clone();
                    tasks.spawn(key, future, move |response: S::Action| {
                        dispatcher.dispatch(response);
                    });
                }
                Effect::Cancel(key) => {
                    if !tasks.cancel(&key) {
                        tracing::debug!(store = %S::NAME, task = %key.name(), "nothing to cancel");
                    }
                }
            }
        }
    }
}

impl<S, A, D> Subscriber<A, D> for Store<S, A, D>
where
    S: Slice,
    S::Action: Nested<A>,
    A: Action,
    D: From<S::Change> + 'static,
{
    fn name(&self) -> &str {
        S::NAME
    }

    fn interest(&self) -> Interest<A::Type> {
        Interest::domain(S::DOMAIN)
    }

    fn on_action(&self, action: &A, dispatcher: &Dispatcher<A, D>) -> Result<(), SubscriberError> {
        if let Some(own) = <S::Action as Nested<A>>::project(action) {
            self.handle(own.clone(), dispatcher);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeEvent;
    use crate::testing::fixtures::{App, AppType, Ping, PingType};
    use crate::testing::EventRecorder;
    use crate::{assert_emitted, assert_not_emitted};
    use std::sync::Arc;
    use std::time::Duration;

    /// Counts greetings; `Echo` round-trips through a request
    #[derive(Default)]
    struct Counter {
        hellos: u32,
        echoes: Vec<u32>,
    }

    impl Slice for Counter {
        type Action = Ping;
        type Change = u32;
        const NAME: &'static str = "counter";
        const DOMAIN: &'static str = "ping";

        fn reduce(&mut self, action: Ping) -> Reaction<Ping, u32> {
            match action {
                Ping::Hello(n) => {
                    self.hellos += n;
                    Reaction::changed().emit(ChangeEvent::ok(PingType::Hello, self.hellos))
                }
                Ping::Echo(n) => Reaction::unchanged().with(Effect::keyed(
                    format!("echo-{n}"),
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ping::Echoed(n)
                    },
                )),
                Ping::Echoed(n) => {
                    self.echoes.push(n);
                    Reaction::changed().emit(ChangeEvent::ok(PingType::Echoed, n))
                }
                Ping::Reset => {
                    self.hellos = 0;
                    Reaction::changed()
                        .with(Effect::cancel("echo-1"))
                        .emit(ChangeEvent::new(PingType::Reset))
                }
            }
        }
    }

    /// Reads the store back while handling its events
    struct Reader {
        store: Arc<Store<Counter, App, u64>>,
        seen: parking_lot::Mutex<Vec<u32>>,
    }

    impl Subscriber<App, u64> for Reader {
        fn on_change(
            &self,
            _: &ChangeEvent<AppType, u64>,
            _: &Dispatcher<App, u64>,
        ) -> Result<(), SubscriberError> {
            let hellos = self.store.read(|c| c.hellos);
            self.seen.lock().push(hellos);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reduce_publishes_lifted_event() {
        let dispatcher: Dispatcher<App, u64> = Dispatcher::new();
        let store = Arc::new(Store::new(Counter::default(), Handle::current()));
        let recorder = EventRecorder::<App, u64>::all();
        dispatcher.register(store.clone()).unwrap();
        dispatcher.register(recorder.clone()).unwrap();

        dispatcher.dispatch(Ping::Hello(2));
        dispatcher.dispatch(Ping::Hello(3));

        assert_eq!(store.read(|c| c.hellos), 5);
        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].cause, AppType::Ping(PingType::Hello));
        assert_eq!(events[1].data, Some(5));
    }

    #[tokio::test]
    async fn test_observer_can_read_store_during_publish() {
        let dispatcher: Dispatcher<App, u64> = Dispatcher::new();
        let store = Arc::new(Store::new(Counter::default(), Handle::current()));
        let reader = Arc::new(Reader {
            store: store.clone(),
            seen: Default::default(),
        });
        dispatcher.register(store).unwrap();
        dispatcher.register(reader.clone()).unwrap();

        dispatcher.dispatch(Ping::Hello(4));

        assert_eq!(*reader.seen.lock(), vec![4]);
    }

    #[tokio::test]
    async fn test_request_dispatches_response() {
        let dispatcher: Dispatcher<App, u64> = Dispatcher::new();
        let store = Arc::new(Store::new(Counter::default(), Handle::current()));
        let recorder = EventRecorder::<App, u64>::all();
        dispatcher.register(store.clone()).unwrap();
        dispatcher.register(recorder.clone()).unwrap();

        dispatcher.dispatch(Ping::Echo(9));
        assert_eq!(store.in_flight(), 1);

        let event = recorder
            .wait_for(
                |e| e.cause == AppType::Ping(PingType::Echoed),
                Duration::from_secs(1),
            )
            .await
            .expect("echo response");
        assert_eq!(event.data, Some(9));
        assert_eq!(store.read(|c| c.echoes.clone()), vec![9]);
        assert_emitted!(recorder.actions(), App::Ping(Ping::Echoed(9)));
    }

    #[tokio::test]
    async fn test_cancel_effect_drops_response() {
        let dispatcher: Dispatcher<App, u64> = Dispatcher::new();
        let store = Arc::new(Store::new(Counter::default(), Handle::current()));
        let recorder = EventRecorder::<App, u64>::all();
        dispatcher.register(store.clone()).unwrap();
        dispatcher.register(recorder.clone()).unwrap();

        dispatcher.dispatch(Ping::Echo(1));
        dispatcher.dispatch(Ping::Reset);
        assert_eq!(store.in_flight(), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.read(|c| c.echoes.is_empty()));
        assert_not_emitted!(recorder.actions(), App::Ping(Ping::Echoed(_)));
    }
}
