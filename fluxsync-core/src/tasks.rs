//! Task manager for in-flight network requests
//!
//! Provides lifecycle management for async tasks with support for:
//! - Automatic cancellation when spawning with a key that is already running
//! - Anonymous keys for requests that must not replace each other
//! - Manual cancellation, and abort of everything on drop

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Identifies a task for cancellation and replacement.
///
/// Tasks with the same key are mutually exclusive - spawning a new task
/// with a key that's already running will cancel the existing task.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// A key no other call will ever produce
    pub fn anonymous() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(format!("anonymous-{}", NEXT.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for TaskKey {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Tracks running tasks by key.
///
/// Each task runs a future on the runtime and hands its output to a sink
/// (normally a closure that dispatches the resulting action). A cancelled
/// task never reaches its sink.
pub struct TaskManager {
    tasks: HashMap<TaskKey, AbortHandle>,
    runtime: Handle,
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TaskManager {
    pub fn new(runtime: Handle) -> Self {
        Self {
            tasks: HashMap::new(),
            runtime,
        }
    }

    /// Use the runtime of the calling context, if any
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Spawn a task, cancelling any existing task with the same key.
    pub fn spawn<T, F, S>(&mut self, key: impl Into<TaskKey>, future: F, sink: S) -> &mut Self
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        S: FnOnce(T) + Send + 'static,
    {
        let key = key.into();
        self.prune();
        self.cancel(&key);

        tracing::trace!(task = %key.name(), "spawn");
        let handle = self.runtime.spawn(async move {
            let output = future.await;
            sink(output);
        });

        self.tasks.insert(key, handle.abort_handle());
        self
    }

    /// Cancel a task by key. Returns whether a running task was aborted.
    pub fn cancel(&mut self, key: &TaskKey) -> bool {
        match self.tasks.remove(key) {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                if running {
                    tracing::debug!(task = %key.name(), "task cancelled");
                }
                running
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    pub fn is_running(&self, key: &TaskKey) -> bool {
        self.tasks
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of tasks that have not finished yet
    pub fn len(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn running_keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.tasks
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(key, _)| key)
    }

    fn prune(&mut self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
