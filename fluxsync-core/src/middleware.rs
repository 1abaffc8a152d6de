//! Dispatcher middleware for cross-cutting concerns

use crate::Action;

/// Middleware trait for intercepting dispatched actions
///
/// Implement this trait to add logging, auditing, or other cross-cutting
/// concerns to a [`Dispatcher`](crate::Dispatcher). Hooks run on the dispatch
/// path, so nested dispatches produce nested `before`/`after` pairs.
pub trait Middleware<A: Action>: Send {
    /// Called before the action is delivered to subscribers
    fn before(&mut self, action: &A);

    /// Called after delivery with the number of subscribers that received it
    fn after(&mut self, action: &A, delivered: usize);
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<A: Action> Middleware<A> for NoopMiddleware {
    fn before(&mut self, _action: &A) {}
    fn after(&mut self, _action: &A, _delivered: usize) {}
}

/// Middleware that logs actions through `tracing`
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before delivery
    pub log_before: bool,
    /// Whether to log after delivery
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<A: Action> Middleware<A> for LoggingMiddleware {
    fn before(&mut self, action: &A) {
        if self.log_before {
            tracing::debug!(
                action = %action.name(),
                domain = %action.domain(),
                kind = %action.kind().as_str(),
                "Dispatching action"
            );
        }
    }

    fn after(&mut self, action: &A, delivered: usize) {
        if self.log_after {
            tracing::debug!(action = %action.name(), delivered, "Action delivered");
        }
    }
}

/// Compose multiple middleware into a single middleware
pub struct ComposedMiddleware<A: Action> {
    middlewares: Vec<Box<dyn Middleware<A>>>,
}

impl<A: Action> std::fmt::Debug for ComposedMiddleware<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl<A: Action> Default for ComposedMiddleware<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> ComposedMiddleware<A> {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware<A> + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Builder form of [`add`](Self::add)
    pub fn with<M: Middleware<A> + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl<A: Action> Middleware<A> for ComposedMiddleware<A> {
    fn before(&mut self, action: &A) {
        for middleware in &mut self.middlewares {
            middleware.before(action);
        }
    }

    fn after(&mut self, action: &A, delivered: usize) {
        // Reverse order for proper nesting
        for middleware in self.middlewares.iter_mut().rev() {
            middleware.after(action, delivered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{Ping, PingType};
    use std::sync::{Arc, Mutex};

    struct Recording {
        label: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware<Ping> for Recording {
        fn before(&mut self, action: &Ping) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:before:{}", self.label, action.name()));
        }

        fn after(&mut self, action: &Ping, delivered: usize) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:after:{}:{}", self.label, action.name(), delivered));
        }
    }

    #[test]
    fn test_composed_middleware_nests_after_hooks() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut composed = ComposedMiddleware::new()
            .with(Recording {
                label: "outer",
                calls: calls.clone(),
            })
            .with(Recording {
                label: "inner",
                calls: calls.clone(),
            });

        let action = Ping::Hello(1);
        assert_eq!(action.action_type(), PingType::Hello);
        composed.before(&action);
        composed.after(&action, 2);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "outer:before:Hello",
                "inner:before:Hello",
                "inner:after:Hello:2",
                "outer:after:Hello:2",
            ]
        );
    }

    #[test]
    fn test_noop_middleware() {
        let mut noop = NoopMiddleware;
        Middleware::<Ping>::before(&mut noop, &Ping::Hello(1));
        Middleware::<Ping>::after(&mut noop, &Ping::Hello(1), 0);
    }
}
