//! Action traits for type-safe state mutations

use std::fmt::Debug;
use std::hash::Hash;

/// How an action participates in the request/response protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Asks a store to perform remote work; answered later by a `Response`
    Request,
    /// Carries the outcome of remote work back into the store
    Response,
    /// Mutates local state only; its change event fires on the request path
    Local,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Request => "request",
            ActionKind::Response => "response",
            ActionKind::Local => "local",
        }
    }
}

/// Fieldless tag naming one action variant
///
/// Every action enum has a matching type enum (generated by
/// `#[derive(Action)]`), which is what subscribers declare interest in and
/// what change events carry as their `cause`.
pub trait ActionType: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Namespace the type belongs to (e.g. `"post"`, `"media"`)
    fn domain(&self) -> &'static str;

    /// Variant name, e.g. `"FetchPosts"`
    fn name(&self) -> &'static str;

    /// Request, response or local
    fn kind(&self) -> ActionKind;
}

/// Trait for actions that can be dispatched
///
/// Actions are immutable messages. They should be:
/// - Clone: every interested store receives its own view of the action
/// - Debug: for logging
/// - Send + Sync + 'static: completions are dispatched from runtime threads
///
/// Use `#[derive(Action)]` from `fluxsync-macros` to implement this trait.
pub trait Action: Clone + Debug + Send + Sync + 'static {
    /// The tag enum for this action
    type Type: ActionType;

    /// The tag of this action's variant
    fn action_type(&self) -> Self::Type;

    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str {
        self.action_type().name()
    }

    fn kind(&self) -> ActionKind {
        self.action_type().kind()
    }

    fn domain(&self) -> &'static str {
        self.action_type().domain()
    }
}

/// A domain action that lives inside a composed application action
///
/// Generated for every variant of an `#[action(compose)]` enum. Stores use it
/// to pick their own actions out of the application-wide stream and to lift
/// their types back into it.
pub trait Nested<A: Action>: Action + Into<A> {
    /// Borrow the nested action if `action` wraps one of ours
    fn project(action: &A) -> Option<&Self>;

    /// Lift a nested type tag into the composed type
    fn lift_type(ty: Self::Type) -> A::Type;
}

/// Short, human-readable description of an action for logs
///
/// The default uses `Debug`; override it for actions carrying large payloads.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}
