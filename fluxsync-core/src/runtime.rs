//! Single-consumer dispatch loop.
//!
//! Hosts that want every action delivered from one task can hand out an
//! [`ActionQueue`] instead of the dispatcher itself and run
//! [`Dispatcher::run`] (or call [`Dispatcher::drain`] from their own loop).

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::dispatcher::Dispatcher;

/// Sending half of a dispatcher's action queue
#[derive(Debug)]
pub struct ActionQueue<A> {
    tx: mpsc::UnboundedSender<A>,
}

impl<A> Clone for ActionQueue<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A: Action> ActionQueue<A> {
    /// Enqueue an action. Returns `false` once the receiving loop is gone.
    pub fn enqueue(&self, action: impl Into<A>) -> bool {
        self.tx.send(action.into()).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<A: Action, D: 'static> Dispatcher<A, D> {
    /// Create a queue feeding this dispatcher
    pub fn queue(&self) -> (ActionQueue<A>, mpsc::UnboundedReceiver<A>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ActionQueue { tx }, rx)
    }

    /// Dispatch everything currently queued without waiting. Returns the
    /// number of actions dispatched.
    pub fn drain(&self, rx: &mut mpsc::UnboundedReceiver<A>) -> usize {
        let mut count = 0;
        while let Ok(action) = rx.try_recv() {
            self.dispatch(action);
            count += 1;
        }
        count
    }

    /// Dispatch queued actions until `cancel` fires or every queue handle is
    /// dropped. Returns the number of actions dispatched.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<A>, cancel: CancellationToken) -> usize {
        let mut count = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(dispatched = count, "dispatch loop cancelled");
                    break;
                }
                next = rx.recv() => match next {
                    Some(action) => {
                        self.dispatch(action);
                        count += 1;
                    }
                    None => break,
                },
            }
        }
        count
    }
}
