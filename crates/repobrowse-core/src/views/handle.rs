use crate::task::TaskGuard;
use std::future::Future;
use tokio::sync::{mpsc, watch};

/// Outside handle to a running store loop
///
/// Events go in through an unbounded queue and are handled one at a time by
/// the loop, which is the store's whole serialization story. State comes
/// back out through a watch channel. Dropping the handle stops the loop.
pub(crate) struct StoreHandle<S, E> {
    events: mpsc::UnboundedSender<E>,
    state: watch::Receiver<S>,
    _task: TaskGuard,
}

impl<S, E> StoreHandle<S, E>
where
    S: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Spawn a store loop. `run` gets the event queue and the state
    /// publisher; `events` is the sending half of that same queue.
    pub(crate) fn spawn<F, Fut>(
        initial: S,
        events: mpsc::UnboundedSender<E>,
        rx: mpsc::UnboundedReceiver<E>,
        run: F,
    ) -> Self
    where
        F: FnOnce(mpsc::UnboundedReceiver<E>, watch::Sender<S>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(initial);
        let task = tokio::spawn(run(rx, state_tx));

        Self {
            events,
            state: state_rx,
            _task: TaskGuard::new(task),
        }
    }

    pub(crate) fn dispatch(&self, event: E) {
        // Only fails once the loop is gone, at which point nobody cares
        let _ = self.events.send(event);
    }

    pub(crate) fn state(&self) -> S {
        self.state.borrow().clone()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<S> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `predicate`
    pub(crate) async fn wait_until(&self, mut predicate: impl FnMut(&S) -> bool) -> S {
        let mut rx = self.state.clone();
        let result = rx.wait_for(|s| predicate(s)).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            // Sender gone means the loop died; hand back the last state we saw
            Err(_) => self.state(),
        }
    }
}
