// Observable value cell with latest-value replay
// New subscribers first receive the current value; publication happens under the
// cell lock, so every subscriber sees values in the order they were set

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct CellInner<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

impl<T: Clone> CellInner<T> {
    fn publish(&mut self, value: T) {
        self.value = value;
        let value = &self.value;
        // Receivers that were dropped are pruned here
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    }
}

/// Thread-safe broadcast cell
pub struct StateCell<T> {
    inner: Arc<Mutex<CellInner<T>>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellInner {
                value,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Replace the value and notify every subscriber
    pub fn set(&self, value: T) {
        self.inner.lock().publish(value);
    }

    /// Atomically compute a replacement from the current value.
    ///
    /// `f` returns `None` to leave the cell untouched. On change, returns the
    /// previous and the new value.
    pub fn update<F>(&self, f: F) -> Option<(T, T)>
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let mut inner = self.inner.lock();
        let next = f(&inner.value)?;
        let previous = inner.value.clone();
        inner.publish(next.clone());
        Some((previous, next))
    }

    /// Subscribe to changes; the current value is delivered first.
    ///
    /// Every value is buffered until it is received, so a subscription that is
    /// held but never drained grows with each `set`. Drop subscriptions you no
    /// longer read; dropped ones are pruned on the next publish.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut inner = self.inner.lock();
        // Cannot fail: we hold the receiver
        let _ = tx.send(inner.value.clone());
        inner.subscribers.push(tx);
        Subscription { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl<T: Clone + Default + Send + 'static> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Receiving end of a [`StateCell`] subscription.
/// Dropping it unsubscribes.
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Block until the next value. Returns `None` once the cell is gone.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Block for at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Everything already published and not yet received
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Wait until a value matching `predicate` arrives, or `timeout` elapses
    pub fn wait_for<P>(&self, timeout: Duration, mut predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let value = self.recv_timeout(remaining)?;
            if predicate(&value) {
                return Some(value);
            }
        }
    }
}

impl<T> Iterator for Subscription<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.recv().ok()
    }
}
