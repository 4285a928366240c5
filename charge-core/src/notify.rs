//! Subscriber notification for confirmed charge-state changes.
//!
//! The dispatcher holds the single current state and a small fixed-capacity
//! subscriber list. Callbacks run in whatever context calls [`Dispatcher::publish`];
//! firmware invokes it from its background monitor task, never from interrupt
//! context.

use heapless::Vec;

use crate::state::ChargeState;

/// Subscriber callback signature.
pub type StateCallback = fn(ChargeState);

/// Default subscriber capacity.
pub const MAX_SUBSCRIBERS: usize = 4;

/// Error returned when a subscriber cannot be registered.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterError {
    /// The fixed-capacity subscriber list is full.
    ListFull,
}

/// Holds the current confirmed state and fans out change notifications.
#[derive(Clone, Debug)]
pub struct Dispatcher<const N: usize = MAX_SUBSCRIBERS> {
    current: ChargeState,
    subscribers: Vec<StateCallback, N>,
}

impl<const N: usize> Dispatcher<N> {
    /// Creates a dispatcher with the given starting state and no subscribers.
    pub const fn new(initial: ChargeState) -> Self {
        Self {
            current: initial,
            subscribers: Vec::new(),
        }
    }

    /// Returns the current confirmed state.
    pub const fn current(&self) -> ChargeState {
        self.current
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Registers a subscriber and immediately delivers the current state once.
    ///
    /// New subscribers are never left waiting for the next natural transition.
    pub fn register(&mut self, callback: StateCallback) -> Result<(), RegisterError> {
        self.subscribers
            .push(callback)
            .map_err(|_| RegisterError::ListFull)?;
        callback(self.current);
        Ok(())
    }

    /// Stores the new confirmed state and notifies every subscriber.
    pub fn publish(&mut self, state: ChargeState) {
        self.current = state;
        for callback in &self.subscribers {
            callback(state);
        }
    }
}
