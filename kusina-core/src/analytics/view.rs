//! Latest-result slot for a report view.
//!
//! Each load takes a [`ViewTicket`]; only the most recent ticket may publish.
//! A slow report that finishes after the user asked for a different one is
//! dropped instead of overwriting the newer result.

use std::sync::Mutex;

/// What the view currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Empty,
    Loading,
    Ready(T),
    /// Terminal error message for this load
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTicket(u64);

pub struct ViewSlot<T> {
    /// (current generation, state)
    state: Mutex<(u64, ViewState<T>)>,
}

impl<T: Clone> Default for ViewSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ViewSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new((0, ViewState::Empty)),
        }
    }

    /// Start a new load. Earlier tickets become stale.
    pub fn begin(&self) -> ViewTicket {
        let mut state = self.lock();
        let generation = state.0 + 1;
        *state = (generation, ViewState::Loading);
        ViewTicket(generation)
    }

    /// Publish the outcome of a load. Returns false if the ticket was stale.
    pub fn publish<E: std::fmt::Display>(
        &self,
        ticket: ViewTicket,
        result: std::result::Result<T, E>,
    ) -> bool {
        let mut state = self.lock();
        if ticket.0 != state.0 {
            tracing::debug!(ticket = ticket.0, "Discarded stale view result");
            return false;
        }
        state.1 = match result {
            Ok(value) => ViewState::Ready(value),
            Err(e) => ViewState::Failed(e.to_string()),
        };
        true
    }

    pub fn current(&self) -> ViewState<T> {
        self.lock().1.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (u64, ViewState<T>)> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
