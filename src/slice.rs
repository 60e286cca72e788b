use crate::retry::{CancelHandle, CancelToken};
use std::sync::Arc;

/// Latest payload for one topic together with its request status.
///
/// `data` survives both a new request and a failed one, so widgets keep
/// showing the previous result while a refresh is pending or after it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    pub fn phase(&self) -> FetchPhase {
        if self.loading {
            FetchPhase::Pending
        } else if self.error.is_some() {
            FetchPhase::Rejected
        } else if self.data.is_some() {
            FetchPhase::Fulfilled
        } else {
            FetchPhase::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

/// Identifies one in-flight request issued by [`FetchSlice::begin`].
///
/// The ticket's cancel token fires once a newer request replaces it.
#[derive(Debug, Clone)]
pub struct Ticket<K> {
    generation: u64,
    key: K,
    cancel: CancelToken,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// State for one domain topic keyed by `K`.
///
/// Every [`begin`](FetchSlice::begin) starts a new generation. Results are
/// only applied for the ticket of the newest generation; anything older is
/// dropped so a slow response for an abandoned key never overwrites state.
#[derive(Debug)]
pub struct FetchSlice<K, T> {
    name: &'static str,
    state: FetchState<T>,
    key: Option<K>,
    generation: u64,
    inflight: Option<CancelHandle>,
}

impl<K: Clone + std::fmt::Debug, T> FetchSlice<K, T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: FetchState::default(),
            key: None,
            generation: 0,
            inflight: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    /// Key of the most recent request, whether or not it has resolved.
    pub fn current_key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        ticket.generation == self.generation
    }

    /// Marks the slice pending for `key` and cancels the ticket it replaces.
    /// Existing data is kept.
    pub fn begin(&mut self, key: K) -> Ticket<K> {
        self.cancel_inflight();
        let handle = CancelHandle::new();
        let cancel = handle.token();
        self.inflight = Some(handle);
        self.generation += 1;
        self.key = Some(key.clone());
        self.state.loading = true;
        self.state.error = None;
        tracing::debug!(
            slice = self.name,
            generation = self.generation,
            ?key,
            "fetch pending"
        );
        Ticket {
            generation: self.generation,
            key,
            cancel,
        }
    }

    /// Cancels the token of the pending request, if any. Its result is still
    /// accepted should it arrive.
    pub fn cancel_inflight(&mut self) -> bool {
        match self.inflight.take() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Stores `data` if `ticket` is still current. Returns whether it was applied.
    pub fn fulfill(&mut self, ticket: &Ticket<K>, data: T) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.inflight = None;
        self.state.loading = false;
        self.state.error = None;
        self.state.data = Some(Arc::new(data));
        tracing::debug!(slice = self.name, generation = ticket.generation, "fetch fulfilled");
        true
    }

    /// Records a failure if `ticket` is still current. Stale data is left alone.
    pub fn reject(&mut self, ticket: &Ticket<K>, message: impl Into<String>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        let message = message.into();
        tracing::debug!(
            slice = self.name,
            generation = ticket.generation,
            %message,
            "fetch rejected"
        );
        self.inflight = None;
        self.state.loading = false;
        self.state.error = Some(message);
        true
    }

    /// Clears the pending flag without recording a result, e.g. when the
    /// request was cancelled on teardown.
    pub fn abandon(&mut self, ticket: &Ticket<K>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.inflight = None;
        self.state.loading = false;
        true
    }

    pub fn reset(&mut self) {
        self.cancel_inflight();
        self.generation += 1;
        self.key = None;
        self.state = FetchState::default();
    }

    fn accept(&self, ticket: &Ticket<K>) -> bool {
        if self.is_current(ticket) {
            return true;
        }
        tracing::debug!(
            slice = self.name,
            stale = ticket.generation,
            current = self.generation,
            key = ?ticket.key,
            "discarding stale response"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice() -> FetchSlice<&'static str, u32> {
        FetchSlice::new("test")
    }

    fn assert_consistent(state: &FetchState<u32>) {
        assert!(!(state.loading && state.error.is_some()));
    }

    #[test]
    fn starts_idle() {
        let s = slice();
        assert_eq!(s.state().phase(), FetchPhase::Idle);
        assert_eq!(s.state(), &FetchState::default());
        assert!(s.current_key().is_none());
    }

    #[test]
    fn pending_then_fulfilled() {
        let mut s = slice();
        let t = s.begin("AAPL");
        assert_eq!(s.state().phase(), FetchPhase::Pending);
        assert!(s.fulfill(&t, 7));
        assert_eq!(s.state().phase(), FetchPhase::Fulfilled);
        assert_eq!(s.state().data.as_deref(), Some(&7));
        assert_eq!(s.current_key(), Some(&"AAPL"));
    }

    #[test]
    fn failure_keeps_previous_data() {
        let mut s = slice();
        let t = s.begin("a");
        s.fulfill(&t, 1);
        let t = s.begin("a");
        assert_eq!(s.state().data.as_deref(), Some(&1));
        assert!(s.reject(&t, "down"));
        assert_eq!(s.state().data.as_deref(), Some(&1));
        assert_eq!(s.state().error.as_deref(), Some("down"));
        assert!(!s.state().loading);
    }

    #[test]
    fn begin_clears_error() {
        let mut s = slice();
        let t = s.begin("a");
        s.reject(&t, "down");
        s.begin("a");
        assert!(s.state().error.is_none());
        assert!(s.state().loading);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut s = slice();
        let old = s.begin("MSFT");
        let new = s.begin("AAPL");
        assert!(!s.fulfill(&old, 1));
        assert!(s.state().loading);
        assert!(s.state().data.is_none());
        assert!(s.fulfill(&new, 2));
        assert!(!s.reject(&old, "late failure"));
        assert_eq!(s.state().data.as_deref(), Some(&2));
        assert!(s.state().error.is_none());
    }

    #[test]
    fn begin_cancels_replaced_ticket() {
        let mut s = slice();
        let old = s.begin("MSFT");
        assert!(!old.cancel_token().is_cancelled());
        let new = s.begin("AAPL");
        assert!(old.cancel_token().is_cancelled());
        assert!(!new.cancel_token().is_cancelled());
        assert!(s.fulfill(&new, 1));
    }

    #[test]
    fn cancel_inflight_keeps_ticket_current() {
        let mut s = slice();
        assert!(!s.cancel_inflight());
        let t = s.begin("a");
        assert!(s.cancel_inflight());
        assert!(t.cancel_token().is_cancelled());
        assert!(s.state().loading);
        assert!(s.abandon(&t));
        assert_eq!(s.state().phase(), FetchPhase::Idle);
    }

    #[test]
    fn abandon_only_clears_loading() {
        let mut s = slice();
        let t = s.begin("a");
        s.fulfill(&t, 3);
        let t = s.begin("b");
        assert!(s.abandon(&t));
        assert_eq!(s.state().phase(), FetchPhase::Fulfilled);
    }

    #[test]
    fn reset_invalidates_outstanding_tickets() {
        let mut s = slice();
        let t = s.begin("a");
        s.reset();
        assert!(!s.fulfill(&t, 9));
        assert_eq!(s.state().phase(), FetchPhase::Idle);
    }

    #[test]
    fn loading_and_error_never_both_set() {
        let mut s = slice();
        let mut tickets = Vec::new();
        // Interleave triggers and resolutions in an arbitrary but fixed order.
        for step in 0..40u32 {
            match step % 5 {
                0 | 3 => tickets.push(s.begin(if step % 2 == 0 { "x" } else { "y" })),
                1 => {
                    if let Some(t) = tickets.pop() {
                        s.reject(&t, "err");
                    }
                }
                2 => {
                    if let Some(t) = tickets.first().cloned() {
                        s.fulfill(&t, step);
                    }
                }
                _ => {
                    if let Some(t) = tickets.last() {
                        s.fulfill(t, step);
                    }
                }
            }
            assert_consistent(s.state());
        }
    }
}
