//! Last-request-wins ordering for overlapping requests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier handed out when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Issues strictly increasing tickets and remembers the latest one.
///
/// # Examples
/// ```
/// use parcel_market::client::RequestSequencer;
///
/// let sequencer = RequestSequencer::default();
/// let first = sequencer.issue();
/// let second = sequencer.issue();
/// assert!(!sequencer.is_current(first));
/// assert!(sequencer.is_current(second));
/// ```
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    /// Start a request; any ticket issued earlier becomes stale.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` belongs to the most recently started request.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}
