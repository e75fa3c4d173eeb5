//! Per-unit registry of in-flight deferred requests.
//!
//! Entries are kept in arrival order, keyed by caller ticket. Marking an
//! entry ready ([`PendingSet::find_and_mark_ready`]) and removing it
//! ([`PendingSet::remove`]) are deliberately distinct steps: abort and
//! resolve mark from any thread, while removal happens only on the unit's
//! worker thread when it services the matching completion message. A
//! second abort of the same ticket therefore finds nothing left to
//! complete and cannot produce a second completion signal.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use gpiodev_core::{CallerContext, RequestRecord, Status, Ticket};

struct PendingEntry {
    record: RequestRecord,
    ctx: Arc<dyn CallerContext>,
    ready: bool,
}

/// Ordered collection of deferred requests for one unit.
#[derive(Default)]
pub struct PendingSet {
    entries: Mutex<Vec<PendingEntry>>,
}

impl PendingSet {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a deferred request.
    ///
    /// O(1) append with no duplicate check: reusing a ticket that is still
    /// pending is a caller contract violation, not defended against here.
    pub fn insert(&self, record: RequestRecord, ctx: Arc<dyn CallerContext>) {
        debug!(ticket = %record.ticket, "pending request added");
        self.entries.lock().push(PendingEntry {
            record,
            ctx,
            ready: false,
        });
    }

    /// Mark the entry for `ticket` ready with its terminal status.
    ///
    /// Returns whether the ticket was found. The entry stays in the
    /// registry; the worker removes it when it services the matching
    /// completion message.
    pub fn find_and_mark_ready(&self, ticket: Ticket, status: Status) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.record.ticket == ticket) {
            Some(entry) => {
                entry.ready = true;
                entry.record.status = status;
                true
            }
            None => false,
        }
    }

    /// Detach and return the entry for `ticket`.
    ///
    /// A miss means the registry and the worker's completion path disagree;
    /// it is logged as a correctness warning but is not fatal.
    pub fn remove(&self, ticket: Ticket) -> Option<(RequestRecord, Arc<dyn CallerContext>)> {
        let mut entries = self.entries.lock();
        match entries.iter().position(|e| e.record.ticket == ticket) {
            Some(idx) => {
                let entry = entries.remove(idx);
                debug!(ticket = %ticket, "pending request removed");
                Some((entry.record, entry.ctx))
            }
            None => {
                warn!(ticket = %ticket, "pending request not found for removal");
                None
            }
        }
    }

    /// Number of parked requests.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is parked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Tickets of all parked requests, in arrival order.
    pub fn tickets(&self) -> Vec<Ticket> {
        self.entries.lock().iter().map(|e| e.record.ticket).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpiodev_core::{UnitHandle, CMD_WAIT};
    use gpiodev_mock::MockCaller;

    fn park(pending: &PendingSet, ticket: u64) {
        let record = RequestRecord::new(UnitHandle(1), CMD_WAIT, Ticket(ticket));
        pending.insert(record, Arc::new(MockCaller::new()));
    }

    #[test]
    fn test_insert_and_remove_in_order() {
        let pending = PendingSet::new();
        park(&pending, 1);
        park(&pending, 2);
        park(&pending, 3);
        assert_eq!(pending.len(), 3);
        assert_eq!(
            pending.tickets(),
            vec![Ticket(1), Ticket(2), Ticket(3)]
        );

        let (record, _ctx) = pending.remove(Ticket(2)).expect("entry");
        assert_eq!(record.ticket, Ticket(2));
        assert_eq!(pending.tickets(), vec![Ticket(1), Ticket(3)]);
    }

    #[test]
    fn test_mark_ready_does_not_remove() {
        let pending = PendingSet::new();
        park(&pending, 7);

        assert!(pending.find_and_mark_ready(Ticket(7), Status::Aborted));
        assert_eq!(pending.len(), 1);

        let (record, _ctx) = pending.remove(Ticket(7)).expect("entry");
        assert_eq!(record.status, Status::Aborted);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_missing_ticket() {
        let pending = PendingSet::new();
        assert!(!pending.find_and_mark_ready(Ticket(9), Status::Aborted));
        assert!(pending.remove(Ticket(9)).is_none());
    }
}
