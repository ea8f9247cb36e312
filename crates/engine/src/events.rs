//! Post-commit change notifications.
//!
//! Dashboards subscribe to the engine and re-read balances when a student's
//! ledger changes. Events are published only after the owning transaction
//! commits; intermediate states inside a transaction are never observable.
//! Delivery is at-least-once for the final state: a lagging subscriber may
//! miss intermediate events but the latest one always reflects committed
//! data to re-read.

use tokio::sync::broadcast;

/// A committed change to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// The student's running balance (or exclusion set) changed; re-read
    /// `current_balance` and the dues aggregates.
    BalanceChanged { student_id: i64 },
    /// The student's whole account was purged.
    StudentPurged { student_id: i64 },
}

pub(crate) const EVENT_CAPACITY: usize = 128;

pub(crate) fn channel() -> broadcast::Sender<LedgerEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}
