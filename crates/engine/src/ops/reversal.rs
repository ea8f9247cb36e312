//! The reversal protocol: undo the ledger effect of a cancelled payment
//! without destroying audit history.
//!
//! Reversal is flag-based and one-way (`ACTIVE -> REVERSED`): the receipt's
//! entries are excluded from every balance and dues computation but the rows
//! stay retrievable. Re-activating a reversed receipt is modeled as a brand
//! new entry, never an un-reversal. Counter-entries are not used; the
//! recompute after flagging is what keeps the invariant intact.

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{LedgerEvent, ReferenceType, ResultEngine, entries};

use super::entries::set_reversed_in;
use super::{Engine, with_tx};

impl Engine {
    /// Reverse every ledger entry of one receipt and recompute the owning
    /// student's running balances, in one transaction.
    ///
    /// Returns the number of entries flagged. Reversing a receipt with no
    /// matching active entries (never posted, or already reversed) is a
    /// no-op, not an error.
    pub async fn reverse_receipt(&self, receipt_id: i64) -> ResultEngine<u64> {
        let (flagged, students) = with_tx!(self, |tx| {
            let matches = entries::Entity::find()
                .filter(entries::Column::ReferenceType.eq(ReferenceType::Receipt.as_str()))
                .filter(entries::Column::ReferenceId.eq(receipt_id))
                .filter(entries::Column::IsReversed.eq(false))
                .order_by_asc(entries::Column::Id)
                .all(&tx)
                .await?;

            let mut students: Vec<i64> = matches.iter().map(|m| m.student_id).collect();
            students.sort_unstable();
            students.dedup();

            let flagged = if matches.is_empty() {
                0
            } else {
                let flagged = set_reversed_in(&tx, ReferenceType::Receipt, receipt_id).await?;
                for student_id in &students {
                    self.recompute_in_tx(&tx, *student_id).await?;
                }
                flagged
            };

            Ok((flagged, students))
        })?;

        if flagged > 0 {
            tracing::info!(receipt_id, flagged, "reversed receipt ledger entries");
            for student_id in students {
                self.notify(LedgerEvent::BalanceChanged { student_id });
            }
        }
        Ok(flagged)
    }
}
