//! Payment collection and receipt cancellation.
//!
//! Collecting a payment writes the receipt row and its CREDIT ledger entry
//! inside one transaction; cancelling marks the receipt and runs the
//! reversal protocol over its entries.

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    CollectPaymentCmd, EngineError, EntryDraft, LedgerEvent, Receipt, ReferenceType, ResultEngine,
    receipts,
};

use super::entries::{last_active, set_reversed_in};
use super::students::{require_session, require_student};
use super::{Engine, with_tx};

/// Result of a collected payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub receipt_id: i64,
    pub entry_id: i64,
    /// The student's running balance after the payment.
    pub balance_minor: i64,
}

impl Engine {
    /// Collect a payment: insert the receipt and its CREDIT ledger entry as
    /// one atomic unit. The entry references the receipt, so a later
    /// cancellation can locate and reverse it.
    pub async fn collect_payment(&self, cmd: CollectPaymentCmd) -> ResultEngine<PaymentOutcome> {
        let student_id = cmd.student_id;
        let outcome = with_tx!(self, |tx| {
            require_student(&tx, cmd.student_id).await?;
            require_session(&tx, cmd.session_id).await?;

            let receipt = receipts::ActiveModel {
                id: ActiveValue::NotSet,
                student_id: ActiveValue::Set(cmd.student_id),
                session_id: ActiveValue::Set(cmd.session_id),
                amount_minor: ActiveValue::Set(cmd.amount_minor),
                paid_on: ActiveValue::Set(cmd.paid_on),
                note: ActiveValue::Set(cmd.note.clone()),
                cancelled_at: ActiveValue::Set(None),
            }
            .insert(&tx)
            .await?;

            let draft = EntryDraft::credit(
                cmd.student_id,
                cmd.session_id,
                cmd.paid_on,
                ReferenceType::Receipt,
                cmd.amount_minor,
                format!("Receipt #{}", receipt.id),
            )?
            .reference_id(receipt.id);
            let entry_id = self.append_in_tx(&tx, &draft).await?;

            let balance_minor = last_active(&tx, cmd.student_id)
                .await?
                .map(|model| model.balance_minor)
                .unwrap_or(0);

            Ok(PaymentOutcome {
                receipt_id: receipt.id,
                entry_id,
                balance_minor,
            })
        })?;

        tracing::info!(
            student_id,
            receipt_id = outcome.receipt_id,
            "collected payment"
        );
        self.notify(LedgerEvent::BalanceChanged { student_id });
        Ok(outcome)
    }

    /// Cancel a receipt (e.g. a bounced cheque): mark it cancelled and
    /// reverse its ledger entries, restoring the dues the payment had
    /// settled. Idempotent: cancelling an already-cancelled receipt affects
    /// zero entries and succeeds.
    pub async fn cancel_receipt(&self, receipt_id: i64) -> ResultEngine<u64> {
        let (flagged, student_id) = with_tx!(self, |tx| {
            let receipt = receipts::Entity::find_by_id(receipt_id)
                .one(&tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;

            if receipt.cancelled_at.is_some() {
                Ok((0, receipt.student_id))
            } else {
                let update = receipts::ActiveModel {
                    id: ActiveValue::Set(receipt.id),
                    cancelled_at: ActiveValue::Set(Some(Utc::now())),
                    ..Default::default()
                };
                update.update(&tx).await?;

                let flagged = set_reversed_in(&tx, ReferenceType::Receipt, receipt_id).await?;
                if flagged > 0 {
                    self.recompute_in_tx(&tx, receipt.student_id).await?;
                }
                Ok((flagged, receipt.student_id))
            }
        })?;

        if flagged > 0 {
            tracing::info!(receipt_id, student_id, flagged, "cancelled receipt");
            self.notify(LedgerEvent::BalanceChanged { student_id });
        }
        Ok(flagged)
    }

    /// Return a receipt by id.
    pub async fn receipt(&self, receipt_id: i64) -> ResultEngine<Receipt> {
        let model = receipts::Entity::find_by_id(receipt_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
        Ok(Receipt::from(model))
    }

    /// Receipts of one student, newest first, cancelled ones included.
    pub async fn receipts_for_student(&self, student_id: i64) -> ResultEngine<Vec<Receipt>> {
        let models = receipts::Entity::find()
            .filter(receipts::Column::StudentId.eq(student_id))
            .order_by_desc(receipts::Column::PaidOn)
            .order_by_desc(receipts::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Receipt::from).collect())
    }
}
