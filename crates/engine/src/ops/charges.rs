//! Collaborator write paths that produce debit/credit entries: fee-charge
//! generation, opening-balance import, discounts, and manual adjustments.

use crate::{
    AdjustmentCmd, ChargeFeesCmd, DiscountCmd, EngineError, EntryDraft, EntryType,
    OpeningBalanceCmd, ReferenceType, ResultEngine,
};

use super::Engine;

impl Engine {
    /// Generate the fee charges of one student for one session: one DEBIT
    /// entry per fee head, appended as a single atomic batch.
    ///
    /// Refuses to charge a session twice for the same student.
    pub async fn charge_fees(&self, cmd: ChargeFeesCmd) -> ResultEngine<Vec<i64>> {
        if cmd.lines.is_empty() {
            return Err(EngineError::InvalidEntry(
                "fee charge needs at least one line".to_string(),
            ));
        }
        if self
            .has_fee_charge_entries(cmd.student_id, cmd.session_id)
            .await?
        {
            return Err(EngineError::ExistingKey(format!(
                "fee charges for student {} in session {}",
                cmd.student_id, cmd.session_id
            )));
        }

        let mut drafts = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            drafts.push(EntryDraft::debit(
                cmd.student_id,
                cmd.session_id,
                cmd.charged_on,
                ReferenceType::FeeCharge,
                line.amount_minor,
                line.particulars.clone(),
            )?);
        }
        self.append_batch(drafts).await
    }

    /// Import a carried-forward balance as a DEBIT entry dated at the
    /// session start. When that date precedes already-recorded entries the
    /// append path recomputes the student's history, so the caller never
    /// observes a stale balance after commit.
    pub async fn import_opening_balance(&self, cmd: OpeningBalanceCmd) -> ResultEngine<i64> {
        let draft = EntryDraft::debit(
            cmd.student_id,
            cmd.session_id,
            cmd.as_of,
            ReferenceType::OpeningBalance,
            cmd.amount_minor,
            cmd.particulars.clone(),
        )?;
        self.append(draft).await
    }

    /// Credit a discount against the student's dues. Discounts have no
    /// originating record and are not touched by receipt reversal.
    pub async fn apply_discount(&self, cmd: DiscountCmd) -> ResultEngine<i64> {
        let draft = EntryDraft::credit(
            cmd.student_id,
            cmd.session_id,
            cmd.granted_on,
            ReferenceType::Discount,
            cmd.amount_minor,
            cmd.particulars.clone(),
        )?;
        self.append(draft).await
    }

    /// Post a manual correction entry, debit or credit.
    pub async fn apply_adjustment(&self, cmd: AdjustmentCmd) -> ResultEngine<i64> {
        let draft = match cmd.entry_type {
            EntryType::Debit => EntryDraft::debit(
                cmd.student_id,
                cmd.session_id,
                cmd.adjusted_on,
                ReferenceType::Adjustment,
                cmd.amount_minor,
                cmd.particulars.clone(),
            )?,
            EntryType::Credit => EntryDraft::credit(
                cmd.student_id,
                cmd.session_id,
                cmd.adjusted_on,
                ReferenceType::Adjustment,
                cmd.amount_minor,
                cmd.particulars.clone(),
            )?,
        };
        self.append(draft).await
    }
}
