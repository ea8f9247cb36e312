//! Append-only store operations for the student fee journal.
//!
//! Entries are never edited or deleted in normal operation: corrections are
//! additive or flag-based, and the only destructive path is the full purge
//! on student deletion.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, Select,
    TransactionTrait, prelude::*,
};

use crate::{
    EngineError, EntryDraft, LedgerEntry, LedgerEvent, ReferenceType, ResultEngine, entries,
    next_balance,
};

use super::students::{require_session, require_student};
use super::{Engine, with_tx};

/// Non-reversed entries of one student in chronological order
/// (`entry_date` ascending, `id` ascending — the [`EntryKey`](crate::EntryKey)
/// order).
fn chronological(student_id: i64) -> Select<entries::Entity> {
    entries::Entity::find()
        .filter(entries::Column::StudentId.eq(student_id))
        .filter(entries::Column::IsReversed.eq(false))
        .order_by_asc(entries::Column::EntryDate)
        .order_by_asc(entries::Column::Id)
}

pub(crate) async fn load_chronological<C: ConnectionTrait>(
    conn: &C,
    student_id: i64,
) -> ResultEngine<Vec<entries::Model>> {
    Ok(chronological(student_id).all(conn).await?)
}

/// Chronologically last non-reversed entry, if any. One indexed lookup.
pub(crate) async fn last_active<C: ConnectionTrait>(
    conn: &C,
    student_id: i64,
) -> ResultEngine<Option<entries::Model>> {
    Ok(entries::Entity::find()
        .filter(entries::Column::StudentId.eq(student_id))
        .filter(entries::Column::IsReversed.eq(false))
        .order_by_desc(entries::Column::EntryDate)
        .order_by_desc(entries::Column::Id)
        .one(conn)
        .await?)
}

/// Overwrite the cached balance of one row. Recompute-only; business logic
/// never patches balances directly.
pub(crate) async fn set_balance<C: ConnectionTrait>(
    conn: &C,
    entry_id: i64,
    balance_minor: i64,
) -> ResultEngine<()> {
    let update = entries::ActiveModel {
        id: ActiveValue::Set(entry_id),
        balance_minor: ActiveValue::Set(balance_minor),
        ..Default::default()
    };
    update.update(conn).await?;
    Ok(())
}

/// Flag every entry of one originating record as reversed. Idempotent:
/// already-reversed rows are not matched again.
pub(crate) async fn set_reversed_in<C: ConnectionTrait>(
    conn: &C,
    reference_type: ReferenceType,
    reference_id: i64,
) -> ResultEngine<u64> {
    let result = entries::Entity::update_many()
        .col_expr(entries::Column::IsReversed, Expr::value(true))
        .filter(entries::Column::ReferenceType.eq(reference_type.as_str()))
        .filter(entries::Column::ReferenceId.eq(reference_id))
        .filter(entries::Column::IsReversed.eq(false))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub(crate) async fn delete_entries_for<C: ConnectionTrait>(
    conn: &C,
    student_id: i64,
) -> ResultEngine<u64> {
    let result = entries::Entity::delete_many()
        .filter(entries::Column::StudentId.eq(student_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

impl Engine {
    /// Append one entry and return its store-assigned id.
    ///
    /// The cached balance is computed here, at insert time. A backdated
    /// entry (earlier `entry_date` than the student's last entry) makes the
    /// later cached balances stale, so the append triggers a chronological
    /// recompute inside the same transaction: the invariant holds whenever
    /// the write commits.
    pub async fn append(&self, draft: EntryDraft) -> ResultEngine<i64> {
        let student_id = draft.student_id;
        let id = with_tx!(self, |tx| self.append_in_tx(&tx, &draft).await)?;
        self.notify(LedgerEvent::BalanceChanged { student_id });
        Ok(id)
    }

    /// Append several entries as one atomic unit, preserving their order.
    ///
    /// Used when a single business event produces multiple ledger lines
    /// (e.g. the fee heads of one charge batch). Either all lines are
    /// visible or none.
    pub async fn append_batch(&self, drafts: Vec<EntryDraft>) -> ResultEngine<Vec<i64>> {
        if drafts.is_empty() {
            return Err(EngineError::InvalidEntry(
                "batch must have at least one entry".to_string(),
            ));
        }

        let mut affected: Vec<i64> = drafts.iter().map(|d| d.student_id).collect();
        affected.sort_unstable();
        affected.dedup();

        let ids = with_tx!(self, |tx| {
            let mut ids = Vec::with_capacity(drafts.len());
            for draft in &drafts {
                ids.push(self.append_in_tx(&tx, draft).await?);
            }
            Ok(ids)
        })?;

        for student_id in affected {
            self.notify(LedgerEvent::BalanceChanged { student_id });
        }
        Ok(ids)
    }

    pub(crate) async fn append_in_tx(
        &self,
        tx: &DatabaseTransaction,
        draft: &EntryDraft,
    ) -> ResultEngine<i64> {
        require_student(tx, draft.student_id).await?;
        require_session(tx, draft.session_id).await?;

        let last = last_active(tx, draft.student_id).await?;
        let (backdated, balance_minor) = match &last {
            Some(prev) if draft.entry_date < prev.entry_date => (true, 0),
            Some(prev) => (
                false,
                next_balance(prev.balance_minor, draft.debit_minor(), draft.credit_minor()),
            ),
            None => (
                false,
                next_balance(0, draft.debit_minor(), draft.credit_minor()),
            ),
        };

        let inserted = draft.active_model(balance_minor, Utc::now()).insert(tx).await?;
        if backdated {
            self.recompute_in_tx(tx, draft.student_id).await?;
        }
        Ok(inserted.id)
    }

    /// Non-reversed entries of a student, optionally scoped to one session,
    /// in chronological order.
    pub async fn entries_for_student(
        &self,
        student_id: i64,
        session_id: Option<i64>,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let mut query = chronological(student_id);
        if let Some(session_id) = session_id {
            query = query.filter(entries::Column::SessionId.eq(session_id));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    /// All non-reversed entries of a student across sessions, in
    /// chronological order. The balance is a whole-account concept, so this
    /// is the sequence recomputation walks.
    pub async fn all_chronological(&self, student_id: i64) -> ResultEngine<Vec<LedgerEntry>> {
        load_chronological(&self.database, student_id)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    /// Most recent entry, reversed or not. Diagnostics only; balances come
    /// from [`current_balance`](Engine::current_balance).
    pub async fn last_entry(&self, student_id: i64) -> ResultEngine<Option<LedgerEntry>> {
        let model = entries::Entity::find()
            .filter(entries::Column::StudentId.eq(student_id))
            .order_by_desc(entries::Column::EntryDate)
            .order_by_desc(entries::Column::Id)
            .one(&self.database)
            .await?;
        model.map(LedgerEntry::try_from).transpose()
    }

    /// All entries tied to one originating record, reversed entries
    /// included (the audit trail survives reversal).
    pub async fn entries_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: i64,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        entries::Entity::find()
            .filter(entries::Column::ReferenceType.eq(reference_type.as_str()))
            .filter(entries::Column::ReferenceId.eq(reference_id))
            .order_by_asc(entries::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    /// Store-level reversal flag. Prefer
    /// [`cancel_receipt`](Engine::cancel_receipt) /
    /// [`reverse_receipt`](Engine::reverse_receipt), which also recompute
    /// the running balances the flagged rows no longer contribute to.
    pub async fn set_reversed(
        &self,
        reference_type: ReferenceType,
        reference_id: i64,
    ) -> ResultEngine<u64> {
        set_reversed_in(&self.database, reference_type, reference_id).await
    }

    /// Full ledger purge for one student. Used only by the student-deletion
    /// workflow.
    pub async fn delete_all_for_student(&self, student_id: i64) -> ResultEngine<u64> {
        let removed = delete_entries_for(&self.database, student_id).await?;
        if removed > 0 {
            self.notify(LedgerEvent::BalanceChanged { student_id });
        }
        Ok(removed)
    }
}
