//! The balance engine: reads of the running-balance invariant and the
//! chronological recompute that repairs it.

use sea_orm::{ConnectionTrait, DatabaseTransaction, Statement, TransactionTrait, Value};

use crate::{EntryKey, LedgerEvent, ResultEngine, next_balance};

use super::entries::{last_active, load_chronological, set_balance};
use super::{Engine, with_tx};

impl Engine {
    /// Current balance of a student: the cached balance of the
    /// chronologically last non-reversed entry, or 0 with no entries.
    ///
    /// One indexed last-entry lookup, never a scan.
    pub async fn current_balance(&self, student_id: i64) -> ResultEngine<i64> {
        let last = last_active(&self.database, student_id).await?;
        Ok(last.map(|model| model.balance_minor).unwrap_or(0))
    }

    /// Sum of debit amounts over non-reversed entries; 0 when none exist.
    pub async fn total_debits(&self, student_id: i64) -> ResultEngine<i64> {
        self.sum_entry_column("debit_minor", student_id, None).await
    }

    /// Sum of credit amounts over non-reversed entries; 0 when none exist.
    pub async fn total_credits(&self, student_id: i64) -> ResultEngine<i64> {
        self.sum_entry_column("credit_minor", student_id, None).await
    }

    /// Credit sum scoped to one session (receipts and discounts of that
    /// academic year).
    pub async fn total_credits_for_session(
        &self,
        student_id: i64,
        session_id: i64,
    ) -> ResultEngine<i64> {
        self.sum_entry_column("credit_minor", student_id, Some(session_id))
            .await
    }

    async fn sum_entry_column(
        &self,
        column: &str,
        student_id: i64,
        session_id: Option<i64>,
    ) -> ResultEngine<i64> {
        let backend = self.database.get_database_backend();

        let mut sql = format!(
            "SELECT COALESCE(SUM({column}), 0) AS sum \
             FROM ledger_entries \
             WHERE student_id = ? AND is_reversed = ?"
        );
        let mut values: Vec<Value> = vec![student_id.into(), false.into()];
        if let Some(session_id) = session_id {
            sql.push_str(" AND session_id = ?");
            values.push(session_id.into());
        }

        let stmt = Statement::from_sql_and_values(backend, sql, values);
        let row = self.database.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }

    /// Recompute the cached balance of every non-reversed entry of one
    /// student, walking the journal in chronological order and folding
    /// [`next_balance`] from 0. Persists only the rows whose cached value
    /// changed and returns how many were rewritten.
    ///
    /// This is the correctness-recovery procedure after reversals and
    /// backdated inserts. Safe to call repeatedly: a second call finds
    /// nothing to rewrite.
    pub async fn recompute_chronological(&self, student_id: i64) -> ResultEngine<usize> {
        let changed = with_tx!(self, |tx| self.recompute_in_tx(&tx, student_id).await)?;
        if changed > 0 {
            self.notify(LedgerEvent::BalanceChanged { student_id });
        }
        Ok(changed)
    }

    pub(crate) async fn recompute_in_tx(
        &self,
        tx: &DatabaseTransaction,
        student_id: i64,
    ) -> ResultEngine<usize> {
        let mut models = load_chronological(tx, student_id).await?;
        // EntryKey is the authoritative chronological order for the fold.
        models.sort_by_key(|m| EntryKey {
            entry_date: m.entry_date,
            id: m.id,
        });

        let mut prior = 0i64;
        let mut changed = 0usize;
        for model in &models {
            let balance = next_balance(prior, model.debit_minor, model.credit_minor);
            if model.balance_minor != balance {
                set_balance(tx, model.id, balance).await?;
                changed += 1;
            }
            prior = balance;
        }

        tracing::debug!(student_id, changed, "recomputed running balances");
        Ok(changed)
    }
}
