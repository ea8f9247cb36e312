//! Cross-student dues reporting, built only from the running-balance
//! invariant (non-reversed sums), never from ad hoc summation elsewhere.

use sea_orm::{ConnectionTrait, PaginatorTrait, QueryFilter, Statement, Value, prelude::*};

use crate::{ReferenceType, ResultEngine, entries};

use super::Engine;

impl Engine {
    /// Net receivable position across all students:
    /// `SUM(debit) - SUM(credit)` over non-reversed entries.
    ///
    /// This is the raw net sum, not a sum of positive balances only: a
    /// student holding an advance reduces the institution-wide figure.
    /// Clamping per student to >= 0 is a presentation concern.
    pub async fn total_pending_dues(&self) -> ResultEngine<i64> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(debit_minor) - SUM(credit_minor), 0) AS net \
             FROM ledger_entries \
             WHERE is_reversed = ?",
            vec![Value::from(false)],
        );
        let row = self.database.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "net").ok()).unwrap_or(0))
    }

    /// Students whose non-reversed debits exceed their credits: the
    /// defaulters list.
    pub async fn student_ids_with_dues(&self) -> ResultEngine<Vec<i64>> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT student_id \
             FROM ledger_entries \
             WHERE is_reversed = ? \
             GROUP BY student_id \
             HAVING SUM(debit_minor) > SUM(credit_minor) \
             ORDER BY student_id",
            vec![Value::from(false)],
        );
        let rows = self.database.query_all(stmt).await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get("", "student_id")?);
        }
        Ok(ids)
    }

    /// True iff at least one non-reversed FEE_CHARGE entry exists for the
    /// student in the given session. Guards against double-charging.
    pub async fn has_fee_charge_entries(
        &self,
        student_id: i64,
        session_id: i64,
    ) -> ResultEngine<bool> {
        let count = entries::Entity::find()
            .filter(entries::Column::StudentId.eq(student_id))
            .filter(entries::Column::SessionId.eq(session_id))
            .filter(entries::Column::ReferenceType.eq(ReferenceType::FeeCharge.as_str()))
            .filter(entries::Column::IsReversed.eq(false))
            .count(&self.database)
            .await?;
        Ok(count > 0)
    }
}
