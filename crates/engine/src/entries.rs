//! Ledger entry primitives.
//!
//! A [`LedgerEntry`] is one row of a student's fee journal: a single debit
//! (charge) or credit (payment) event, together with the cached running
//! balance immediately after the event. The journal is append-only;
//! corrections happen through the reversal flag, never by editing amounts.
//!
//! Amounts are stored as non-negative integer **minor units**. Exactly one of
//! `debit_minor`/`credit_minor` is non-zero, consistent with [`EntryType`].

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Whether an entry increases (`Debit`) or decreases (`Credit`) what the
/// student owes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for EntryType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::InvalidEntry(format!(
                "invalid entry type: {other}"
            ))),
        }
    }
}

/// The kind of business event that produced an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    FeeCharge,
    Receipt,
    Adjustment,
    Reversal,
    OpeningBalance,
    Discount,
}

impl ReferenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FeeCharge => "fee_charge",
            Self::Receipt => "receipt",
            Self::Adjustment => "adjustment",
            Self::Reversal => "reversal",
            Self::OpeningBalance => "opening_balance",
            Self::Discount => "discount",
        }
    }
}

impl TryFrom<&str> for ReferenceType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "fee_charge" => Ok(Self::FeeCharge),
            "receipt" => Ok(Self::Receipt),
            "adjustment" => Ok(Self::Adjustment),
            "reversal" => Ok(Self::Reversal),
            "opening_balance" => Ok(Self::OpeningBalance),
            "discount" => Ok(Self::Discount),
            other => Err(EngineError::InvalidEntry(format!(
                "invalid reference type: {other}"
            ))),
        }
    }
}

/// Composite chronological sort key: `entry_date` first, then the
/// store-assigned `id` as the deterministic tie-breaker.
///
/// Both the read path and the recompute path order entries by this key, so
/// the derived `Ord` (field order matters) is the single comparator for the
/// whole ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub entry_date: NaiveDate,
    pub id: i64,
}

/// Pure balance step: the running balance after applying one entry on top of
/// `prior_minor`. Append and recompute both fold this function, so the
/// invariant `balance[k] = balance[k-1] + debit[k] - credit[k]` has exactly
/// one definition.
pub const fn next_balance(prior_minor: i64, debit_minor: i64, credit_minor: i64) -> i64 {
    prior_minor + debit_minor - credit_minor
}

/// One row of a student's fee journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub entry_date: NaiveDate,
    pub particulars: String,
    pub entry_type: EntryType,
    pub debit_minor: i64,
    pub credit_minor: i64,
    /// Running balance immediately after this entry, over non-reversed
    /// entries only. Positive = due, negative = advance, zero = settled.
    pub balance_minor: i64,
    pub reference_type: ReferenceType,
    pub reference_id: Option<i64>,
    pub is_reversed: bool,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            entry_date: self.entry_date,
            id: self.id,
        }
    }

    /// Signed effect on the balance (positive increases what is owed).
    pub fn signed_minor(&self) -> i64 {
        self.debit_minor - self.credit_minor
    }
}

/// A ledger entry before the store assigns its id and cached balance.
///
/// Built by collaborators (fee-charge generation, payment collection,
/// opening-balance import, discounts) and handed to
/// [`Engine::append`](crate::Engine::append) / `append_batch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryDraft {
    pub student_id: i64,
    pub session_id: i64,
    pub entry_date: NaiveDate,
    pub particulars: String,
    pub entry_type: EntryType,
    pub amount_minor: i64,
    pub reference_type: ReferenceType,
    pub reference_id: Option<i64>,
}

impl EntryDraft {
    /// Creates a debit (charge) draft. The amount must be strictly positive.
    pub fn debit(
        student_id: i64,
        session_id: i64,
        entry_date: NaiveDate,
        reference_type: ReferenceType,
        amount_minor: i64,
        particulars: impl Into<String>,
    ) -> ResultEngine<Self> {
        Self::new(
            student_id,
            session_id,
            entry_date,
            EntryType::Debit,
            reference_type,
            amount_minor,
            particulars,
        )
    }

    /// Creates a credit (payment) draft. The amount must be strictly positive.
    pub fn credit(
        student_id: i64,
        session_id: i64,
        entry_date: NaiveDate,
        reference_type: ReferenceType,
        amount_minor: i64,
        particulars: impl Into<String>,
    ) -> ResultEngine<Self> {
        Self::new(
            student_id,
            session_id,
            entry_date,
            EntryType::Credit,
            reference_type,
            amount_minor,
            particulars,
        )
    }

    fn new(
        student_id: i64,
        session_id: i64,
        entry_date: NaiveDate,
        entry_type: EntryType,
        reference_type: ReferenceType,
        amount_minor: i64,
        particulars: impl Into<String>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            student_id,
            session_id,
            entry_date,
            particulars: particulars.into(),
            entry_type,
            amount_minor,
            reference_type,
            reference_id: None,
        })
    }

    #[must_use]
    pub fn reference_id(mut self, reference_id: i64) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    pub fn debit_minor(&self) -> i64 {
        match self.entry_type {
            EntryType::Debit => self.amount_minor,
            EntryType::Credit => 0,
        }
    }

    pub fn credit_minor(&self) -> i64 {
        match self.entry_type {
            EntryType::Debit => 0,
            EntryType::Credit => self.amount_minor,
        }
    }

    pub(crate) fn active_model(
        &self,
        balance_minor: i64,
        created_at: DateTime<Utc>,
    ) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::NotSet,
            student_id: ActiveValue::Set(self.student_id),
            session_id: ActiveValue::Set(self.session_id),
            entry_date: ActiveValue::Set(self.entry_date),
            particulars: ActiveValue::Set(self.particulars.clone()),
            entry_type: ActiveValue::Set(self.entry_type.as_str().to_string()),
            debit_minor: ActiveValue::Set(self.debit_minor()),
            credit_minor: ActiveValue::Set(self.credit_minor()),
            balance_minor: ActiveValue::Set(balance_minor),
            reference_type: ActiveValue::Set(self.reference_type.as_str().to_string()),
            reference_id: ActiveValue::Set(self.reference_id),
            is_reversed: ActiveValue::Set(false),
            created_at: ActiveValue::Set(created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub entry_date: Date,
    pub particulars: String,
    pub entry_type: String,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub balance_minor: i64,
    pub reference_type: String,
    pub reference_id: Option<i64>,
    pub is_reversed: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::students::Entity",
        from = "Column::StudentId",
        to = "super::students::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Students,
    #[sea_orm(
        belongs_to = "super::sessions::Entity",
        from = "Column::SessionId",
        to = "super::sessions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sessions,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            student_id: model.student_id,
            session_id: model.session_id,
            entry_date: model.entry_date,
            particulars: model.particulars,
            entry_type: EntryType::try_from(model.entry_type.as_str())?,
            debit_minor: model.debit_minor,
            credit_minor: model.credit_minor,
            balance_minor: model.balance_minor,
            reference_type: ReferenceType::try_from(model.reference_type.as_str())?,
            reference_id: model.reference_id,
            is_reversed: model.is_reversed,
            created_at: model.created_at,
        })
    }
}
