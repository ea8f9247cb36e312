//! Payment receipts.
//!
//! A receipt is the originating record for a CREDIT ledger entry. Cancelling
//! a receipt never deletes it; it sets `cancelled_at` and reverses the
//! receipt's ledger effect through the reversal protocol.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub amount_minor: i64,
    pub paid_on: Date,
    pub note: Option<String>,
    pub cancelled_at: Option<DateTimeUtc>,
}

impl Receipt {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub amount_minor: i64,
    pub paid_on: Date,
    pub note: Option<String>,
    pub cancelled_at: Option<DateTimeUtc>,
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

impl From<Model> for Receipt {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            session_id: model.session_id,
            amount_minor: model.amount_minor,
            paid_on: model.paid_on,
            note: model.note,
            cancelled_at: model.cancelled_at,
        }
    }
}
