//! Academic sessions.
//!
//! A session scopes fee charges to one academic year. Balances are
//! whole-account (carried across sessions); entries are only tagged with the
//! session they originated in.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An academic year, e.g. "2026-27".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub name: String,
    pub starts_on: Date,
    pub ends_on: Date,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub starts_on: Date,
    pub ends_on: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    LedgerEntries,
    #[sea_orm(has_many = "super::receipts::Entity")]
    Receipts,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl Related<super::receipts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Session {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            starts_on: model.starts_on,
            ends_on: model.ends_on,
        }
    }
}
