use sea_orm_migration::prelude::*;

use crate::m20260412_100000_students::Students;
use crate::m20260412_101500_sessions::Sessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Receipts {
    Table,
    Id,
    StudentId,
    SessionId,
    AmountMinor,
    PaidOn,
    Note,
    CancelledAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Receipts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Receipts::StudentId).big_integer().not_null())
                    .col(ColumnDef::new(Receipts::SessionId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Receipts::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Receipts::PaidOn).date().not_null())
                    .col(ColumnDef::new(Receipts::Note).string())
                    .col(ColumnDef::new(Receipts::CancelledAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-student_id")
                            .from(Receipts::Table, Receipts::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-session_id")
                            .from(Receipts::Table, Receipts::SessionId)
                            .to(Sessions::Table, Sessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-student_id")
                    .table(Receipts::Table)
                    .col(Receipts::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        Ok(())
    }
}
