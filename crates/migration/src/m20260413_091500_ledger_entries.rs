use sea_orm_migration::prelude::*;

use crate::m20260412_100000_students::Students;
use crate::m20260412_101500_sessions::Sessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum LedgerEntries {
    Table,
    Id,
    StudentId,
    SessionId,
    EntryDate,
    Particulars,
    EntryType,
    DebitMinor,
    CreditMinor,
    BalanceMinor,
    ReferenceType,
    ReferenceId,
    IsReversed,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::SessionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::EntryDate).date().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::Particulars)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::EntryType).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::DebitMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::CreditMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::ReferenceType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::ReferenceId).big_integer())
                    .col(
                        ColumnDef::new(LedgerEntries::IsReversed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-student_id")
                            .from(LedgerEntries::Table, LedgerEntries::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-session_id")
                            .from(LedgerEntries::Table, LedgerEntries::SessionId)
                            .to(Sessions::Table, Sessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Drives `current_balance` (last-entry lookup) and chronological replay.
        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-student-chrono")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::StudentId)
                    .col(LedgerEntries::EntryDate)
                    .col(LedgerEntries::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-reference")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::ReferenceType)
                    .col(LedgerEntries::ReferenceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        Ok(())
    }
}
