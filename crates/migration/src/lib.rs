pub use sea_orm_migration::prelude::*;

mod m20260412_100000_students;
mod m20260412_101500_sessions;
mod m20260413_090000_receipts;
mod m20260413_091500_ledger_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260412_100000_students::Migration),
            Box::new(m20260412_101500_sessions::Migration),
            Box::new(m20260413_090000_receipts::Migration),
            Box::new(m20260413_091500_ledger_entries::Migration),
        ]
    }
}
