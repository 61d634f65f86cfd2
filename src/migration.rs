//! Schema migrations for applications that manage DDL through
//! `sea-orm-migration` instead of letting the store create its table.

pub use sea_orm_migration::prelude::*;

mod m20261016_000001_create_session_table;

pub use m20261016_000001_create_session_table::Migration as CreateSessionTable;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Own migration table so an application's migrator is left alone
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("signed_sessions_seaorm_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateSessionTable::default())]
    }
}
