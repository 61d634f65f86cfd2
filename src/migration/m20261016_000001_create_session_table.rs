use sea_orm_migration::prelude::*;

use crate::gateway::{self, StorageGateway, DEFAULT_TABLE_NAME};

/// Creates the session table, `sessions` unless another name is given.
#[derive(Debug, Clone)]
pub struct Migration {
    table: String,
}

impl Migration {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    fn table(&self) -> Result<String, DbErr> {
        gateway::normalize_table_name(&self.table).map_err(|e| DbErr::Custom(e.to_string()))
    }
}

impl Default for Migration {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_NAME)
    }
}

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20261016_000001_create_session_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = StorageGateway::migration_query(manager.get_database_backend(), &self.table()?);
        manager.get_connection().execute_unprepared(&sql).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = format!("DROP TABLE IF EXISTS {}", self.table()?);
        manager.get_connection().execute_unprepared(&sql).await?;
        Ok(())
    }
}
