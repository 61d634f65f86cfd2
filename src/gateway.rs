//! Row persistence for session data.
//!
//! [`StorageGateway`] owns the database connection and four statements
//! (insert, update, delete, select) rendered once against the configured
//! table. It knows nothing about cookies, codecs or expiry.

use sea_orm::prelude::{DateTimeWithTimeZone, Uuid};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, FromQueryResult, Statement, Value,
};

use crate::entity::session::Model;
use crate::error::{Error, Result};

/// Table used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "sessions";

/// Database access for the session table.
#[derive(Debug, Clone)]
pub struct StorageGateway {
    conn: DatabaseConnection,
    table: String,
    stmt_insert: String,
    stmt_update: String,
    stmt_delete: String,
    stmt_select: String,
}

impl StorageGateway {
    /// Renders the statements for `table_name` on the connection's backend.
    ///
    /// Surrounding back-ticks are stripped. The remaining name must be a plain
    /// identifier, optionally qualified once (`keyspace.table`); it is
    /// interpolated into SQL as is.
    pub fn new(conn: DatabaseConnection, table_name: &str) -> Result<Self> {
        let table = normalize_table_name(table_name)?;
        let backend = conn.get_database_backend();
        let p = |n| placeholder(backend, n);

        let stmt_insert = format!(
            "INSERT INTO {table} (id, session_data, created_on, modified_on, expires_on) \
            VALUES ({}, {}, {}, {}, {})",
            p(1),
            p(2),
            p(3),
            p(4),
            p(5),
        );
        let stmt_update = format!(
            "UPDATE {table} SET session_data = {}, created_on = {}, expires_on = {}, modified_on = {} \
            WHERE id = {}",
            p(1),
            p(2),
            p(3),
            p(4),
            p(5),
        );
        let stmt_delete = format!("DELETE FROM {table} WHERE id = {}", p(1));
        let stmt_select = format!(
            "SELECT id, session_data, created_on, modified_on, expires_on FROM {table} WHERE id = {}",
            p(1),
        );

        Ok(Self {
            conn,
            table,
            stmt_insert,
            stmt_update,
            stmt_delete,
            stmt_select,
        })
    }

    /// The `CREATE TABLE IF NOT EXISTS` statement for `table` on `backend`.
    ///
    /// Use it to put the table into your own migration scripts, or call
    /// [`create_table`](Self::create_table) to run it directly. `table` is
    /// expected to be normalized already.
    pub fn migration_query(backend: DatabaseBackend, table: &str) -> String {
        let (uuid, blob, timestamp) = match backend {
            DatabaseBackend::Postgres => ("uuid", "bytea", "timestamptz"),
            _ => ("uuid", "blob", "timestamp"),
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
            id {uuid}, \
            session_data {blob}, \
            created_on {timestamp}, \
            modified_on {timestamp}, \
            expires_on {timestamp}, \
            PRIMARY KEY (id))"
        )
    }

    /// Creates the session table if it does not exist yet. Idempotent.
    #[tracing::instrument(name = "Create session table", level = tracing::Level::DEBUG, skip_all, fields(table = %self.table))]
    pub async fn create_table(&self) -> Result<()> {
        let query = Self::migration_query(self.conn.get_database_backend(), &self.table);
        self.conn.execute_unprepared(&query).await?;
        Ok(())
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Consumes the gateway and returns its connection.
    pub fn into_connection(self) -> DatabaseConnection {
        self.conn
    }

    /// Writes a full row.
    #[tracing::instrument(name = "Insert session row", level = tracing::Level::DEBUG, skip_all, fields(%id))]
    pub async fn insert(
        &self,
        id: Uuid,
        payload: &[u8],
        created_on: DateTimeWithTimeZone,
        modified_on: DateTimeWithTimeZone,
        expires_on: DateTimeWithTimeZone,
    ) -> Result<()> {
        self.conn
            .execute(self.statement(
                &self.stmt_insert,
                vec![
                    id.into(),
                    payload.to_vec().into(),
                    created_on.into(),
                    modified_on.into(),
                    expires_on.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    /// Overwrites every column of the row keyed by `id`.
    ///
    /// Like a wide-column `UPDATE`, this writes the row even when it does not
    /// exist yet.
    #[tracing::instrument(name = "Update session row", level = tracing::Level::DEBUG, skip_all, fields(%id))]
    pub async fn update(
        &self,
        id: Uuid,
        payload: &[u8],
        created_on: DateTimeWithTimeZone,
        expires_on: DateTimeWithTimeZone,
        modified_on: DateTimeWithTimeZone,
    ) -> Result<()> {
        let result = self
            .conn
            .execute(self.statement(
                &self.stmt_update,
                vec![
                    payload.to_vec().into(),
                    created_on.into(),
                    expires_on.into(),
                    modified_on.into(),
                    id.into(),
                ],
            ))
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("no row to update, inserting");
            self.insert(id, payload, created_on, modified_on, expires_on)
                .await?;
        }
        Ok(())
    }

    /// Removes the row keyed by `id`. Removing a missing row is not an error.
    #[tracing::instrument(name = "Delete session row", level = tracing::Level::DEBUG, skip_all, fields(%id))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.conn
            .execute(self.statement(&self.stmt_delete, vec![id.into()]))
            .await?;
        Ok(())
    }

    /// Point lookup by primary key.
    #[tracing::instrument(name = "Select session row", level = tracing::Level::DEBUG, skip_all, fields(%id))]
    pub async fn select(&self, id: Uuid) -> Result<Option<Model>> {
        let row = Model::find_by_statement(self.statement(&self.stmt_select, vec![id.into()]))
            .one(&self.conn)
            .await?;
        Ok(row)
    }

    fn statement(&self, sql: &str, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(self.conn.get_database_backend(), sql, values)
    }
}

fn placeholder(backend: DatabaseBackend, n: usize) -> String {
    match backend {
        DatabaseBackend::Postgres => format!("${n}"),
        _ => "?".to_owned(),
    }
}

/// Strips surrounding back-ticks and checks the remaining name.
pub(crate) fn normalize_table_name(table_name: &str) -> Result<String> {
    let table = table_name.trim_matches('`');
    let mut segments = table.split('.');
    let valid = match (segments.next(), segments.next(), segments.next()) {
        (Some(name), None, None) => is_identifier(name),
        (Some(keyspace), Some(name), None) => is_identifier(keyspace) && is_identifier(name),
        _ => false,
    };
    if valid {
        Ok(table.to_owned())
    } else {
        Err(Error::InvalidTableName(table_name.to_owned()))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
