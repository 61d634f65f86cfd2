//! Raw session row as read back from the database.
//!
//! The table name is chosen at runtime, so rows are materialized from the
//! gateway's prepared `SELECT` with [`FromQueryResult`] rather than through a
//! static `DeriveEntityModel` entity.

use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;

/// One row of the session table.
///
/// # Database Schema
///
/// | Column       | Type       | Description                              |
/// |--------------|------------|------------------------------------------|
/// | id           | uuid (PK)  | Session identifier                       |
/// | session_data | blob       | Codec-encoded value map                  |
/// | created_on   | timestamp  | First save of the session                |
/// | modified_on  | timestamp  | Last save of the session                 |
/// | expires_on   | timestamp  | Loads at or after this instant fail      |
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult)]
pub struct Model {
    pub id: Uuid,
    pub session_data: Vec<u8>,
    pub created_on: DateTimeWithTimeZone,
    pub modified_on: DateTimeWithTimeZone,
    pub expires_on: DateTimeWithTimeZone,
}
