//! Error types for the session store.
//!
//! Load-path failures (bad cookie, missing row, expired row) are swallowed at
//! [`SessionStore::new_session`](crate::SessionStore::new_session) and only
//! reach callers through logs. Write-path failures surface from
//! [`save`](crate::SessionStore::save) and [`delete`](crate::SessionStore::delete)
//! as [`Error`].

use sea_orm::DbErr;
use time::OffsetDateTime;

use crate::codec::CodecError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the store, its storage gateway and its row mapper.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The database driver reported an error (connection, DDL or DML).
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// Encoding or verifying a token failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// No row exists for the session identifier.
    #[error("session not found")]
    NotFound,

    /// The row exists but its `expires_on` is not in the future.
    #[error("session expired on {expires_on}")]
    Expired { expires_on: OffsetDateTime },

    /// The session identifier is not a canonical UUID.
    #[error("invalid session identifier: {0}")]
    InvalidId(#[from] uuid::Error),

    /// A reserved timestamp key holds something other than a timestamp.
    #[error("session value `{key}` must be a timestamp")]
    InvalidTimestamp { key: String },

    /// A timestamp cannot be represented, either read from storage or derived
    /// from a max age.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(String),

    /// The configured table name is not a plain (optionally qualified) identifier.
    #[error("invalid table name: `{0}`")]
    InvalidTableName(String),

    /// The encoded cookie cannot be placed in a `Set-Cookie` header.
    #[error("invalid Set-Cookie header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),
}
