//! Database row shapes used by the storage gateway.

/// The persisted session row.
pub mod session;
