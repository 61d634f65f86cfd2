//! # Signed-Cookie Session Store for Sea-ORM
//!
//! A server-side session store for HTTP applications. Session values live in a
//! database table reached through [Sea-ORM](https://crates.io/crates/sea-orm);
//! the client only holds a cookie carrying the session's identifier, signed
//! with HMAC-SHA256 and optionally encrypted with AES-GCM.
//!
//! ## Features
//!
//! - One row per session, keyed by a random UUID
//! - Signed (and optionally encrypted) session cookies with key rotation
//! - Session values serialized with MessagePack and stored as an opaque blob
//! - Creation, modification and expiry timestamps exposed as session values
//! - Custom table names, optionally qualified by a schema
//! - Works with PostgreSQL (default) or SQLite
//!
//! ## Quick Start
//!
//! ```no_run
//! use signed_sessions_seaorm_store::{SeaOrmStore, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::from_env()?;
//!
//! // Creates the session table if it is missing.
//! let store = SeaOrmStore::connect(&config, [b"a-very-secret-hash-key-of-32-byt"]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Session Management
//!
//! A request is represented by its [`http::request::Parts`], a response by its
//! [`http::HeaderMap`]:
//!
//! ```no_run
//! use http::HeaderMap;
//! use signed_sessions_seaorm_store::{SeaOrmStore, SessionStore, Value};
//!
//! # async fn example(store: SeaOrmStore, mut request: http::request::Parts) -> signed_sessions_seaorm_store::Result<()> {
//! // A bad cookie still yields a usable, fresh session.
//! let session = store
//!     .get(&mut request, "session-name")
//!     .await
//!     .unwrap_or_else(|e| e.into_session());
//! let mut session = session.lock().await;
//!
//! let visits = session.get("visits").and_then(Value::as_i64).unwrap_or(0);
//! session.insert("visits", visits + 1);
//!
//! let mut response = HeaderMap::new();
//! store.save(&request, &mut response, &mut session).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Timestamps
//!
//! Loaded sessions carry three extra values, [`row::CREATED_ON`],
//! [`row::MODIFIED_ON`] and [`row::EXPIRES_ON`]. They are taken out of the value
//! map before it is encoded and written to their own columns instead. Setting
//! `expires_on` before a save moves the session's expiry.

pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
#[cfg(feature = "migration")]
pub mod migration;
mod registry;
pub mod row;
mod seaorm_store;
pub mod session;
pub mod store;
pub mod value;

/// The Sea-ORM backed store.
///
/// This is the primary type you'll use from this crate.
pub use seaorm_store::SeaOrmStore;

pub use codec::{CodecChain, CodecError, SecureCookie};
pub use config::{ConfigError, StoreConfig};
pub use error::{Error, Result};
pub use gateway::StorageGateway;
pub use session::{Options, Session, SharedSession};
pub use store::{CookieError, SessionStore};
pub use value::Value;
