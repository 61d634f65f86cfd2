//! The contract between an HTTP session framework and a session backend.

use std::sync::Arc;

use async_trait::async_trait;
use http::request::Parts;
use http::HeaderMap;

use crate::codec::CodecError;
use crate::error::Result;
use crate::session::{Session, SharedSession};

/// The request's session cookie could not be decoded.
///
/// The error still carries a usable, fresh session: callers that only want
/// to log the failure can continue with [`into_session`](Self::into_session).
#[derive(Debug, thiserror::Error)]
#[error("session cookie could not be decoded")]
pub struct CookieError<S> {
    session: S,
    #[source]
    source: Arc<CodecError>,
}

impl<S> CookieError<S> {
    pub(crate) fn new(session: S, source: Arc<CodecError>) -> Self {
        Self { session, source }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub fn codec_error(&self) -> &CodecError {
        &self.source
    }

    pub(crate) fn into_parts(self) -> (S, Arc<CodecError>) {
        (self.session, self.source)
    }
}

/// Session persistence as seen by request handlers.
///
/// A request is represented by its [`Parts`] (the cookie header, and the
/// extensions holding the per-request registry); a response by its
/// [`HeaderMap`], which receives the `Set-Cookie` header.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the request's session called `name`, creating it through
    /// [`new_session`](Self::new_session) on first access.
    ///
    /// Repeated calls for the same name on the same request return the same
    /// session and the same outcome.
    async fn get(
        &self,
        request: &mut Parts,
        name: &str,
    ) -> Result<SharedSession, CookieError<SharedSession>>;

    /// Builds the session called `name` for a request.
    ///
    /// Without a cookie the session is new. With a cookie that fails to
    /// decode, the new session comes back inside a [`CookieError`]. With a
    /// valid cookie whose row cannot be loaded (missing, expired, undecodable)
    /// the session is silently new.
    async fn new_session(
        &self,
        request: &Parts,
        name: &str,
    ) -> Result<Session, CookieError<Session>>;

    /// Persists the session and appends its `Set-Cookie` header.
    ///
    /// `response` is untouched when persistence fails.
    async fn save(
        &self,
        request: &Parts,
        response: &mut HeaderMap,
        session: &mut Session,
    ) -> Result<()>;

    /// Invalidates the client cookie, clears the values and removes the row.
    async fn delete(
        &self,
        request: &Parts,
        response: &mut HeaderMap,
        session: &mut Session,
    ) -> Result<()>;
}
