//! Per-request session registry.
//!
//! Stored in the request extensions so every [`get`](crate::SessionStore::get)
//! for the same name on the same request sees one session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use http::request::Parts;

use crate::codec::CodecError;
use crate::session::{Session, SharedSession};
use crate::store::CookieError;

#[derive(Clone)]
struct Entry {
    session: SharedSession,
    error: Option<Arc<CodecError>>,
}

impl Entry {
    fn outcome(&self) -> Result<SharedSession, CookieError<SharedSession>> {
        match &self.error {
            None => Ok(self.session.clone()),
            Some(error) => Err(CookieError::new(self.session.clone(), error.clone())),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct Registry {
    sessions: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Registry {
    /// The registry of this request, installed on first use.
    pub(crate) fn of(request: &mut Parts) -> Self {
        if let Some(registry) = request.extensions.get::<Registry>() {
            return registry.clone();
        }
        let registry = Registry::default();
        request.extensions.insert(registry.clone());
        registry
    }

    pub(crate) fn lookup(
        &self,
        name: &str,
    ) -> Option<Result<SharedSession, CookieError<SharedSession>>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(Entry::outcome)
    }

    /// Registers the outcome of building `name`. If another task registered it
    /// first, that earlier outcome wins.
    pub(crate) fn register(
        &self,
        name: &str,
        session: Session,
        error: Option<Arc<CodecError>>,
    ) -> Result<SharedSession, CookieError<SharedSession>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(name.to_owned())
            .or_insert_with(|| Entry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                error,
            })
            .outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Options;

    fn parts() -> Parts {
        http::Request::new(()).into_parts().0
    }

    #[test]
    fn test_registry_installed_once() {
        let mut request = parts();
        let first = Registry::of(&mut request);
        first
            .register("sid", Session::new("sid", Options::default()), None)
            .unwrap();

        let second = Registry::of(&mut request);
        assert!(second.lookup("sid").is_some());
        assert!(second.lookup("other").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = Registry::of(&mut parts());
        let a = registry
            .register("sid", Session::new("sid", Options::default()), None)
            .unwrap();
        let b = registry
            .register("sid", Session::new("sid", Options::new("/other", 1)), None)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_error_is_replayed() {
        let registry = Registry::of(&mut parts());
        let error = Arc::new(CodecError::InvalidMac);
        let first = registry
            .register("sid", Session::new("sid", Options::default()), Some(error))
            .unwrap_err();
        let again = registry.lookup("sid").unwrap().unwrap_err();
        assert!(Arc::ptr_eq(first.session(), again.session()));
        assert!(matches!(again.codec_error(), CodecError::InvalidMac));
    }
}
