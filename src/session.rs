//! Per-request session state and its cookie.

use std::collections::HashMap;
use std::sync::Arc;

use cookie::{Cookie, SameSite};
use http::header::COOKIE;
use http::HeaderMap;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::value::Value;

/// Cookie attributes for a session.
///
/// The store keeps one default set and copies it into every new session, so
/// changing `session.options` in a handler only affects that session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options {
    pub path: String,
    pub domain: String,
    /// Lifetime in seconds. `0` makes a browser-session cookie, a negative
    /// value deletes the cookie.
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Options {
    pub fn new(path: impl Into<String>, max_age: i64) -> Self {
        Self {
            path: path.into(),
            max_age,
            ..Default::default()
        }
    }
}

/// A named session bound to one request.
///
/// `id` is empty until the first successful save; afterwards it is the
/// canonical UUID string of the session's row.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub values: HashMap<String, Value>,
    pub options: Options,
    pub is_new: bool,
    name: String,
}

/// A session shared through the per-request registry.
pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
    /// A fresh, unsaved session.
    pub fn new(name: impl Into<String>, options: Options) -> Self {
        Self {
            id: String::new(),
            values: HashMap::new(),
            options,
            is_new: true,
            name: name.into(),
        }
    }

    /// The session name, which is also the cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}

/// Builds the `Set-Cookie` cookie for `name` from session options.
///
/// A positive max age also sets `Expires` (left out when it would overflow);
/// a negative one sets `Max-Age=-1` and an `Expires` in the past so every
/// client drops the cookie.
pub(crate) fn new_cookie(name: &str, value: String, options: &Options) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_owned(), value);
    cookie.set_path(options.path.clone());
    if !options.domain.is_empty() {
        cookie.set_domain(options.domain.clone());
    }
    cookie.set_secure(options.secure);
    cookie.set_http_only(options.http_only);
    if let Some(same_site) = options.same_site {
        cookie.set_same_site(same_site);
    }

    if options.max_age > 0 {
        let max_age = Duration::seconds(options.max_age);
        cookie.set_max_age(max_age);
        if let Some(expires) = OffsetDateTime::now_utc().checked_add(max_age) {
            cookie.set_expires(expires);
        }
    } else if options.max_age < 0 {
        cookie.set_max_age(Duration::seconds(-1));
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH + Duration::seconds(1));
    }
    cookie
}

/// Value of the first request cookie called `name`.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| Cookie::split_parse(header))
        .flatten()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}
