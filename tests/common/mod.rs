#![allow(dead_code)]

use std::collections::HashMap;

use http::header::{COOKIE, SET_COOKIE};
use http::request::Parts;
use http::{HeaderMap, HeaderValue};
use sea_orm::prelude::Uuid;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use signed_sessions_seaorm_store::row::SessionRow;
use signed_sessions_seaorm_store::{SeaOrmStore, Value};

pub const SESSION_NAME: &str = "session-test";
pub const TABLE: &str = "sessions";
pub const MAX_AGE: i64 = 3600;

pub const HASH_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
pub const BLOCK_KEY: &[u8] = b"fedcba9876543210";
pub const OLD_HASH_KEY: &[u8] = b"an-older-hash-key-still-accepted";
pub const OLD_BLOCK_KEY: &[u8] = b"an-older-aes-256-block-key-32byt";

/// A private in-memory SQLite database. One pooled connection, so every
/// query sees the same database.
pub async fn connection() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    Database::connect(opt).await.expect("connect to sqlite")
}

pub async fn store_with_keys(conn: DatabaseConnection, keys: &[&[u8]]) -> SeaOrmStore {
    SeaOrmStore::from_connection(conn, TABLE, "/", MAX_AGE, keys.iter().copied())
        .await
        .expect("build store")
}

pub async fn store() -> SeaOrmStore {
    store_with_keys(connection().await, &[HASH_KEY, BLOCK_KEY]).await
}

pub fn request() -> Parts {
    http::Request::new(()).into_parts().0
}

/// A request presenting `value` as the session cookie.
pub fn request_with_cookie(value: &str) -> Parts {
    let mut parts = request();
    let header = format!("{SESSION_NAME}={value}");
    parts
        .headers
        .insert(COOKIE, HeaderValue::from_str(&header).expect("cookie header"));
    parts
}

/// The only `Set-Cookie` header of a response, as sent.
pub fn set_cookie_header(response: &HeaderMap) -> String {
    let mut headers = response.get_all(SET_COOKIE).iter();
    let header = headers.next().expect("a Set-Cookie header");
    assert!(headers.next().is_none(), "more than one Set-Cookie header");
    header.to_str().expect("ascii header").to_owned()
}

/// The cookie value carried by the response's `Set-Cookie` header.
pub fn set_cookie_value(response: &HeaderMap) -> String {
    let header = set_cookie_header(response);
    let cookie = cookie::Cookie::parse(header).expect("parse Set-Cookie");
    assert_eq!(cookie.name(), SESSION_NAME);
    cookie.value().to_owned()
}

/// The stored row behind a session id, if any.
pub async fn stored_row(store: &SeaOrmStore, id: &str) -> Option<SessionRow> {
    let id = Uuid::parse_str(id).expect("canonical uuid");
    store
        .gateway()
        .select(id)
        .await
        .expect("select row")
        .map(|model| SessionRow::try_from(model).expect("map row"))
}

pub fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect()
}

pub async fn row_count(store: &SeaOrmStore) -> i64 {
    use sea_orm::{ConnectionTrait, Statement};

    let conn = store.gateway().connection();
    let row = conn
        .query_one(Statement::from_string(
            conn.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {}", store.gateway().table_name()),
        ))
        .await
        .expect("count rows")
        .expect("one row");
    row.try_get("", "n").expect("count column")
}
