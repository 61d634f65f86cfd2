//! Mapping between an in-memory [`Session`](crate::Session) and its row.
//!
//! Timestamps live in their own columns. In memory they travel in the value
//! map under the reserved keys below, but only transiently: they are stripped
//! before the map is encoded and reinjected from the columns after it is
//! decoded, so the persisted payload never carries them.

use std::collections::HashMap;

use chrono::DateTime;
use sea_orm::prelude::{DateTimeWithTimeZone, Uuid};
use time::{Duration, OffsetDateTime};

use crate::entity::session::Model;
use crate::error::{Error, Result};
use crate::value::Value;

pub const CREATED_ON: &str = "created_on";
pub const MODIFIED_ON: &str = "modified_on";
pub const EXPIRES_ON: &str = "expires_on";

/// Keys that only cross the persistence boundary as columns.
pub const RESERVED_KEYS: [&str; 3] = [CREATED_ON, MODIFIED_ON, EXPIRES_ON];

/// A session row with timestamps in `time` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub id: Uuid,
    pub session_data: Vec<u8>,
    pub created_on: OffsetDateTime,
    pub modified_on: OffsetDateTime,
    pub expires_on: OffsetDateTime,
}

impl TryFrom<Model> for SessionRow {
    type Error = Error;

    fn try_from(model: Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            session_data: model.session_data,
            created_on: from_db_time(model.created_on)?,
            modified_on: from_db_time(model.modified_on)?,
            expires_on: from_db_time(model.expires_on)?,
        })
    }
}

impl SessionRow {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_on <= now
    }

    /// Puts the column timestamps back into a decoded value map so the next
    /// save carries them forward.
    pub fn inject_timestamps(&self, values: &mut HashMap<String, Value>) {
        values.insert(CREATED_ON.to_owned(), Value::Timestamp(self.created_on));
        values.insert(MODIFIED_ON.to_owned(), Value::Timestamp(self.modified_on));
        values.insert(EXPIRES_ON.to_owned(), Value::Timestamp(self.expires_on));
    }
}

/// The three timestamp columns written on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    pub created_on: OffsetDateTime,
    pub modified_on: OffsetDateTime,
    pub expires_on: OffsetDateTime,
}

impl Timestamps {
    /// Timestamps for a first save.
    ///
    /// `created_on` and `expires_on` come from the value map when present,
    /// otherwise `now` and `now + max_age`. `modified_on` equals `created_on`.
    /// A non-positive `max_age` yields an expiry that is already due.
    pub fn for_insert(
        values: &HashMap<String, Value>,
        now: OffsetDateTime,
        max_age: i64,
    ) -> Result<Self> {
        let created_on = timestamp_or(values, CREATED_ON, now)?;
        let expires_on = timestamp_or(values, EXPIRES_ON, expiry_from(now, max_age)?)?;
        Ok(Self {
            created_on,
            modified_on: created_on,
            expires_on,
        })
    }

    /// Timestamps for a save over an existing row.
    ///
    /// Same derivation as [`for_insert`](Self::for_insert), except the expiry is
    /// never earlier than `now + max_age`.
    pub fn for_update(
        values: &HashMap<String, Value>,
        now: OffsetDateTime,
        max_age: i64,
    ) -> Result<Self> {
        let floor = expiry_from(now, max_age)?;
        let mut timestamps = Self::for_insert(values, now, max_age)?;
        if timestamps.expires_on < floor {
            timestamps.expires_on = floor;
        }
        Ok(timestamps)
    }
}

/// Removes the reserved keys from a value map before it is encoded.
pub fn strip_reserved(values: &mut HashMap<String, Value>) {
    for key in RESERVED_KEYS {
        values.remove(key);
    }
}

fn timestamp_or(
    values: &HashMap<String, Value>,
    key: &str,
    default: OffsetDateTime,
) -> Result<OffsetDateTime> {
    match values.get(key) {
        None => Ok(default),
        Some(value) => value.as_timestamp().ok_or_else(|| Error::InvalidTimestamp {
            key: key.to_owned(),
        }),
    }
}

/// `now + max_age`, or an error when that instant is not representable.
fn expiry_from(now: OffsetDateTime, max_age: i64) -> Result<OffsetDateTime> {
    now.checked_add(Duration::seconds(max_age))
        .ok_or_else(|| Error::TimestampOutOfRange(format!("{now} + {max_age}s")))
}

/// Converts a `time` timestamp into the chrono type sea-orm binds.
pub(crate) fn to_db_time(time: OffsetDateTime) -> Result<DateTimeWithTimeZone> {
    DateTime::from_timestamp(time.unix_timestamp(), time.nanosecond())
        .map(|datetime| datetime.fixed_offset())
        .ok_or_else(|| Error::TimestampOutOfRange(time.to_string()))
}

/// Converts a chrono timestamp read from the database into `time`.
pub(crate) fn from_db_time(datetime: DateTimeWithTimeZone) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(datetime.timestamp())
        .and_then(|time| time.replace_nanosecond(datetime.timestamp_subsec_nanos()))
        .map_err(|_| Error::TimestampOutOfRange(datetime.to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(unix: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(unix).unwrap()
    }

    #[test]
    fn test_insert_defaults_from_now() {
        let now = at(1_700_000_000);
        let ts = Timestamps::for_insert(&HashMap::new(), now, 3600).unwrap();
        assert_eq!(ts.created_on, now);
        assert_eq!(ts.modified_on, now);
        assert_eq!(ts.expires_on, now + Duration::hours(1));
    }

    #[test]
    fn test_insert_reads_values() {
        let now = at(1_700_000_000);
        let mut values = HashMap::new();
        values.insert(CREATED_ON.to_owned(), Value::from(at(1_600_000_000)));
        values.insert(EXPIRES_ON.to_owned(), Value::from(at(1_650_000_000)));

        let ts = Timestamps::for_insert(&values, now, 3600).unwrap();
        assert_eq!(ts.created_on, at(1_600_000_000));
        assert_eq!(ts.modified_on, at(1_600_000_000));
        // The insert path takes a supplied expiry as is.
        assert_eq!(ts.expires_on, at(1_650_000_000));
    }

    #[test]
    fn test_insert_non_positive_max_age_is_due() {
        let now = at(1_700_000_000);
        let ts = Timestamps::for_insert(&HashMap::new(), now, 0).unwrap();
        assert!(ts.expires_on <= now);
    }

    #[test]
    fn test_update_extends_expiry() {
        let now = at(1_700_000_000);
        let mut values = HashMap::new();
        values.insert(EXPIRES_ON.to_owned(), Value::from(now + Duration::minutes(5)));

        let ts = Timestamps::for_update(&values, now, 3600).unwrap();
        assert_eq!(ts.expires_on, now + Duration::hours(1));
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let now = at(1_700_000_000);
        for max_age in [i64::MAX / 2, i64::MIN / 2] {
            let err = Timestamps::for_insert(&HashMap::new(), now, max_age).unwrap_err();
            assert!(matches!(err, Error::TimestampOutOfRange(_)));
            let err = Timestamps::for_update(&HashMap::new(), now, max_age).unwrap_err();
            assert!(matches!(err, Error::TimestampOutOfRange(_)));
        }
    }

    #[test]
    fn test_update_keeps_later_expiry() {
        let now = at(1_700_000_000);
        let later = now + Duration::days(2);
        let mut values = HashMap::new();
        values.insert(EXPIRES_ON.to_owned(), Value::from(later));

        let ts = Timestamps::for_update(&values, now, 3600).unwrap();
        assert_eq!(ts.expires_on, later);
    }

    #[test]
    fn test_update_modified_tracks_created() {
        let now = at(1_700_000_000);
        let mut values = HashMap::new();
        values.insert(CREATED_ON.to_owned(), Value::from(at(1_600_000_000)));
        values.insert(MODIFIED_ON.to_owned(), Value::from(at(1_650_000_000)));

        let ts = Timestamps::for_update(&values, now, 3600).unwrap();
        assert_eq!(ts.modified_on, ts.created_on);
    }

    #[test]
    fn test_reserved_key_must_be_timestamp() {
        let mut values = HashMap::new();
        values.insert(CREATED_ON.to_owned(), Value::from("yesterday"));
        let err = Timestamps::for_insert(&values, at(0), 60).unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp { key } if key == CREATED_ON));
    }

    #[test]
    fn test_strip_and_inject() {
        let now = at(1_700_000_000);
        let row = SessionRow {
            id: Uuid::new_v4(),
            session_data: Vec::new(),
            created_on: now,
            modified_on: now,
            expires_on: now + Duration::hours(1),
        };
        let mut values = HashMap::new();
        values.insert("user".to_owned(), Value::from("alice"));

        row.inject_timestamps(&mut values);
        assert_eq!(values.len(), 4);
        assert_eq!(values[EXPIRES_ON].as_timestamp(), Some(row.expires_on));

        strip_reserved(&mut values);
        assert_eq!(values.len(), 1);
        assert!(RESERVED_KEYS.iter().all(|key| !values.contains_key(*key)));
    }

    #[test]
    fn test_db_time_roundtrip_keeps_nanos() {
        let time = at(1_700_000_000).replace_nanosecond(123_456_789).unwrap();
        let back = from_db_time(to_db_time(time).unwrap()).unwrap();
        assert_eq!(back, time);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = at(1_700_000_000);
        let row = SessionRow {
            id: Uuid::new_v4(),
            session_data: Vec::new(),
            created_on: now,
            modified_on: now,
            expires_on: now,
        };
        assert!(row.is_expired(now));
        assert!(!row.is_expired(now - Duration::seconds(1)));
    }
}
