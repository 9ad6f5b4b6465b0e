use std::cmp::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::validation::{validate_integer, NumberOptions};

/// Seconds of `0001-01-01T00:00:00Z`, the earliest instant Firestore stores.
pub const MIN_SECONDS: i64 = -62_135_596_800;
/// Seconds of `9999-12-31T23:59:59Z`, the latest instant Firestore stores.
pub const MAX_SECONDS: i64 = 253_402_300_799;
const MAX_NANOS: i32 = 999_999_999;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    /// Builds a timestamp, carrying excess nanoseconds into seconds.
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let mut timestamp = Self { seconds, nanos };
        timestamp.normalize();
        timestamp
    }

    /// Builds a timestamp from exact parts, rejecting values Firestore cannot
    /// store.
    pub fn try_new(seconds: i64, nanos: i32) -> FirestoreResult<Self> {
        validate_integer(
            "seconds",
            Some(seconds as f64),
            NumberOptions::range(MIN_SECONDS as f64, MAX_SECONDS as f64),
        )?;
        validate_integer(
            "nanoseconds",
            Some(nanos as f64),
            NumberOptions::range(0.0, MAX_NANOS as f64),
        )?;
        Ok(Self { seconds, nanos })
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self::new(
            millis.div_euclid(1_000),
            (millis.rem_euclid(1_000) * 1_000_000) as i32,
        )
    }

    pub fn to_millis(&self) -> i64 {
        self.seconds * 1_000 + i64::from(self.nanos / 1_000_000)
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Self {
                seconds: duration.as_secs() as i64,
                nanos: duration.subsec_nanos() as i32,
            },
            Err(err) => {
                let duration = err.duration();
                Self::new(
                    -(duration.as_secs() as i64),
                    -(duration.subsec_nanos() as i32),
                )
            }
        }
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.seconds >= 0 {
            UNIX_EPOCH + Duration::from_secs(self.seconds as u64) + Duration::from_nanos(self.nanos as u64)
        } else {
            UNIX_EPOCH - Duration::from_secs((-self.seconds) as u64) + Duration::from_nanos(self.nanos as u64)
        }
    }

    /// RFC 3339 rendering with nanosecond precision, as used by the REST API.
    pub fn to_rfc3339(&self) -> String {
        Utc.timestamp_opt(self.seconds, self.nanos as u32)
            .single()
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn parse_rfc3339(value: &str) -> FirestoreResult<Self> {
        let datetime = DateTime::parse_from_rfc3339(value)
            .map_err(|err| invalid_argument(format!("Invalid timestamp \"{value}\": {err}")))?;
        let datetime_utc = datetime.with_timezone(&Utc);
        Ok(Timestamp::new(
            datetime_utc.timestamp(),
            datetime_utc.timestamp_subsec_nanos() as i32,
        ))
    }

    fn normalize(&mut self) {
        let extra_seconds = self.nanos.div_euclid(1_000_000_000);
        self.seconds += extra_seconds as i64;
        self.nanos = self.nanos.rem_euclid(1_000_000_000);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.seconds.cmp(&other.seconds) {
            Ordering::Equal => self.nanos.cmp(&other.nanos),
            ordering => ordering,
        }
    }
}
