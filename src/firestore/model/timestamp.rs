use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, TimeZone, Utc};

use crate::util::assert::hard_fail;

/// A point in time with nanosecond precision, independent of any time zone.
///
/// Valid timestamps lie between `0001-01-01T00:00:00Z` and `9999-12-31T23:59:59.999999999Z`.
/// Constructing one outside that range is a programming error; decoders validate untrusted input
/// with [`Timestamp::validate`] first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    seconds: i64,
    nanos: i32,
}

impl Timestamp {
    /// Seconds of `0001-01-01T00:00:00Z`.
    pub const MIN_SECONDS: i64 = -62_135_596_800;
    /// Seconds of `9999-12-31T23:59:59Z`.
    pub const MAX_SECONDS: i64 = 253_402_300_799;
    pub const MAX_NANOS: i32 = 999_999_999;

    /// Creates a timestamp, panicking if either component is out of range.
    #[track_caller]
    pub fn new(seconds: i64, nanos: i32) -> Self {
        if let Err(message) = Self::validate(seconds, nanos) {
            hard_fail(message);
        }
        Self { seconds, nanos }
    }

    /// Checks the range invariants without constructing a value.
    pub fn validate(seconds: i64, nanos: i32) -> Result<(), &'static str> {
        if seconds < Self::MIN_SECONDS {
            Err("timestamp beyond the earliest supported date")
        } else if seconds > Self::MAX_SECONDS {
            Err("timestamp beyond the latest supported date")
        } else if !(0..=Self::MAX_NANOS).contains(&nanos) {
            Err("timestamp nanos must be between 0 and 999999999")
        } else {
            Ok(())
        }
    }

    pub fn min() -> Self {
        Self {
            seconds: Self::MIN_SECONDS,
            nanos: 0,
        }
    }

    pub fn max() -> Self {
        Self {
            seconds: Self::MAX_SECONDS,
            nanos: Self::MAX_NANOS,
        }
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Self::new(duration.as_secs() as i64, duration.subsec_nanos() as i32),
            Err(err) => {
                let duration = err.duration();
                let mut seconds = -(duration.as_secs() as i64);
                let mut nanos = -(duration.subsec_nanos() as i32);
                if nanos < 0 {
                    seconds -= 1;
                    nanos += 1_000_000_000;
                }
                Self::new(seconds, nanos)
            }
        }
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.seconds >= 0 {
            UNIX_EPOCH + Duration::new(self.seconds as u64, self.nanos as u32)
        } else {
            UNIX_EPOCH - Duration::from_secs(self.seconds.unsigned_abs())
                + Duration::from_nanos(self.nanos as u64)
        }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> i32 {
        self.nanos
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

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match Utc.timestamp_opt(self.seconds, self.nanos as u32).single() {
            Some(datetime) => write!(f, "{}", datetime.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            None => write!(f, "Timestamp(seconds={}, nanos={})", self.seconds, self.nanos),
        }
    }
}
