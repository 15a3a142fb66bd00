use std::convert::TryFrom;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// The number of milliseconds since the [`UNIX_EPOCH`].
///
/// - Internally represented by a non-negative [`i64`] to ease interop with
///   storage layers and wire formats that don't support unsigned 64-bit ints.
/// - Can represent any time from January 1st, 1970 00:00:00.000 UTC to
///   roughly 292 million years in the future.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct UtcMillis(i64);

impl UtcMillis {
    /// Creates a new [`UtcMillis`] from the current [`SystemTime`].
    ///
    /// Panics if the current time is not within bounds, which cannot happen
    /// on any system with a sane clock.
    pub fn now() -> Self {
        Self::try_from(SystemTime::now()).expect("System clock is insane")
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from(SystemTime::from(self))
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::try_from(SystemTime::from(dt))
            .expect("chrono datetime outside representable range")
    }

    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        let millis = i64::try_from(duration.as_millis()).ok()?;
        self.0.checked_add(millis).map(Self)
    }

    pub fn checked_sub(self, duration: Duration) -> Option<Self> {
        let millis = i64::try_from(duration.as_millis()).ok()?;
        self.0.checked_sub(millis).map(Self)
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        self.checked_add(duration).unwrap_or(Self(i64::MAX))
    }

    pub fn saturating_sub(self, duration: Duration) -> Self {
        self.checked_sub(duration).unwrap_or(Self(0))
    }
}

impl From<UtcMillis> for SystemTime {
    fn from(timestamp: UtcMillis) -> Self {
        let millis_u64 = u64::try_from(timestamp.0)
            .expect("Non-negative invariant was violated");
        UNIX_EPOCH + Duration::from_millis(millis_u64)
    }
}

impl TryFrom<SystemTime> for UtcMillis {
    type Error = anyhow::Error;
    fn try_from(system_time: SystemTime) -> anyhow::Result<Self> {
        system_time
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_millis())
            .map(i64::try_from)
            .map(|res| res.map(Self))
            .context("Current time is before January 1st, 1970")?
            .context("Current time is more than 292 million years past epoch")
    }
}

impl<'de> Deserialize<'de> for UtcMillis {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        if value >= 0 {
            Ok(UtcMillis(value))
        } else {
            Err(de::Error::invalid_value(
                de::Unexpected::Signed(value),
                &"Unix millisecond timestamp must be non-negative",
            ))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrips_through_system_time() {
        let now = UtcMillis::now();
        let st = SystemTime::from(now);
        let back = UtcMillis::try_from(st).unwrap();
        assert_eq!(now, back);
    }

    #[test]
    fn deserialize_enforces_nonnegative() {
        assert_eq!(
            serde_json::from_str::<UtcMillis>("42").unwrap().as_i64(),
            42
        );
        assert!(serde_json::from_str::<UtcMillis>("-1").is_err());
    }

    #[test]
    fn checked_add_sub_roundtrip() {
        let t = UtcMillis::from_millis(1_000_000);
        let later = t.checked_add(Duration::from_secs(5)).unwrap();
        assert_eq!(later.as_i64(), 1_005_000);
        let back = later.checked_sub(Duration::from_secs(5)).unwrap();
        assert_eq!(back, t);
    }
}
