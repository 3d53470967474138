//! Serde adapters for the on-disk catalog document.
//!
//! `Published` is stored as a native TOML datetime and `Duration` as
//! integer nanoseconds, matching files written by earlier tooling.

pub(crate) fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// RFC3339 timestamp stored as a TOML datetime. Quoted strings are accepted
/// on read.
pub mod published {
    use chrono::{DateTime, FixedOffset, SecondsFormat};
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
    use toml::value::Datetime;

    pub fn serialize<S>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rendered = value.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let datetime: Datetime = rendered.parse().map_err(ser::Error::custom)?;
        datetime.serialize(serializer)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match toml::Value::deserialize(deserializer)? {
            toml::Value::Datetime(datetime) => datetime.to_string(),
            toml::Value::String(text) => text,
            other => {
                return Err(de::Error::custom(format!(
                    "expected an RFC3339 timestamp, found {}",
                    other.type_str()
                )));
            }
        };

        DateTime::parse_from_rfc3339(raw.trim()).map_err(|err| {
            de::Error::custom(format!("invalid timestamp {raw:?}: {err}"))
        })
    }
}

/// `std::time::Duration` as signed integer nanoseconds.
pub mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer, de, ser};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = i64::try_from(value.as_nanos()).map_err(|_| {
            ser::Error::custom("duration does not fit in i64 nanoseconds")
        })?;
        serializer.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = i64::deserialize(deserializer)?;
        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .map_err(|_| de::Error::custom(format!("negative duration {nanos}")))
    }
}
