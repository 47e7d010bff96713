//! Serde helpers for durations written as seconds or as humantime strings
//! (`"500ms"`, `"10s"`, `"1m30s"`). Durations are always written back as
//! humantime strings.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    fn into_duration<E: de::Error>(self) -> Result<Duration, E> {
        match self {
            DurationValue::Seconds(seconds) => Ok(Duration::from_secs(seconds)),
            DurationValue::Text(text) => humantime::parse_duration(&text)
                .map_err(|e| E::custom(format!("Invalid duration '{text}': {e}"))),
        }
    }
}

pub mod duration {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        DurationValue::deserialize(deserializer)?.into_duration()
    }
}

pub mod option_duration {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.collect_str(&humantime::format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<DurationValue>::deserialize(deserializer)?
            .map(DurationValue::into_duration)
            .transpose()
    }
}
