//! Serde helpers for the backend's loose JSON shapes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Optional timestamps.
///
/// The backend emits either full RFC 3339 timestamps or bare `YYYY-MM-DD`
/// dates; a bare date is read as midnight UTC. Serialization always writes
/// RFC 3339.
pub(crate) mod opt_datetime {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(text) => parse(text).map(Some).map_err(serde::de::Error::custom),
        }
    }

    fn parse(text: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("invalid date: {text}"))
    }
}

/// `completedBy` arrives either as a bare user id or as `{id, name}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum UserRefWire {
    Id(u64),
    Full {
        id: u64,
        #[serde(default)]
        name: String,
    },
}
