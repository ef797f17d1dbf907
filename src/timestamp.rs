//! Lenient timestamp (de)serialization for backend payloads.
//!
//! The backend emits both RFC 3339 strings and offset-less ISO strings
//! (`2024-01-03T10:00:00`). Offset-less values are read as UTC. Output is
//! always RFC 3339.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Parse an RFC 3339 or offset-less ISO datetime string.
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    None
}

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Same as the parent module, for `Option<DateTime<Utc>>` fields.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.is_empty() => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_rfc3339_and_naive() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        assert_eq!(parse("2024-01-03T10:00:00Z"), Some(expected));
        assert_eq!(parse("2024-01-03T11:00:00+01:00"), Some(expected));
        assert_eq!(parse("2024-01-03T10:00:00"), Some(expected));
        assert_eq!(parse("2024-01-03T10:00"), Some(expected));
        assert_eq!(parse("next tuesday"), None);
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Stamped {
        #[serde(default, with = "super::option")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn optional_field_accepts_null_and_missing() {
        let p: Stamped = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(p.at.is_none());
        let p: Stamped = serde_json::from_str("{}").unwrap();
        assert!(p.at.is_none());
        let p: Stamped = serde_json::from_str(r#"{"at": "2024-01-03T10:00:00"}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&p).unwrap()["at"],
            "2024-01-03T10:00:00+00:00"
        );
    }
}
