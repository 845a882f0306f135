//! Salesforce scalar field wrappers.
//!
//! Salesforce rejects an empty string for date, time and binary fields, so
//! each wrapper serializes its empty value as JSON `null` and reads `null`
//! back as empty.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";
const TIME_FORMAT: &str = "%H:%M:%S%.3fZ";

macro_rules! nullable_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Wrap an already formatted value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if self.0.is_empty() {
                    serializer.serialize_none()
                } else {
                    serializer.serialize_str(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Ok(Self(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
            }
        }
    };
}

nullable_string!(
    /// A date field, `YYYY-MM-DD`.
    Date
);

nullable_string!(
    /// A datetime field, `YYYY-MM-DDTHH:MM:SS.sss+0000`.
    Datetime
);

nullable_string!(
    /// A time field, `HH:MM:SS.sssZ`.
    Time
);

impl Date {
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, DATE_FORMAT).ok()
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Self(date.format(DATE_FORMAT).to_string())
    }
}

impl Datetime {
    /// Parse the value. Accepts the Salesforce form (`+0000` offset) and
    /// RFC 3339.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(&self.0, DATETIME_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(&self.0))
            .ok()
    }
}

impl From<DateTime<Utc>> for Datetime {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at.format(DATETIME_FORMAT).to_string())
    }
}

impl From<DateTime<FixedOffset>> for Datetime {
    fn from(at: DateTime<FixedOffset>) -> Self {
        Self(at.format(DATETIME_FORMAT).to_string())
    }
}

impl Time {
    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.0, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&self.0, "%H:%M:%S"))
            .ok()
    }
}

impl From<NaiveTime> for Time {
    fn from(time: NaiveTime) -> Self {
        Self(time.format(TIME_FORMAT).to_string())
    }
}

/// A base64 field such as `Attachment.Body`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.serialize_str(&STANDARD.encode(&self.0))
        }
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) if !encoded.is_empty() => STANDARD
                .decode(encoded.as_bytes())
                .map(Self)
                .map_err(serde::de::Error::custom),
            _ => Ok(Self::default()),
        }
    }
}
