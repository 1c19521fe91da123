//! Key metadata types

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Last index (inclusive) fetched for list and sorted-set previews
pub const PREVIEW_LAST_INDEX: isize = 10;

/// Data type of a key as reported by `TYPE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    String,
    List,
    Set,
    Hash,
    ZSet,
    /// Key does not exist
    None,
    /// Types without a preview (streams, module types)
    Other(String),
}

impl KeyKind {
    pub fn as_str(&self) -> &str {
        match self {
            KeyKind::String => "string",
            KeyKind::List => "list",
            KeyKind::Set => "set",
            KeyKind::Hash => "hash",
            KeyKind::ZSet => "zset",
            KeyKind::None => "none",
            KeyKind::Other(name) => name,
        }
    }
}

impl From<&str> for KeyKind {
    fn from(value: &str) -> Self {
        match value {
            "string" => KeyKind::String,
            "list" => KeyKind::List,
            "set" => KeyKind::Set,
            "hash" => KeyKind::Hash,
            "zset" => KeyKind::ZSet,
            "none" => KeyKind::None,
            other => KeyKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for KeyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Remaining lifetime of a key as reported by `TTL`.
///
/// Serializes back to the Redis integer form: seconds, `-1` or `-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeToLive {
    Expires(u64),
    /// Key exists without an expiry
    Persistent,
    /// Key does not exist
    Missing,
}

impl TimeToLive {
    pub fn from_reply(seconds: i64) -> Self {
        match seconds {
            -1 => TimeToLive::Persistent,
            s if s < 0 => TimeToLive::Missing,
            s => TimeToLive::Expires(s as u64),
        }
    }

    pub fn as_reply(&self) -> i64 {
        match self {
            TimeToLive::Expires(s) => *s as i64,
            TimeToLive::Persistent => -1,
            TimeToLive::Missing => -2,
        }
    }

    pub fn seconds(&self) -> Option<u64> {
        match self {
            TimeToLive::Expires(s) => Some(*s),
            _ => None,
        }
    }
}

impl Serialize for TimeToLive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_reply())
    }
}

/// Type-specific content summary attached to [`KeyInfo`] when the key exists.
///
/// Field names are part of the HTTP contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeyPreview {
    Scalar {
        value: Option<String>,
    },
    List {
        length: i64,
        values: Vec<String>,
    },
    Set {
        size: i64,
        members: Vec<String>,
    },
    Hash {
        size: i64,
        fields: BTreeMap<String, String>,
    },
    SortedSet {
        size: i64,
        members: Vec<String>,
    },
}

/// Structured summary of a single key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyInfo {
    pub key: String,
    pub exists: bool,
    #[serde(rename = "type")]
    pub kind: KeyKind,
    pub ttl: TimeToLive,
    #[serde(flatten)]
    pub preview: Option<KeyPreview>,
}
