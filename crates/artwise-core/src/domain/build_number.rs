//! Build number keys.
//!
//! The CI server transmits build numbers as text, but history is always
//! ordered numerically: `10` sorts after `9`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ArtwiseError;

/// Numeric key of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildNumber(u64);

impl BuildNumber {
    pub const fn new(value: u64) -> Self {
        BuildNumber(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for BuildNumber {
    fn from(value: u64) -> Self {
        BuildNumber(value)
    }
}

impl FromStr for BuildNumber {
    type Err = ArtwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(BuildNumber)
            .map_err(|_| ArtwiseError::InvalidBuildNumber(s.to_string()))
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Serialized as text so it can key JSON objects.
impl Serialize for BuildNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BuildNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(u64),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(n) => Ok(BuildNumber(n)),
            Wire::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
