//! Strongly-typed identifiers for buffers, workers, and items.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a buffer within a topology.
///
/// Buffer ids are chosen by whoever builds the topology (e.g. `"Q0"`)
/// and must be unique among buffers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferId(pub String);

impl BufferId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BufferId {
    fn from(v: &str) -> Self {
        Self(v.to_owned())
    }
}

impl From<String> for BufferId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Identifies a worker within a topology.
///
/// Worker ids are chosen by whoever builds the topology (e.g. `"M1"`)
/// and must be unique among workers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(v: &str) -> Self {
        Self(v.to_owned())
    }
}

impl From<String> for WorkerId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Sequence number of an item within one run.
///
/// The generator numbers items from 1 in production order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
