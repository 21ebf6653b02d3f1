//! Represents one entry of an object-store listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single object-store listing row.
///
/// Sourced directly from ListObjectsV2 and never persisted anywhere else;
/// the cached listing payload is a JSON array of these.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    /// Slash-delimited object key, `<prefix>/<releaseId>/<os>/<filename>`.
    pub key: String,

    /// When the object was last modified.
    pub last_modified: DateTime<Utc>,

    /// Object size in bytes.
    pub size: i64,
}

impl ObjectEntry {
    /// Listing depth of this entry: the count of `/` separators in the key.
    pub fn depth(&self) -> usize {
        self.key.matches('/').count()
    }

    /// Bare filename, i.e. the final path segment of the key.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}
