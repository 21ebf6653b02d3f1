//! Represents a versioned release and its platform-specific installer assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A versioned, dated bundle of downloadable platform installers grouped
/// under one identifier.
///
/// The identifier is the third path segment of any member object's key and
/// the `version` is its first seven characters (short-hash convention).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Release {
    /// Release identifier derived from the object key layout.
    pub id: String,

    /// Timestamp of a representative member object. All members of a release
    /// share the same release event, so any member's timestamp stands in.
    pub timestamp: DateTime<Utc>,

    /// Short version string, the first 7 characters of `id`.
    pub version: String,

    /// Per-platform asset filenames.
    pub assets: ReleaseAssets,
}

/// Fixed-shape asset record with one bucket per supported platform.
///
/// A release may legitimately have fewer asset kinds than platforms; absent
/// slots are omitted from the serialized form.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ReleaseAssets {
    pub linux: LinuxAssets,
    pub windows: WindowsAssets,
    pub macos: MacosAssets,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LinuxAssets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deb: Option<String>,

    #[serde(rename = "appImage", skip_serializing_if = "Option::is_none")]
    pub app_image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct WindowsAssets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MacosAssets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dmg: Option<String>,
}

/// Ordered collection of releases, ascending by timestamp (oldest first).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReleaseList {
    pub releases: Vec<Release>,
    pub total: usize,
}
