//! Release Parser — pure, stateless transformation from raw object-store
//! entries to `Release` records and `ReleaseList` aggregates.
//!
//! Parsing a listing is deliberately best-effort: a malformed or ID-less
//! entry never aborts the whole listing, it is dropped with a logged
//! diagnostic and the rest proceeds. The single-release path is strict and
//! fails outright on an empty or malformed group.

use crate::{
    errors::ApiError,
    models::{
        object::ObjectEntry,
        release::{Release, ReleaseAssets, ReleaseList},
    },
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Zero-based index of the release identifier within a slash-delimited key,
/// per the fixed `<prefix>/<releaseId>/<os>/<filename>` layout.
const RELEASE_ID_SEGMENT: usize = 2;

/// Short-hash version length, the first characters of a release id.
const VERSION_LEN: usize = 7;

/// The asset slot a filename classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    LinuxDeb,
    LinuxAppImage,
    LinuxSnap,
    WindowsExe,
    MacosDmg,
}

/// Match a filename suffix against the fixed extension table. Unmatched
/// extensions are silently ignored, not an error: a release may have fewer
/// asset kinds than platforms.
pub fn classify_asset(filename: &str) -> Option<AssetKind> {
    if filename.ends_with(".deb") {
        Some(AssetKind::LinuxDeb)
    } else if filename.ends_with(".AppImage") {
        Some(AssetKind::LinuxAppImage)
    } else if filename.ends_with(".snap") {
        Some(AssetKind::LinuxSnap)
    } else if filename.ends_with(".exe") {
        Some(AssetKind::WindowsExe)
    } else if filename.ends_with(".dmg") {
        Some(AssetKind::MacosDmg)
    } else {
        None
    }
}

/// Derive the release identifier from an object key, if the key has one.
pub fn release_id_from_key(key: &str) -> Option<&str> {
    key.split('/')
        .nth(RELEASE_ID_SEGMENT)
        .filter(|segment| !segment.is_empty())
}

/// Group listing entries by release identifier, preserving input order
/// within each group. Entries whose key cannot yield an identifier are
/// dropped with a diagnostic.
pub fn group_by_release_id(entries: &[ObjectEntry]) -> BTreeMap<String, Vec<ObjectEntry>> {
    let mut groups: BTreeMap<String, Vec<ObjectEntry>> = BTreeMap::new();
    for entry in entries {
        match release_id_from_key(&entry.key) {
            Some(id) => groups.entry(id.to_string()).or_default().push(entry.clone()),
            None => debug!(key = %entry.key, "dropping entry without a release id"),
        }
    }
    groups
}

/// Parse one release from the objects belonging to it.
///
/// The first entry acts as the representative: all members of a release
/// share the same release event, so its timestamp stands in for the group.
/// Duplicate matches for the same asset slot are last-write-wins.
pub fn parse_release(entries: &[ObjectEntry]) -> Result<Release, ApiError> {
    let representative = entries.first().ok_or_else(|| {
        warn!("cannot parse a release from an empty object group");
        ApiError::Internal
    })?;

    let id = release_id_from_key(&representative.key).ok_or_else(|| {
        warn!(key = %representative.key, "release id could not be determined");
        ApiError::Internal
    })?;

    let mut assets = ReleaseAssets::default();
    for entry in entries {
        let filename = entry.filename();
        if let Some(kind) = classify_asset(filename) {
            set_asset(&mut assets, kind, filename.to_string());
        }
    }

    Ok(Release {
        id: id.to_string(),
        timestamp: representative.last_modified,
        version: id.chars().take(VERSION_LEN).collect(),
        assets,
    })
}

/// Parse a whole listing into releases, ascending by timestamp.
///
/// Groups that fail to parse are discarded with a log entry rather than
/// propagated; partial results are acceptable for a listing.
pub fn parse_release_list(entries: &[ObjectEntry]) -> ReleaseList {
    let groups = group_by_release_id(entries);

    let mut releases: Vec<Release> = groups
        .values()
        .filter_map(|group| match parse_release(group) {
            Ok(release) => Some(release),
            Err(err) => {
                debug!(error = %err, "discarding unparsable release group");
                None
            }
        })
        .collect();

    releases.sort_by_key(|release| release.timestamp);

    ReleaseList {
        total: releases.len(),
        releases,
    }
}

fn set_asset(assets: &mut ReleaseAssets, kind: AssetKind, filename: String) {
    match kind {
        AssetKind::LinuxDeb => assets.linux.deb = Some(filename),
        AssetKind::LinuxAppImage => assets.linux.app_image = Some(filename),
        AssetKind::LinuxSnap => assets.linux.snap = Some(filename),
        AssetKind::WindowsExe => assets.windows.exe = Some(filename),
        AssetKind::MacosDmg => assets.macos.dmg = Some(filename),
    }
}
