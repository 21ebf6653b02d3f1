//! Core data models for the release-distribution API.
//!
//! These entities represent object-store listing rows and the aggregated
//! release records derived from them. They serialize naturally as JSON via
//! `serde` in the camelCase shape the API exposes.

pub mod object;
pub mod release;
