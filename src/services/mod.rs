//! Service layer: object-store gateway, cache policy, release parsing,
//! query orchestration, and download streaming.

pub mod cache;
pub mod download;
pub mod object_store;
pub mod parser;
pub mod release_service;

#[cfg(test)]
pub mod testing;
