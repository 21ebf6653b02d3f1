//! Release-distribution API.
//!
//! Lists versioned release artifacts stored in an object store, aggregates
//! them into platform-grouped `Release` records, and serves downloads either
//! by redirecting to a short-lived signed URL or by proxying the bytes. A
//! TTL cache in front of the object store absorbs repeated listing and
//! signed-URL requests.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
