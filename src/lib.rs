//! Product store fronted by a cache-aside layer.
//!
//! [`cache::CacheAside`] keeps a cache region and a durable store in step and
//! offers two lookups: a populating one and a read-only one that never writes
//! the cache. [`application::products::ProductService`] wraps it with
//! validation, and [`infra::http`] exposes the service over HTTP.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
