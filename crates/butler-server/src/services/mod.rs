//! Business logic services

pub mod connection_cache;
pub mod key_service;

pub use connection_cache::ConnectionCache;
pub use key_service::KeyService;
