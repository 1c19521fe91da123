//! Storage layer
//!
//! Redis connections behind the `butler_core` store ports. The in-memory
//! store stands in for Redis in tests.

#[cfg(test)]
pub mod memory;
pub mod redis;

pub use self::redis::RedisConnector;
