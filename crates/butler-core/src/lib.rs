//! Redis Butler Core Library
//!
//! Domain types, the environment registry and the store port traits shared by
//! the Redis Butler server. Nothing in this crate talks to the network.

pub mod error;
pub mod ports;
pub mod registry;
pub mod types;

pub use error::{ButlerError, Result};
pub use ports::{KeyValueStore, StoreConnector};
pub use registry::EnvironmentRegistry;
pub use types::*;
