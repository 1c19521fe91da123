//! Core domain types

pub mod batch;
pub mod environment;
pub mod key;

pub use batch::*;
pub use environment::*;
pub use key::*;
