#[macro_use]
extern crate log;

/// Client side
pub mod client;
/// Error types
pub mod error;
/// Protocol implementation
pub mod protocol;
