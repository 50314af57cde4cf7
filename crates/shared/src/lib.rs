//! Wire types for the field-service backend.

pub mod messages;

pub use messages::*;
