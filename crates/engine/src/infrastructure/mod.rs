//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod bounded;
pub mod canvas;
pub mod clock;
pub mod config;
pub mod memory;
pub mod ports;
pub mod sqlite;
