//! Marrow Core - Foundational types for the Marrow runtime
//!
//! This crate provides the types every other Marrow crate depends on:
//! - Error types and a `Result` alias
//! - Little-endian binary I/O extension traits used by the asset formats

mod error;
pub mod io;

pub use error::{MarrowError, Result};
