//! Utility types shared by the importers.
//!
//! This module contains the fundamental types used throughout the library:
//! - [`TypedStream`] - Length-tagged numeric buffers
//! - [`Error`] / [`Result`] - Error handling
//! - [`logging`] - `tracing` subscriber setup
//! - [`fs`] - file replacement via a temporary sibling
//! - Math type re-exports from glam

mod error;
mod math;
mod stream;
pub mod fs;
pub mod logging;

pub use error::*;
pub use math::*;
pub use stream::*;
