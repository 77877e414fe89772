//! metricgate core: transport-agnostic contracts shared by the gateway and engines.
//!
//! This crate defines the error surface, the result/descriptor model and the
//! engine/adapter traits. It carries no transport or runtime dependencies so
//! alternative engines can implement it without pulling in the HTTP stack.
//!
//! `unwrap`, `expect` and `panic!` are denied crate-wide.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod engine;
pub mod error;
pub mod model;

/// Shared result type.
pub use error::{Result, GateError};
