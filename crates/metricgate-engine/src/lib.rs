//! Reference semantic engine and warehouse adapter for metricgate.
//!
//! Implements the `metricgate-core` engine traits on top of a dbt
//! `semantic_manifest.json` and a SQLite warehouse described by `profiles.yml`.
//! Gateway library code only sees the traits; the gateway binary wires this crate in.

pub mod adapter;
pub mod catalog;
pub mod engine;
pub mod manifest;
pub mod planner;
pub mod profiles;
pub mod sqlite;

pub use adapter::ProfileAdapterFactory;
pub use engine::{ManifestEngine, ManifestEngineBuilder};
