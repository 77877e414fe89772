//! metricgate: an authenticated HTTP front for a semantic-layer engine.
//!
//! Re-exports the workspace crates so users can depend on a single crate:
//! `core` (errors, data model, engine traits), `engine` (manifest-driven
//! reference engine with a SQLite adapter) and `gateway` (lifecycle manager,
//! auth tiers, axum router).

pub mod core {
    pub use metricgate_core::*;
}

pub mod engine {
    pub use metricgate_engine::*;
}

pub mod gateway {
    pub use metricgate_gateway::*;
}
