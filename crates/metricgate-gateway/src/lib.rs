//! metricgate HTTP gateway.
//!
//! Fronts a semantic-layer engine with a small authenticated JSON API:
//! catalog listing, metric queries, a liveness probe and an admin route that
//! hot-swaps the engine from a freshly compiled manifest. The crate only
//! talks to the engine through the traits in `metricgate_core::engine`; the
//! binary picks the concrete collaborators.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod engine_manager;
pub mod error;
pub mod router;

pub use app_state::AppState;
pub use engine_manager::EngineManager;
pub use router::build_router;
