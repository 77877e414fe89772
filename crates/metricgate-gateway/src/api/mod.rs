//! HTTP handlers and their wire shapes.

pub mod admin;
pub mod routes;
pub mod schemas;
