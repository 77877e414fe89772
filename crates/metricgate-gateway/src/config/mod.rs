//! Process configuration: environment settings and profile directory resolution.

pub mod profiles;
pub mod settings;

pub use profiles::{ProfileSource, ProfilesDir};
pub use settings::Settings;
