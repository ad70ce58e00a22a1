//! Core library shared by the integrations CLI and TUI front-ends.

pub mod backend;
pub mod config;
pub mod integration;
pub mod params;
pub mod services;
pub mod view;

pub use integration::IntegrationType;
pub use params::{Identity, IntegrationParams, Item};
