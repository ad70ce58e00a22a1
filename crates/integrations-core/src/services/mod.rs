pub mod credentials;
pub mod loader;
