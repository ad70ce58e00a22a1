mod client;

pub use client::{BackendClient, BackendError, BackendResult, DEFAULT_BACKEND_URL};
