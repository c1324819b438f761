//! HTTP API consumed by the wallet frontend.

pub mod server;
pub mod types;

pub use server::{AppState, router, start_server};
