//! HTTP surface: GitHub-compatible issue endpoints served with axum.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod params;
pub mod server;
pub mod state;

pub use auth::AuthGate;
pub use error::ApiError;
pub use server::{build_router, run_server};
pub use state::AppState;
