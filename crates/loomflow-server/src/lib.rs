//! HTTP surface for Loomflow: agent/connection CRUD and flow execution.
//!
//! Everything here is plumbing around the engine — request validation,
//! status-code mapping, CORS, and environment-based feature toggling for the
//! generative credential. The engine itself never sees HTTP.

pub mod routes;
pub mod server;
pub mod state;

pub use server::{build_router, serve};
pub use state::AppState;
