//! The HTTP boundary (§6a): wires the earnings-core engines onto an axum
//! router, with authentication, role enforcement, and wire encoding handled
//! once, here, rather than in each handler.

pub mod auth;
pub mod blob_store;
pub mod error;
pub mod extract;
pub mod routes;
pub mod server;
pub mod state;

pub use routes::router;
pub use state::AppState;
