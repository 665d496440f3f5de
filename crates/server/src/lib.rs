//! cronvault server: HTTP API, bearer auth, and the `run` job entry point.

pub mod api;
pub mod auth;
pub mod backup;
pub mod cli;
pub mod error;
pub mod router;
pub mod startup;
pub mod state;

pub use router::build_router;
pub use state::AppState;
