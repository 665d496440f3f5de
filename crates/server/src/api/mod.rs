//! Domain-focused API endpoint modules.
//!
//! Handlers stay thin: parse, call one component, map the error.

mod backups;
mod config;
pub mod doc;
mod health;
mod passwords;
mod schedules;
mod status;

// ── Re-exports ───────────────────────────────────────────────────
// Flat `api::foo` paths used by router.rs route registration.

pub use backups::{backups_delete, backups_list, backups_trigger};
pub use config::{config_get, config_put};
pub use health::health;
pub use passwords::{
    passwords_delete, passwords_get, passwords_list, passwords_put, passwords_reset,
};
pub use schedules::schedules_validate;
pub use status::status;
