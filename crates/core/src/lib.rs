pub mod config;
pub mod error;
pub mod fs;
pub mod naming;
pub mod queue;

pub use config::Config;
pub use error::*;
pub use naming::is_valid_config_name;
pub use queue::MutationQueue;
