pub mod config;
pub mod db;
pub mod error;
pub mod server;
pub mod switch;

pub use error::{SwitchError, SwitchyardError};
pub use switch::{SwitchCoordinator, SwitchOutcome, SwitchStatus};
