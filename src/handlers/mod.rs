//! Command handler modules
//!
//! One module per CLI command area. `main.rs` only parses arguments and
//! dispatches here.

pub mod config;
pub mod init;
pub mod status;
pub mod sync;

pub use config::{handle_config_path, handle_config_show};
pub use init::{handle_init, is_initialized};
pub use status::handle_status;
pub use sync::{handle_run, handle_sync};
