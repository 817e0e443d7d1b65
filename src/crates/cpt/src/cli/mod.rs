//! CLI command implementations
//!
//! Handlers write command output to the given writer; diagnostics go to
//! stderr.

pub mod broken;
pub mod count;
pub mod data;
pub mod maintenance;
pub mod show;

pub use broken::handle_broken;
pub use count::handle_count;
pub use data::handle_data;
pub use maintenance::{handle_cleanup, handle_delete, handle_restart};
pub use show::{handle_show, ShowOptions};
