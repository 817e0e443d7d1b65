//! Configuration management for cpt
//!
//! The only mandatory setting is the connection string, normally supplied
//! through the `DATABASE_URL` environment variable. Optional TOML files can
//! carry it as well, together with pool and logging settings.

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    expand_env_vars, CptConfig, DatabaseConfig, LogFormat, LoggingConfig, DATABASE_URL_VAR,
};

use crate::Result;
use std::path::PathBuf;

/// Load configuration from every layer, with `explicit` read after the user file
pub async fn load_config(explicit: Option<PathBuf>) -> Result<CptConfig> {
    ConfigLoader::new().with_file(explicit).load().await
}
