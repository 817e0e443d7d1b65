//! # cpt - Copper persistence tool
//!
//! Operator tool for inspecting and maintaining the persisted state of a
//! Copper workflow engine without a running engine process.
//!
//! ## Features
//!
//! - **Counting and searching** - instances by state, broken instances by
//!   exception, class and error time, instances by JSON data
//! - **Inspection** - instance details, data and decoded audit trails
//! - **Cascading maintenance** - delete, restart and retention cleanup that
//!   keep dependent rows consistent, one id at a time
//! - **Pipelining** - ids printed by one command are read from stdin by the
//!   next: `cpt broken --exception-pattern Timeout | cpt restart`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cpt::{cli, Database, StateSelector};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let db = Arc::new(Database::connect_url("postgres://localhost/copper").await?);
//! cli::handle_count(db.clone(), StateSelector::All, &mut std::io::stdout()).await?;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

pub mod age;
pub mod audit;
pub mod cascade;
pub mod cli;
pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod repositories;

mod error;

// Re-export key types for convenience
pub use age::Age;
pub use cascade::{BatchReport, CleanupTargets};
pub use config::{load_config, CptConfig};
pub use db::{Database, Dialect};
pub use filter::BrokenFilter;
pub use models::{StateSelector, WorkflowState};
pub use repositories::InstanceRepository;

// Error types
pub use error::{CptError, Result};
