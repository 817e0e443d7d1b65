//! Database repositories
//!
//! Read-side queries against the engine's tables. Mutations go through
//! [`crate::cascade`].

pub mod instance_repository;

pub use instance_repository::InstanceRepository;
