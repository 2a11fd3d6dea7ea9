// src/config/mod.rs

//! Executor configuration loaded from an optional TOML file.
//!
//! - [`model`] holds the raw serde model and the validated [`ExecutorConfig`].
//! - [`loader`] reads files / strings.
//! - [`validate`] turns a [`RawConfigFile`] into an [`ExecutorConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{ExecutorConfig, ExecutorSection, LoggingSection, RawConfigFile};
pub use validate::parse_duration;
