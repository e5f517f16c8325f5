//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the photo manager:
//! - Logging and tracing setup
//! - Configuration management
//!
//! ## Overview
//!
//! This crate holds the runtime utilities the other modules depend on. It
//! establishes the logging conventions and the validated configuration
//! object the orchestrator is constructed from.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, AppConfigBuilder, ContentfulSettings, DriveSettings};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
