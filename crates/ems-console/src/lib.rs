//! EMS Console - list screens, configuration and CLI
//!
//! Wires the engine crates into one screen controller:
//! - [`ListView`] owns a selection, the current page, reference filters and a dispatcher
//! - [`ConsoleConfig`] loads TOML plus environment overrides
//! - [`logging`] installs the `tracing` subscriber

pub mod cli;
pub mod commands;
pub mod config;
pub mod list_view;
pub mod logging;

pub use config::{ConfigError, ConsoleConfig, ResolverSettings};
pub use list_view::{ListView, Page, PageSummary};
pub use logging::{init_logging, LogConfig, LogFormat};
