//! taskwright library
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod delegates;
pub mod error;
pub mod format;
pub mod logging;
pub mod paths;
pub mod registry;
pub mod runner;
pub mod template;
pub mod watch;
