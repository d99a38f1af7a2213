//! crosslog CLI library
//!
//! Argument parsing, output rendering and command handlers are exposed as a
//! library so integration tests can drive the commands without spawning the
//! binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
