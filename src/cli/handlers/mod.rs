//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod list;
pub mod next;
pub mod run;

pub use list::ListCommandHandler;
pub use next::NextCommandHandler;
pub use run::RunCommandHandler;
