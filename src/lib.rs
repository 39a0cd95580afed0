//! Fusion-Jobs Library
//!
//! Core library modules for the fusion-jobs scheduler.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod lock;
pub mod logger;
pub mod runtime;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
