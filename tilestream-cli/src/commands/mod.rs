//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Disk cache management (clear, stats, prune)
//! - [`config`] - Configuration management (init, show, path)
//! - [`fetch`] - Single tile download
//! - [`prefetch`] - Warm the disk cache around a location

pub mod cache;
pub mod config;
pub mod fetch;
pub mod prefetch;
