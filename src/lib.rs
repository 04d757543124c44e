//! quarry - orchestration driver for a source-code indexing and search
//! platform.
//!
//! The binary converts a flag vector into a deterministic
//! bootstrap-and-run sequence: resolve options (two passes, so `-R`
//! config files can be overridden by explicit flags), validate the
//! environment, discover repositories and projects, refresh history
//! caches, run the index pass, and distribute the resulting
//! configuration locally or over the network.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod distrib;
pub mod engine;
pub mod errors;
pub mod history;
pub mod options;
pub mod orchestrator;
pub mod projects;
pub mod repos;
