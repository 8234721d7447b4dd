//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting, verbosity and upload progress
//!
//! # Design
//!
//! All terminal output goes through this module so that quiet and debug
//! modes behave the same for every command.

pub mod output;
