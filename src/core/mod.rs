//! core
//!
//! Core domain types, configuration, and local locking.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, FileRecord, BlobRef, etc.
//! - [`config`] - Configuration schema and loading
//! - [`lock`] - Exclusive publish lock per repository
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod lock;
pub mod types;
