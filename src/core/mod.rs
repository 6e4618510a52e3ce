//! core
//!
//! Core domain types, the version graph, and access control.
//!
//! # Modules
//!
//! - [`types`] - Strong types: DocumentId, UserId, BranchName, Permission, etc.
//! - [`graph`] - Documents, versions, branches, and the graph operations
//! - [`access`] - Permission checks
//! - [`verify`] - Document invariant checks
//! - [`view`] - Per-user projections of a document
//! - [`registry`] - Process-wide document table with per-document locks
//! - [`errors`] - The domain error taxonomy
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here performs I/O except config loading
//! - Core never depends on the engine, session, server, or CLI layers

pub mod access;
pub mod config;
pub mod errors;
pub mod graph;
pub mod registry;
pub mod types;
pub mod verify;
pub mod view;
