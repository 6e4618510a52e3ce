//! collabdoc - collaborative documents with branchable version history
//!
//! Documents carry an append-only version history organized into named
//! branches, an access list, and a live editing session that relays edits
//! and version saves to every participant in a consistent order.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Domain types, the version graph, access control, registry, config
//! - [`engine`] - Gated request operations: Resolve → Lock → Gate → Mutate → Notify
//! - [`session`] - Connection lifecycle, live edits, and per-document fan-out
//! - [`server`] - Line-delimited JSON over TCP
//! - [`auth`] - Token verification
//! - [`content`] - Opaque content storage used by editor clients
//! - [`cli`] - Command-line interface layer
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Correctness Invariants
//!
//! 1. No mutation happens before its permission gate passes
//! 2. Every branch's head is the last version it lists, and the current
//!    branch always exists
//! 3. Events for one document reach every participant in the same order
//! 4. Failures are reported to the requester only and never leak content

pub mod auth;
pub mod cli;
pub mod content;
pub mod core;
pub mod engine;
pub mod logging;
pub mod server;
pub mod session;
