//! # Stackgen Composition Engine
//!
//! This library is the core engine of a project scaffolding tool. It
//! materializes a new project's file tree by composing six ordered template
//! layers (base scaffold, framework choices, integrations, features,
//! tooling, deployment) into one target directory, resolving collisions
//! between layers with per-file-type policy, and performing every
//! filesystem mutation inside a transaction that rolls back atomically if
//! any step fails.
//!
//! ## Quick Example
//!
//! ```no_run
//! use std::path::Path;
//! use stackgen::compose::materialize;
//! use stackgen::config::ProjectConfig;
//! use stackgen::render::PassthroughRenderer;
//!
//! let mut config = ProjectConfig::new("my-app");
//! config.frontends = vec!["react".to_string()];
//! config.addons.insert("docker".to_string());
//!
//! let outcome = materialize(
//!     &config,
//!     Path::new("templates"),
//!     Path::new("my-app"),
//!     &PassthroughRenderer,
//! );
//! match outcome.result {
//!     Ok(report) => println!("materialized {} files", report.processed_files.len()),
//!     Err(e) => eprintln!("run failed and was rolled back: {}", e),
//! }
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key components:
//!
//! - **Configuration (`config`)**: the resolved stack choices for one run.
//!   Produced by an outer collaborator (prompt, CLI, preset); immutable
//!   here.
//! - **Layers (`layer`)**: the fixed ordered template source categories
//!   and the mapping from configuration to selected subtrees, including
//!   the monorepo/flat destination topology.
//! - **Conflict Resolution (`conflict`)**: a pure decision function over
//!   explicit rule tables - rename, merge, append, or override for every
//!   colliding destination path.
//! - **Manifest Merging (`manifest`)**: the asymmetric structural merge of
//!   the project manifest across layers.
//! - **Transactions (`transaction`)**: backup-before-mutate filesystem
//!   operations with all-or-nothing rollback.
//! - **Rendering (`render`)**: the seam to the external template
//!   substitution capability and the template filename marker convention.
//!
//! ## Execution Flow
//!
//! The main entry point is [`compose::materialize`], which executes one
//! run:
//!
//! 1.  Validate the configuration.
//! 2.  Open a fresh transaction with its own backup directory.
//! 3.  Walk the six layers in order; for each selected subtree, mirror its
//!     files to their configured destinations, consulting the conflict
//!     resolver for existing targets.
//! 4.  On success, commit and discard backups; on any fatal error, roll
//!     the destination tree back to its pre-run state.
//! 5.  Return the structured report (processed files + conflict records)
//!     and the transaction summary. Presentation is the caller's job.

pub mod compose;
pub mod config;
pub mod conflict;
pub mod error;
pub mod layer;
pub mod manifest;
pub mod render;
pub mod transaction;

#[cfg(test)]
mod conflict_proptest;

pub use compose::{materialize, ComposeReport, Orchestrator};
pub use config::{PackageManager, ProjectConfig};
pub use conflict::{ConflictAction, ConflictRecord, ConflictResolver, ConflictRules};
pub use error::{Error, Result};
pub use render::{PassthroughRenderer, RenderContext, Renderer};
pub use transaction::{run_in_transaction, Transaction, TransactionOutcome, TxState};
