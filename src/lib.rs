//! content-sync - content schemas and git-backed content sync
//!
//! Declares the document types of the college docs site and keeps a local
//! checkout of its content repository current for the build pipeline.
//!
//! # Architecture
//!
//! - The schema registry is static data, built once and consumed by the
//!   content pipeline
//! - The sync loop runs one clone-or-pull before the pipeline reads any
//!   content, then repeats on a fixed interval until cancelled
//! - Background failures are reported to an observer; the loop keeps going
//!
//! # Modules
//!
//! - `schema`: Document type definitions and the registry
//! - `sync`: Git commands, the sync loop and its handle
//! - `config`: Layered configuration (env, YAML file, defaults)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Clone or pull once
//! content-sync sync
//!
//! # Keep syncing every minute
//! content-sync watch
//!
//! # Inspect schemas and synced files
//! content-sync schema Course
//! content-sync scan --all
//! ```

pub mod cli;
pub mod config;
pub mod schema;
pub mod sync;

// Re-export main types at crate root for convenience
pub use schema::{registry, DocumentTypeDefinition, RawDocument, Registry, SchemaError};
pub use sync::{SyncCommand, SyncError, SyncHandle, SyncLoop, SyncSettings};
