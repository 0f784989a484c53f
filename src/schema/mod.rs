//! Content schemas for the site.
//!
//! Each document type maps a set of files under the content root to a typed
//! record: declared frontmatter fields plus computed fields derived from the
//! raw document. Definitions are plain data, built once and never mutated.
//!
//! # Layout
//!
//! ```text
//! <content root>/
//! ├── docs/**/*.md         # Post
//! ├── colleges/**/*.mdx    # CollegeHomePage
//! ├── courses/**/*.mdx     # Course
//! └── chapters/**/*.mdx    # Chapter
//! ```

pub mod definition;
pub mod registry;

use std::path::PathBuf;

use thiserror::Error;

pub use definition::{
    ComputedField, ContentFormat, DocumentTypeDefinition, FieldDefinition, FieldType, RawDocument,
    Resolver,
};
pub use registry::{registry, Registry, SourceDefinition};

/// Errors raised while declaring or evaluating schemas
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Document type '{document_type}' has invalid file path pattern '{pattern}': {reason}")]
    InvalidPattern {
        document_type: String,
        pattern: String,
        reason: String,
    },

    #[error("Document type '{0}' is declared more than once")]
    DuplicateType(String),

    #[error("Failed to compute field '{field}' for {path}: {message}")]
    Computation {
        field: String,
        path: String,
        message: String,
    },

    #[error("Walked {} outside content root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
