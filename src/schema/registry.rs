//! Registry of the site's document types and its content source.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use serde_json::{json, Value};

use super::definition::{
    normalize, ComputedField, ContentFormat, DocumentTypeDefinition, FieldDefinition, FieldType,
    RawDocument,
};
use super::SchemaError;

/// Global registry, built on first use (stores Result to handle init errors)
static REGISTRY: OnceLock<Result<Registry, String>> = OnceLock::new();

/// Content source registration handed to the content pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDefinition {
    /// Directory holding the synced checkout
    pub content_dir_path: PathBuf,

    /// Top-level directories of the checkout to read (empty = everything)
    pub content_dir_include: Vec<String>,

    /// Names of the document types the pipeline builds
    pub document_types: Vec<String>,

    pub disable_import_alias_warning: bool,
}

impl Default for SourceDefinition {
    fn default() -> Self {
        Self {
            content_dir_path: PathBuf::from("nextjs-repo"),
            content_dir_include: vec!["courses".to_string()],
            document_types: vec!["Post".to_string()],
            disable_import_alias_warning: true,
        }
    }
}

impl SourceDefinition {
    /// Source reading the whole checkout with every registered type
    pub fn everything(content_dir_path: impl Into<PathBuf>, registry: &Registry) -> Self {
        Self {
            content_dir_path: content_dir_path.into(),
            content_dir_include: Vec::new(),
            document_types: registry.names().map(str::to_string).collect(),
            disable_import_alias_warning: true,
        }
    }

    /// Check whether a relative path falls under the include list
    pub fn includes(&self, relative_path: &str) -> bool {
        self.content_dir_include.is_empty()
            || self.content_dir_include.iter().any(|dir| {
                let dir = dir.trim_end_matches('/');
                relative_path == dir || relative_path.starts_with(&format!("{}/", dir))
            })
    }

    /// Check whether a document type is built from this source
    pub fn builds(&self, document_type: &str) -> bool {
        self.document_types.iter().any(|t| t == document_type)
    }
}

/// Immutable set of document type definitions with unique names
#[derive(Debug, Clone)]
pub struct Registry {
    definitions: Vec<DocumentTypeDefinition>,
}

impl Registry {
    /// Build a registry, rejecting duplicate names
    pub fn new(definitions: Vec<DocumentTypeDefinition>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if !seen.insert(def.name) {
                return Err(SchemaError::DuplicateType(def.name.to_string()));
            }
        }
        Ok(Self { definitions })
    }

    /// The site's built-in document types
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::new(vec![post()?, college_home_page()?, course()?, chapter()?])
    }

    /// All definitions in declaration order
    pub fn definitions(&self) -> &[DocumentTypeDefinition] {
        &self.definitions
    }

    /// Names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.iter().map(|d| d.name)
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&DocumentTypeDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// First definition whose pattern matches the relative path
    pub fn classify(&self, relative_path: impl AsRef<Path>) -> Option<&DocumentTypeDefinition> {
        let path = relative_path.as_ref();
        self.definitions.iter().find(|d| d.matches(path))
    }

    /// Walk a content root and return the documents the source builds,
    /// sorted by path.
    pub fn collect(
        &self,
        content_root: &Path,
        source: &SourceDefinition,
    ) -> Result<Vec<(&DocumentTypeDefinition, RawDocument)>, SchemaError> {
        // glob yields paths spelled like the pattern, so `.` segments must go
        let root: PathBuf = content_root
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        let pattern = if root.as_os_str().is_empty() {
            "**/*".to_string()
        } else {
            format!("{}/**/*", Pattern::escape(&root.to_string_lossy()))
        };
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };
        let entries = glob::glob_with(&pattern, options).map_err(|e| SchemaError::InvalidPattern {
            document_type: "<content root>".to_string(),
            pattern: pattern.clone(),
            reason: e.msg.to_string(),
        })?;

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SchemaError::Io(e.into_error()))?;
            if !path.is_file() {
                continue;
            }

            let relative = path
                .strip_prefix(&root)
                .map_err(|_| SchemaError::OutsideRoot {
                    path: path.clone(),
                    root: content_root.to_path_buf(),
                })?;
            if !source.includes(&normalize(relative)) {
                continue;
            }

            if let Some(def) = self
                .definitions
                .iter()
                .filter(|d| source.builds(d.name))
                .find(|d| d.matches(relative))
            {
                documents.push((def, def.raw_document(relative)));
            }
        }

        documents.sort_by(|a, b| a.1.source_file_path.cmp(&b.1.source_file_path));
        Ok(documents)
    }
}

/// Get the global registry (built once, then cached)
pub fn registry() -> Result<&'static Registry> {
    let result = REGISTRY.get_or_init(|| Registry::builtin().map_err(|e| e.to_string()));

    match result {
        Ok(registry) => Ok(registry),
        Err(e) => anyhow::bail!("{}", e),
    }
}

// ============================================================================
// Built-in document types
// ============================================================================

/// `/posts/<flattened path>`
fn posts_url(raw: &RawDocument) -> Result<Value, SchemaError> {
    Ok(Value::String(format!("/posts/{}", raw.flattened_path)))
}

fn url_field() -> ComputedField {
    ComputedField {
        name: "url",
        field_type: FieldType::String,
        resolve: posts_url,
    }
}

fn post() -> Result<DocumentTypeDefinition, SchemaError> {
    DocumentTypeDefinition::new(
        "Post",
        "docs/**/*.md",
        ContentFormat::Markdown,
        vec![
            FieldDefinition::optional("title", FieldType::String),
            FieldDefinition::optional("description", FieldType::String),
        ],
        vec![url_field()],
    )
}

fn college_home_page() -> Result<DocumentTypeDefinition, SchemaError> {
    DocumentTypeDefinition::new(
        "CollegeHomePage",
        "colleges/**/*.mdx",
        ContentFormat::Mdx,
        vec![
            FieldDefinition::required("name", FieldType::String),
            FieldDefinition::optional("slogan", FieldType::String),
        ],
        vec![url_field()],
    )
}

fn course() -> Result<DocumentTypeDefinition, SchemaError> {
    DocumentTypeDefinition::new(
        "Course",
        "courses/**/*.mdx",
        ContentFormat::Mdx,
        vec![
            FieldDefinition::required("title", FieldType::String),
            FieldDefinition::optional("description", FieldType::String),
            FieldDefinition::optional("cover", FieldType::String),
            FieldDefinition::required("date", FieldType::Date),
            FieldDefinition::optional("published", FieldType::Boolean).with_default(json!(true)),
            FieldDefinition::optional("featured", FieldType::Boolean).with_default(json!(false)),
        ],
        vec![url_field()],
    )
}

fn chapter() -> Result<DocumentTypeDefinition, SchemaError> {
    DocumentTypeDefinition::new(
        "Chapter",
        "chapters/**/*.mdx",
        ContentFormat::Mdx,
        vec![
            FieldDefinition::required("title", FieldType::String),
            FieldDefinition::optional("description", FieldType::String),
        ],
        vec![url_field()],
    )
}
