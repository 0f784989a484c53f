//! Document type definitions.
//!
//! A definition describes one kind of content file: which paths belong to
//! it, how its body is formatted, which frontmatter fields it declares and
//! which fields are computed from the raw document.

use std::fmt;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use serde_json::{Map, Value};

use super::SchemaError;

/// Glob options for file path patterns: `*` stays inside one path segment,
/// `**` spans directories.
const PATTERN_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Body format of a content file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// Plain markdown
    Markdown,

    /// Markdown with embedded components
    Mdx,
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentFormat::Markdown => write!(f, "markdown"),
            ContentFormat::Mdx => write!(f, "mdx"),
        }
    }
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    List,
    Json,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::List => "list",
            FieldType::Json => "json",
        };
        f.write_str(name)
    }
}

/// A frontmatter field declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDefinition {
    /// Optional field without a default
    pub fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            default: None,
        }
    }

    /// Required field
    pub fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            required: true,
            ..Self::optional(name, field_type)
        }
    }

    /// Attach a default value used when the field is absent
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Pure function deriving a value from the raw document
pub type Resolver = fn(&RawDocument) -> Result<Value, SchemaError>;

/// A field whose value is derived rather than stored in the file
#[derive(Clone, Serialize)]
pub struct ComputedField {
    pub name: &'static str,
    pub field_type: FieldType,
    #[serde(skip)]
    pub resolve: Resolver,
}

impl fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedField")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .finish_non_exhaustive()
    }
}

/// Raw record of a content file, as seen by computed field resolvers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDocument {
    /// Path relative to the content root, `/` separated
    pub source_file_path: String,

    /// File name with extension
    pub source_file_name: String,

    /// Directory relative to the content root (empty at the root)
    pub source_file_dir: String,

    /// Body format
    pub content_type: ContentFormat,

    /// Path without extension; a trailing `index` segment is dropped
    pub flattened_path: String,
}

impl RawDocument {
    /// Build the raw record for a path relative to the content root
    pub fn new(relative_path: impl AsRef<Path>, content_type: ContentFormat) -> Self {
        let source_file_path = normalize(relative_path.as_ref());

        let (source_file_dir, source_file_name) = match source_file_path.rsplit_once('/') {
            Some((dir, name)) => (dir.to_string(), name.to_string()),
            None => (String::new(), source_file_path.clone()),
        };

        let stem = match source_file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => source_file_name.as_str(),
        };

        let flattened_path = if stem == "index" {
            source_file_dir.clone()
        } else if source_file_dir.is_empty() {
            stem.to_string()
        } else {
            format!("{}/{}", source_file_dir, stem)
        };

        Self {
            source_file_path,
            source_file_name,
            source_file_dir,
            content_type,
            flattened_path,
        }
    }
}

/// Join path components with `/` regardless of platform
pub(crate) fn normalize(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Schema for one kind of content file
#[derive(Debug, Clone, Serialize)]
pub struct DocumentTypeDefinition {
    pub name: &'static str,
    pub file_path_pattern: &'static str,
    pub content_type: ContentFormat,
    pub fields: Vec<FieldDefinition>,
    pub computed_fields: Vec<ComputedField>,
    #[serde(skip)]
    pattern: Pattern,
}

impl DocumentTypeDefinition {
    /// Declare a document type, compiling its file path pattern
    pub fn new(
        name: &'static str,
        file_path_pattern: &'static str,
        content_type: ContentFormat,
        fields: Vec<FieldDefinition>,
        computed_fields: Vec<ComputedField>,
    ) -> Result<Self, SchemaError> {
        let pattern = Pattern::new(file_path_pattern).map_err(|e| SchemaError::InvalidPattern {
            document_type: name.to_string(),
            pattern: file_path_pattern.to_string(),
            reason: e.msg.to_string(),
        })?;

        Ok(Self {
            name,
            file_path_pattern,
            content_type,
            fields,
            computed_fields,
            pattern,
        })
    }

    /// Check whether a path relative to the content root belongs to this type
    pub fn matches(&self, relative_path: impl AsRef<Path>) -> bool {
        let path = normalize(relative_path.as_ref());
        self.pattern.matches_with(&path, PATTERN_OPTIONS)
    }

    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a computed field
    pub fn computed_field(&self, name: &str) -> Option<&ComputedField> {
        self.computed_fields.iter().find(|f| f.name == name)
    }

    /// Build the raw record for a file of this type
    pub fn raw_document(&self, relative_path: impl AsRef<Path>) -> RawDocument {
        RawDocument::new(relative_path, self.content_type)
    }

    /// Evaluate every computed field in declaration order.
    ///
    /// The first resolver error is returned as-is.
    pub fn resolve_computed(&self, raw: &RawDocument) -> Result<Map<String, Value>, SchemaError> {
        let mut values = Map::new();
        for computed in &self.computed_fields {
            let value = (computed.resolve)(raw)?;
            values.insert(computed.name.to_string(), value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title_only(raw: &RawDocument) -> Result<Value, SchemaError> {
        Ok(Value::String(raw.source_file_name.to_uppercase()))
    }

    #[test]
    fn test_flattened_path_strips_extension() {
        let raw = RawDocument::new("docs/guide/setup.md", ContentFormat::Markdown);
        assert_eq!(raw.source_file_path, "docs/guide/setup.md");
        assert_eq!(raw.source_file_dir, "docs/guide");
        assert_eq!(raw.source_file_name, "setup.md");
        assert_eq!(raw.flattened_path, "docs/guide/setup");
    }

    #[test]
    fn test_flattened_path_drops_index() {
        let raw = RawDocument::new("courses/rust/index.mdx", ContentFormat::Mdx);
        assert_eq!(raw.flattened_path, "courses/rust");

        let root = RawDocument::new("index.md", ContentFormat::Markdown);
        assert_eq!(root.flattened_path, "");
        assert_eq!(root.source_file_dir, "");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = DocumentTypeDefinition::new(
            "Broken",
            "docs/[*.md",
            ContentFormat::Markdown,
            vec![],
            vec![],
        )
        .unwrap_err();

        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let def = DocumentTypeDefinition::new(
            "Top",
            "notes/*.md",
            ContentFormat::Markdown,
            vec![],
            vec![],
        )
        .unwrap();

        assert!(def.matches("notes/a.md"));
        assert!(!def.matches("notes/deep/a.md"));
        assert!(!def.matches("notes/a.mdx"));
    }

    #[test]
    fn test_resolve_computed_in_order() {
        let def = DocumentTypeDefinition::new(
            "Note",
            "notes/**/*.md",
            ContentFormat::Markdown,
            vec![FieldDefinition::optional("title", FieldType::String)],
            vec![ComputedField {
                name: "shout",
                field_type: FieldType::String,
                resolve: title_only,
            }],
        )
        .unwrap();

        let raw = def.raw_document("notes/hello.md");
        let values = def.resolve_computed(&raw).unwrap();
        assert_eq!(values.get("shout"), Some(&Value::String("HELLO.MD".into())));
    }
}
