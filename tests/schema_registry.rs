//! Schema Registry Integration Tests
//!
//! Tests for document type declarations, path classification and computed
//! fields.

use content_sync::schema::{
    registry, ComputedField, ContentFormat, DocumentTypeDefinition, FieldDefinition, FieldType,
    RawDocument, Registry, SchemaError, SourceDefinition,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn write(root: &std::path::Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "---\ntitle: Test\n---\n\nBody\n").unwrap();
}

#[test]
fn test_classify_by_pattern() {
    let registry = registry().unwrap();

    let cases = [
        ("docs/intro.md", Some("Post")),
        ("docs/guide/setup.md", Some("Post")),
        ("docs/intro.mdx", None),
        ("colleges/mit/index.mdx", Some("CollegeHomePage")),
        ("courses/rust-101.mdx", Some("Course")),
        ("chapters/rust-101/01-ownership.mdx", Some("Chapter")),
        ("README.md", None),
        ("courses/rust-101.md", None),
    ];

    for (path, expected) in cases {
        let actual = registry.classify(path).map(|d| d.name);
        assert_eq!(actual, expected, "classify({})", path);
    }
}

#[test]
fn test_course_fields_and_defaults() {
    let course = registry().unwrap().get("Course").unwrap();

    assert_eq!(course.content_type, ContentFormat::Mdx);

    let title = course.field("title").unwrap();
    assert!(title.required);
    assert_eq!(title.field_type, FieldType::String);

    let date = course.field("date").unwrap();
    assert!(date.required);
    assert_eq!(date.field_type, FieldType::Date);

    assert_eq!(course.field("published").unwrap().default, Some(json!(true)));
    assert_eq!(course.field("featured").unwrap().default, Some(json!(false)));
    assert!(!course.field("cover").unwrap().required);
    assert!(course.field("slug").is_none());
}

#[test]
fn test_post_fields_are_optional() {
    let post = registry().unwrap().get("Post").unwrap();

    assert_eq!(post.content_type, ContentFormat::Markdown);
    assert!(post.fields.iter().all(|f| !f.required && f.default.is_none()));
}

#[test]
fn test_every_type_computes_url() {
    let registry = registry().unwrap();

    for def in registry.definitions() {
        let computed = def.computed_field("url").unwrap();
        assert_eq!(computed.field_type, FieldType::String, "{}", def.name);
    }

    let course = registry.get("Course").unwrap();
    let raw = course.raw_document("courses/rust-101/index.mdx");
    let values = course.resolve_computed(&raw).unwrap();
    assert_eq!(values.get("url"), Some(&json!("/posts/courses/rust-101")));

    let post = registry.get("Post").unwrap();
    let raw = post.raw_document("docs/guide/setup.md");
    let values = post.resolve_computed(&raw).unwrap();
    assert_eq!(values.get("url"), Some(&json!("/posts/docs/guide/setup")));
}

#[test]
fn test_resolvers_are_deterministic() {
    let chapter = registry().unwrap().get("Chapter").unwrap();
    let raw = chapter.raw_document("chapters/a/b.mdx");

    let first = chapter.resolve_computed(&raw).unwrap();
    let second = chapter.resolve_computed(&raw).unwrap();
    assert_eq!(first, second);
}

fn failing(raw: &RawDocument) -> Result<Value, SchemaError> {
    Err(SchemaError::Computation {
        field: "reading_time".to_string(),
        path: raw.source_file_path.clone(),
        message: "body not available".to_string(),
    })
}

#[test]
fn test_computation_error_propagates() {
    let def = DocumentTypeDefinition::new(
        "Essay",
        "essays/**/*.md",
        ContentFormat::Markdown,
        vec![FieldDefinition::required("title", FieldType::String)],
        vec![ComputedField {
            name: "reading_time",
            field_type: FieldType::Number,
            resolve: failing,
        }],
    )
    .unwrap();

    let raw = def.raw_document("essays/first.md");
    let err = def.resolve_computed(&raw).unwrap_err();

    assert!(matches!(err, SchemaError::Computation { .. }));
    assert!(err.to_string().contains("essays/first.md"));
}

#[test]
fn test_collect_honours_source() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "docs/intro.md");
    write(root, "courses/rust-101/index.mdx");
    write(root, "courses/rust-101/notes.md");
    write(root, "chapters/rust-101/01.mdx");
    write(root, ".git/HEAD");

    let registry = Registry::builtin().unwrap();

    // The site's source reads only courses/ and only builds posts
    let site = registry.collect(root, &SourceDefinition::default()).unwrap();
    assert!(site.is_empty());

    let everything = SourceDefinition::everything(root, &registry);
    let documents = registry.collect(root, &everything).unwrap();
    let found: Vec<(&str, &str)> = documents
        .iter()
        .map(|(def, raw)| (def.name, raw.flattened_path.as_str()))
        .collect();

    assert_eq!(
        found,
        vec![
            ("Chapter", "chapters/rust-101/01"),
            ("Course", "courses/rust-101"),
            ("Post", "docs/intro"),
        ]
    );

    let courses_only = SourceDefinition {
        content_dir_include: vec!["courses".to_string()],
        ..everything
    };
    let documents = registry.collect(root, &courses_only).unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].0.name, "Course");
}

#[test]
fn test_collect_with_relative_roots() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "docs/intro.md");
    write(temp.path(), "content/docs/intro.md");
    write(temp.path(), "content/courses/rust-101.mdx");

    // Only this test depends on the working directory
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(temp.path()).unwrap();

    let registry = Registry::builtin().unwrap();
    let flattened = |root: &str| -> Vec<String> {
        let source = SourceDefinition::everything(root, &registry);
        registry
            .collect(std::path::Path::new(root), &source)
            .unwrap()
            .into_iter()
            .map(|(_, raw)| raw.flattened_path)
            .collect()
    };

    let dot = flattened(".");
    let content = flattened("./content");
    let trailing = flattened("content/");
    let bare = flattened("content");

    std::env::set_current_dir(previous).unwrap();

    // Patterns are anchored at the root, so content/ files match nothing here
    assert_eq!(dot, vec!["docs/intro"]);
    for found in [content, trailing, bare] {
        assert_eq!(found, vec!["courses/rust-101", "docs/intro"]);
    }
}

#[test]
fn test_definitions_serialize_without_resolvers() {
    let course = registry().unwrap().get("Course").unwrap();
    let value = serde_json::to_value(course).unwrap();

    assert_eq!(value["name"], "Course");
    assert_eq!(value["file_path_pattern"], "courses/**/*.mdx");
    assert_eq!(value["content_type"], "mdx");
    assert_eq!(value["computed_fields"][0]["name"], "url");
    assert!(value["computed_fields"][0].get("resolve").is_none());
    assert!(value.get("pattern").is_none());
}
