//! Template document loading.
//!
//! A template is a YAML file, optionally starting with a bare `---` line.
//! Loading keeps the parsed mapping and the separator-stripped source text
//! side by side: the mapping answers field lookups, the text is what gets
//! rendered and copied as the "full document".

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::CatalogError;

/// File extensions recognized as template documents.
pub const TEMPLATE_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Keys holding the display name, in lookup order.
const NAME_KEYS: [&str; 2] = ["prompt_name", "name"];

/// Keys holding the templatable body, in lookup order.
const CONTENT_KEYS: [&str; 2] = ["style_prompt", "content"];

const DESCRIPTION_KEY: &str = "description";
const TAGS_KEY: &str = "tags";

/// Returns true if the path has one of the template extensions.
pub fn is_template_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

/// Removes a leading `---` line, if the text starts with exactly that line.
pub fn strip_separator(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("---") else {
        return text;
    };
    if let Some(rest) = rest.strip_prefix("\r\n") {
        rest
    } else if let Some(rest) = rest.strip_prefix('\n') {
        rest
    } else {
        text
    }
}

/// A parsed template: its fields and the text they were parsed from.
#[derive(Debug, Clone)]
pub struct Document {
    fields: Mapping,
    raw: String,
}

impl Document {
    /// Parse document text. `path` is only used to identify the file in errors.
    pub fn parse(text: &str, path: &Path) -> Result<Self, CatalogError> {
        let raw = strip_separator(text);

        let fields = if raw.trim().is_empty() {
            Mapping::new()
        } else {
            let value: Value =
                serde_yaml::from_str(raw).map_err(|source| CatalogError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            match value {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => {
                    return Err(CatalogError::NotAMapping {
                        path: path.to_path_buf(),
                    });
                }
            }
        };

        Ok(Self {
            fields,
            raw: raw.to_string(),
        })
    }

    /// Read and parse a document from disk.
    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&text, path)?;
        debug!(path = ?path, fields = document.fields.len(), "document_read");
        Ok(document)
    }

    /// The parsed top-level mapping, in file order.
    pub fn fields(&self) -> &Mapping {
        &self.fields
    }

    /// Source text with the leading separator removed. Placeholders are unresolved.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn name(&self) -> Option<String> {
        self.first_present(&NAME_KEYS).and_then(scalar_text)
    }

    pub fn description(&self) -> Option<String> {
        self.fields.get(DESCRIPTION_KEY).and_then(scalar_text)
    }

    /// The templatable body, unrendered.
    pub fn content(&self) -> Option<String> {
        self.first_present(&CONTENT_KEYS).and_then(scalar_text)
    }

    /// Tags as strings. Anything other than a sequence yields no tags;
    /// non-scalar entries are skipped.
    pub fn tags(&self) -> Vec<String> {
        match self.fields.get(TAGS_KEY) {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
            _ => Vec::new(),
        }
    }

    /// Fields other than name, description and content, in file order.
    pub fn extra_fields(&self) -> Vec<(String, &Value)> {
        let name_key = self.first_present_key(&NAME_KEYS);
        let content_key = self.first_present_key(&CONTENT_KEYS);

        self.fields
            .iter()
            .filter_map(|(key, value)| {
                let key = scalar_text(key)?;
                let known = Some(key.as_str()) == name_key
                    || Some(key.as_str()) == content_key
                    || key == DESCRIPTION_KEY;
                (!known).then_some((key, value))
            })
            .collect()
    }

    fn first_present_key(&self, keys: &[&'static str]) -> Option<&'static str> {
        keys.iter().copied().find(|key| self.fields.contains_key(*key))
    }

    fn first_present(&self, keys: &[&'static str]) -> Option<&Value> {
        self.first_present_key(keys)
            .and_then(|key| self.fields.get(key))
    }
}

/// Text of a scalar value. Null and collections have none.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Formats any field value for display: strings verbatim, collections inline.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Sequence(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Mapping(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", format_value(k), format_value(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Tagged(tagged) => format_value(&tagged.value),
        other => scalar_text(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    const BASIC: &str = r#"prompt_name: "Basic Review"
description: "quick pass"
style_prompt: "Review this {{ lang }} code"
tags: [review, quick]
model: gpt-4
"#;

    fn parse(text: &str) -> Document {
        Document::parse(text, Path::new("test.yaml")).unwrap()
    }

    #[test]
    fn test_is_template_file() {
        assert!(is_template_file(Path::new("a/b/review.yaml")));
        assert!(is_template_file(Path::new("review.yml")));
        assert!(!is_template_file(Path::new("README.md")));
        assert!(!is_template_file(Path::new("yaml")));
        assert!(!is_template_file(Path::new("review.YAML")));
    }

    #[test]
    fn test_strip_separator() {
        assert_eq!(strip_separator("---\na: 1\n"), "a: 1\n");
        assert_eq!(strip_separator("---\r\na: 1\n"), "a: 1\n");
        assert_eq!(strip_separator("a: 1\n---\n"), "a: 1\n---\n");
        assert_eq!(strip_separator("---"), "---");
        assert_eq!(strip_separator("--- a: 1\n"), "--- a: 1\n");
    }

    #[test]
    fn test_separator_stripping_does_not_change_fields() {
        let with = parse(&format!("---\n{}", BASIC));
        let without = parse(BASIC);
        assert_eq!(with.fields(), without.fields());
        assert_eq!(with.raw(), without.raw());
        assert_eq!(without.raw(), BASIC);
    }

    #[test]
    fn test_raw_keeps_placeholders() {
        let doc = parse(BASIC);
        assert!(doc.raw().contains("{{ lang }}"));
        assert_eq!(doc.content().as_deref(), Some("Review this {{ lang }} code"));
    }

    #[test]
    fn test_known_fields() {
        let doc = parse(BASIC);
        assert_eq!(doc.name().as_deref(), Some("Basic Review"));
        assert_eq!(doc.description().as_deref(), Some("quick pass"));
        assert_eq!(doc.tags(), vec!["review", "quick"]);
    }

    #[test]
    fn test_field_aliases() {
        let doc = parse("name: Short\ncontent: Body {{ x }}\n");
        assert_eq!(doc.name().as_deref(), Some("Short"));
        assert_eq!(doc.content().as_deref(), Some("Body {{ x }}"));
    }

    #[test]
    fn test_prompt_name_wins_over_name() {
        let doc = parse("name: plain\nprompt_name: preferred\n");
        assert_eq!(doc.name().as_deref(), Some("preferred"));
        let extras: Vec<String> = doc.extra_fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(extras, vec!["name"]);
    }

    #[test]
    fn test_missing_fields_are_none() {
        let doc = parse("other: 1\n");
        assert!(doc.name().is_none());
        assert!(doc.description().is_none());
        assert!(doc.content().is_none());
        assert!(doc.tags().is_empty());
    }

    #[test]
    fn test_non_list_tags_are_empty() {
        let doc = parse("tags: review\n");
        assert!(doc.tags().is_empty());
    }

    #[test]
    fn test_scalar_tags_are_stringified() {
        let doc = parse("tags: [rust, 2024, true, {nested: x}]\n");
        assert_eq!(doc.tags(), vec!["rust", "2024", "true"]);
    }

    #[test]
    fn test_extra_fields_in_file_order() {
        let doc = parse(BASIC);
        let extras: Vec<(String, String)> = doc
            .extra_fields()
            .into_iter()
            .map(|(k, v)| (k, format_value(v)))
            .collect();
        assert_eq!(
            extras,
            vec![
                ("tags".to_string(), "[review, quick]".to_string()),
                ("model".to_string(), "gpt-4".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let doc = parse("");
        assert!(doc.fields().is_empty());
        let doc = parse("---\n");
        assert!(doc.fields().is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = Document::parse("key: [unclosed\n", Path::new("bad.yaml")).unwrap_err();
        match err {
            CatalogError::Parse { path, .. } => assert_eq!(path, PathBuf::from("bad.yaml")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_document_is_not_a_mapping() {
        let err = Document::parse("just a string\n", Path::new("s.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::NotAMapping { .. }));
        let err = Document::parse("- a\n- b\n", Path::new("l.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::NotAMapping { .. }));
    }

    #[test]
    fn test_format_value_nested() {
        let value: Value = serde_yaml::from_str("{a: [1, 2], b: null, c: {d: e}}").unwrap();
        assert_eq!(format_value(&value), "{a: [1, 2], b: null, c: {d: e}}");
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = Document::read(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.yaml");
        std::fs::write(&path, format!("---\n{}", BASIC)).unwrap();
        let doc = Document::read(&path).unwrap();
        assert_eq!(doc.raw(), BASIC);
        assert_eq!(doc.name().as_deref(), Some("Basic Review"));
    }
}
