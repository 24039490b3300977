//! Validation of every template under the root.
//!
//! Browsing tolerates broken files by leaving them out. This pass reports
//! them instead, together with templates that lack the fields the preview
//! relies on.

use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::catalog::{Catalog, template_files};
use crate::document::Document;
use crate::error::CatalogError;
use crate::render::Renderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Unreadable(String),
    Parse(String),
    NotAMapping,
    Empty,
    MissingField(&'static str),
    Template(String),
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(msg) => write!(f, "unreadable: {}", msg),
            Self::Parse(msg) => write!(f, "parse error: {}", msg),
            Self::NotAMapping => write!(f, "not a mapping"),
            Self::Empty => write!(f, "empty document"),
            Self::MissingField(field) => write!(f, "missing field: {}", field),
            Self::Template(msg) => write!(f, "template error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: PathBuf,
    pub kind: IssueKind,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub checked: usize,
    pub issues: Vec<Issue>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check every template file under the catalog root.
pub fn check_catalog(catalog: &Catalog, renderer: &Renderer) -> Result<CheckReport, CatalogError> {
    catalog.list_categories()?;

    let mut report = CheckReport::default();
    for path in template_files(catalog.root()) {
        report.checked += 1;
        for kind in check_file(&path, renderer) {
            report.issues.push(Issue {
                path: path.clone(),
                kind,
            });
        }
    }

    info!(
        checked = report.checked,
        issues = report.issues.len(),
        "check_completed"
    );
    Ok(report)
}

fn check_file(path: &std::path::Path, renderer: &Renderer) -> Vec<IssueKind> {
    let document = match Document::read(path) {
        Ok(document) => document,
        Err(CatalogError::Parse { source, .. }) => return vec![IssueKind::Parse(source.to_string())],
        Err(CatalogError::NotAMapping { .. }) => return vec![IssueKind::NotAMapping],
        Err(e) => return vec![IssueKind::Unreadable(e.to_string())],
    };

    if document.fields().is_empty() {
        return vec![IssueKind::Empty];
    }

    let mut issues = Vec::new();
    if document.name().is_none() {
        issues.push(IssueKind::MissingField("prompt_name"));
    }
    if document.description().is_none() {
        issues.push(IssueKind::MissingField("description"));
    }
    match document.content() {
        None => issues.push(IssueKind::MissingField("style_prompt")),
        Some(content) => {
            if let Err(e) = renderer.validate(&content) {
                issues.push(IssueKind::Template(e.to_string()));
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn kinds(report: &CheckReport, file: &str) -> Vec<IssueKind> {
        report
            .issues
            .iter()
            .filter(|issue| issue.path.ends_with(file))
            .map(|issue| issue.kind.clone())
            .collect()
    }

    #[test]
    fn test_clean_catalog() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a/ok.yaml",
            "prompt_name: Ok\ndescription: fine\nstyle_prompt: Hi {{ who }}\n",
        );
        let report = check_catalog(&Catalog::new(dir.path()), &Renderer::default()).unwrap();
        assert_eq!(report.checked, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_reports_each_problem() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/broken.yaml", "prompt_name: [unclosed\n");
        write(dir.path(), "a/empty.yaml", "");
        write(dir.path(), "a/list.yml", "- one\n");
        write(dir.path(), "a/sparse.yaml", "name: Sparse\n");
        write(
            dir.path(),
            "b/bad-template.yaml",
            "prompt_name: T\ndescription: d\nstyle_prompt: \"{% if %}\"\n",
        );
        write(dir.path(), "b/readme.md", "ignored");

        let report = check_catalog(&Catalog::new(dir.path()), &Renderer::default()).unwrap();
        assert_eq!(report.checked, 5);
        assert!(!report.is_clean());

        assert!(matches!(
            kinds(&report, "broken.yaml").as_slice(),
            [IssueKind::Parse(_)]
        ));
        assert_eq!(kinds(&report, "empty.yaml"), vec![IssueKind::Empty]);
        assert_eq!(kinds(&report, "list.yml"), vec![IssueKind::NotAMapping]);
        assert_eq!(
            kinds(&report, "sparse.yaml"),
            vec![
                IssueKind::MissingField("description"),
                IssueKind::MissingField("style_prompt"),
            ]
        );
        assert!(matches!(
            kinds(&report, "bad-template.yaml").as_slice(),
            [IssueKind::Template(_)]
        ));
    }

    #[test]
    fn test_missing_root() {
        let result = check_catalog(
            &Catalog::new("/definitely/not/a/template/root"),
            &Renderer::default(),
        );
        assert!(matches!(result, Err(CatalogError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_issue_display() {
        assert_eq!(
            IssueKind::MissingField("description").to_string(),
            "missing field: description"
        );
        assert_eq!(IssueKind::Empty.to_string(), "empty document");
    }
}
