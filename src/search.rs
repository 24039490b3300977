//! Keyword search across every template under the root.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::catalog::{Catalog, template_files};
use crate::document::Document;
use crate::error::CatalogError;

/// Paths of templates whose description, tags or file name contain `term`,
/// ignoring case. Traversal order, no ranking. An empty term matches every
/// template; files that fail to parse never match.
pub fn search(catalog: &Catalog, term: &str) -> Result<Vec<PathBuf>, CatalogError> {
    // Fails early with DirectoryNotFound instead of an empty result.
    catalog.list_categories()?;

    let needle = term.to_lowercase();
    let mut matches = Vec::new();

    for path in template_files(catalog.root()) {
        let document = match Document::read(&path) {
            Ok(document) => document,
            Err(e) => {
                debug!(path = ?path, error = %e, "search_skipped");
                continue;
            }
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if matches_term(&document, &file_name, &needle) {
            matches.push(path);
        }
    }

    info!(term, count = matches.len(), "search_completed");
    Ok(matches)
}

/// `needle` must already be lowercase.
fn matches_term(document: &Document, file_name: &str, needle: &str) -> bool {
    let description = document.description().unwrap_or_default().to_lowercase();
    description.contains(needle)
        || file_name.to_lowercase().contains(needle)
        || document
            .tags()
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "dev/refactor.yaml",
            "prompt_name: Cleanup\ndescription: Tidy a messy module\ntags: [Code, Review]\nstyle_prompt: Refactor {{ target }}\nauthor: zebra\n",
        );
        write(
            dir.path(),
            "writing/deep/essay.yml",
            "prompt_name: Essay\ndescription: Long form writing\ntags: not-a-list\n",
        );
        write(dir.path(), "writing/broken.yaml", "description: [unclosed\n");
        write(dir.path(), "writing/list.yaml", "- a\n- b\n");
        write(dir.path(), "writing/readme.md", "description: code\n");
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_empty_term_matches_every_valid_template() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        let found = search(&catalog, "").unwrap();
        assert_eq!(names(&found), vec!["refactor.yaml", "essay.yml"]);
    }

    #[test]
    fn test_matches_tag_case_insensitive() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        assert_eq!(names(&search(&catalog, "code").unwrap()), vec!["refactor.yaml"]);
        assert_eq!(names(&search(&catalog, "REVIEW").unwrap()), vec!["refactor.yaml"]);
    }

    #[test]
    fn test_tag_matches_on_substring() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        // "rev" is only part of the tag "Review"; partial tags still match.
        assert_eq!(names(&search(&catalog, "rev").unwrap()), vec!["refactor.yaml"]);
    }

    #[test]
    fn test_hidden_directories_are_not_searched() {
        let dir = fixture();
        write(
            dir.path(),
            ".drafts/wip.yaml",
            "description: Tidy a messy draft
tags: [Review]
",
        );
        let catalog = Catalog::new(dir.path());
        assert_eq!(names(&search(&catalog, "messy").unwrap()), vec!["refactor.yaml"]);
    }

    #[test]
    fn test_matches_filename() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        assert_eq!(
            names(&search(&catalog, "REFACTOR").unwrap()),
            vec!["refactor.yaml"]
        );
        assert_eq!(names(&search(&catalog, ".yml").unwrap()), vec!["essay.yml"]);
    }

    #[test]
    fn test_matches_description_substring() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        assert_eq!(names(&search(&catalog, "messy").unwrap()), vec!["refactor.yaml"]);
        assert_eq!(names(&search(&catalog, "long FORM").unwrap()), vec!["essay.yml"]);
    }

    #[test]
    fn test_unrelated_fields_do_not_match() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        // Present only in author, name and content.
        assert!(search(&catalog, "zebra").unwrap().is_empty());
        assert!(search(&catalog, "cleanup").unwrap().is_empty());
        assert!(search(&catalog, "target").unwrap().is_empty());
    }

    #[test]
    fn test_non_list_tags_ignored() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        assert!(search(&catalog, "not-a-list").unwrap().is_empty());
    }

    #[test]
    fn test_results_feed_explicit_path_previews() {
        let dir = fixture();
        let catalog = Catalog::new(dir.path());
        let found = search(&catalog, "").unwrap();
        let previews = catalog
            .list_previews(crate::catalog::Scope::Paths(&found))
            .unwrap();
        let paths: Vec<String> = previews.iter().map(|p| p.handle.display_path()).collect();
        assert_eq!(paths, vec!["dev/refactor.yaml", "writing/deep/essay.yml"]);
    }

    #[test]
    fn test_missing_root_is_error() {
        let catalog = Catalog::new("/definitely/not/a/template/root");
        assert!(matches!(
            search(&catalog, "x"),
            Err(CatalogError::DirectoryNotFound { .. })
        ));
    }
}
