//! The rendered view of one selected template.

use crate::catalog::{DEFAULT_DESCRIPTION, DEFAULT_NAME, TemplateHandle};
use crate::context::RenderContext;
use crate::document::{Document, format_value};
use crate::error::CatalogError;
use crate::render::Renderer;

/// Everything shown for a selected template, plus the text offered for copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePreview {
    pub path: String,
    pub name: String,
    pub description: String,
    /// Content field with placeholders resolved.
    pub content: String,
    /// Remaining fields, formatted, in file order.
    pub extra_fields: Vec<(String, String)>,
    /// `k=v, ...` when any variables were supplied.
    pub applied_variables: Option<String>,
    /// The whole document text with placeholders resolved.
    pub full_document: String,
}

impl TemplatePreview {
    /// Render a loaded document. The content field and the whole source text
    /// are rendered separately with the same context.
    pub fn build(
        handle: &TemplateHandle,
        document: &Document,
        renderer: &Renderer,
        context: &RenderContext,
    ) -> Result<Self, CatalogError> {
        let content = renderer.render(&document.content().unwrap_or_default(), context)?;
        let full_document = renderer.render(document.raw(), context)?;

        let extra_fields = document
            .extra_fields()
            .into_iter()
            .map(|(key, value)| (key, format_value(value)))
            .collect();

        Ok(Self {
            path: handle.display_path(),
            name: document
                .name()
                .unwrap_or_else(|| DEFAULT_NAME.to_string())
                .trim()
                .to_string(),
            description: document
                .description()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
                .trim()
                .to_string(),
            content: content.trim().to_string(),
            extra_fields,
            applied_variables: (!context.is_empty()).then(|| context.summary()),
            full_document,
        })
    }

    /// Label/value rows in display order.
    pub fn rows(&self) -> Vec<(&str, &str)> {
        let mut rows = vec![
            ("name", self.name.as_str()),
            ("description", self.description.as_str()),
            ("prompt_content", self.content.as_str()),
        ];
        rows.extend(
            self.extra_fields
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        rows
    }
}
