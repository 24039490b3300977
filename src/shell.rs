//! Menu flow and output: the part of the program the user talks to.

use std::io::Write;

use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use tracing::{info, warn};

use crate::catalog::{Catalog, PreviewRecord, Scope, TemplateHandle};
use crate::clipboard::ClipboardWriter;
use crate::context::RenderContext;
use crate::error::CatalogError;
use crate::preview::TemplatePreview;
use crate::prompter::{Prompter, Selection};
use crate::render::Renderer;
use crate::search::search;

const MAIN_MENU_TITLE: &str = "Main Menu - Choose an option:";
const MENU_CATEGORY: &str = "Select a category";
const MENU_SEARCH: &str = "Search for templates";
const MENU_EXIT: &str = "Exit";
const RETURN_TO_MENU: &str = "Return to main menu";
const AFTER_DISPLAY_TITLE: &str = "What would you like to do?";
const AFTER_RETURN: &str = "Return to the main menu";
const COPY_QUESTION: &str = "Copy full YAML to clipboard?";
const COPIED: &str = "Copied full YAML to clipboard!";

/// Whether the menu loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Interactive browser: main menu, category drill-down, search, display.
pub struct Shell<P: Prompter, C: ClipboardWriter> {
    catalog: Catalog,
    renderer: Renderer,
    context: RenderContext,
    copy_by_default: bool,
    prompter: P,
    clipboard: C,
}

impl<P: Prompter, C: ClipboardWriter> Shell<P, C> {
    pub fn new(
        catalog: Catalog,
        renderer: Renderer,
        context: RenderContext,
        prompter: P,
        clipboard: C,
    ) -> Self {
        Self {
            catalog,
            renderer,
            context,
            copy_by_default: true,
            prompter,
            clipboard,
        }
    }

    /// Default answer of the copy confirmation.
    pub fn with_copy_default(mut self, copy_by_default: bool) -> Self {
        self.copy_by_default = copy_by_default;
        self
    }

    /// Run until the user exits. With `start_category`, the template list of
    /// that category is shown before the main menu.
    pub fn run(&mut self, start_category: Option<&str>) -> Result<()> {
        if let Some(category) = start_category
            && self.browse_category(category)? == Flow::Exit
        {
            return Ok(());
        }

        loop {
            self.prompter.show_preview(None)?;
            let choices = [MENU_CATEGORY, MENU_SEARCH, MENU_EXIT].map(String::from);
            let flow = match self.prompter.select(MAIN_MENU_TITLE, &choices)? {
                Selection::Selected(0) => self.choose_category()?,
                Selection::Selected(1) => self.search()?,
                Selection::Selected(_) | Selection::Exit => Flow::Exit,
                Selection::Back => Flow::Continue,
            };
            if flow == Flow::Exit {
                info!("shell_exit");
                return Ok(());
            }
        }
    }

    fn choose_category(&mut self) -> Result<Flow> {
        let categories = match self.catalog.list_categories() {
            Ok(categories) => categories,
            Err(e) => return self.report("Cannot list categories", &e),
        };

        let mut choices = categories.clone();
        choices.push(RETURN_TO_MENU.to_string());

        match self
            .prompter
            .select("Select a category (or return):", &choices)?
        {
            Selection::Selected(index) if index < categories.len() => {
                self.browse_category(&categories[index])
            }
            Selection::Exit => Ok(Flow::Exit),
            Selection::Selected(_) | Selection::Back => Ok(Flow::Continue),
        }
    }

    fn browse_category(&mut self, category: &str) -> Result<Flow> {
        let previews = match self.catalog.list_previews(Scope::Category(category)) {
            Ok(previews) => previews,
            Err(e) => return self.report("Cannot open category", &e),
        };
        if previews.is_empty() {
            self.prompter
                .notify("Empty category", &format!("No templates in '{}'.", category))?;
            return Ok(Flow::Continue);
        }
        self.pick_template("Select a template (or return):", &previews)
    }

    fn search(&mut self) -> Result<Flow> {
        let Some(term) = self.prompter.input("Enter search term:")? else {
            return Ok(Flow::Continue);
        };

        let paths = match search(&self.catalog, &term) {
            Ok(paths) => paths,
            Err(e) => return self.report("Search failed", &e),
        };
        if paths.is_empty() {
            self.prompter
                .notify("Search", &format!("No templates found for '{}'.", term))?;
            return Ok(Flow::Continue);
        }

        let previews = match self.catalog.list_previews(Scope::Paths(&paths)) {
            Ok(previews) => previews,
            Err(e) => return self.report("Search failed", &e),
        };
        self.pick_template("Search results:", &previews)
    }

    fn pick_template(&mut self, title: &str, previews: &[PreviewRecord]) -> Result<Flow> {
        let mut choices: Vec<String> = previews.iter().map(|p| p.label.clone()).collect();
        choices.push(RETURN_TO_MENU.to_string());

        match self.prompter.select(title, &choices)? {
            Selection::Selected(index) if index < previews.len() => {
                self.display(&previews[index].handle)
            }
            Selection::Exit => Ok(Flow::Exit),
            Selection::Selected(_) | Selection::Back => Ok(Flow::Continue),
        }
    }

    /// Render and show one template, offer to copy it, then ask where to go.
    fn display(&mut self, handle: &TemplateHandle) -> Result<Flow> {
        let preview = match build_preview(&self.catalog, &self.renderer, &self.context, handle) {
            Ok(preview) => preview,
            Err(e) => return self.report("Cannot open template", &e),
        };
        info!(template = %preview.path, "template_displayed");

        self.prompter.show_preview(Some(&preview))?;

        let mut title = AFTER_DISPLAY_TITLE.to_string();
        if self.prompter.confirm(COPY_QUESTION, self.copy_by_default)? {
            match self.clipboard.copy(&preview.full_document) {
                Ok(()) => title = format!("{} {}", COPIED, AFTER_DISPLAY_TITLE),
                Err(e) => {
                    warn!(error = %e, "clipboard_copy_failed");
                    title = format!("Warning: {}. {}", e, AFTER_DISPLAY_TITLE);
                }
            }
        }

        let choices = [AFTER_RETURN, MENU_EXIT].map(String::from);
        let flow = match self.prompter.select(&title, &choices)? {
            Selection::Selected(1) | Selection::Exit => Flow::Exit,
            Selection::Selected(_) | Selection::Back => Flow::Continue,
        };
        self.prompter.show_preview(None)?;
        Ok(flow)
    }

    /// Show an error and return to the menu.
    fn report(&mut self, title: &str, error: &CatalogError) -> Result<Flow> {
        warn!(path = ?error.path(), error = %error, "{}", title);
        self.prompter.notify(title, &error.to_string())?;
        Ok(Flow::Continue)
    }
}

/// Load a template and render it against the context.
pub fn build_preview(
    catalog: &Catalog,
    renderer: &Renderer,
    context: &RenderContext,
    handle: &TemplateHandle,
) -> Result<TemplatePreview, CatalogError> {
    let document = catalog.load_handle(handle)?;
    TemplatePreview::build(handle, &document, renderer, context)
}

/// Options for showing a single template without menus.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectOptions {
    /// Print only the rendered document.
    pub raw: bool,
    /// Copy the rendered document to the clipboard.
    pub copy: bool,
    /// Style the preview with terminal colors.
    pub color: bool,
}

/// Render `category/template` to `out`. Status messages go to `status` so a
/// raw document on `out` stays clean for piping.
#[allow(clippy::too_many_arguments)]
pub fn run_direct(
    catalog: &Catalog,
    renderer: &Renderer,
    context: &RenderContext,
    handle: &TemplateHandle,
    options: DirectOptions,
    clipboard: &impl ClipboardWriter,
    out: &mut impl Write,
    status: &mut impl Write,
) -> Result<()> {
    let preview = build_preview(catalog, renderer, context, handle)
        .with_context(|| format!("Cannot open template {}", handle.display_path()))?;

    if options.raw {
        writeln!(out, "{}", preview.full_document)?;
    } else {
        write_preview(out, &preview, options.color)?;
    }

    if options.copy {
        match clipboard.copy(&preview.full_document) {
            Ok(()) => writeln!(status, "{}", paint(COPIED, Color::Green, options.color))?,
            Err(e) => {
                warn!(error = %e, "clipboard_copy_failed");
                writeln!(
                    status,
                    "{}",
                    paint(&format!("Warning: {}", e), Color::Yellow, options.color)
                )?;
            }
        }
    }
    Ok(())
}

/// Styled, human-readable preview.
pub fn write_preview(out: &mut impl Write, preview: &TemplatePreview, color: bool) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", paint("Template Preview:", Color::Yellow, color))?;
    for (label, value) in preview.rows() {
        writeln!(
            out,
            "{} {}",
            paint(&format!("{}:", label), Color::Cyan, color),
            value
        )?;
    }
    if let Some(applied) = &preview.applied_variables {
        writeln!(out)?;
        writeln!(
            out,
            "{} {}",
            paint("Applied Variables:", Color::Magenta, color),
            applied
        )?;
    }
    Ok(())
}

/// Categories, or the preview labels of one category.
pub fn write_listing(catalog: &Catalog, category: Option<&str>, out: &mut impl Write) -> Result<()> {
    match category {
        None => {
            for category in catalog.list_categories()? {
                writeln!(out, "{}", category)?;
            }
        }
        Some(category) => {
            for preview in catalog.list_previews(Scope::Category(category))? {
                writeln!(out, "{}", preview.label)?;
            }
        }
    }
    Ok(())
}

fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        text.with(color).bold().to_string()
    } else {
        text.to_string()
    }
}
