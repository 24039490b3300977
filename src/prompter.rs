//! User interaction capability used by the shell.

use anyhow::Result;

use crate::preview::TemplatePreview;

/// Outcome of presenting a list of choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    Selected(T),
    /// Go back one level.
    Back,
    /// Leave the program.
    Exit,
}

/// Presents choices and collects answers.
pub trait Prompter {
    /// Show labeled choices; returns the chosen index.
    fn select(&mut self, title: &str, choices: &[String]) -> Result<Selection<usize>>;

    /// Read one line of text. `None` when cancelled.
    fn input(&mut self, title: &str) -> Result<Option<String>>;

    /// Yes/no question.
    fn confirm(&mut self, title: &str, default: bool) -> Result<bool>;

    /// Show a message until acknowledged.
    fn notify(&mut self, title: &str, message: &str) -> Result<()>;

    /// Keep a preview on screen behind subsequent prompts. `None` clears it.
    fn show_preview(&mut self, preview: Option<&TemplatePreview>) -> Result<()>;
}
