//! Full-screen terminal prompts built on ratatui.
//!
//! A selected template stays on screen as a scrollable backdrop while the
//! copy and navigation prompts are answered below it.

use std::io;

use anyhow::Result;
use crossterm::cursor::Show;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame, Terminal};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::preview::TemplatePreview;
use crate::prompter::{Prompter, Selection};

const PANEL_WIDTH: u16 = 72;
const PREVIEW_SCROLL_STEP: u16 = 5;

/// Cursor over a list of choices.
#[derive(Debug, Clone, Default)]
pub struct MenuState {
    pub selected: usize,
    len: usize,
}

impl MenuState {
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    /// Move selection up.
    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    /// Move selection down.
    pub fn select_next(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.len.saturating_sub(1);
    }
}

/// Single-line text field. `cursor` counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub value: String,
    pub cursor: usize,
}

impl InputState {
    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }

    fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, c: char) {
        let idx = self.byte_index(self.cursor);
        self.value.insert(idx, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char_before(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let idx = self.byte_index(self.cursor - 1);
        self.value.remove(idx);
        self.cursor -= 1;
    }

    /// Delete the character under the cursor (delete).
    pub fn delete_char_at(&mut self) {
        if self.cursor < self.char_count() {
            let idx = self.byte_index(self.cursor);
            self.value.remove(idx);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    /// Split around the cursor: text before, character under it, text after.
    fn split_at_cursor(&self) -> (&str, &str, &str) {
        let start = self.byte_index(self.cursor);
        let end = self.byte_index(self.cursor + 1);
        (
            &self.value[..start],
            &self.value[start..end],
            &self.value[end..],
        )
    }
}

/// Focused button of a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmField {
    Yes,
    No,
}

impl ConfirmField {
    pub fn toggle(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    fn from_default(default: bool) -> Self {
        if default { Self::Yes } else { Self::No }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Returns the final answer once the key settles the menu.
pub fn handle_menu_key(state: &mut MenuState, key: &KeyEvent) -> Option<Selection<usize>> {
    if is_interrupt(key) {
        return Some(Selection::Exit);
    }
    match key.code {
        KeyCode::Char('q') => Some(Selection::Exit),
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
            Some(Selection::Back)
        }
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
            Some(Selection::Selected(state.selected))
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.select_prev();
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.select_next();
            None
        }
        KeyCode::Home | KeyCode::Char('g') => {
            state.select_first();
            None
        }
        KeyCode::End | KeyCode::Char('G') => {
            state.select_last();
            None
        }
        _ => None,
    }
}

/// `Some(Some(text))` on submit, `Some(None)` on cancel.
pub fn handle_input_key(state: &mut InputState, key: &KeyEvent) -> Option<Option<String>> {
    if is_interrupt(key) {
        return Some(None);
    }
    match key.code {
        KeyCode::Enter => Some(Some(state.value.clone())),
        KeyCode::Esc => Some(None),
        KeyCode::Backspace => {
            state.delete_char_before();
            None
        }
        KeyCode::Delete => {
            state.delete_char_at();
            None
        }
        KeyCode::Left => {
            state.move_left();
            None
        }
        KeyCode::Right => {
            state.move_right();
            None
        }
        KeyCode::Home => {
            state.move_home();
            None
        }
        KeyCode::End => {
            state.move_end();
            None
        }
        KeyCode::Char(c) => {
            state.insert_char(c);
            None
        }
        _ => None,
    }
}

pub fn handle_confirm_key(focus: &mut ConfirmField, key: &KeyEvent) -> Option<bool> {
    if is_interrupt(key) {
        return Some(false);
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
        KeyCode::Enter => Some(*focus == ConfirmField::Yes),
        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
            *focus = focus.toggle();
            None
        }
        KeyCode::Char('h') | KeyCode::Char('l') => {
            *focus = focus.toggle();
            None
        }
        _ => None,
    }
}

fn is_dismiss_key(key: &KeyEvent) -> bool {
    is_interrupt(key)
        || matches!(
            key.code,
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') | KeyCode::Char('q')
        )
}

/// Lines of the backdrop preview.
pub fn preview_lines(preview: &TemplatePreview) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled(
            "Template Preview:",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            preview.path.clone(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    for (label, value) in preview.rows() {
        let mut value_lines = value.lines();
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", label), label_style),
            Span::raw(value_lines.next().unwrap_or_default().to_string()),
        ]));
        lines.extend(value_lines.map(|line| Line::from(format!("  {}", line))));
    }

    if let Some(applied) = &preview.applied_variables {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                "Applied Variables: ",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(applied.clone()),
        ]));
    }
    lines
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// The prompt currently waiting for an answer.
enum Panel<'a> {
    Menu {
        title: &'a str,
        choices: &'a [String],
        state: &'a MenuState,
    },
    Input {
        title: &'a str,
        state: &'a InputState,
    },
    Confirm {
        title: &'a str,
        focus: ConfirmField,
    },
    Notice {
        title: &'a str,
        message: &'a str,
    },
}

impl Panel<'_> {
    fn title(&self) -> &str {
        match self {
            Self::Menu { title, .. }
            | Self::Input { title, .. }
            | Self::Confirm { title, .. }
            | Self::Notice { title, .. } => title,
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::Menu { .. } => " ↑/↓ move  Enter select  Esc back  q quit ",
            Self::Input { .. } => " Enter search  Esc cancel ",
            Self::Confirm { .. } => " y yes  n no  ←/→ switch  Enter confirm ",
            Self::Notice { .. } => " Enter dismiss ",
        }
    }

    /// Rows needed inside the border.
    fn content_height(&self, width: u16) -> u16 {
        match self {
            Self::Menu { choices, .. } => choices
                .iter()
                .map(|choice| choice.lines().count().max(1))
                .sum::<usize>() as u16,
            Self::Input { .. } | Self::Confirm { .. } => 1,
            Self::Notice { message, .. } => {
                let inner = width.saturating_sub(2).max(1) as usize;
                message
                    .lines()
                    .map(|line| line.width().div_ceil(inner).max(1))
                    .sum::<usize>()
                    .max(1) as u16
            }
        }
    }
}

fn draw_panel(f: &mut Frame, area: Rect, panel: &Panel) {
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(Span::styled(
            format!(" {} ", panel.title()),
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .title_bottom(Line::from(Span::styled(
            panel.hint(),
            Style::default().fg(Color::DarkGray),
        )));
    let inner = block.inner(area);
    f.render_widget(block, area);

    match panel {
        Panel::Menu { choices, state, .. } => {
            let items: Vec<ListItem> = choices
                .iter()
                .map(|choice| {
                    let lines: Vec<Line> = choice.lines().map(|l| Line::from(l.to_string())).collect();
                    ListItem::new(lines)
                })
                .collect();
            let list = List::new(items)
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");
            let mut list_state = ListState::default().with_selected(Some(state.selected));
            f.render_stateful_widget(list, inner, &mut list_state);
        }
        Panel::Input { state, .. } => {
            let (before, at, after) = state.split_at_cursor();
            let cursor_style = Style::default().add_modifier(Modifier::REVERSED);
            let line = Line::from(vec![
                Span::raw("> "),
                Span::raw(before.to_string()),
                Span::styled(if at.is_empty() { " ".to_string() } else { at.to_string() }, cursor_style),
                Span::raw(after.to_string()),
            ]);
            f.render_widget(Paragraph::new(line), inner);
        }
        Panel::Confirm { focus, .. } => {
            let button = |label: &'static str, focused: bool| {
                let style = if focused {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Span::styled(label, style)
            };
            let line = Line::from(vec![
                Span::raw("  "),
                button(" Yes ", *focus == ConfirmField::Yes),
                Span::raw("   "),
                button(" No ", *focus == ConfirmField::No),
            ]);
            f.render_widget(Paragraph::new(line), inner);
        }
        Panel::Notice { message, .. } => {
            f.render_widget(
                Paragraph::new(message.to_string()).wrap(Wrap { trim: false }),
                inner,
            );
        }
    }
}

/// Draw the backdrop (if any) and the prompt. Returns the largest useful
/// preview scroll offset for the current size.
fn draw_screen(
    f: &mut Frame,
    backdrop: Option<&TemplatePreview>,
    preview_scroll: u16,
    panel: &Panel,
) -> u16 {
    let area = f.area();
    let panel_width = PANEL_WIDTH.min(area.width);

    let Some(preview) = backdrop else {
        let height = (panel.content_height(panel_width) + 2).min(area.height);
        draw_panel(f, centered_rect(panel_width, height, area), panel);
        return 0;
    };

    let panel_height = (panel.content_height(area.width) + 2).min(area.height / 2).max(3);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(panel_height)])
        .split(area);

    let paragraph = Paragraph::new(preview_lines(preview))
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    let total = paragraph.line_count(chunks[0].width) as u16;
    let max_scroll = total.saturating_sub(chunks[0].height);
    f.render_widget(paragraph.scroll((preview_scroll.min(max_scroll), 0)), chunks[0]);

    draw_panel(f, chunks[1], panel);
    max_scroll
}

fn preview_scroll_delta(key: &KeyEvent) -> Option<i32> {
    match key.code {
        KeyCode::PageUp => Some(-(PREVIEW_SCROLL_STEP as i32)),
        KeyCode::PageDown => Some(PREVIEW_SCROLL_STEP as i32),
        _ => None,
    }
}

/// [`Prompter`] on the alternate screen. The terminal is restored on drop.
pub struct TerminalPrompter {
    terminal: DefaultTerminal,
    backdrop: Option<TemplatePreview>,
    preview_scroll: u16,
}

impl TerminalPrompter {
    pub fn start() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        debug!("terminal_started");
        Ok(Self {
            terminal,
            backdrop: None,
            preview_scroll: 0,
        })
    }

    /// Draw `panel` and wait for the next key press. PageUp/PageDown scroll
    /// the backdrop and are not passed on.
    fn next_key(&mut self, panel: &Panel) -> Result<KeyEvent> {
        loop {
            let mut max_scroll = 0;
            let scroll = self.preview_scroll;
            let backdrop = self.backdrop.as_ref();
            self.terminal.draw(|f| {
                max_scroll = draw_screen(f, backdrop, scroll, panel);
            })?;
            self.preview_scroll = self.preview_scroll.min(max_scroll);

            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                match preview_scroll_delta(&key) {
                    Some(delta) if self.backdrop.is_some() => {
                        let next = (self.preview_scroll as i32 + delta).clamp(0, max_scroll as i32);
                        self.preview_scroll = next as u16;
                    }
                    _ => return Ok(key),
                }
            }
        }
    }
}

impl Drop for TerminalPrompter {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

impl Prompter for TerminalPrompter {
    fn select(&mut self, title: &str, choices: &[String]) -> Result<Selection<usize>> {
        let mut state = MenuState::new(choices.len());
        loop {
            let key = self.next_key(&Panel::Menu {
                title,
                choices,
                state: &state,
            })?;
            if let Some(selection) = handle_menu_key(&mut state, &key) {
                return Ok(selection);
            }
        }
    }

    fn input(&mut self, title: &str) -> Result<Option<String>> {
        let mut state = InputState::default();
        loop {
            let key = self.next_key(&Panel::Input {
                title,
                state: &state,
            })?;
            if let Some(answer) = handle_input_key(&mut state, &key) {
                return Ok(answer);
            }
        }
    }

    fn confirm(&mut self, title: &str, default: bool) -> Result<bool> {
        let mut focus = ConfirmField::from_default(default);
        loop {
            let key = self.next_key(&Panel::Confirm { title, focus })?;
            if let Some(answer) = handle_confirm_key(&mut focus, &key) {
                return Ok(answer);
            }
        }
    }

    fn notify(&mut self, title: &str, message: &str) -> Result<()> {
        loop {
            let key = self.next_key(&Panel::Notice { title, message })?;
            if is_dismiss_key(&key) {
                return Ok(());
            }
        }
    }

    fn show_preview(&mut self, preview: Option<&TemplatePreview>) -> Result<()> {
        self.backdrop = preview.cloned();
        self.preview_scroll = 0;
        Ok(())
    }
}
