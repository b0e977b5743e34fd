//! Boxed console panels for verbose survey runs.

use std::io::Write;

use crossterm::style::{Color, Stylize};

use crate::config::MIN_PANEL_WIDTH;
use crate::error::Result;

/// Sink for titled panels shown while a survey runs.
pub trait PanelRenderer: Send + Sync {
    /// `sequence` is the panel's position within the current survey.
    fn panel(&self, title: &str, body: &str, sequence: usize) -> Result<()>;
}

/// Renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPanels;

impl PanelRenderer for NoopPanels {
    fn panel(&self, _title: &str, _body: &str, _sequence: usize) -> Result<()> {
        Ok(())
    }
}

/// Draws colored panels on stderr, leaving stdout for results.
#[derive(Debug, Clone)]
pub struct ConsolePanels {
    width: usize,
    palette: Vec<Color>,
}

impl ConsolePanels {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(MIN_PANEL_WIDTH),
            palette: vec![
                Color::Cyan,
                Color::Magenta,
                Color::Yellow,
                Color::Green,
                Color::Blue,
            ],
        }
    }

    pub fn with_palette(mut self, palette: Vec<Color>) -> Self {
        if !palette.is_empty() {
            self.palette = palette;
        }
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Border color for the panel at `sequence`.
    pub fn color_for(&self, sequence: usize) -> Color {
        self.palette[sequence % self.palette.len()]
    }
}

impl Default for ConsolePanels {
    fn default() -> Self {
        Self::new(80)
    }
}

impl PanelRenderer for ConsolePanels {
    fn panel(&self, title: &str, body: &str, sequence: usize) -> Result<()> {
        let color = self.color_for(sequence);
        let stderr = std::io::stderr();
        let mut out = stderr.lock();

        for line in format_panel(title, body, self.width) {
            match line
                .strip_prefix('│')
                .and_then(|rest| rest.strip_suffix('│'))
            {
                Some(inner) => writeln!(out, "{}{}{}", "│".with(color), inner, "│".with(color))?,
                None => writeln!(out, "{}", line.as_str().with(color).bold())?,
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Lay out a boxed panel of exactly `width` columns.
///
/// Body lines are wrapped by characters to the inner width; blank lines are kept.
pub fn format_panel(title: &str, body: &str, width: usize) -> Vec<String> {
    let width = width.max(MIN_PANEL_WIDTH);
    let inner = width - 4;

    let title: String = title.chars().take(width - 6).collect();
    let fill = width - 5 - title.chars().count();
    let mut lines = vec![format!("╭─ {} {}╮", title, "─".repeat(fill))];

    let mut push_row = |text: &str| {
        let pad = inner - text.chars().count();
        lines.push(format!("│ {}{} │", text, " ".repeat(pad)));
    };

    if body.is_empty() {
        push_row("");
    }
    for raw in body.lines() {
        let chars: Vec<char> = raw.chars().filter(|c| *c != '\t' && *c != '\r').collect();
        if chars.is_empty() {
            push_row("");
            continue;
        }
        for chunk in chars.chunks(inner) {
            push_row(&chunk.iter().collect::<String>());
        }
    }

    lines.push(format!("╰{}╯", "─".repeat(width - 2)));
    lines
}
