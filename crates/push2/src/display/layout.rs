//! Text-cell layout for the Push 2 display.
//!
//! The 960x160 panel is split into one column per track encoder, each holding
//! a few lines of text. Modes write cells through [`DisplaySurface`]; the
//! layout remembers whether anything changed since it was last taken.

use conductor_core::surface::{DISPLAY_COLUMNS, DISPLAY_LINES};
use conductor_core::{Color, DisplaySurface};

/// Characters that fit in one column at the default font size.
pub const CELL_WIDTH: usize = 17;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub text: String,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub struct TextLayout {
    cells: [[Cell; DISPLAY_LINES]; DISPLAY_COLUMNS],
    highlights: [Option<Color>; DISPLAY_COLUMNS],
    dirty: bool,
}

impl TextLayout {
    pub fn new() -> Self {
        Self {
            cells: Default::default(),
            highlights: [None; DISPLAY_COLUMNS],
            dirty: true,
        }
    }

    pub fn cell(&self, column: usize, line: usize) -> Option<&Cell> {
        self.cells.get(column).and_then(|c| c.get(line))
    }

    pub fn highlight_of(&self, column: usize) -> Option<Color> {
        self.highlights.get(column).copied().flatten()
    }

    /// Take over the content of another layout, marking dirty only on change.
    pub fn update_from(&mut self, other: &TextLayout) {
        if self.cells != other.cells || self.highlights != other.highlights {
            self.cells = other.cells.clone();
            self.highlights = other.highlights;
            self.dirty = true;
        }
    }

    /// Returns true once after each change.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// One string per line, cells padded to [`CELL_WIDTH`].
    ///
    /// Highlighted columns are wrapped in brackets.
    pub fn render_lines(&self) -> Vec<String> {
        (0..DISPLAY_LINES)
            .map(|line| {
                let mut out = String::with_capacity(DISPLAY_COLUMNS * (CELL_WIDTH + 2));
                for column in 0..DISPLAY_COLUMNS {
                    let text = fit(&self.cells[column][line].text);
                    if self.highlights[column].is_some() {
                        out.push_str(&format!("[{:<width$}]", text, width = CELL_WIDTH));
                    } else {
                        out.push_str(&format!(" {:<width$} ", text, width = CELL_WIDTH));
                    }
                }
                out.trim_end().to_string()
            })
            .collect()
    }
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate to the cell width on a character boundary.
fn fit(text: &str) -> String {
    text.chars().take(CELL_WIDTH).collect()
}

impl DisplaySurface for TextLayout {
    fn clear(&mut self) {
        let blank = self.cells.iter().flatten().all(|c| c.text.is_empty())
            && self.highlights.iter().all(Option::is_none);
        if !blank {
            self.cells = Default::default();
            self.highlights = [None; DISPLAY_COLUMNS];
            self.dirty = true;
        }
    }

    fn text(&mut self, column: usize, line: usize, text: &str, color: Color) {
        let Some(cell) = self.cells.get_mut(column).and_then(|c| c.get_mut(line)) else {
            return;
        };
        if cell.text != text || cell.color != color {
            cell.text = text.to_string();
            cell.color = color;
            self.dirty = true;
        }
    }

    fn highlight(&mut self, column: usize, color: Color) {
        if let Some(slot) = self.highlights.get_mut(column) {
            if *slot != Some(color) {
                *slot = Some(color);
                self.dirty = true;
            }
        }
    }
}
