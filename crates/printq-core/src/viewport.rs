//! Bounded window over a sequence of text lines with a proportional scrollbar.
//!
//! The viewport knows nothing about jobs or files. Callers hand it lines and
//! a line index to keep visible; it returns exactly `height` rows of exactly
//! `width` columns.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SCROLLBAR_COLUMNS: usize = 2;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollbarGlyph {
    /// `active` is false when already scrolled to the top.
    UpArrow { active: bool },
    /// `active` is false when the last line is already visible.
    DownArrow { active: bool },
    Track,
    Thumb,
}

impl ScrollbarGlyph {
    pub fn symbol(&self) -> &'static str {
        match self {
            ScrollbarGlyph::UpArrow { .. } => " ▲",
            ScrollbarGlyph::DownArrow { .. } => " ▼",
            ScrollbarGlyph::Track => " ░",
            ScrollbarGlyph::Thumb => " █",
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            ScrollbarGlyph::UpArrow { active } | ScrollbarGlyph::DownArrow { active } => *active,
            ScrollbarGlyph::Track => false,
            ScrollbarGlyph::Thumb => true,
        }
    }
}

/// One rendered row. `line` is the content index shown, `None` for padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportRow {
    pub line: Option<usize>,
    pub text: String,
    pub scrollbar: Option<ScrollbarGlyph>,
}

impl ViewportRow {
    pub fn render(&self) -> String {
        match self.scrollbar {
            Some(glyph) => format!("{}{}", self.text, glyph.symbol()),
            None => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrollableViewport {
    lines: Vec<String>,
    width: usize,
    height: usize,
    offset: usize,
}

impl ScrollableViewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            lines: Vec::new(),
            width,
            height,
            offset: 0,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.clamp_offset();
    }

    pub fn set_content(&mut self, lines: Vec<String>) {
        self.lines = lines;
        self.clamp_offset();
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub fn can_scroll_up(&self) -> bool {
        self.offset > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.offset + self.height < self.lines.len()
    }

    pub fn has_scrollbar(&self) -> bool {
        self.lines.len() > self.height && self.width > SCROLLBAR_COLUMNS
    }

    pub fn content_width(&self) -> usize {
        if self.has_scrollbar() {
            self.width - SCROLLBAR_COLUMNS
        } else {
            self.width
        }
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.offset = self.offset.saturating_add(n).min(self.max_offset());
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// Moves the window the least distance that puts `line` on screen.
    pub fn scroll_to_line(&mut self, line: usize) {
        if line < self.offset {
            self.offset = line;
        } else if self.height > 0 && line >= self.offset + self.height {
            self.offset = line + 1 - self.height;
        }
        self.clamp_offset();
    }

    /// Thumb `(start_row, size)` inside the viewport, when one is drawn.
    pub fn thumb(&self) -> Option<(usize, usize)> {
        if !self.has_scrollbar() || self.height <= 4 {
            return None;
        }
        let total = self.lines.len();
        let track_start = 1;
        let track_height = self.height - 2;
        let thumb_size = div_round(track_height * self.height, total).clamp(1, track_height);

        let span = track_height - thumb_size;
        let max_offset = self.max_offset();
        let shift = if max_offset == 0 {
            0
        } else {
            div_round(self.offset * span, max_offset)
        };
        Some((track_start + shift.min(span), thumb_size))
    }

    pub fn scrollbar_glyph(&self, row: usize) -> Option<ScrollbarGlyph> {
        if !self.has_scrollbar() || row >= self.height {
            return None;
        }
        if row == 0 {
            return Some(ScrollbarGlyph::UpArrow {
                active: self.can_scroll_up(),
            });
        }
        if row == self.height - 1 {
            return Some(ScrollbarGlyph::DownArrow {
                active: self.can_scroll_down(),
            });
        }
        match self.thumb() {
            Some((start, size)) if row >= start && row < start + size => {
                Some(ScrollbarGlyph::Thumb)
            }
            _ => Some(ScrollbarGlyph::Track),
        }
    }

    pub fn rows(&self) -> Vec<ViewportRow> {
        let content_width = self.content_width();
        (0..self.height)
            .map(|row| {
                let index = self.offset + row;
                let line = (index < self.lines.len()).then_some(index);
                let text = match line {
                    Some(index) => fit_width(&self.lines[index], content_width),
                    None => " ".repeat(content_width),
                };
                ViewportRow {
                    line,
                    text,
                    scrollbar: self.scrollbar_glyph(row),
                }
            })
            .collect()
    }

    pub fn render(&self) -> String {
        self.rows()
            .iter()
            .map(ViewportRow::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }
}

fn div_round(numerator: usize, denominator: usize) -> usize {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Pads or truncates `line` to exactly `width` display columns.
pub fn fit_width(line: &str, width: usize) -> String {
    let line_width = UnicodeWidthStr::width(line);
    if line_width <= width {
        let mut out = line.to_string();
        out.push_str(&" ".repeat(width - line_width));
        return out;
    }

    let (budget, suffix) = if width >= ELLIPSIS.len() {
        (width - ELLIPSIS.len(), ELLIPSIS)
    } else {
        (width, "")
    };
    let mut out = String::new();
    let mut used = 0;
    for ch in line.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(suffix);
    used += suffix.len();
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
