use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

pub fn char_display_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

pub fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

/// Column bookkeeping shared by the plain and styled wrappers.
struct RowCursor {
    width: usize,
    used: usize,
}

impl RowCursor {
    fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            used: 0,
        }
    }

    /// Accounts for `ch`; returns true when it must start a new row.
    fn place(&mut self, ch: char) -> bool {
        let ch_width = char_display_width(ch);
        let breaks = self.used > 0 && self.used + ch_width > self.width;
        if breaks {
            self.used = 0;
        }
        self.used += ch_width;
        breaks
    }

    fn newline(&mut self) {
        self.used = 0;
    }
}

/// Hard-wraps prompt text to `width` columns; every `\n` starts a new row.
pub fn wrap_input_lines(input: &str, width: usize) -> Vec<String> {
    let mut rows = vec![String::new()];
    let mut cursor = RowCursor::new(width);
    for ch in input.chars() {
        match ch {
            '\r' => {}
            '\n' => {
                cursor.newline();
                rows.push(String::new());
            }
            _ => {
                if cursor.place(ch) {
                    rows.push(String::new());
                }
                if let Some(row) = rows.last_mut() {
                    row.push(ch);
                }
            }
        }
    }
    rows
}

/// Row and column of byte offset `cursor_byte` once `input` is wrapped to `width`.
pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let end = clamp_to_char_boundary_left(input, cursor_byte);
    let mut row = 0usize;
    let mut cursor = RowCursor::new(width);
    for ch in input[..end].chars() {
        match ch {
            '\r' => {}
            '\n' => {
                row += 1;
                cursor.newline();
            }
            _ => {
                if cursor.place(ch) {
                    row += 1;
                }
            }
        }
    }
    if cursor.used >= width {
        return (row + 1, 0);
    }
    (row, cursor.used)
}

/// Hard-wraps a styled line to `width` columns, keeping span and line styles.
pub fn wrap_styled_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    let mut rows = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut cursor = RowCursor::new(width);
    for span in &line.spans {
        let mut chunk = String::new();
        for ch in span.content.chars() {
            if cursor.place(ch) {
                if !chunk.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut chunk), span.style));
                }
                rows.push(Line::from(std::mem::take(&mut spans)).style(line.style));
            }
            chunk.push(ch);
        }
        if !chunk.is_empty() {
            spans.push(Span::styled(chunk, span.style));
        }
    }
    rows.push(Line::from(spans).style(line.style));
    rows
}

/// Cuts `input` to `width` columns, ending in `...` when something was dropped.
pub fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    if display_width(input) <= width {
        return input.to_string();
    }
    let (budget, suffix) = if width >= 4 { (width - 3, "...") } else { (width, "") };
    let mut out = String::new();
    let mut used = 0usize;
    for ch in input.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > budget {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push_str(suffix);
    out
}
