use crate::ui::input_metrics::clamp_to_char_boundary_left;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    buffer: String,
    cursor: usize,
}

/// Multi-line prompt buffer with submit history and undo/redo.
///
/// The cursor is a byte offset that always sits on a char boundary.
#[derive(Default, Debug)]
pub struct PromptEditor {
    buffer: String,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
    history_stash: Option<Snapshot>,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl PromptEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// True when submitting would send nothing.
    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    fn prev_boundary(&self) -> usize {
        let end = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        self.buffer[..end]
            .char_indices()
            .next_back()
            .map_or(0, |(idx, _)| idx)
    }

    fn next_boundary(&self) -> usize {
        let start = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        self.buffer[start..]
            .chars()
            .next()
            .map_or(self.buffer.len(), |ch| start + ch.len_utf8())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            buffer: self.buffer.clone(),
            cursor: self.cursor,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.buffer = snapshot.buffer;
        self.cursor = clamp_to_char_boundary_left(&self.buffer, snapshot.cursor);
    }

    fn begin_edit(&mut self) {
        self.history_index = None;
        self.history_stash = None;
        self.undo_stack.push(self.snapshot());
        self.redo_stack.clear();
    }

    pub fn insert_str(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        self.begin_edit();
        let cursor = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        self.buffer.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    pub fn insert_newline(&mut self) {
        self.insert_str("\n");
    }

    pub fn backspace(&mut self) {
        let end = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_boundary();
        self.begin_edit();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    pub fn delete(&mut self) {
        let start = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        if start >= self.buffer.len() {
            return;
        }
        let end = self.next_boundary();
        self.begin_edit();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    pub fn move_right(&mut self) {
        self.cursor = self.next_boundary();
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    /// Takes the buffer for sending. Blank input stays put and yields nothing.
    pub fn take_submission(&mut self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        let value = self.buffer.trim().to_string();
        self.history.push(value.clone());
        self.begin_edit();
        self.buffer.clear();
        self.cursor = 0;
        Some(value)
    }

    pub fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        if self.history_index.is_none() {
            self.history_stash = Some(self.snapshot());
        }
        let next = match self.history_index {
            Some(idx) => idx.saturating_sub(1),
            None => self.history.len() - 1,
        };
        self.history_index = Some(next);
        self.buffer = self.history[next].clone();
        self.cursor = self.buffer.len();
    }

    pub fn history_down(&mut self) {
        let Some(idx) = self.history_index else {
            return;
        };
        if idx + 1 < self.history.len() {
            self.history_index = Some(idx + 1);
            self.buffer = self.history[idx + 1].clone();
            self.cursor = self.buffer.len();
            return;
        }
        self.history_index = None;
        match self.history_stash.take() {
            Some(stash) => self.restore(stash),
            None => {
                self.buffer.clear();
                self.cursor = 0;
            }
        }
    }

    pub fn undo(&mut self) {
        if let Some(previous) = self.undo_stack.pop() {
            self.redo_stack.push(self.snapshot());
            self.restore(previous);
        }
    }

    pub fn redo(&mut self) {
        if let Some(next) = self.redo_stack.pop() {
            self.undo_stack.push(self.snapshot());
            self.restore(next);
        }
    }
}
