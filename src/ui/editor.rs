use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Debug, PartialEq, Eq)]
struct EditorSnapshot {
    buffer: String,
    cursor: usize,
}

/// Multi-line prompt editor for one chat panel. Owns its buffer,
/// submit history, and undo state; knows nothing about rendering.
#[derive(Default, Debug)]
pub struct InputEditor {
    buffer: String,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
    history_stash: Option<EditorSnapshot>,
    undo_stack: Vec<EditorSnapshot>,
    redo_stack: Vec<EditorSnapshot>,
}

pub enum InputAction {
    None,
    Submit(String),
    Interrupt,
    Quit,
}

impl InputEditor {
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

    pub fn clear(&mut self) {
        self.history_index = None;
        self.history_stash = None;
        self.push_undo();
        self.buffer.clear();
        self.cursor = 0;
    }

    fn clamp_cursor_to_boundary_left(&self, mut idx: usize) -> usize {
        idx = idx.min(self.buffer.len());
        while idx > 0 && !self.buffer.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        if i == 0 {
            return 0;
        }
        let mut j = i - 1;
        while j > 0 && !self.buffer.is_char_boundary(j) {
            j -= 1;
        }
        j
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        if i >= self.buffer.len() {
            return self.buffer.len();
        }
        match self.buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.buffer.len(),
        }
    }

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            buffer: self.buffer.clone(),
            cursor: self.cursor,
        }
    }

    fn push_undo(&mut self) {
        self.undo_stack.push(self.snapshot());
        self.redo_stack.clear();
    }

    fn restore(&mut self, snap: EditorSnapshot) {
        self.buffer = snap.buffer;
        self.cursor = self.clamp_cursor_to_boundary_left(snap.cursor);
    }

    pub fn insert_str(&mut self, value: &str) {
        self.history_index = None;
        self.history_stash = None;
        let cursor = self.clamp_cursor_to_boundary_left(self.cursor);
        self.push_undo();
        self.buffer.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    pub fn backspace(&mut self) {
        let end = self.clamp_cursor_to_boundary_left(self.cursor);
        if end == 0 {
            return;
        }
        self.history_index = None;
        self.history_stash = None;
        let start = self.prev_char_boundary(end);
        self.push_undo();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    pub fn delete(&mut self) {
        let start = self.clamp_cursor_to_boundary_left(self.cursor);
        if start >= self.buffer.len() {
            return;
        }
        self.history_index = None;
        self.history_stash = None;
        let end = self.next_char_boundary(start);
        self.push_undo();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    /// Take the buffer as a submitted message. Trailing newlines are
    /// stripped; an empty buffer submits nothing.
    pub fn submit(&mut self) -> Option<String> {
        let value = self
            .buffer
            .trim_end_matches('\n')
            .trim_end_matches('\r')
            .to_string();
        if value.is_empty() {
            return None;
        }
        self.history.push(self.buffer.clone());
        self.history_index = None;
        self.history_stash = None;
        self.push_undo();
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
        let next_index = match self.history_index {
            Some(idx) if idx > 0 => idx - 1,
            Some(_) => 0,
            None => self.history.len().saturating_sub(1),
        };
        self.history_index = Some(next_index);
        self.buffer = self.history[next_index].clone();
        self.cursor = self.buffer.len();
    }

    pub fn history_down(&mut self) {
        let Some(idx) = self.history_index else {
            return;
        };

        if idx + 1 >= self.history.len() {
            self.history_index = None;
            if let Some(stash) = self.history_stash.take() {
                self.restore(stash);
            } else {
                self.buffer.clear();
                self.cursor = 0;
            }
        } else {
            let next = idx + 1;
            self.history_index = Some(next);
            self.buffer = self.history[next].clone();
            self.cursor = self.buffer.len();
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

    pub fn apply_key(&mut self, key: KeyEvent) -> InputAction {
        match key.code {
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.buffer.is_empty() {
                    return InputAction::Quit;
                }
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return InputAction::Interrupt;
            }
            KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_str("\n");
            }
            KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.undo();
            }
            KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.redo();
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.insert_str("\n");
            }
            KeyCode::Enter => {
                if let Some(value) = self.submit() {
                    return InputAction::Submit(value);
                }
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.cursor = self.prev_char_boundary(self.cursor);
            }
            KeyCode::Right => {
                self.cursor = self.next_char_boundary(self.cursor);
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.buffer.len(),
            KeyCode::Up => self.history_up(),
            KeyCode::Down => self.history_down(),
            KeyCode::Char(ch) => self.insert_str(&ch.to_string()),
            _ => {}
        }

        InputAction::None
    }
}
