/// Fixed width command line typed into at the bottom of the screen
///
/// ┌──────────────── Insert at cursor (capacity 6) ─────────────────┐
/// │  before : [ a | b | c | d | e | f ]   cursor = 2               │
/// │  insert 'x'                                                    │
/// │  after  : [ a | b | x | c | d | e ]   cursor = 3   'f' dropped │
/// └────────────────────────────────────────────────────────────────┘
///
/// - capacity never changes after construction
/// - a full line silently drops its tail on insert
/// - cursor always stays inside `0..capacity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    cells: Vec<char>,
    cursor: usize,
}

pub const BLANK: char = ' ';

impl LineBuffer {
    /// Create a blank line with `capacity` cells
    /// - a zero capacity is bumped to one so a cursor cell always exists
    pub fn new(capacity: usize) -> Self {
        LineBuffer {
            cells: vec![BLANK; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn last(&self) -> usize {
        self.cells.len() - 1
    }

    /// Clamp `index` into `[0, capacity - 1]`, out of range input is never
    /// rejected
    pub fn set_cursor(&mut self, index: i64) {
        let last = self.last() as i64;
        self.cursor = index.clamp(0, last) as usize;
    }

    pub fn shift_cursor(&mut self, offset: i64) {
        self.set_cursor((self.cursor as i64).saturating_add(offset));
    }

    pub fn insert_character(&mut self, ch: char) {
        // shift everything from the cursor one cell right, tail falls off
        let last = self.last();
        for i in (self.cursor..last).rev() {
            self.cells[i + 1] = self.cells[i];
        }
        self.cells[self.cursor] = ch;
        self.shift_cursor(1);
    }

    /// Remove the character under the cursor, cursor stays put
    pub fn delete_character(&mut self) {
        let last = self.last();
        for i in self.cursor..last {
            self.cells[i] = self.cells[i + 1];
        }
        self.cells[last] = BLANK;
    }

    /// Remove the character left of the cursor and step onto its cell
    /// - nothing to the left at cursor 0, so the line is left untouched
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.shift_cursor(-1);
        self.delete_character();
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = BLANK);
        self.cursor = 0;
    }

    /// Every cell, trailing blanks included
    pub fn text(&self) -> String {
        self.cells.iter().collect()
    }

    pub fn cells(&self) -> &[char] {
        &self.cells
    }
}

/// Characters the command line will take from the keyboard
/// - ascii letters and digits
/// - space and `. , ? ! : ; ' "`
pub fn is_accepted(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '.' | ',' | '?' | '!' | ':' | ';' | '\'' | '"')
}
