/// The mutable text buffer the session edits against. Hosts adapt their
/// editor widget to this; [`StringBuffer`] is the plain in-memory
/// implementation used in tests and headless embeddings.
///
/// Offsets are in characters, not bytes.
pub trait TextBuffer {
    fn content(&self) -> String;
    fn set_content(&mut self, text: &str);
    fn selection(&self) -> (usize, usize);
    fn set_selection(&mut self, start: usize, end: usize);
}

pub struct StringBuffer {
    text: String,
    selection: (usize, usize),
}

impl StringBuffer {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            selection: (0, 0),
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.set_content(text);
        buffer
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl TextBuffer for StringBuffer {
    fn content(&self) -> String {
        self.text.clone()
    }

    fn set_content(&mut self, text: &str) {
        self.text = text.to_string();
        let len = self.char_len();
        self.selection = (self.selection.0.min(len), self.selection.1.min(len));
    }

    fn selection(&self) -> (usize, usize) {
        self.selection
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        let len = self.char_len();
        let start = start.min(len);
        let end = end.min(len);
        // Normalize so start never trails end
        self.selection = if start <= end { (start, end) } else { (end, start) };
    }
}

impl Default for StringBuffer {
    fn default() -> Self {
        Self::new()
    }
}
