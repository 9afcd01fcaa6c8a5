/// Word, character and line counts plus an estimated read time, recomputed
/// on every edit. Read time assumes 200 words per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentStats {
    pub words: usize,
    pub chars: usize,
    pub lines: usize,
    pub read_minutes: usize,
}

impl DocumentStats {
    pub fn of(text: &str) -> Self {
        let words = text.split_whitespace().count();
        Self {
            words,
            chars: text.chars().count(),
            lines: text.split('\n').count(),
            read_minutes: words.div_ceil(200),
        }
    }
}
