// src/cursor.rs
//
// Position-tracking view over the input. Everything else reads input through
// this type.
//
// - Lookahead past the end yields NUL (b'\0') instead of failing, so callers
//   can compare characters without bounds checks.
// - Positions are byte offsets. Every syntactically meaningful character is
//   ASCII, so positions produced by scanning always sit on UTF-8 boundaries.
// - Two backing stores: a fixed `&str`, or a growable `String` that can be
//   extended with `push_str` while a conversion is being set up or chained.

/// Sentinel returned when reading past the end of input.
pub const NUL: u8 = b'\0';

/// A read cursor over `S`, which is either `&str` or `String`.
#[derive(Clone, Debug, Default)]
pub struct Cursor<S = String> {
    src: S,
    pos: usize,
}

impl<S: AsRef<str>> Cursor<S> {
    pub fn new(src: S) -> Self {
        Self { src, pos: 0 }
    }

    /// The whole backing text, independent of the current position.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.src.as_ref()
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.src.as_ref().as_bytes()
    }

    /// Total length of the backing text in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.len()
    }

    /// Byte at `position() + offset`, or NUL past the end.
    #[inline]
    pub fn peek(&self, offset: usize) -> u8 {
        self.char_at(self.pos + offset)
    }

    /// Byte at an absolute index, or NUL past the end.
    #[inline]
    pub fn char_at(&self, index: usize) -> u8 {
        self.bytes().get(index).copied().unwrap_or(NUL)
    }

    /// Move forward `n` bytes, clamped to the end of input.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.len());
    }

    /// `len` bytes starting at absolute `start`, clamped to the end of input.
    ///
    /// Both ends must fall on character boundaries. Offsets produced by
    /// scanning for ASCII delimiters always do.
    pub fn substring(&self, start: usize, len: usize) -> &str {
        let text = self.as_str();
        let start = start.min(text.len());
        let end = start.saturating_add(len).min(text.len());
        &text[start..end]
    }

    /// Unread input as bytes.
    #[inline]
    pub fn rest(&self) -> &[u8] {
        &self.bytes()[self.pos..]
    }

    /// Does the unread input start with `pat`?
    #[inline]
    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.rest().starts_with(pat)
    }

    /// Jump back to an earlier position. Only the tag parser uses this, to
    /// undo a failed parse.
    pub(crate) fn rewind(&mut self, pos: usize) {
        debug_assert!(pos <= self.pos, "rewind must not move forward");
        self.pos = pos;
    }
}

impl Cursor<String> {
    /// Append more input to a growable cursor. The read position is kept.
    pub fn push_str(&mut self, more: &str) {
        self.src.push_str(more);
    }

    /// Give back the backing buffer.
    pub fn into_inner(self) -> String {
        self.src
    }
}

impl<'a> From<&'a str> for Cursor<&'a str> {
    fn from(src: &'a str) -> Self {
        Cursor::new(src)
    }
}

impl From<String> for Cursor<String> {
    fn from(src: String) -> Self {
        Cursor::new(src)
    }
}
