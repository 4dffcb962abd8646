//! Stack of currently open elements, bottom = outermost, top = innermost.
//!
//! Every entry is a start tag already written to the output whose end tag
//! has not been written yet. Entries only leave through
//! [`OpenElements::truncate_with`], which hands each one to the caller so the
//! matching end tag gets written.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenElements {
    names: Vec<String>,
}

impl OpenElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    /// Remove and return the innermost element.
    pub fn pop(&mut self) -> Option<String> {
        self.names.pop()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn top(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    /// Index of the innermost open element called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().rposition(|n| n == name)
    }

    /// Elements opened after (above) `index`, outermost first.
    pub fn above(&self, index: usize) -> &[String] {
        self.names.get(index + 1..).unwrap_or(&[])
    }

    /// Pop everything at `index` and above, innermost first, handing each
    /// name to `on_close`.
    pub fn truncate_with(&mut self, index: usize, mut on_close: impl FnMut(&str)) {
        while self.names.len() > index {
            if let Some(name) = self.names.pop() {
                on_close(&name);
            }
        }
    }
}
