use std::fmt;

/// Line-oriented output target for generated code.
///
/// Rules and visitors only ever append whole lines; indentation is tracked
/// by the sink.
pub trait Sink {
    /// Append one line at the current indentation.
    fn line(&mut self, text: &str);

    fn increase_indent(&mut self);

    fn decrease_indent(&mut self);

    /// Append an empty line.
    fn blank(&mut self) {
        self.line("");
    }
}

/// An in-memory [`Sink`] that renders to a `String`.
#[derive(Debug, Clone)]
pub struct Document {
    out: String,
    level: usize,
    indent_width: usize,
}

impl Document {
    pub fn new(indent_width: usize) -> Self {
        Self {
            out: String::new(),
            level: 0,
            indent_width,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }

    /// Emit `{`, run `body` one level deeper, then emit `}`.
    pub fn scope<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.line("{");
        self.increase_indent();
        let result = body(self);
        self.decrease_indent();
        self.line("}");
        result
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Sink for Document {
    fn line(&mut self, text: &str) {
        // Blank lines carry no trailing whitespace.
        if !text.is_empty() {
            for _ in 0..self.level * self.indent_width {
                self.out.push(' ');
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn increase_indent(&mut self) {
        self.level += 1;
    }

    /// Saturates at column zero.
    fn decrease_indent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.out)
    }
}
