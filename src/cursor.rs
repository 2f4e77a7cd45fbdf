use std::str::Chars;

pub(crate) const EOF_CHAR: char = '\0';

/// Peekable character stream over the source text which tracks the position
/// of the next character.
pub struct Cursor<'a> {
    chars: Chars<'a>,
    prev: char,
    line: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            chars: input.chars(),
            prev: EOF_CHAR,
            line: 1,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Last eaten character.
    pub fn prev(&self) -> char {
        self.prev
    }

    /// Peek the next character without consuming it, `EOF_CHAR` at the end.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    pub fn second(&self) -> char {
        let mut it = self.chars.clone();
        it.next();
        it.next().unwrap_or(EOF_CHAR)
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.prev = c;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    pub fn eat_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while !self.is_eof() && predicate(self.first()) {
            self.bump();
        }
    }

    /// Like `eat_while`, but collects the eaten characters into `buf`.
    pub fn eat_while_back(&mut self, buf: &mut String, mut predicate: impl FnMut(char) -> bool) {
        while !self.is_eof() && predicate(self.first()) {
            if let Some(c) = self.bump() {
                buf.push(c);
            }
        }
    }
}
