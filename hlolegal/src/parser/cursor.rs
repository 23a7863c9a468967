use anyhow::Result;

/// Character-level view on the source.
///
/// Types such as `tensor<4x?xf32>` do not split into tokens in a useful way,
/// so they are read character by character. The [Parser](crate::parser::Parser)
/// skips its tokens up to [Cursor::pos] afterwards.
pub struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(chars: &'a [char], pos: usize) -> Self {
        Self { chars, pos }
    }
    pub fn pos(&self) -> usize {
        self.pos
    }
    pub fn peek(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }
    pub fn advance(&mut self) -> char {
        let c = self.peek();
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
        c
    }
    pub fn skip_whitespace(&mut self) {
        while self.peek().is_whitespace() {
            self.advance();
        }
    }
    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }
    /// Consume `s` after skipping whitespace.
    pub fn eat(&mut self, s: &str) -> bool {
        self.skip_whitespace();
        if self.starts_with(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }
    pub fn expect(&mut self, s: &str) -> Result<()> {
        if self.eat(s) {
            Ok(())
        } else {
            let found = self.peek();
            Err(anyhow::anyhow!("Expected '{s}', but got '{found}'"))
        }
    }
    /// Consume `c` without skipping whitespace.
    pub fn eat_char(&mut self, c: char) -> bool {
        if self.peek() == c {
            self.advance();
            true
        } else {
            false
        }
    }
    /// Read a word such as `tensor`, `f32`, or `mhlo.token`.
    pub fn identifier(&mut self) -> String {
        self.skip_whitespace();
        let mut word = String::new();
        while self.peek().is_alphanumeric() || self.peek() == '_' || self.peek() == '.' {
            word.push(self.advance());
        }
        word
    }
    pub fn integer(&mut self) -> Result<i64> {
        self.skip_whitespace();
        let mut digits = String::new();
        if self.peek() == '-' {
            digits.push(self.advance());
        }
        while self.peek().is_ascii_digit() {
            digits.push(self.advance());
        }
        digits
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Expected integer, but got '{digits}'"))
    }
    /// Read a dimension, where `?` stands for an unknown dimension.
    pub fn dim(&mut self) -> Result<Option<i64>> {
        self.skip_whitespace();
        if self.eat_char('?') {
            Ok(None)
        } else {
            Ok(Some(self.integer()?))
        }
    }
    /// Read a comma-separated list of dimensions up to (and including) `close`.
    pub fn dims(&mut self, close: char) -> Result<Vec<Option<i64>>> {
        let mut dims = vec![];
        loop {
            self.skip_whitespace();
            if self.eat_char(close) {
                return Ok(dims);
            }
            dims.push(self.dim()?);
            self.skip_whitespace();
            if !self.eat_char(',') {
                self.expect(&close.to_string())?;
                return Ok(dims);
            }
        }
    }
    /// Skip a `<...>` group including nested groups and strings.
    pub fn balanced(&mut self) -> Result<()> {
        let mut depth = 0;
        loop {
            match self.advance() {
                '\0' => return Err(anyhow::anyhow!("Unterminated '<'")),
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                '"' => {
                    while self.peek() != '"' && self.peek() != '\0' {
                        if self.advance() == '\\' {
                            self.advance();
                        }
                    }
                    self.advance();
                }
                _ => (),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor() {
        let chars = "foo.bar<1, \"a>b\"> [4, ?]".chars().collect::<Vec<char>>();
        let mut cursor = Cursor::new(&chars, 0);
        assert_eq!(cursor.identifier(), "foo.bar");
        cursor.balanced().unwrap();
        assert!(cursor.eat("["));
        assert_eq!(cursor.dims(']').unwrap(), vec![Some(4), None]);
        assert_eq!(cursor.pos(), chars.len());
        assert_eq!(cursor.peek(), '\0');
    }
}
