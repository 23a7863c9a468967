use crate::parser::token::Location;
use crate::parser::token::Token;
use crate::parser::token::TokenKind;
use anyhow::Result;

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 0,
            column: 0,
        }
    }
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }
    fn peek(&self) -> char {
        self.peek_n(0)
    }
    fn peek_next(&self) -> char {
        self.peek_n(1)
    }
    fn peek_n(&self, n: usize) -> char {
        self.source.get(self.current + n).copied().unwrap_or('\0')
    }
    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = if kind == TokenKind::Eof {
            "".to_string()
        } else {
            self.source[self.start..self.current].iter().collect()
        };
        let diff = self.current - self.start;
        let column = self.column - diff;
        let location = Location::new(self.line, column, self.start);
        self.tokens.push(Token::new(kind, lexeme, location));
    }
    fn number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        // Exponent such as `1.0e-05`.
        if is_float && (self.peek() == 'e' || self.peek() == 'E') {
            let sign = self.peek_next() == '+' || self.peek_next() == '-';
            let digit = if sign { self.peek_n(2) } else { self.peek_next() };
            if digit.is_ascii_digit() {
                self.advance();
                if sign {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }
        if is_float {
            self.add_token(TokenKind::FloatLiteral);
        } else {
            self.add_token(TokenKind::Integer)
        }
        Ok(())
    }
    // Whether the character is a valid identifier start character.
    fn is_identifier_start(c: char) -> bool {
        c.is_alphabetic() || c == '_' || c == '@' || c == '%' || c == '^'
    }
    // Whether the character is a valid identifier character.
    fn is_identifier(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
    }
    fn is_int_type(word: &str) -> bool {
        let digits = word
            .strip_prefix("si")
            .or_else(|| word.strip_prefix("ui"))
            .or_else(|| word.strip_prefix('i'));
        match digits {
            Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
            None => false,
        }
    }
    // Scan identifiers and keywords.
    fn identifier(&mut self) -> Result<()> {
        while Scanner::is_identifier(self.peek()) {
            self.advance();
        }
        let lexeme = self.source[self.start..self.current]
            .iter()
            .collect::<String>();
        let kind = match lexeme.as_str() {
            s if s.starts_with('@') => TokenKind::AtIdentifier,
            s if s.starts_with('%') => TokenKind::PercentIdentifier,
            s if s.starts_with('^') => TokenKind::CaretIdentifier,
            s if Scanner::is_int_type(s) => TokenKind::IntType,
            _ => TokenKind::BareIdentifier,
        };
        self.add_token(kind);
        Ok(())
    }
    fn arrow_or_minus(&mut self) -> Result<()> {
        if self.peek() == '>' {
            self.advance();
            self.add_token(TokenKind::Arrow);
        } else {
            self.add_token(TokenKind::Minus);
        }
        Ok(())
    }
    fn string(&mut self) -> Result<()> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\\' {
                self.advance();
            }
            if self.peek() == '\n' {
                self.line += 1;
                self.column = 0;
            }
            if !self.is_at_end() {
                self.advance();
            }
        }
        if self.is_at_end() {
            return Err(anyhow::anyhow!("Unterminated string"));
        } else {
            // self.peek() == '"'
            self.advance();
            self.add_token(TokenKind::String);
        }
        Ok(())
    }
    fn comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }
    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            '{' => self.add_token(TokenKind::LBrace),
            '}' => self.add_token(TokenKind::RBrace),
            '[' => self.add_token(TokenKind::LBracket),
            ']' => self.add_token(TokenKind::RBracket),
            ':' => self.add_token(TokenKind::Colon),
            ',' => self.add_token(TokenKind::Comma),
            '=' => self.add_token(TokenKind::Equal),
            '!' => self.add_token(TokenKind::Exclamation),
            '#' => self.add_token(TokenKind::Hash),
            '?' => self.add_token(TokenKind::Question),
            '>' => self.add_token(TokenKind::Greater),
            '<' => self.add_token(TokenKind::Less),
            ' ' | '\r' | '\t' => (),
            '\n' => {
                self.line += 1;
                self.column = 0;
            }
            '/' if self.peek() == '/' => self.comment(),
            '-' => self.arrow_or_minus()?,
            '"' => self.string()?,
            s if s.is_ascii_digit() => self.number()?,
            s if Scanner::is_identifier_start(s) => self.identifier()?,
            _ => {
                let column = if self.column == 0 { 0 } else { self.column - 1 };
                let location = Location::new(self.line, column, self.start);
                let src = self.source.iter().collect::<String>();
                return Err(anyhow::anyhow!(Self::error(
                    &src,
                    &location,
                    &format!("Scanning failed starting at: {}", c)
                )));
            }
        }
        Ok(())
    }
    fn scan_tokens(&mut self) -> Result<()> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.start = self.current;
        self.add_token(TokenKind::Eof);
        Ok(())
    }
    pub fn scan(src: &str) -> Result<Vec<Token>> {
        let mut scanner = Scanner::new(src);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }
    pub fn error(src: &str, loc: &Location, msg: &str) -> String {
        let lines = src.split('\n').collect::<Vec<&str>>();
        let n = loc.line().min(lines.len().saturating_sub(1));
        let prev_line = if n > 0 {
            let prev_n = n - 1;
            let prev = lines[prev_n];
            format!("\n{prev_n}  | {prev}")
        } else {
            "".to_string()
        };
        let line = lines.get(n).copied().unwrap_or("");
        let line_num_width = 4 + n.to_string().len();
        let err_indent = " ".repeat(loc.column() + line_num_width);
        format!("```{prev_line}\n{n}  | {line}\n{err_indent}^ {msg}\n```")
    }
}
