/// The kinds of tokens in the textual IR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Eof,

    /// `func.func`, `tensor`, `mhlo.token` or `dense`.
    BareIdentifier,
    /// `@main`
    AtIdentifier,
    /// `%arg0`
    PercentIdentifier,
    /// `^bb0`
    CaretIdentifier,

    /// `1.5` or `1.0e-3`
    FloatLiteral,
    /// `42`
    Integer,
    /// `"{replicated}"`, including the quotes.
    String,
    /// `i1`, `si8` or `ui32`
    IntType,

    Arrow,
    Colon,
    Comma,
    Equal,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Minus,
    Exclamation,
    Hash,
    Question,
    Greater,
    Less,
}

/// Where a token starts in the source.
///
/// `line` and `column` are zero-based and used for diagnostics. `start` is
/// the offset in characters, which lets the parser hand the raw text of an
/// unknown dialect attribute to a [Cursor](crate::parser::Cursor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    line: usize,
    column: usize,
    start: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, start: usize) -> Self {
        Self {
            line,
            column,
            start,
        }
    }
    pub fn line(&self) -> usize {
        self.line
    }
    pub fn column(&self) -> usize {
        self.column
    }
    pub fn start(&self) -> usize {
        self.start
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The text of the token as written, such as `%arg0` or `"foo"`.
    pub lexeme: String,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, location: Location) -> Self {
        Self {
            kind,
            lexeme,
            location,
        }
    }
}
