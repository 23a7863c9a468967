use crate::ir::Block;
use crate::ir::ModuleOp;
use crate::ir::Operation;
use crate::ir::Value;
use crate::parser::cursor::Cursor;
use crate::parser::scanner::Scanner;
use crate::parser::token::Token;
use crate::parser::token::TokenKind;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::collections::HashMap;

/// Recursive-descent parser for the textual IR.
///
/// Operations are read in the generic form
/// (`%0 = "mhlo.add"(%a, %b) : (tensor<f32>, tensor<f32>) -> tensor<f32>`)
/// apart from `module` and `func.func`, which use their custom form.
pub struct Parser {
    src: String,
    chars: Vec<char>,
    tokens: Vec<Token>,
    current: usize,
    /// SSA names that are visible at the current position, innermost last.
    scopes: Vec<HashMap<String, Shared<Value>>>,
}

impl Parser {
    pub fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
    pub fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    pub fn peek(&self) -> &Token {
        self.peek_n(0)
    }
    pub fn peek_n(&self, n: usize) -> &Token {
        let index = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }
    pub fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
    pub fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().kind == kind
    }
    /// Whether the next token has the given kind and lexeme.
    pub fn check_lexeme(&self, kind: TokenKind, lexeme: &str) -> bool {
        self.check(kind) && self.peek().lexeme == lexeme
    }
    pub fn error(&self, token: &Token, msg: &str) -> String {
        let msg = Scanner::error(&self.src, &token.location, msg);
        format!("\n\n{msg}\n")
    }
    pub fn report_token_error(&self, token: &Token, expected: TokenKind) -> Result<Token> {
        let msg = format!(
            "Expected {:?}, but got \"{}\" of kind {:?}",
            expected, token.lexeme, token.kind
        );
        Err(anyhow::anyhow!(self.error(token, &msg)))
    }
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            self.advance();
            Ok(self.previous().clone())
        } else {
            self.report_token_error(self.peek(), kind)
        }
    }
    /// Return the token index so that the parser can backtrack to it.
    pub(crate) fn mark(&self) -> usize {
        self.current
    }
    pub(crate) fn reset(&mut self, mark: usize) {
        self.current = mark;
    }
    /// A character-level cursor positioned at the next token.
    pub(crate) fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.chars, self.peek().location.start())
    }
    pub(crate) fn source_range(&self, start: usize, end: usize) -> String {
        self.chars[start.min(end)..end].iter().collect()
    }
    /// Skip all tokens that start before `pos`.
    ///
    /// Used to continue token-based parsing after the [Cursor] has read a
    /// part of the source.
    pub(crate) fn skip_to(&mut self, pos: usize) {
        while !self.is_at_end() && self.peek().location.start() < pos {
            self.current += 1;
        }
    }
    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }
    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }
    /// Make a value visible under its name in the innermost scope.
    pub(crate) fn define(&mut self, token: &Token, value: Shared<Value>) -> Result<()> {
        let name = token.lexeme.clone();
        let redefined = self.scopes.iter().any(|scope| scope.contains_key(&name));
        if redefined {
            let msg = format!("Redefinition of {name}");
            return Err(anyhow::anyhow!(self.error(token, &msg)));
        }
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name, value);
                Ok(())
            }
            None => Err(anyhow::anyhow!(self.error(token, "No scope to define value in"))),
        }
    }
    /// Find the value that a name such as `%0` refers to.
    pub(crate) fn lookup(&self, token: &Token) -> Result<Shared<Value>> {
        let value = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&token.lexeme));
        match value {
            Some(value) => Ok(value.clone()),
            None => {
                let msg = "Expected assignment before use.";
                Err(anyhow::anyhow!(self.error(token, msg)))
            }
        }
    }
    /// Parse `%0`, `%1` and return the values that the names refer to.
    pub fn operands(&mut self) -> Result<Vec<Shared<Value>>> {
        let mut operands = vec![];
        while self.check(TokenKind::PercentIdentifier) {
            let token = self.expect(TokenKind::PercentIdentifier)?;
            operands.push(self.lookup(&token)?);
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(operands)
    }
    /// Parse the operations of a block until `}` or the next block label.
    pub fn ops(&mut self, block: &Shared<Block>) -> Result<()> {
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::CaretIdentifier) {
            if self.is_at_end() {
                let token = self.peek().clone();
                return Err(anyhow::anyhow!(self.error(&token, "Expected '}'")));
            }
            let op = self.parse_op()?;
            block.wr().push(op);
        }
        Ok(())
    }
    pub fn parse(src: &str) -> Result<ModuleOp> {
        let mut parser = Parser {
            src: src.to_string(),
            chars: src.chars().collect(),
            tokens: Scanner::scan(src)?,
            current: 0,
            scopes: vec![HashMap::new()],
        };
        let module = if parser.check_lexeme(TokenKind::BareIdentifier, "module") {
            parser.parse_module()?
        } else {
            // Top-level operations without `module { ... }` around them.
            let module = ModuleOp::default();
            let body = module.body()?;
            while !parser.is_at_end() {
                let op = parser.parse_op()?;
                body.wr().push(op);
            }
            module
        };
        if !parser.is_at_end() {
            let token = parser.peek().clone();
            let msg = "Expected end of input after module";
            return Err(anyhow::anyhow!(parser.error(&token, msg)));
        }
        Ok(module)
    }
    /// Parse a single operation outside of any module.
    pub fn parse_single_op(src: &str) -> Result<Shared<Operation>> {
        let mut parser = Parser {
            src: src.to_string(),
            chars: src.chars().collect(),
            tokens: Scanner::scan(src)?,
            current: 0,
            scopes: vec![HashMap::new()],
        };
        parser.parse_op()
    }
}
