//! Core lexer implementation.
//!
//! This module contains the main Lexer struct and its dispatch loop.
//! Literal scanning lives in the sibling sub-modules.

mod identifier;
mod number;
mod string;

use nooc_util::{DiagnosticBuilder, DiagnosticCode, FileId, Handler, Span};

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

/// Lexer for the Noolang language.
///
/// The lexer transforms source text into a stream of tokens. It handles
/// whitespace, `#` comments, identifiers, keywords, accessors, operators,
/// and literals. Errors are reported through the handler; the offending
/// character is skipped and lexing continues.
pub struct Lexer<'a> {
    /// Character cursor for source traversal.
    pub(crate) cursor: Cursor<'a>,

    /// Error handler for reporting lexical errors.
    handler: &'a Handler,

    /// File the source came from, stamped onto every span.
    file_id: FileId,

    /// Starting position of the current token (byte offset).
    pub(crate) token_start: usize,

    /// Line number where the current token starts (1-based).
    token_start_line: u32,

    /// Column number where the current token starts (1-based).
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source code.
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self::with_file(source, handler, FileId::DUMMY)
    }

    /// Creates a lexer whose spans reference a specific file.
    pub fn with_file(source: &'a str, handler: &'a Handler, file_id: FileId) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            file_id,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Lex the entire source into a token vector ending with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    /// Returns the next token from the source code.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return self.token(TokenKind::Eof);
        }

        let ch = self.cursor.current_char();
        match ch {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '+' => self.single(TokenKind::Plus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '|' => self.single(TokenKind::Pipe),
            '-' => self.lex_minus(),
            '=' => self.lex_equals(),
            '!' => self.lex_bang(),
            '<' => self.lex_less(),
            '>' => self.lex_greater(),
            ':' => self.lex_colon(),
            '@' => self.lex_accessor(),
            '"' => self.lex_string(),
            '_' if !self.peek_is_ident_continue() => self.single(TokenKind::Underscore),
            c if c.is_ascii_digit() => self.lex_number(),
            c if c.is_alphabetic() || c == '_' => self.lex_identifier(),
            c => {
                DiagnosticBuilder::error(format!("unexpected character `{}`", c))
                    .code(DiagnosticCode::E_LEX_UNEXPECTED_CHAR)
                    .span(self.current_span())
                    .emit(self.handler);
                self.cursor.advance();
                self.next_token()
            }
        }
    }

    fn lex_minus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.current_char() == '>' {
            self.cursor.advance();
            self.token(TokenKind::Arrow)
        } else {
            self.token(TokenKind::Minus)
        }
    }

    fn lex_equals(&mut self) -> Token {
        self.cursor.advance();
        match self.cursor.current_char() {
            '=' => {
                self.cursor.advance();
                self.token(TokenKind::EqEq)
            }
            '>' => {
                self.cursor.advance();
                self.token(TokenKind::FatArrow)
            }
            _ => self.token(TokenKind::Equals),
        }
    }

    fn lex_bang(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.current_char() == '=' {
            self.cursor.advance();
            self.token(TokenKind::NotEq)
        } else {
            DiagnosticBuilder::error("unexpected character `!`")
                .code(DiagnosticCode::E_LEX_UNEXPECTED_CHAR)
                .span(self.current_span())
                .help("`!` is only valid as part of `!=`")
                .emit(self.handler);
            self.next_token()
        }
    }

    fn lex_less(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.current_char() == '=' {
            self.cursor.advance();
            self.token(TokenKind::Le)
        } else {
            self.token(TokenKind::Lt)
        }
    }

    fn lex_greater(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.current_char() == '=' {
            self.cursor.advance();
            self.token(TokenKind::Ge)
        } else {
            self.token(TokenKind::Gt)
        }
    }

    fn lex_colon(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.current_char() == '=' {
            self.cursor.advance();
            self.token(TokenKind::ColonEq)
        } else {
            self.token(TokenKind::Colon)
        }
    }

    fn peek_is_ident_continue(&self) -> bool {
        let next = self.cursor.peek_char();
        next.is_alphanumeric() || next == '_'
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.cursor.advance_while(|c| c.is_whitespace());
            if self.cursor.current_char() == '#' {
                self.cursor.advance_while(|c| c != '\n');
            } else {
                break;
            }
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        Span::with_file(
            self.token_start,
            self.cursor.position(),
            self.file_id,
            self.token_start_line,
            self.token_start_column,
        )
    }

    pub(crate) fn token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.current_span())
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        self.token(kind)
    }

    pub(crate) fn handler(&self) -> &'a Handler {
        self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let handler = Handler::new();
        Lexer::new(source, &handler)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Ident(nooc_util::Symbol::intern(name))
    }

    #[test]
    fn test_punctuation_and_operators() {
        assert_eq!(
            kinds("( ) [ ] , ; + - * / | < <= > >= == != -> => : :="),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Pipe,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::Colon,
                TokenKind::ColonEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        assert_eq!(
            kinds("fn map if then else"),
            vec![
                TokenKind::Fn,
                ident("map"),
                TokenKind::If,
                TokenKind::Then,
                TokenKind::Else,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lambda_expression() {
        assert_eq!(
            kinds("fn x => x + 1"),
            vec![
                TokenKind::Fn,
                ident("x"),
                TokenKind::FatArrow,
                ident("x"),
                TokenKind::Plus,
                TokenKind::Number(1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("x # comment to end of line\ny"),
            vec![ident("x"), ident("y"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_accessor_tokens() {
        assert_eq!(
            kinds("@name @age?"),
            vec![
                TokenKind::Accessor(nooc_util::Symbol::intern("name")),
                TokenKind::AccessorOpt(nooc_util::Symbol::intern("age")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_underscore_is_wildcard() {
        assert_eq!(kinds("_"), vec![TokenKind::Underscore, TokenKind::Eof]);
        assert_eq!(kinds("_x"), vec![ident("_x"), TokenKind::Eof]);
    }

    #[test]
    fn test_spans_track_lines() {
        let handler = Handler::new();
        let tokens = Lexer::new("x\ny", &handler).tokenize();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 2);
    }

    #[test]
    fn test_unexpected_character_reports_and_continues() {
        let handler = Handler::new();
        let tokens = Lexer::new("x $ y", &handler).tokenize();
        assert!(handler.has_errors());
        assert_eq!(tokens.len(), 3); // x, y, Eof
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn lexer_never_panics(source in "\\PC*") {
                let handler = Handler::new();
                let _ = Lexer::new(&source, &handler).tokenize();
            }

            #[test]
            fn identifiers_round_trip(name in "[a-z][a-z0-9_]{0,10}") {
                prop_assume!(TokenKind::keyword(&name).is_none());
                let handler = Handler::new();
                let tokens = Lexer::new(&name, &handler).tokenize();
                prop_assert_eq!(tokens.len(), 2);
                prop_assert_eq!(
                    tokens[0].kind.clone(),
                    TokenKind::Ident(nooc_util::Symbol::intern(&name))
                );
            }

            #[test]
            fn numbers_lex_to_their_value(value in 0.0f64..1e9) {
                let source = format!("{}", value);
                let handler = Handler::new();
                let tokens = Lexer::new(&source, &handler).tokenize();
                prop_assert_eq!(tokens.len(), 2);
                match tokens[0].kind {
                    TokenKind::Number(n) => prop_assert!((n - value).abs() < 1e-9),
                    ref k => prop_assert!(false, "expected number, got {:?}", k),
                }
            }
        }
    }
}
