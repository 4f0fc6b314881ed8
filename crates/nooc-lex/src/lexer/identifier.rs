//! Identifier, keyword and accessor lexing.

use nooc_util::{DiagnosticBuilder, DiagnosticCode, Symbol};

use super::Lexer;
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    /// Lex an identifier or keyword.
    pub(crate) fn lex_identifier(&mut self) -> Token {
        self.cursor
            .advance_while(|c| c.is_alphanumeric() || c == '_');
        let text = self.cursor.slice(self.token_start, self.cursor.position());
        match TokenKind::keyword(text) {
            Some(kind) => self.token(kind),
            None => self.token(TokenKind::Ident(Symbol::intern(text))),
        }
    }

    /// Lex `@field` or `@field?`.
    pub(crate) fn lex_accessor(&mut self) -> Token {
        self.cursor.advance(); // @
        let name_start = self.cursor.position();
        self.cursor
            .advance_while(|c| c.is_alphanumeric() || c == '_');
        let name = self.cursor.slice(name_start, self.cursor.position());

        if name.is_empty() {
            DiagnosticBuilder::error("expected field name after `@`")
                .code(DiagnosticCode::E_LEX_UNEXPECTED_CHAR)
                .span(self.current_span())
                .emit(self.handler());
            return self.next_token();
        }

        let symbol = Symbol::intern(name);
        if self.cursor.current_char() == '?' {
            self.cursor.advance();
            self.token(TokenKind::AccessorOpt(symbol))
        } else {
            self.token(TokenKind::Accessor(symbol))
        }
    }
}
