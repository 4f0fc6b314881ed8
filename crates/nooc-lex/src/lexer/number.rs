//! Number literal lexing.
//!
//! Noolang has a single numeric type, Float, so `1`, `1.5` and `1e3` all
//! produce `TokenKind::Number`.

use nooc_util::{DiagnosticBuilder, DiagnosticCode};

use super::Lexer;
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    /// Lex a numeric literal: digits, optional fraction, optional exponent.
    pub(crate) fn lex_number(&mut self) -> Token {
        self.cursor.advance_while(|c| c.is_ascii_digit());

        // Fraction, only when followed by a digit so `1.foo` stays two tokens.
        if self.cursor.current_char() == '.' && self.cursor.peek_char().is_ascii_digit() {
            self.cursor.advance();
            self.cursor.advance_while(|c| c.is_ascii_digit());
        }

        // Exponent, only when `e` is followed by a digit or a signed digit.
        let next = self.cursor.peek_char();
        if matches!(self.cursor.current_char(), 'e' | 'E')
            && (next.is_ascii_digit() || matches!(next, '+' | '-'))
        {
            self.cursor.advance();
            if matches!(self.cursor.current_char(), '+' | '-') {
                self.cursor.advance();
            }
            if !self.cursor.current_char().is_ascii_digit() {
                DiagnosticBuilder::error("malformed number literal: missing exponent digits")
                    .code(DiagnosticCode::E_LEX_INVALID_NUMBER)
                    .span(self.current_span())
                    .emit(self.handler());
                return self.token(TokenKind::Number(0.0));
            }
            self.cursor.advance_while(|c| c.is_ascii_digit());
        }

        let text = self.cursor.slice(self.token_start, self.cursor.position());
        match text.parse::<f64>() {
            Ok(value) => self.token(TokenKind::Number(value)),
            Err(_) => {
                DiagnosticBuilder::error(format!("malformed number literal `{}`", text))
                    .code(DiagnosticCode::E_LEX_INVALID_NUMBER)
                    .span(self.current_span())
                    .emit(self.handler());
                self.token(TokenKind::Number(0.0))
            }
        }
    }
}
