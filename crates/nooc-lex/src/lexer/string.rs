//! String literal lexing with escape processing.

use nooc_util::{DiagnosticBuilder, DiagnosticCode};

use super::Lexer;
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    /// Lex a double-quoted string literal. Escapes: `\n \t \r \\ \"`.
    pub(crate) fn lex_string(&mut self) -> Token {
        self.cursor.advance(); // opening quote
        let mut value = String::new();

        loop {
            if self.cursor.is_at_end() || self.cursor.current_char() == '\n' {
                DiagnosticBuilder::error("unterminated string literal")
                    .code(DiagnosticCode::E_LEX_UNTERMINATED_STRING)
                    .span(self.current_span())
                    .help("add a closing `\"`")
                    .emit(self.handler());
                return self.token(TokenKind::Str(value));
            }

            match self.cursor.current_char() {
                '"' => {
                    self.cursor.advance();
                    return self.token(TokenKind::Str(value));
                }
                '\\' => {
                    self.cursor.advance();
                    let escaped = self.cursor.current_char();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        other => {
                            DiagnosticBuilder::error(format!(
                                "invalid escape sequence `\\{}`",
                                other
                            ))
                            .code(DiagnosticCode::E_LEX_INVALID_ESCAPE)
                            .span(self.current_span())
                            .emit(self.handler());
                            value.push(other);
                        }
                    }
                    self.cursor.advance();
                }
                ch => {
                    value.push(ch);
                    self.cursor.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::TokenKind;
    use crate::Lexer;
    use nooc_util::Handler;

    fn lex_one(source: &str) -> TokenKind {
        let handler = Handler::new();
        Lexer::new(source, &handler).next_token().kind
    }

    #[test]
    fn test_simple_string() {
        assert_eq!(lex_one(r#""hello""#), TokenKind::Str("hello".into()));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(lex_one(r#""a\nb\t\"c\"""#), TokenKind::Str("a\nb\t\"c\"".into()));
    }

    #[test]
    fn test_unterminated_string_reports() {
        let handler = Handler::new();
        let _ = Lexer::new(r#""oops"#, &handler).tokenize();
        assert!(handler.has_errors());
    }

    #[test]
    fn test_invalid_escape_reports_but_keeps_char() {
        let handler = Handler::new();
        let token = Lexer::new(r#""a\qb""#, &handler).next_token();
        assert!(handler.has_errors());
        assert_eq!(token.kind, TokenKind::Str("aqb".into()));
    }
}
