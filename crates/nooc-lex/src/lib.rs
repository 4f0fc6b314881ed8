//! nooc-lex - Lexer for the Noolang language.
//!
//! Transforms `.noo` source text into a stream of [`Token`]s with spans.
//! The lexer is a straightforward hand-written scanner: a [`Cursor`] walks
//! the source character by character, and the [`Lexer`] dispatches on the
//! current character to the sub-lexers (numbers, strings, identifiers).
//!
//! Noolang specifics worth knowing at this level:
//!
//! - `#` starts a line comment.
//! - All numeric literals are floats (`1` and `1.0` lex to the same kind).
//! - `@name` is an accessor token and `@name?` its optional variant; both
//!   are single tokens, not `@` followed by an identifier.
//! - `=` is definition, `==` comparison, `=>` lambda body, `->` function
//!   type, `|` pipe/union, `:=` mutation.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::{Token, TokenKind};
