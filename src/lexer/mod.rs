//! Lexical analysis for effect source text
//!
//! The parser consumes tokens through the [`TokenSource`] trait; [`Lexer`] is
//! the default implementation that scans characters on demand.

mod scanner;
mod token;

pub use scanner::{Lexer, StreamPosition, TokenSource};
pub use token::{Keyword, Location, Punct, Token, TokenKind};
