use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Position of a token or IR node in the source text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Name of the source the position refers to
    pub source: Arc<str>,
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
}

impl Location {
    /// Creates a location inside the named source
    pub fn new(source: Arc<str>, line: u32, column: u32) -> Self {
        Location {
            source,
            line,
            column,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location {
            source: Arc::from(""),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.source, self.line, self.column)
    }
}

/// A single token from the source code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Where the token starts
    pub location: Location,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: String, location: Location) -> Self {
        Token {
            kind,
            lexeme,
            location,
        }
    }

    /// End-of-stream marker at the given location
    pub fn eof(location: Location) -> Self {
        Token::new(TokenKind::Eof, String::new(), location)
    }
}

/// All possible token types of the effect language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Signed integer literal
    IntLiteral(i32),
    /// Unsigned integer literal (`u` suffix or out of signed range)
    UintLiteral(u32),
    /// Floating-point literal
    FloatLiteral(f32),
    /// String literal
    StringLiteral(String),
    /// Identifier, including built-in type names such as `float3`
    Identifier(String),
    /// Reserved word
    Keyword(Keyword),
    /// Operator or delimiter
    Punct(Punct),
    /// Character the scanner does not recognize
    Unknown(char),
    /// End of stream
    Eof,
}

impl TokenKind {
    /// Check if token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(self, TokenKind::Keyword(_))
    }

    /// Check if token is a literal of any kind
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral(_)
                | TokenKind::UintLiteral(_)
                | TokenKind::FloatLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::Keyword(Keyword::True)
                | TokenKind::Keyword(Keyword::False)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::IntLiteral(n) => write!(f, "{}", n),
            TokenKind::UintLiteral(n) => write!(f, "{}u", n),
            TokenKind::FloatLiteral(fl) => write!(f, "{}", fl),
            TokenKind::StringLiteral(s) => write!(f, "\"{}\"", s),
            TokenKind::Identifier(id) => write!(f, "'{}'", id),
            TokenKind::Keyword(kw) => write!(f, "'{}'", kw.as_str()),
            TokenKind::Punct(p) => write!(f, "'{}'", p.as_str()),
            TokenKind::Unknown(c) => write!(f, "'{}'", c),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// Reserved words of the effect language
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Keyword {
            $(
                #[doc = concat!("`", $text, "`")]
                $variant,
            )*
        }

        impl Keyword {
            /// Get keyword from string
            pub fn parse(s: &str) -> Option<Keyword> {
                match s {
                    $($text => Some(Keyword::$variant),)*
                    _ => None,
                }
            }

            /// Source spelling of the keyword
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }
        }
    };
}

keywords! {
    True => "true",
    False => "false",
    Struct => "struct",
    Namespace => "namespace",
    Technique => "technique",
    Pass => "pass",
    Typedef => "typedef",
    If => "if",
    Else => "else",
    While => "while",
    Do => "do",
    For => "for",
    Return => "return",
    Break => "break",
    Continue => "continue",
    Discard => "discard",
    Extern => "extern",
    Static => "static",
    Uniform => "uniform",
    Volatile => "volatile",
    Precise => "precise",
    In => "in",
    Out => "out",
    Inout => "inout",
    Const => "const",
    Linear => "linear",
    Noperspective => "noperspective",
    Centroid => "centroid",
    Nointerpolation => "nointerpolation",
    Vector => "vector",
    Matrix => "matrix",
}

macro_rules! punctuation {
    ($($variant:ident => $text:literal,)*) => {
        /// Operators and delimiters
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Punct {
            $(
                #[doc = concat!("`", $text, "`")]
                $variant,
            )*
        }

        impl Punct {
            /// Source spelling of the symbol
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Punct::$variant => $text,)*
                }
            }
        }
    };
}

punctuation! {
    LeftParen => "(",
    RightParen => ")",
    LeftBrace => "{",
    RightBrace => "}",
    LeftBracket => "[",
    RightBracket => "]",
    Comma => ",",
    Semicolon => ";",
    Colon => ":",
    ColonColon => "::",
    Dot => ".",
    Question => "?",
    Plus => "+",
    Minus => "-",
    Star => "*",
    Slash => "/",
    Percent => "%",
    PlusPlus => "++",
    MinusMinus => "--",
    Exclaim => "!",
    Tilde => "~",
    Ampersand => "&",
    Pipe => "|",
    Caret => "^",
    AmpAmp => "&&",
    PipePipe => "||",
    Less => "<",
    Greater => ">",
    LessEqual => "<=",
    GreaterEqual => ">=",
    EqualEqual => "==",
    ExclaimEqual => "!=",
    ShiftLeft => "<<",
    ShiftRight => ">>",
    Equal => "=",
    PlusEqual => "+=",
    MinusEqual => "-=",
    StarEqual => "*=",
    SlashEqual => "/=",
    PercentEqual => "%=",
    AmpEqual => "&=",
    PipeEqual => "|=",
    CaretEqual => "^=",
    ShiftLeftEqual => "<<=",
    ShiftRightEqual => ">>=",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_detection() {
        assert_eq!(Keyword::parse("technique"), Some(Keyword::Technique));
        assert_eq!(Keyword::parse("inout"), Some(Keyword::Inout));
        assert_eq!(Keyword::parse("float3"), None);
        assert_eq!(Keyword::Discard.as_str(), "discard");
    }

    #[test]
    fn test_location_display() {
        let loc = Location::new(Arc::from("effect.fx"), 3, 14);
        assert_eq!(loc.to_string(), "effect.fx(3, 14)");
    }

    #[test]
    fn test_is_literal() {
        assert!(TokenKind::FloatLiteral(1.0).is_literal());
        assert!(TokenKind::Keyword(Keyword::True).is_literal());
        assert!(!TokenKind::Keyword(Keyword::If).is_literal());
        assert!(!TokenKind::Identifier("x".to_string()).is_literal());
    }
}
