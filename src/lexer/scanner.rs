use super::token::{Keyword, Location, Punct, Token, TokenKind};
use std::sync::Arc;

/// Opaque cursor into a token stream, used to rewind for backtracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamPosition {
    /// Character offset of the next token
    pub offset: usize,
    /// Line at that offset
    pub line: u32,
    /// Column at that offset
    pub column: u32,
}

/// Supplier of tokens to the parser
///
/// Implementations hand out one token per call and must be able to jump back
/// to any position they reported earlier.
pub trait TokenSource {
    /// Produces the next token; returns `Eof` forever once exhausted
    fn next_token(&mut self) -> Token;

    /// Position of the token the next call to `next_token` will return
    fn position(&self) -> StreamPosition;

    /// Rewinds (or fast-forwards) to a previously reported position
    fn seek(&mut self, position: StreamPosition);
}

/// On-demand scanner for effect source text
pub struct Lexer {
    /// Source code as character vector
    source: Vec<char>,
    /// Name reported in locations
    name: Arc<str>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: u32,
    /// Current column number (1-indexed)
    column: u32,
}

impl Lexer {
    /// Creates a new scanner over source code
    pub fn new(source: &str) -> Self {
        Self::with_name(source, "<source>")
    }

    /// Creates a new scanner whose locations carry the given source name
    pub fn with_name(source: &str, name: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            name: Arc::from(name),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans all remaining tokens, including the trailing `Eof`
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.start = self.current;
        let location = Location::new(self.name.clone(), self.line, self.column);

        if self.is_at_end() {
            return Token::eof(location);
        }

        let c = self.advance();
        let kind = match c {
            '(' => TokenKind::Punct(Punct::LeftParen),
            ')' => TokenKind::Punct(Punct::RightParen),
            '{' => TokenKind::Punct(Punct::LeftBrace),
            '}' => TokenKind::Punct(Punct::RightBrace),
            '[' => TokenKind::Punct(Punct::LeftBracket),
            ']' => TokenKind::Punct(Punct::RightBracket),
            ',' => TokenKind::Punct(Punct::Comma),
            ';' => TokenKind::Punct(Punct::Semicolon),
            '?' => TokenKind::Punct(Punct::Question),
            '~' => TokenKind::Punct(Punct::Tilde),
            ':' => self.either(':', Punct::ColonColon, Punct::Colon),
            '.' if self.peek().is_ascii_digit() => self.scan_number(),
            '.' => TokenKind::Punct(Punct::Dot),
            '+' => {
                if self.match_char('+') {
                    TokenKind::Punct(Punct::PlusPlus)
                } else {
                    self.either('=', Punct::PlusEqual, Punct::Plus)
                }
            }
            '-' => {
                if self.match_char('-') {
                    TokenKind::Punct(Punct::MinusMinus)
                } else {
                    self.either('=', Punct::MinusEqual, Punct::Minus)
                }
            }
            '*' => self.either('=', Punct::StarEqual, Punct::Star),
            '/' => self.either('=', Punct::SlashEqual, Punct::Slash),
            '%' => self.either('=', Punct::PercentEqual, Punct::Percent),
            '^' => self.either('=', Punct::CaretEqual, Punct::Caret),
            '!' => self.either('=', Punct::ExclaimEqual, Punct::Exclaim),
            '=' => self.either('=', Punct::EqualEqual, Punct::Equal),
            '&' => {
                if self.match_char('&') {
                    TokenKind::Punct(Punct::AmpAmp)
                } else {
                    self.either('=', Punct::AmpEqual, Punct::Ampersand)
                }
            }
            '|' => {
                if self.match_char('|') {
                    TokenKind::Punct(Punct::PipePipe)
                } else {
                    self.either('=', Punct::PipeEqual, Punct::Pipe)
                }
            }
            '<' => {
                if self.match_char('<') {
                    self.either('=', Punct::ShiftLeftEqual, Punct::ShiftLeft)
                } else {
                    self.either('=', Punct::LessEqual, Punct::Less)
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.either('=', Punct::ShiftRightEqual, Punct::ShiftRight)
                } else {
                    self.either('=', Punct::GreaterEqual, Punct::Greater)
                }
            }
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier_or_keyword(),
            c => TokenKind::Unknown(c),
        };

        let lexeme: String = self.source[self.start..self.current].iter().collect();
        Token::new(kind, lexeme, location)
    }

    fn either(&mut self, next: char, matched: Punct, otherwise: Punct) -> TokenKind {
        if self.match_char(next) {
            TokenKind::Punct(matched)
        } else {
            TokenKind::Punct(otherwise)
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_next() == '/' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == '*' => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() && !(self.peek() == '*' && self.peek_next() == '/') {
                        self.advance();
                    }
                    if !self.is_at_end() {
                        self.advance();
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '"' && self.peek() != '\n' {
            if self.peek() == '\\' && self.current + 1 < self.source.len() {
                self.advance();
                match self.advance() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    other => value.push(other),
                }
            } else {
                value.push(self.advance());
            }
        }

        if self.peek() != '"' {
            // Unterminated, the parser reports it at the opening quote
            return TokenKind::Unknown('"');
        }
        self.advance();

        TokenKind::StringLiteral(value)
    }

    fn scan_number(&mut self) -> TokenKind {
        let text_start = self.start;

        if self.source[text_start] == '0' && matches!(self.peek(), 'x' | 'X') {
            let prefix = self.advance();
            let digits_start = self.current;
            if !self.peek().is_ascii_hexdigit() {
                return TokenKind::Unknown(prefix);
            }
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            let digits: String = self.source[digits_start..self.current].iter().collect();
            let value = u32::from_str_radix(&digits, 16).unwrap_or(u32::MAX);
            return self.integer_kind(value);
        }

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = self.source[text_start] == '.';
        if !is_float && self.peek() == '.' && self.peek_next() != '.' {
            is_float = true;
            self.advance();
        }
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if matches!(self.peek(), 'e' | 'E')
            && (self.peek_next().is_ascii_digit()
                || (matches!(self.peek_next(), '+' | '-') && self.peek_at(2).is_ascii_digit()))
        {
            is_float = true;
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[text_start..self.current].iter().collect();

        if is_float || matches!(self.peek(), 'f' | 'F' | 'h' | 'H') {
            if matches!(self.peek(), 'f' | 'F' | 'h' | 'H') {
                self.advance();
            }
            return TokenKind::FloatLiteral(text.parse().unwrap_or(0.0));
        }

        // A leading zero makes an octal literal
        let radix = if text.len() > 1 && text.starts_with('0') { 8 } else { 10 };
        if let Some(bad) = text.chars().find(|c| c.to_digit(radix).is_none()) {
            return TokenKind::Unknown(bad);
        }
        let value = u64::from_str_radix(&text, radix)
            .unwrap_or(u64::MAX)
            .min(u32::MAX as u64) as u32;
        self.integer_kind(value)
    }

    fn integer_kind(&mut self, value: u32) -> TokenKind {
        if matches!(self.peek(), 'u' | 'U') {
            self.advance();
            return TokenKind::UintLiteral(value);
        }
        if matches!(self.peek(), 'l' | 'L') {
            self.advance();
        }
        match i32::try_from(value) {
            Ok(signed) => TokenKind::IntLiteral(signed),
            Err(_) => TokenKind::UintLiteral(value),
        }
    }

    fn scan_identifier_or_keyword(&mut self) -> TokenKind {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        match Keyword::parse(&text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(text),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, distance: usize) -> char {
        self.source
            .get(self.current + distance)
            .copied()
            .unwrap_or('\0')
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Token {
        self.scan_token()
    }

    fn position(&self) -> StreamPosition {
        StreamPosition {
            offset: self.current,
            line: self.line,
            column: self.column,
        }
    }

    fn seek(&mut self, position: StreamPosition) {
        self.current = position.offset.min(self.source.len());
        self.start = self.current;
        self.line = position.line;
        self.column = position.column;
    }
}
