use std::str::Chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,

    // Operators
    Plus,
    Minus,
    Star,
    Caret,
    Slash,
    Colon,
    Le,
    Ge,
    Eq,

    // Delimiters
    LBracket,
    RBracket,

    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based source line
    pub line: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// `inf`/`infinity` in any case
    pub fn is_infinity(&self) -> bool {
        self.kind == TokenKind::Ident
            && matches!(self.text.to_ascii_lowercase().as_str(), "inf" | "infinity")
    }
}

/// Characters an LP name may contain besides letters and digits
const NAME_SYMBOLS: &str = "_!\"#$%&()/,.;?@'{}|~`";

fn starts_name(c: char) -> bool {
    c.is_alphabetic() || (c != '/' && c != '.' && NAME_SYMBOLS.contains(c))
}

fn continues_name(c: char) -> bool {
    c.is_alphanumeric() || NAME_SYMBOLS.contains(c)
}

/// Whether `text` lexes as exactly one name token
pub(crate) fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(starts_name) && chars.all(continues_name)
}

/// Tokenizer for one line of LP text; comments are stripped beforehand.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    pos: usize,
    current: Option<char>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, line: usize) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            pos: 0,
            current,
            line,
        }
    }

    pub fn tokenize(source: &str, line: usize) -> Vec<Token> {
        let mut lexer = Lexer::new(source, line);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current?;
        self.current = self.chars.next();
        self.pos += c.len_utf8();
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text: self.source[start..self.pos].to_string(),
            line: self.line,
        }
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn read_number(&mut self, start: usize) -> Token {
        self.skip_digits();
        if self.peek() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        // exponent only when digits follow
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut ahead = self.chars.clone();
            let next = ahead.next();
            let after = ahead.next();
            let has_exponent = match next {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => matches!(after, Some(c) if c.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                self.skip_digits();
            }
        }
        self.token(TokenKind::Number, start)
    }

    fn read_name(&mut self, start: usize) -> Token {
        while matches!(self.peek(), Some(c) if continues_name(c)) {
            self.advance();
        }
        self.token(TokenKind::Ident, start)
    }

    /// `<`, `<=`, `=<` and the mirrored forms
    fn read_relation(&mut self, start: usize, first: char) -> Token {
        let second = self.peek();
        let kind = match (first, second) {
            ('<', Some('=')) | ('=', Some('<')) => {
                self.advance();
                TokenKind::Le
            }
            ('>', Some('=')) | ('=', Some('>')) => {
                self.advance();
                TokenKind::Ge
            }
            ('<', _) => TokenKind::Le,
            ('>', _) => TokenKind::Ge,
            _ => TokenKind::Eq,
        };
        self.token(kind, start)
    }

    pub fn next_token(&mut self) -> Option<Token> {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }

        let start = self.pos;
        let c = self.advance()?;
        let token = match c {
            '+' => self.token(TokenKind::Plus, start),
            '-' => self.token(TokenKind::Minus, start),
            '*' => self.token(TokenKind::Star, start),
            '^' => self.token(TokenKind::Caret, start),
            '/' => self.token(TokenKind::Slash, start),
            ':' => self.token(TokenKind::Colon, start),
            '[' => self.token(TokenKind::LBracket, start),
            ']' => self.token(TokenKind::RBracket, start),
            '<' | '>' | '=' => self.read_relation(start, c),
            c if c.is_ascii_digit() => self.read_number(start),
            '.' if matches!(self.peek(), Some(d) if d.is_ascii_digit()) => self.read_number(start),
            c if starts_name(c) => self.read_name(start),
            _ => self.token(TokenKind::Error, start),
        };
        Some(token)
    }
}
