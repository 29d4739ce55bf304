// ABOUTME: Lexer turning source text into a token stream

use crate::token::{keyword, Token, TokenKind};

/// Single forward pass over the source. Errors never abort the scan; they
/// are emitted as `Error` tokens and surfaced later by the parser.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
}

/// Tokenizes a whole source string. Always ends with an `Eof` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).run()
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
        }
    }

    pub fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.col = 1;
                }
                '#' => self.skip_comment(),
                '"' | '\'' => self.lex_string(c),
                '0'..='9' => self.lex_number(),
                'a'..='z' | 'A'..='Z' | '_' => self.lex_word(),
                _ => self.lex_symbol(c),
            }
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line, self.col));
        self.tokens
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
            self.col += 1;
        }
        c
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>, line: usize, col: usize) {
        self.tokens.push(Token::new(kind, lexeme, line, col));
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn lex_string(&mut self, delimiter: char) {
        let (line, col) = (self.line, self.col);
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                Some(c) if c == delimiter => {
                    self.advance();
                    self.push(TokenKind::String, text, line, col);
                    return;
                }
                Some('\n') | None => {
                    self.push(TokenKind::Error, "unterminated string", line, col);
                    return;
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
            }
        }
    }

    fn lex_number(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        // A dot is part of the number only when digits follow; otherwise it
        // terminates the sentence.
        if self.peek() == Some('.')
            && self
                .chars
                .get(self.pos + 1)
                .is_some_and(|c| c.is_ascii_digit())
        {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.push(TokenKind::Number, text, line, col);
    }

    fn lex_word(&mut self) {
        let (line, col) = (self.line, self.col);
        let word = self.read_word();
        let lowered = word.to_lowercase();
        match keyword(&lowered) {
            Some(TokenKind::Is) => {
                if let Some((kind, phrase)) = self.fuse_comparison() {
                    self.push(kind, phrase, line, col);
                } else {
                    self.push(TokenKind::Is, word, line, col);
                }
            }
            Some(kind) => self.push(kind, word, line, col),
            None => self.push(TokenKind::Identifier, word, line, col),
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    /// After consuming `is`, tries to fuse one of the six comparison
    /// phrases into a single token. Lookahead is bounded to the five words
    /// of the longest phrase; on failure the cursor is restored.
    fn fuse_comparison(&mut self) -> Option<(TokenKind, &'static str)> {
        let saved = (self.pos, self.line, self.col);
        let mut words = Vec::with_capacity(5);
        for _ in 0..5 {
            match self.peek_next_word() {
                Some(w) => words.push(w),
                None => break,
            }
        }
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        let candidates: [(&[&str], TokenKind, &'static str); 6] = [
            (
                &["greater", "than", "or", "equal", "to"],
                TokenKind::IsGreaterThanOrEqualTo,
                "is greater than or equal to",
            ),
            (
                &["less", "than", "or", "equal", "to"],
                TokenKind::IsLessThanOrEqualTo,
                "is less than or equal to",
            ),
            (
                &["greater", "than"],
                TokenKind::IsGreaterThan,
                "is greater than",
            ),
            (&["less", "than"], TokenKind::IsLessThan, "is less than"),
            (&["not", "equal", "to"], TokenKind::IsNotEqualTo, "is not equal to"),
            (&["equal", "to"], TokenKind::IsEqualTo, "is equal to"),
        ];

        for (pattern, kind, phrase) in candidates {
            if words.len() >= pattern.len() && &words[..pattern.len()] == pattern {
                // Re-consume exactly the matched words.
                self.pos = saved.0;
                self.line = saved.1;
                self.col = saved.2;
                for _ in 0..pattern.len() {
                    self.consume_next_word();
                }
                return Some((kind, phrase));
            }
        }

        self.pos = saved.0;
        self.line = saved.1;
        self.col = saved.2;
        None
    }

    /// Reads the next whitespace-separated word without committing the
    /// cursor past it in any way callers care about; used only under a
    /// saved position.
    fn peek_next_word(&mut self) -> Option<String> {
        self.consume_next_word()
    }

    fn consume_next_word(&mut self) -> Option<String> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.col = 1;
                }
                _ => break,
            }
        }
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => Some(self.read_word().to_lowercase()),
            _ => None,
        }
    }

    fn lex_symbol(&mut self, c: char) {
        let (line, col) = (self.line, self.col);
        self.advance();
        let kind = match c {
            '.' => TokenKind::Period,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => TokenKind::Equals,
            other => {
                self.push(
                    TokenKind::Error,
                    format!("unexpected character '{}'", other),
                    line,
                    col,
                );
                return;
            }
        };
        self.push(kind, c.to_string(), line, col);
    }
}
