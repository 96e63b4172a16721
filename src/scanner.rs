use std::str::Chars;

use log::debug;
use thiserror::Error;

pub(crate) const EOF_CHAR: char = '\0';

/// Single pass, maximal-munch lexer over a borrowed source string.
///
/// Yields one item per token or lexing error and finishes with exactly one
/// [`TokenKind::Eof`] token.
pub struct Scanner<'a> {
    source: &'a str,
    chars: Chars<'a>,
    start: usize,
    line: u32,
    finished: bool,
}

/// Everything a scan pass produced: the token stream plus any collected errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct LexError {
    pub line: u32,
    pub message: &'static str,
}

pub fn scan(source: &str) -> Scanned {
    let mut tokens = vec![];
    let mut errors = vec![];

    for item in Scanner::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(error) => errors.push(error),
        }
    }

    debug!(
        "scanned {} tokens with {} lex errors",
        tokens.len(),
        errors.len()
    );
    Scanned { tokens, errors }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, LexError>;
    fn next(&mut self) -> Option<Self::Item> {
        self.scan_token()
    }
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            start: 0,
            line: 1,
            finished: false,
        }
    }

    fn scan_token(&mut self) -> Option<Result<Token, LexError>> {
        loop {
            self.start = self.offset();
            let Some(c) = self.advance() else {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(Ok(self.create_token(TokenKind::Eof, None)));
            };

            let kind = match c {
                ' ' | '\r' | '\t' => continue,
                '\n' => {
                    self.line += 1;
                    continue;
                }
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                '{' => TokenKind::LeftBrace,
                '}' => TokenKind::RightBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '-' => TokenKind::Minus,
                '+' => TokenKind::Plus,
                ';' => TokenKind::Semicolon,
                '*' => TokenKind::Star,
                '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
                '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
                '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
                '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
                '/' => match self.peek_first() {
                    '/' => {
                        self.advance_until('\n');
                        continue;
                    }
                    _ => TokenKind::Slash,
                },
                '"' => return Some(self.string()),
                '0'..='9' => return Some(Ok(self.number())),
                c if is_identifier_start(c) => return Some(Ok(self.identifier())),
                _ => return Some(Err(self.error("Unexpected character."))),
            };

            return Some(Ok(self.create_token(kind, None)));
        }
    }

    fn create_token(&self, kind: TokenKind, literal: Option<Literal>) -> Token {
        Token {
            kind,
            lexeme: self.lexeme().to_string(),
            literal,
            line: self.line,
        }
    }

    fn error(&self, message: &'static str) -> LexError {
        LexError {
            line: self.line,
            message,
        }
    }

    fn either(&mut self, expected: char, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if !self.is_at_end() && self.peek_first() == expected {
            self.advance();
            matched
        } else {
            otherwise
        }
    }

    fn string(&mut self) -> Result<Token, LexError> {
        while !self.is_at_end() && self.peek_first() != '"' {
            if self.peek_first() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string."));
        }

        // closing quote
        self.advance();

        let lexeme = self.lexeme();
        let value = lexeme[1..lexeme.len() - 1].to_string();
        Ok(self.create_token(TokenKind::String, Some(Literal::String(value))))
    }

    fn number(&mut self) -> Token {
        self.advance_while(|c| c.is_ascii_digit());

        if self.peek_first() == '.' && self.peek_second().is_ascii_digit() {
            self.advance();
            self.advance_while(|c| c.is_ascii_digit());
        }

        // digits with an optional fraction always parse as f64
        let value = self.lexeme().parse().unwrap_or_default();
        self.create_token(TokenKind::Number, Some(Literal::Number(value)))
    }

    fn identifier(&mut self) -> Token {
        self.advance_while(is_identifier_continue);

        let kind = keyword(self.lexeme()).unwrap_or(TokenKind::Identifier);
        self.create_token(kind, None)
    }

    fn advance_until(&mut self, predicate_char: char) {
        while !self.is_at_end() && self.peek_first() != predicate_char {
            self.advance();
        }
    }

    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while !self.is_at_end() && predicate(self.peek_first()) {
            self.advance();
        }
    }

    fn peek_first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    fn peek_second(&self) -> char {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().unwrap_or(EOF_CHAR)
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn is_at_end(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Byte offset of the next unread character.
    fn offset(&self) -> usize {
        self.source.len() - self.chars.as_str().len()
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.offset()]
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "and" => TokenKind::And,
        "class" => TokenKind::Class,
        "else" => TokenKind::Else,
        "false" => TokenKind::False,
        "for" => TokenKind::For,
        "fun" => TokenKind::Fun,
        "if" => TokenKind::If,
        "nil" => TokenKind::Nil,
        "or" => TokenKind::Or,
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "super" => TokenKind::Super,
        "this" => TokenKind::This,
        "true" => TokenKind::True,
        "var" => TokenKind::Var,
        "while" => TokenKind::While,
        _ => return None,
    };
    Some(kind)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Single character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

/// Decoded value of a NUMBER or STRING token.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ignores_comments() {
        let source = "// dasdassasadsad
        2 + 2";
        let scanned = scan(source);

        assert!(scanned.errors.is_empty());
        assert_eq!(
            scanned.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
        assert_eq!(scanned.tokens[0].line, 2);
    }

    #[test]
    fn prefers_two_character_operators() {
        assert_eq!(
            kinds("! != = == < <= > >= /"),
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Slash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        let tokens = scan("12.5 7.").tokens;

        assert_eq!(tokens[0].literal, Some(Literal::Number(12.5)));
        assert_eq!(tokens[1].lexeme, "7");
        assert_eq!(tokens[1].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[2].kind, TokenKind::Dot);
    }

    #[test]
    fn numbers_parse_with_leading_zeros_and_fractions() {
        let tokens = scan("007 0.250").tokens;

        assert_eq!(tokens[0].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(0.25)));
        assert_eq!(tokens[1].lexeme, "0.250");
    }

    #[test]
    fn strings_keep_raw_text_and_count_lines() {
        let tokens = scan("\"a\\n\nb\" x").tokens;

        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, Some(Literal::String("a\\n\nb".into())));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn keywords_use_the_whole_lexeme() {
        assert_eq!(
            kinds("var variable _if fun print"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Fun,
                TokenKind::Print,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unexpected_characters_do_not_stop_scanning() {
        let scanned = scan("1 @\n# 2");

        assert_eq!(
            scanned.errors,
            vec![
                LexError {
                    line: 1,
                    message: "Unexpected character."
                },
                LexError {
                    line: 2,
                    message: "Unexpected character."
                },
            ]
        );
        assert_eq!(scanned.tokens.len(), 3);
    }

    #[test]
    fn reports_unterminated_string() {
        let scanned = scan("print \"open\n");

        assert_eq!(scanned.errors.len(), 1);
        assert_eq!(scanned.errors[0].message, "Unterminated string.");
        assert_eq!(scanned.errors[0].line, 2);
        assert_eq!(scanned.tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn appends_exactly_one_eof_on_last_line() {
        let tokens = scan("a\n\n").tokens;
        let eofs = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();

        assert_eq!(eofs, 1);
        assert_eq!(tokens.last().map(|t| t.line), Some(3));
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn scanning_is_idempotent() {
        let source = "var a = \"x\" + 1.5; // done\n{ print a; }";
        assert_eq!(scan(source), scan(source));
    }
}
