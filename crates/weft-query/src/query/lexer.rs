//! Tokeniser for rule source text.

use std::iter::Peekable;
use std::str::CharIndices;

/// Position of a token in the rule source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct TokenPos {
    pub(crate) offset: usize,
    pub(crate) len: usize,
    pub(crate) line: u32,
    pub(crate) column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Bang,
    Dot,
    Question,
    Star,
    Plus,
    /// Node kind, field name or bare predicate argument.
    Ident(String),
    /// Unescaped string literal contents.
    Str(String),
    /// Capture name without the `@`.
    Capture(String),
    /// Predicate or directive name including its `?`/`!` suffix, without `#`.
    Predicate(String),
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::LParen => String::from("`(`"),
            Self::RParen => String::from("`)`"),
            Self::LBracket => String::from("`[`"),
            Self::RBracket => String::from("`]`"),
            Self::Colon => String::from("`:`"),
            Self::Bang => String::from("`!`"),
            Self::Dot => String::from("`.`"),
            Self::Question => String::from("`?`"),
            Self::Star => String::from("`*`"),
            Self::Plus => String::from("`+`"),
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Str(text) => format!("string {text:?}"),
            Self::Capture(name) => format!("capture `@{name}`"),
            Self::Predicate(name) => format!("predicate `#{name}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) pos: TokenPos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub(crate) pos: TokenPos,
    pub(crate) message: String,
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/')
}

fn is_capture_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

struct Lexer<'s> {
    source: &'s str,
    chars: Peekable<CharIndices<'s>>,
    line: u32,
    column: u32,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, ch)) = next {
            if ch == '\n' {
                self.line = self.line.saturating_add(1);
                self.column = 1;
            } else {
                self.column = self.column.saturating_add(1);
            }
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |(offset, _)| *offset)
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == ';' {
                while let Some(ch) = self.peek_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn take_while(&mut self, predicate: fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek_char() {
            if !predicate(ch) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    fn string(&mut self, pos: TokenPos) -> Result<String, LexError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some((_, '"')) => return Ok(out),
                Some((_, '\\')) => match self.bump() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                Some((_, ch)) => out.push(ch),
                None => break,
            }
        }
        Err(LexError {
            pos,
            message: String::from("unterminated string literal"),
        })
    }

    fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        self.skip_trivia();
        let offset = self.offset();
        let mut pos = TokenPos {
            offset,
            len: 0,
            line: self.line,
            column: self.column,
        };
        let ch = self.peek_char()?;
        let kind = match ch {
            '(' | ')' | '[' | ']' | ':' | '!' | '.' | '?' | '*' | '+' => {
                self.bump();
                match ch {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    ':' => TokenKind::Colon,
                    '!' => TokenKind::Bang,
                    '.' => TokenKind::Dot,
                    '?' => TokenKind::Question,
                    '*' => TokenKind::Star,
                    _ => TokenKind::Plus,
                }
            }
            '"' => {
                self.bump();
                match self.string(pos) {
                    Ok(text) => TokenKind::Str(text),
                    Err(err) => return Some(Err(err)),
                }
            }
            '@' => {
                self.bump();
                let name = self.take_while(is_capture_char);
                if name.is_empty() {
                    return Some(Err(LexError {
                        pos,
                        message: String::from("expected a capture name after `@`"),
                    }));
                }
                TokenKind::Capture(name)
            }
            '#' => {
                self.bump();
                let mut name = self.take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-'));
                match self.peek_char() {
                    Some(suffix @ ('?' | '!')) if !name.is_empty() => {
                        self.bump();
                        name.push(suffix);
                    }
                    _ => {
                        return Some(Err(LexError {
                            pos,
                            message: String::from("predicate names end with `?` or `!`"),
                        }));
                    }
                }
                TokenKind::Predicate(name)
            }
            c if is_ident_char(c) && c != '.' => TokenKind::Ident(self.take_while(is_ident_char)),
            other => {
                self.bump();
                return Some(Err(LexError {
                    pos,
                    message: format!("unexpected character `{other}`"),
                }));
            }
        };
        pos.len = self.offset().saturating_sub(offset);
        Some(Ok(Token { kind, pos }))
    }
}

/// Tokens up to the first lexical error, plus that error.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tokens {
    pub(crate) tokens: Vec<Token>,
    pub(crate) error: Option<LexError>,
    pub(crate) end: TokenPos,
}

/// Splits rule source text into tokens, dropping whitespace and comments.
///
/// Lexing stops at the first error so the parser can attribute it to the
/// rule it interrupts.
pub(crate) fn tokenize(source: &str) -> Tokens {
    let mut lexer = Lexer::new(source);
    let mut out = Tokens::default();
    while let Some(token) = lexer.next_token() {
        match token {
            Ok(token) => out.tokens.push(token),
            Err(err) => {
                out.error = Some(err);
                break;
            }
        }
    }
    out.end = TokenPos {
        offset: source.len(),
        len: 0,
        line: lexer.line,
        column: lexer.column,
    };
    out
}
