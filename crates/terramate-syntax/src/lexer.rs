//! Lexer turning configuration source into structural tokens.
//!
//! Only the structure matters to the checker, so string literals, heredocs
//! and template interpolations are consumed whole and operators are not
//! distinguished from each other.

use crate::errors::LocalError;
use crate::position::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Number,
    String,
    Heredoc,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Equals,
    Comma,
    Operator,
    Newline,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Ident => "identifier",
            Self::Number => "number",
            Self::String => "string",
            Self::Heredoc => "heredoc",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Equals => "'='",
            Self::Comma => "','",
            Self::Operator => "operator",
            Self::Newline => "newline",
            Self::Eof => "end of file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) text: String,
    pub(crate) start: Pos,
    pub(crate) end: Pos,
}

/// Deepest nesting of blocks, or of strings inside template
/// interpolations, accepted in one file.
pub(crate) const MAX_NESTING_DEPTH: usize = 128;

struct Lexer<'a> {
    source: &'a str,
    pos: Pos,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        self.source.get(self.pos.byte..).unwrap_or("")
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos = self.pos.advance(ch);
        Some(ch)
    }

    fn bump_while(&mut self, accept: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&accept) {
            self.bump();
        }
    }

    fn token(&self, kind: TokenKind, start: Pos) -> Token {
        let text = self
            .source
            .get(start.byte..self.pos.byte)
            .unwrap_or_default()
            .to_owned();
        Token {
            kind,
            text,
            start,
            end: self.pos,
        }
    }

    fn skip_block_comment(&mut self, start: Pos) -> Result<(), LocalError> {
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    let end = start.advance('/').advance('*');
                    return Err(LocalError::syntax(start, end, "unterminated comment"));
                }
            }
        }
    }

    /// Consume a quoted string body; the opening quote is already consumed.
    ///
    /// `depth` counts the interpolations enclosing this string.
    fn quoted_string(&mut self, start: Pos, depth: usize) -> Result<(), LocalError> {
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(LocalError::syntax(start, self.pos, "unterminated string"));
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('"') => {
                    self.bump();
                    return Ok(());
                }
                Some('$' | '%') if self.peek_second() == Some('{') => {
                    if depth >= MAX_NESTING_DEPTH {
                        let end = self.pos.advance('$').advance('{');
                        return Err(LocalError::syntax(
                            self.pos,
                            end,
                            format!(
                                "template interpolations nested too deeply, the limit is {MAX_NESTING_DEPTH}"
                            ),
                        ));
                    }
                    self.bump();
                    self.bump();
                    self.template_interpolation(start, depth + 1)?;
                }
                Some('$' | '%') if self.peek_second() == Some('$') => {
                    self.bump();
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Consume a `${ ... }` sequence; the opening `${` is already consumed.
    fn template_interpolation(&mut self, string_start: Pos, depth: usize) -> Result<(), LocalError> {
        let mut depth = 1usize;
        while depth > 0 {
            let here = self.pos;
            match self.bump() {
                None => {
                    return Err(LocalError::syntax(
                        string_start,
                        self.pos,
                        "unterminated template interpolation",
                    ));
                }
                Some('{') => depth += 1,
                Some('}') => depth -= 1,
                Some('"') => self.quoted_string(here, depth)?,
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Consume a heredoc; `<<` is already consumed.
    fn heredoc(&mut self, start: Pos) -> Result<(), LocalError> {
        if self.peek() == Some('-') {
            self.bump();
        }
        let marker_start = self.pos;
        self.bump_while(is_ident_continue);
        let marker = self
            .source
            .get(marker_start.byte..self.pos.byte)
            .unwrap_or_default()
            .to_owned();
        let header_end = self.pos;

        self.bump_while(|ch| ch == ' ' || ch == '\t' || ch == '\r');
        if self.bump() != Some('\n') {
            return Err(LocalError::syntax(
                start,
                header_end,
                "heredoc marker must be followed by a newline",
            ));
        }

        loop {
            if self.peek().is_none() {
                return Err(LocalError::syntax(
                    start,
                    header_end,
                    format!("unterminated heredoc, missing closing marker `{marker}`"),
                ));
            }
            let line = self.rest().split('\n').next().unwrap_or_default();
            let closes = line.trim() == marker;
            self.bump_while(|ch| ch != '\n');
            if closes {
                return Ok(());
            }
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LocalError> {
        loop {
            self.bump_while(|ch| ch == ' ' || ch == '\t' || ch == '\r');
            let start = self.pos;
            let Some(ch) = self.bump() else {
                return Ok(None);
            };

            let kind = match ch {
                '\n' => TokenKind::Newline,
                '#' => {
                    self.bump_while(|ch| ch != '\n');
                    continue;
                }
                '/' if self.peek() == Some('/') => {
                    self.bump_while(|ch| ch != '\n');
                    continue;
                }
                '/' if self.peek() == Some('*') => {
                    self.bump();
                    self.skip_block_comment(start)?;
                    continue;
                }
                '"' => {
                    self.quoted_string(start, 0)?;
                    TokenKind::String
                }
                '<' if self.peek() == Some('<')
                    && self
                        .peek_second()
                        .is_some_and(|next| next == '-' || is_ident_start(next)) =>
                {
                    self.bump();
                    self.heredoc(start)?;
                    TokenKind::Heredoc
                }
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                ',' => TokenKind::Comma,
                '=' if matches!(self.peek(), Some('=' | '>')) => {
                    self.bump();
                    TokenKind::Operator
                }
                '=' => TokenKind::Equals,
                '!' | '<' | '>' | '&' | '|' | '+' | '-' | '*' | '/' | '%' | '?' | ':' | '.' => {
                    if matches!(self.peek(), Some('=' | '&' | '|')) {
                        self.bump();
                    }
                    TokenKind::Operator
                }
                c if is_ident_start(c) => {
                    self.bump_while(is_ident_continue);
                    TokenKind::Ident
                }
                c if c.is_ascii_digit() => {
                    self.bump_while(|ch| ch.is_ascii_alphanumeric() || ch == '.');
                    TokenKind::Number
                }
                other => {
                    return Err(LocalError::syntax(
                        start,
                        self.pos,
                        format!("invalid character {other:?}"),
                    ));
                }
            };
            return Ok(Some(self.token(kind, start)));
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

/// Split `source` into tokens, always terminated by a single `Eof` token.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, LocalError> {
    let mut lexer = Lexer {
        source,
        pos: Pos::START,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        start: lexer.pos,
        end: lexer.pos,
    });
    Ok(tokens)
}
