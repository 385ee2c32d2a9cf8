//! Structural parser building the block/attribute tree of one file.
//!
//! Expressions are skipped with bracket matching; only attribute names,
//! block types, labels and their positions are retained.

use crate::errors::LocalError;
use crate::lexer::{MAX_NESTING_DEPTH, Token, TokenKind};
use crate::position::Pos;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Body {
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribute {
    pub(crate) name: String,
    pub(crate) start: Pos,
    pub(crate) end: Pos,
}

/// A block; `start..end` spans the type name, labels and opening brace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) kind: String,
    pub(crate) labels: Vec<String>,
    pub(crate) start: Pos,
    pub(crate) end: Pos,
    pub(crate) body: Body,
}

struct Parser<'t> {
    tokens: &'t [Token],
    index: usize,
    eof: Token,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.index).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    /// Parse items until end of file, or until the `}` closing `open`.
    fn body(&mut self, open: Option<&Token>) -> Result<Body, LocalError> {
        let mut body = Body::default();
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Eof => {
                    return open.map_or(Ok(body), |brace| {
                        Err(LocalError::syntax(
                            brace.start,
                            brace.end,
                            "unclosed block, expected '}'",
                        ))
                    });
                }
                TokenKind::RBrace if open.is_some() => {
                    self.advance();
                    return Ok(body);
                }
                TokenKind::Ident => self.item(&mut body, open.is_some())?,
                other => {
                    return Err(LocalError::syntax(
                        token.start,
                        token.end,
                        format!(
                            "unexpected {}, expected an attribute or block definition",
                            other.describe()
                        ),
                    ));
                }
            }
        }
    }

    fn item(&mut self, body: &mut Body, nested: bool) -> Result<(), LocalError> {
        let name = self.advance();
        match self.peek().kind {
            TokenKind::Equals => {
                let equals = self.advance();
                self.expression(&equals, nested)?;
                body.attributes.push(Attribute {
                    name: name.text,
                    start: name.start,
                    end: name.end,
                });
                Ok(())
            }
            TokenKind::String | TokenKind::Ident | TokenKind::LBrace => {
                let block = self.block(name)?;
                body.blocks.push(block);
                self.end_of_item(nested)
            }
            _ => Err(LocalError::syntax(
                name.start,
                name.end,
                format!(
                    "expected '=' or a block definition after `{}`",
                    name.text
                ),
            )),
        }
    }

    fn block(&mut self, kind: Token) -> Result<Block, LocalError> {
        let mut labels = Vec::new();
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::String => labels.push(unquote(&token.text)),
                TokenKind::Ident => labels.push(token.text),
                TokenKind::LBrace => {
                    if self.depth >= MAX_NESTING_DEPTH {
                        return Err(LocalError::syntax(
                            token.start,
                            token.end,
                            format!("blocks nested too deeply, the limit is {MAX_NESTING_DEPTH}"),
                        ));
                    }
                    self.depth += 1;
                    let body = self.body(Some(&token));
                    self.depth -= 1;
                    return Ok(Block {
                        kind: kind.text,
                        labels,
                        start: kind.start,
                        end: token.end,
                        body: body?,
                    });
                }
                other => {
                    return Err(LocalError::syntax(
                        token.start,
                        token.end,
                        format!(
                            "unexpected {} in `{}` block header, expected '{{'",
                            other.describe(),
                            kind.text
                        ),
                    ));
                }
            }
        }
    }

    /// After a block, only a newline, end of file or an enclosing `}` may follow.
    fn end_of_item(&self, nested: bool) -> Result<(), LocalError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Newline | TokenKind::Eof => Ok(()),
            TokenKind::RBrace if nested => Ok(()),
            other => Err(LocalError::syntax(
                token.start,
                token.end,
                format!("unexpected {} after block, expected a newline", other.describe()),
            )),
        }
    }

    /// Skip an attribute expression, checking bracket balance.
    ///
    /// Stops before a newline, end of file or (inside a block) a `}` at
    /// bracket depth zero.
    fn expression(&mut self, equals: &Token, nested: bool) -> Result<(), LocalError> {
        let mut open: Vec<Token> = Vec::new();
        let mut consumed = 0usize;
        loop {
            let token = self.peek().clone();
            let at_top = open.is_empty();
            match token.kind {
                TokenKind::Newline | TokenKind::Eof if at_top => break,
                TokenKind::RBrace if at_top && nested => break,
                TokenKind::Eof => {
                    let opener = open.last().unwrap_or(equals);
                    return Err(LocalError::syntax(
                        opener.start,
                        opener.end,
                        format!("unclosed {} in expression", opener.kind.describe()),
                    ));
                }
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => {
                    open.push(self.advance());
                }
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => {
                    let closer = self.advance();
                    let matches = open
                        .pop()
                        .is_some_and(|opener| closes(opener.kind, closer.kind));
                    if !matches {
                        return Err(LocalError::syntax(
                            closer.start,
                            closer.end,
                            format!("unexpected {} in expression", closer.kind.describe()),
                        ));
                    }
                }
                TokenKind::Equals if at_top => {
                    return Err(LocalError::syntax(
                        token.start,
                        token.end,
                        "unexpected '=' in expression",
                    ));
                }
                _ => {
                    self.advance();
                }
            }
            consumed += 1;
        }

        if consumed == 0 {
            return Err(LocalError::syntax(
                equals.start,
                equals.end,
                "missing expression after '='",
            ));
        }
        Ok(())
    }
}

fn closes(open: TokenKind, close: TokenKind) -> bool {
    matches!(
        (open, close),
        (TokenKind::LBrace, TokenKind::RBrace)
            | (TokenKind::LBracket, TokenKind::RBracket)
            | (TokenKind::LParen, TokenKind::RParen)
    )
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
        .to_owned()
}

/// Parse a token stream produced by [`crate::lexer::tokenize`].
pub(crate) fn parse(tokens: &[Token]) -> Result<Body, LocalError> {
    let eof = tokens.last().cloned().unwrap_or_else(|| Token {
        kind: TokenKind::Eof,
        text: String::new(),
        start: Pos::START,
        end: Pos::START,
    });
    let mut parser = Parser {
        tokens,
        index: 0,
        eof,
        depth: 0,
    };
    parser.body(None)
}
