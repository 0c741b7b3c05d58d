pub mod keywords;
pub mod postgres;

use std::fmt;
use std::ops::Range;

use thiserror::Error;

/// Coarse token class the normalizer decides on.
///
/// Everything except `Punctuation` is a "content" token: two content tokens
/// separated by whitespace keep one space between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenClass {
    Identifier,
    Keyword,
    Operator,
    Constant,
    Punctuation,
}

impl TokenClass {
    pub fn is_content(self) -> bool {
        !matches!(self, TokenClass::Punctuation)
    }
}

/// Fine-grained lexical kind as produced by a scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    QuotedIdent,
    /// Positional parameter: `$1`
    Param,
    /// `?` standing in for a value.
    Placeholder,
    Keyword,
    /// Run of operator characters.
    Operator,
    Integer,
    Numeric,
    String,
    BitString,
    HexString,
    /// `NULL`, `TRUE`, `FALSE`, `CURRENT_DATE` and friends.
    KeywordLiteral,
    /// `::`
    Typecast,
    /// `:=`
    ColonEquals,
    /// `..`
    DotDot,
    /// Any other single byte: `(`, `)`, `,`, `;` ...
    Punct(u8),
}

impl TokenKind {
    pub fn class(self) -> TokenClass {
        match self {
            TokenKind::Ident | TokenKind::QuotedIdent | TokenKind::Param | TokenKind::Placeholder => {
                TokenClass::Identifier
            }
            TokenKind::Keyword => TokenClass::Keyword,
            TokenKind::Operator => TokenClass::Operator,
            TokenKind::Integer
            | TokenKind::Numeric
            | TokenKind::String
            | TokenKind::BitString
            | TokenKind::HexString
            | TokenKind::KeywordLiteral => TokenClass::Constant,
            TokenKind::Typecast | TokenKind::ColonEquals | TokenKind::DotDot | TokenKind::Punct(_) => {
                TokenClass::Punctuation
            }
        }
    }
}

/// One classified token. `span` indexes the buffer the scanner was fed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    /// Whitespace or a comment sits between this token and the previous one.
    pub spaced: bool,
}

impl Token {
    pub fn class(&self) -> TokenClass {
        self.kind.class()
    }

    pub fn len(&self) -> usize {
        self.span.end - self.span.start
    }

    pub fn is_punct(&self, byte: u8) -> bool {
        self.kind == TokenKind::Punct(byte)
    }

    pub fn text<'a>(&self, src: &'a [u8]) -> &'a [u8] {
        &src[self.span.clone()]
    }
}

/// What the scanner could not finish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unterminated {
    QuotedIdentifier,
    String,
    BitString,
    HexString,
    DollarQuote,
    BlockComment,
}

impl fmt::Display for Unterminated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Unterminated::QuotedIdentifier => "quoted identifier",
            Unterminated::String => "quoted string",
            Unterminated::BitString => "bit string literal",
            Unterminated::HexString => "hexadecimal string literal",
            Unterminated::DollarQuote => "dollar-quoted string",
            Unterminated::BlockComment => "/* comment",
        };
        f.write_str(what)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unterminated {what} starting at byte {offset}")]
    Unterminated { what: Unterminated, offset: usize },
}

impl ScanError {
    pub fn offset(&self) -> usize {
        match self {
            ScanError::Unterminated { offset, .. } => *offset,
        }
    }
}

/// Pulls tokens one at a time out of a byte buffer.
///
/// The scanner keeps only a read offset, never a borrow, so the caller is
/// free to rewrite bytes behind that offset between calls.
pub trait Tokenizer {
    /// `Ok(None)` at end of input. After an error the scanner must not be
    /// polled again.
    fn next_token(&mut self, src: &[u8]) -> Result<Option<Token>, ScanError>;

    /// Byte offset of the next unread byte.
    fn position(&self) -> usize;
}
