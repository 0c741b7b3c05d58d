use tracing::trace;

use super::keywords::{is_keyword, is_keyword_literal};
use super::{ScanError, Token, TokenKind, Tokenizer, Unterminated};

/// Operator characters. Must stay in sync with `op_chars` in PostgreSQL's scan.l.
pub const OP_CHARS: &[u8] = b"~!@#^&|`?+-*/%<>=";

/// An operator containing one of these may legitimately end in `+` or `-`.
const NON_MATH_OP_CHARS: &[u8] = b"~!@#^&|`?%";

pub fn is_op_char(b: u8) -> bool {
    OP_CHARS.contains(&b)
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_cont(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit() || b == b'$'
}

fn is_dollar_tag_cont(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Whether `kind` can end an operand, so that an operator may follow.
fn ends_operand(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::QuotedIdent
            | TokenKind::Param
            | TokenKind::Placeholder
            | TokenKind::Integer
            | TokenKind::Numeric
            | TokenKind::String
            | TokenKind::BitString
            | TokenKind::HexString
            | TokenKind::KeywordLiteral
            | TokenKind::Punct(b')' | b']')
    )
}

/// Lexical scanner following PostgreSQL's rules closely enough to classify
/// tokens the way the server's own lexer would.
#[derive(Debug, Default)]
pub struct PostgresScanner {
    pos: usize,
    last: Option<TokenKind>,
}

impl PostgresScanner {
    pub fn new() -> Self {
        Self { pos: 0, last: None }
    }

    /// Skips whitespace and comments. Returns whether anything was skipped.
    fn skip_blank(&mut self, src: &[u8]) -> Result<bool, ScanError> {
        let start = self.pos;
        loop {
            match src.get(self.pos) {
                Some(&b) if is_space(b) => self.pos += 1,
                Some(b'-') if src.get(self.pos + 1) == Some(&b'-') => {
                    while self.pos < src.len() && src[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                Some(b'/') if src.get(self.pos + 1) == Some(&b'*') => {
                    self.skip_block_comment(src)?;
                }
                _ => break,
            }
        }
        Ok(self.pos > start)
    }

    /// Block comments nest.
    fn skip_block_comment(&mut self, src: &[u8]) -> Result<(), ScanError> {
        let offset = self.pos;
        let mut depth = 0usize;
        while self.pos < src.len() {
            let rest = &src[self.pos..];
            if rest.starts_with(b"/*") {
                depth += 1;
                self.pos += 2;
            } else if rest.starts_with(b"*/") {
                depth -= 1;
                self.pos += 2;
                if depth == 0 {
                    return Ok(());
                }
            } else {
                self.pos += 1;
            }
        }
        Err(ScanError::Unterminated {
            what: Unterminated::BlockComment,
            offset,
        })
    }

    /// Scans a quoted body whose opening quote sits at `body - 1`.
    /// A doubled quote is an escaped quote.
    fn quoted(
        &mut self,
        src: &[u8],
        token_start: usize,
        body: usize,
        backslash_escapes: bool,
        what: Unterminated,
    ) -> Result<(), ScanError> {
        let quote = src[body - 1];
        let mut i = body;
        while i < src.len() {
            let b = src[i];
            if b == quote {
                if src.get(i + 1) == Some(&quote) {
                    i += 2;
                    continue;
                }
                self.pos = i + 1;
                return Ok(());
            }
            if backslash_escapes && b == b'\\' {
                i += 2;
            } else {
                i += 1;
            }
        }
        Err(ScanError::Unterminated {
            what,
            offset: token_start,
        })
    }

    /// `$` has several meanings: parameter, dollar quote, or a plain byte.
    fn dollar(&mut self, src: &[u8], start: usize) -> Result<TokenKind, ScanError> {
        let mut i = start + 1;
        if src.get(i).is_some_and(u8::is_ascii_digit) {
            while src.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
            self.pos = i;
            return Ok(TokenKind::Param);
        }

        if src.get(i).is_some_and(|&b| is_ident_start(b)) {
            while src.get(i).is_some_and(|&b| is_dollar_tag_cont(b)) {
                i += 1;
            }
        }
        // A stray `$` behaves like an operator symbol. As punctuation it
        // would lose its spacing and could glue onto a following `$1`.
        if src.get(i) != Some(&b'$') {
            self.pos = start + 1;
            return Ok(TokenKind::Operator);
        }

        let tag = &src[start..=i];
        let body = i + 1;
        match src[body..].windows(tag.len()).position(|w| w == tag) {
            Some(at) => {
                self.pos = body + at + tag.len();
                Ok(TokenKind::String)
            }
            None => Err(ScanError::Unterminated {
                what: Unterminated::DollarQuote,
                offset: start,
            }),
        }
    }

    fn number(&mut self, src: &[u8], start: usize) -> TokenKind {
        if src[start] == b'0' {
            let digit: Option<fn(&u8) -> bool> = match src.get(start + 1).map(u8::to_ascii_lowercase) {
                Some(b'x') => Some(u8::is_ascii_hexdigit),
                Some(b'o') => Some(|b: &u8| (b'0'..=b'7').contains(b)),
                Some(b'b') => Some(|b: &u8| *b == b'0' || *b == b'1'),
                _ => None,
            };
            if let Some(digit) = digit {
                let mut i = start + 2;
                if src.get(i).is_some_and(digit) {
                    while src.get(i).is_some_and(|b| digit(b) || *b == b'_') {
                        i += 1;
                    }
                    self.pos = i;
                    return TokenKind::Integer;
                }
            }
        }

        let mut kind = TokenKind::Integer;
        let mut i = skip_digits(src, start);
        // `1..10` is an integer followed by `..`
        if src.get(i) == Some(&b'.') && src.get(i + 1) != Some(&b'.') {
            kind = TokenKind::Numeric;
            i = skip_digits(src, i + 1);
        }
        if matches!(src.get(i), Some(b'e' | b'E')) {
            let mut j = i + 1;
            if matches!(src.get(j), Some(b'+' | b'-')) {
                j += 1;
            }
            if src.get(j).is_some_and(u8::is_ascii_digit) {
                kind = TokenKind::Numeric;
                i = skip_digits(src, j);
            }
        }
        self.pos = i;
        kind
    }

    /// Operators such as `?|`, `?&` and `@?` contain `?`, which otherwise
    /// stands in for a value. A `?` only starts an operator right after an
    /// operand, and a run stops at any later `?` apart from the one in
    /// `@?`. Masked text like `x=?` or `?<>y` scans back into the same
    /// tokens.
    fn operator(&mut self, src: &[u8], start: usize) -> TokenKind {
        let after_operand = self.last.is_some_and(ends_operand);
        if src[start] == b'?' && !after_operand {
            self.pos = start + 1;
            return TokenKind::Placeholder;
        }

        let mut end = start;
        while end < src.len() && is_op_char(src[end]) {
            let rest = &src[end..];
            if end > start && (rest.starts_with(b"--") || rest.starts_with(b"/*")) {
                break;
            }
            let at_question = after_operand && end == start + 1 && src[start] == b'@';
            if end > start && src[end] == b'?' && !at_question {
                break;
            }
            end += 1;
        }

        let run = &src[start..end];
        if run == b"?" {
            self.pos = end;
            return TokenKind::Placeholder;
        }
        let mut len = run.len();
        if len > 1
            && matches!(run[len - 1], b'+' | b'-')
            && !run.iter().any(|b| NON_MATH_OP_CHARS.contains(b))
        {
            while len > 1 && matches!(run[len - 1], b'+' | b'-') {
                len -= 1;
            }
        }
        self.pos = start + len;
        TokenKind::Operator
    }

    fn word(&mut self, src: &[u8], start: usize) -> TokenKind {
        let mut i = start + 1;
        while src.get(i).is_some_and(|&b| is_ident_cont(b)) {
            i += 1;
        }
        self.pos = i;

        let word = &src[start..i];
        if is_keyword_literal(word) {
            TokenKind::KeywordLiteral
        } else if is_keyword(word) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        }
    }

    fn scan(&mut self, src: &[u8], start: usize) -> Result<TokenKind, ScanError> {
        let b = src[start];
        let next = src.get(start + 1).copied();
        let after = src.get(start + 2).copied();

        let kind = match (b, next) {
            (b'\'', _) => {
                self.quoted(src, start, start + 1, false, Unterminated::String)?;
                TokenKind::String
            }
            (b'"', _) => {
                self.quoted(src, start, start + 1, false, Unterminated::QuotedIdentifier)?;
                TokenKind::QuotedIdent
            }
            (b'e' | b'E', Some(b'\'')) => {
                self.quoted(src, start, start + 2, true, Unterminated::String)?;
                TokenKind::String
            }
            (b'n' | b'N', Some(b'\'')) => {
                self.quoted(src, start, start + 2, false, Unterminated::String)?;
                TokenKind::String
            }
            (b'b' | b'B', Some(b'\'')) => {
                self.quoted(src, start, start + 2, false, Unterminated::BitString)?;
                TokenKind::BitString
            }
            (b'x' | b'X', Some(b'\'')) => {
                self.quoted(src, start, start + 2, false, Unterminated::HexString)?;
                TokenKind::HexString
            }
            (b'u' | b'U', Some(b'&')) if after == Some(b'\'') => {
                self.quoted(src, start, start + 3, false, Unterminated::String)?;
                TokenKind::String
            }
            (b'u' | b'U', Some(b'&')) if after == Some(b'"') => {
                self.quoted(src, start, start + 3, false, Unterminated::QuotedIdentifier)?;
                TokenKind::QuotedIdent
            }
            (b'$', _) => self.dollar(src, start)?,
            (b'0'..=b'9', _) => self.number(src, start),
            (b'.', Some(b'0'..=b'9')) => self.number(src, start),
            (b'.', Some(b'.')) => {
                self.pos = start + 2;
                TokenKind::DotDot
            }
            (b':', Some(b':')) => {
                self.pos = start + 2;
                TokenKind::Typecast
            }
            (b':', Some(b'=')) => {
                self.pos = start + 2;
                TokenKind::ColonEquals
            }
            (b, _) if is_op_char(b) => self.operator(src, start),
            (b, _) if is_ident_start(b) => self.word(src, start),
            (b, _) => {
                self.pos = start + 1;
                TokenKind::Punct(b)
            }
        };
        Ok(kind)
    }
}

fn skip_digits(src: &[u8], mut i: usize) -> usize {
    while let Some(&b) = src.get(i) {
        let separator = b == b'_' && src.get(i + 1).is_some_and(u8::is_ascii_digit);
        if !b.is_ascii_digit() && !separator {
            break;
        }
        i += 1;
    }
    i
}

impl Tokenizer for PostgresScanner {
    fn next_token(&mut self, src: &[u8]) -> Result<Option<Token>, ScanError> {
        let spaced = self.skip_blank(src)?;
        let start = self.pos;
        if start >= src.len() {
            return Ok(None);
        }

        let kind = self.scan(src, start)?;
        self.last = Some(kind);
        trace!("{kind:?} at {start}..{}", self.pos);
        Ok(Some(Token {
            kind,
            span: start..self.pos,
            spaced,
        }))
    }

    fn position(&self) -> usize {
        self.pos
    }
}
