//! Query text normalization.
//!
//! Masks constants, strips needless whitespace and upcases keywords so that
//! queries differing only in literal values or formatting normalize to the
//! same text. The buffer is rewritten in place: the write cursor never
//! passes the read cursor, so the output is never longer than the input.

use tracing::{debug, trace};

use crate::scanner::postgres::PostgresScanner;
use crate::scanner::{ScanError, Token, TokenClass, TokenKind, Tokenizer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Keep one space for every run of whitespace instead of only between
    /// words. Trades uniqueness for readability.
    pub preserve_space: bool,
    /// Drop a `;` ending the statement. Matches query texts stored without
    /// their trailing semicolon.
    pub drop_trailing_semicolon: bool,
    /// Skip a leading `EXPLAIN` and its options.
    pub strip_explain: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            preserve_space: false,
            drop_trailing_semicolon: true,
            strip_explain: false,
        }
    }
}

/// How far normalization got.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Complete,
    /// The scanner gave up; the output holds everything before the bad token.
    Truncated(ScanError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub completion: Completion,
}

impl Normalized {
    pub fn is_truncated(&self) -> bool {
        matches!(self.completion, Completion::Truncated(_))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn normalize(&self, text: &str) -> Normalized {
        let mut buf = text.as_bytes().to_vec();
        let completion = self.normalize_in_place(&mut buf);
        // Tokens are copied whole and truncation happens on token
        // boundaries, so this only falls back on a scanner bug.
        let text = String::from_utf8(buf)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        Normalized { text, completion }
    }

    /// Rewrites `buf` and truncates it to the normalized length.
    pub fn normalize_in_place(&self, buf: &mut Vec<u8>) -> Completion {
        self.normalize_with(buf, PostgresScanner::new())
    }

    pub fn normalize_with<T: Tokenizer>(&self, buf: &mut Vec<u8>, tokenizer: T) -> Completion {
        let input_len = buf.len();
        let (written, result) = {
            let mut rewriter = Rewriter::new(buf.as_mut_slice(), tokenizer, self.options);
            let result = rewriter.run();
            (rewriter.wp, result)
        };
        buf.truncate(written);
        trace!("normalized {input_len} bytes into {written}");

        match result {
            Ok(()) => Completion::Complete,
            Err(e) => {
                debug!("Normalization truncated at byte {written}: {e}");
                Completion::Truncated(e)
            }
        }
    }
}

/// Normalizes with default options apart from `preserve_space`.
pub fn normalize(text: &str, preserve_space: bool) -> String {
    let options = NormalizeOptions {
        preserve_space,
        ..NormalizeOptions::default()
    };
    Normalizer::new(options).normalize(text).text
}

/// The last token written to the output.
#[derive(Clone, Copy, Debug)]
struct Prev {
    class: TokenClass,
    /// `)` or `]`
    closes: bool,
}

impl Prev {
    /// Whether a following `-` is binary.
    fn is_operand(self) -> bool {
        self.closes || matches!(self.class, TokenClass::Identifier | TokenClass::Constant)
    }
}

/// What the output written last would scan into if the next token were
/// written right against it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fuse {
    /// A `?` following an operand: `x?` then `|` scans as `x`, `?|`.
    Operator,
    /// An `@` following an operand: `x@` then `?` scans as `x`, `@?`.
    Placeholder,
}

/// Output state right before an emitted `(`, kept so the parenthesis can be
/// taken back.
#[derive(Clone, Copy, Debug)]
struct ParenMark {
    wp: usize,
    before: Option<Prev>,
    fuse: Option<Fuse>,
    spaced: bool,
}

struct Rewriter<'a, T> {
    buf: &'a mut [u8],
    tokens: T,
    peeked: Option<Result<Option<Token>, ScanError>>,
    options: NormalizeOptions,
    wp: usize,
    last: Option<Prev>,
    fuse: Option<Fuse>,
    open_paren: Option<ParenMark>,
    /// Where the current run of `;` began in the output.
    semicolons: Option<usize>,
}

impl<'a, T: Tokenizer> Rewriter<'a, T> {
    fn new(buf: &'a mut [u8], tokens: T, options: NormalizeOptions) -> Self {
        Self {
            buf,
            tokens,
            peeked: None,
            options,
            wp: 0,
            last: None,
            fuse: None,
            open_paren: None,
            semicolons: None,
        }
    }

    fn next(&mut self) -> Result<Option<Token>, ScanError> {
        match self.peeked.take() {
            Some(scanned) => scanned,
            None => self.tokens.next_token(self.buf),
        }
    }

    /// Looks one token ahead. End of input and scan errors never match; an
    /// error stays queued for the next `next()`.
    fn peek_matches(&mut self, pred: impl Fn(&Token, &[u8]) -> bool) -> bool {
        if self.peeked.is_none() {
            self.peeked = Some(self.tokens.next_token(self.buf));
        }
        match &self.peeked {
            Some(Ok(Some(tok))) => pred(tok, self.buf),
            _ => false,
        }
    }

    fn run(&mut self) -> Result<(), ScanError> {
        if self.options.strip_explain {
            self.skip_explain()?;
        }

        while let Some(tok) = self.next()? {
            let wp = self.wp;
            let semicolon = tok.is_punct(b';');
            if self.is_unary_minus(&tok)
                && self.peek_matches(|t, _| t.class() == TokenClass::Constant)
            {
                let end = self.next()?.map_or(tok.span.end, |c| c.span.end);
                self.mask(tok, end)?;
            } else if tok.class() == TokenClass::Constant {
                let end = tok.span.end;
                self.mask(tok, end)?;
            } else {
                self.emit(tok);
            }
            self.semicolons = if semicolon {
                self.semicolons.or(Some(wp))
            } else {
                None
            };
        }

        if self.options.drop_trailing_semicolon {
            if let Some(wp) = self.semicolons.take() {
                trace!("dropping trailing semicolons from byte {wp}");
                self.wp = wp;
            }
        }
        Ok(())
    }

    fn is_unary_minus(&self, tok: &Token) -> bool {
        tok.kind == TokenKind::Operator
            && tok.text(self.buf) == b"-"
            && !self.last.is_some_and(Prev::is_operand)
    }

    fn skip_explain(&mut self) -> Result<(), ScanError> {
        if !self.peek_matches(|t, src| is_keyword(t, src, "explain")) {
            return Ok(());
        }
        self.next()?;

        if self.peek_matches(|t, _| t.is_punct(b'(')) {
            self.next()?;
            let mut depth = 1usize;
            while depth > 0 {
                match self.next()? {
                    Some(t) if t.is_punct(b'(') => depth += 1,
                    Some(t) if t.is_punct(b')') => depth -= 1,
                    Some(_) => {}
                    None => break,
                }
            }
        } else {
            while self.peek_matches(|t, src| {
                ["analyze", "analyse", "verbose"]
                    .iter()
                    .any(|word| is_keyword(t, src, word))
            }) {
                self.next()?;
            }
        }
        debug!("Skipped EXPLAIN prefix");
        Ok(())
    }

    fn write_separator(&mut self, class: TokenClass, spaced: bool) {
        let Some(prev) = self.last else {
            return;
        };
        if spaced
            && (self.options.preserve_space || (prev.class.is_content() && class.is_content()))
        {
            self.buf[self.wp] = b' ';
            self.wp += 1;
        }
    }

    /// Writes a space where `want` says the next token would fuse with the
    /// output before it. Only done if the token, ending at `end`, leaves a
    /// byte to spare.
    fn unfuse(&mut self, want: Fuse, spaced: bool, end: usize) {
        if self.fuse == Some(want) && !spaced && self.wp + 2 <= end {
            trace!("keeping {want:?} apart at {}", self.wp);
            self.buf[self.wp] = b' ';
            self.wp += 1;
        }
    }

    fn emit(&mut self, tok: Token) {
        let class = tok.class();
        let mark = ParenMark {
            wp: self.wp,
            before: self.last,
            fuse: self.fuse,
            spaced: tok.spaced,
        };
        let after_operand = self.last.is_some_and(Prev::is_operand);
        let fuse = match tok.kind {
            TokenKind::Placeholder if after_operand => Some(Fuse::Operator),
            TokenKind::Operator if after_operand && tok.text(self.buf) == b"@" => {
                Some(Fuse::Placeholder)
            }
            _ => None,
        };

        self.write_separator(class, tok.spaced);
        if class == TokenClass::Operator {
            self.unfuse(Fuse::Operator, tok.spaced, tok.span.end);
        }

        let len = tok.len();
        let dst = self.wp;
        match class {
            // Any multi-character operator is as good as any other.
            TokenClass::Operator if len > 1 => {
                self.buf[dst] = b'=';
                self.wp += 1;
            }
            // Identifiers are case sensitive.
            TokenClass::Identifier | TokenClass::Operator => {
                self.buf.copy_within(tok.span.clone(), dst);
                self.wp += len;
            }
            _ => {
                self.buf.copy_within(tok.span.clone(), dst);
                self.buf[dst..dst + len].make_ascii_uppercase();
                self.wp += len;
            }
        }
        debug_assert!(self.wp <= tok.span.end);

        self.fuse = fuse;
        self.open_paren = tok.is_punct(b'(').then_some(mark);
        self.last = Some(Prev {
            class,
            closes: tok.is_punct(b')') || tok.is_punct(b']'),
        });
    }

    /// Replaces a run of constants starting with `lead` by a single `?`.
    /// `lead` is either the first constant or a unary minus, and `end` is
    /// where the input consumed so far ends.
    fn mask(&mut self, lead: Token, mut end: usize) -> Result<(), ScanError> {
        while self.peek_matches(|t, _| t.class() == TokenClass::Constant) {
            if let Some(tok) = self.next()? {
                end = tok.span.end;
            }
        }

        let mut spaced = lead.spaced;
        // `(c)` and `(-c)` mask like `c`, once.
        if self.open_paren.is_some() && self.peek_matches(|t, _| t.is_punct(b')')) {
            if let Some(close) = self.next()? {
                end = close.span.end;
            }
            if let Some(mark) = self.open_paren.take() {
                trace!("eliding parentheses around constant at {}", lead.span.start);
                self.wp = mark.wp;
                self.last = mark.before;
                self.fuse = mark.fuse;
                spaced = mark.spaced;
            }
        }

        let after_operand = self.last.is_some_and(Prev::is_operand);
        self.write_separator(TokenClass::Constant, spaced);
        self.unfuse(Fuse::Placeholder, spaced, end);
        debug_assert!(self.wp < end);
        self.buf[self.wp] = b'?';
        self.wp += 1;

        self.fuse = after_operand.then_some(Fuse::Operator);
        self.open_paren = None;
        self.last = Some(Prev {
            class: TokenClass::Constant,
            closes: false,
        });
        Ok(())
    }
}

fn is_keyword(tok: &Token, src: &[u8], word: &str) -> bool {
    tok.kind == TokenKind::Keyword && tok.text(src).eq_ignore_ascii_case(word.as_bytes())
}
