//! Lexer for PDF byte streams.
//!
//! [`Lexer`] turns a decoded content stream (or any PDF object syntax) into
//! a sequence of [`Token`]s. It is the lexical layer under both the
//! cross-reference scan and the operator-level [`tokenizer`](crate::tokenizer).
//!
//! The lexer only moves forward. To start over, construct a new one over
//! the same buffer.

use pdfsieve_core::{ExtractResult, ExtractWarning, ExtractWarningCode};

use crate::error::BackendError;

/// A lexical PDF token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer number (e.g., `42`, `-7`).
    Integer(i64),
    /// Real number (e.g., `3.14`, `.5`, `-2.`).
    Real(f64),
    /// Name without the leading `/`, with `#xx` escapes decoded.
    Name(Vec<u8>),
    /// Literal string `( ... )`, escapes decoded.
    LiteralString(Vec<u8>),
    /// Hex string `< ... >`, decoded to bytes.
    HexString(Vec<u8>),
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// Bare keyword: a content operator (`Tj`, `re`) or a syntax keyword
    /// (`obj`, `R`, `true`, `null`).
    Operator(Vec<u8>),
    /// Comment body without the leading `%`. Only produced when the lexer
    /// keeps comments.
    Comment(Vec<u8>),
    /// End of the buffer.
    EndOfStream,
}

/// Coarse token classification used to filter token sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal or hex string.
    String,
    /// Integer or real.
    Number,
    /// Name.
    Name,
    /// Everything else.
    Other,
}

impl Token {
    /// Classify this token.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::LiteralString(_) | Token::HexString(_) => TokenKind::String,
            Token::Integer(_) | Token::Real(_) => TokenKind::Number,
            Token::Name(_) => TokenKind::Name,
            _ => TokenKind::Other,
        }
    }

    /// String bytes if this is a literal or hex string.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            Token::LiteralString(s) | Token::HexString(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if this is the operator/keyword `kw`.
    pub fn is_operator(&self, kw: &[u8]) -> bool {
        matches!(self, Token::Operator(op) if op.as_slice() == kw)
    }
}

/// Returns `true` if `b` is a PDF whitespace character.
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

/// Returns `true` if `b` is a PDF delimiter character.
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Convert a hex digit character to its value (0-15).
pub(crate) fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Forward-only cursor over a byte buffer producing [`Token`]s.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    keep_comments: bool,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer at the start of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self::at(input, 0)
    }

    /// Create a lexer starting at byte `offset` of `input`.
    pub fn at(input: &'a [u8], offset: usize) -> Self {
        Self {
            input,
            pos: offset.min(input.len()),
            keep_comments: false,
            finished: false,
        }
    }

    /// Emit [`Token::Comment`] instead of skipping comments.
    pub fn keep_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    /// Current byte offset of the cursor.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The underlying buffer.
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Advance to the next token.
    ///
    /// Returns [`Token::EndOfStream`] at the end of the buffer and on every
    /// call after it. After an error the lexer is finished as well.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Tokenize`] for unterminated strings, invalid
    /// hex digits, and stray `>`.
    pub fn next_token(&mut self) -> Result<Token, BackendError> {
        if self.finished {
            return Ok(Token::EndOfStream);
        }
        let result = self.lex();
        match &result {
            Ok(Token::EndOfStream) | Err(_) => self.finished = true,
            _ => {}
        }
        result
    }

    fn lex(&mut self) -> Result<Token, BackendError> {
        loop {
            self.skip_whitespace();
            let Some(&b) = self.input.get(self.pos) else {
                return Ok(Token::EndOfStream);
            };
            match b {
                b'%' => {
                    let comment = self.read_comment();
                    if self.keep_comments {
                        return Ok(Token::Comment(comment));
                    }
                }
                b'(' => return self.parse_literal_string().map(Token::LiteralString),
                b'<' => {
                    if self.input.get(self.pos + 1) == Some(&b'<') {
                        self.pos += 2;
                        return Ok(Token::DictStart);
                    }
                    return self.parse_hex_string().map(Token::HexString);
                }
                b'>' => {
                    if self.input.get(self.pos + 1) == Some(&b'>') {
                        self.pos += 2;
                        return Ok(Token::DictEnd);
                    }
                    return Err(BackendError::tokenize(self.pos, "unexpected '>'"));
                }
                b'[' => {
                    self.pos += 1;
                    return Ok(Token::ArrayStart);
                }
                b']' => {
                    self.pos += 1;
                    return Ok(Token::ArrayEnd);
                }
                b'{' | b'}' => {
                    self.pos += 1;
                    return Ok(Token::Operator(vec![b]));
                }
                b')' => {
                    // Unbalanced close paren outside a string
                    self.pos += 1;
                }
                b'/' => return Ok(Token::Name(self.parse_name())),
                b'0'..=b'9' | b'+' | b'-' | b'.' => return Ok(self.parse_number()),
                _ => return Ok(Token::Operator(self.parse_keyword())),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && is_whitespace(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    /// Read a `%` comment up to (not including) the end of line.
    fn read_comment(&mut self) -> Vec<u8> {
        debug_assert_eq!(self.input[self.pos], b'%');
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.input.len()
            && self.input[self.pos] != b'\n'
            && self.input[self.pos] != b'\r'
        {
            self.pos += 1;
        }
        self.input[start..self.pos].to_vec()
    }

    /// Parse a literal string `(...)` with balanced parentheses and escapes.
    fn parse_literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        let start = self.pos;
        self.pos += 1; // skip opening '('

        let input = self.input;
        let mut result = Vec::new();
        let mut depth = 1u32;

        while self.pos < input.len() {
            let b = input[self.pos];
            match b {
                b'(' => {
                    depth += 1;
                    result.push(b'(');
                    self.pos += 1;
                }
                b')' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(result);
                    }
                    result.push(b')');
                }
                b'\\' => {
                    self.pos += 1;
                    let Some(&escaped) = input.get(self.pos) else {
                        break;
                    };
                    match escaped {
                        b'n' => result.push(b'\n'),
                        b'r' => result.push(b'\r'),
                        b't' => result.push(b'\t'),
                        b'b' => result.push(0x08),
                        b'f' => result.push(0x0C),
                        b'(' | b')' | b'\\' => result.push(escaped),
                        b'\r' => {
                            // Line continuation: backslash + CR or CR LF
                            self.pos += 1;
                            if input.get(self.pos) == Some(&b'\n') {
                                self.pos += 1;
                            }
                            continue;
                        }
                        b'\n' => {
                            self.pos += 1;
                            continue;
                        }
                        b'0'..=b'7' => {
                            let mut val = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match input.get(self.pos + 1) {
                                    Some(&d @ b'0'..=b'7') => {
                                        self.pos += 1;
                                        val = val * 8 + u32::from(d - b'0');
                                    }
                                    _ => break,
                                }
                            }
                            // High-order overflow is ignored
                            result.push((val & 0xFF) as u8);
                        }
                        // Unknown escape: the backslash is dropped
                        _ => result.push(escaped),
                    }
                    self.pos += 1;
                }
                _ => {
                    result.push(b);
                    self.pos += 1;
                }
            }
        }

        Err(BackendError::tokenize(start, "unterminated literal string"))
    }

    /// Parse a hex string `<...>`. Whitespace is ignored and an odd
    /// trailing digit is padded with a zero nibble.
    fn parse_hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        let start = self.pos;
        self.pos += 1; // skip '<'

        let mut result = Vec::new();
        let mut high: Option<u8> = None;
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            self.pos += 1;
            if b == b'>' {
                if let Some(h) = high {
                    result.push(h << 4);
                }
                return Ok(result);
            }
            if is_whitespace(b) {
                continue;
            }
            let Some(v) = hex_value(b) else {
                return Err(BackendError::tokenize(
                    self.pos - 1,
                    format!("invalid hex digit: {:?}", b as char),
                ));
            };
            match high.take() {
                Some(h) => result.push((h << 4) | v),
                None => high = Some(v),
            }
        }

        Err(BackendError::tokenize(start, "unterminated hex string"))
    }

    /// Parse a `/Name` token. Assumes the current byte is `/`.
    fn parse_name(&mut self) -> Vec<u8> {
        self.pos += 1; // skip '/'

        let start = self.pos;
        while self.pos < self.input.len()
            && !is_whitespace(self.input[self.pos])
            && !is_delimiter(self.input[self.pos])
        {
            self.pos += 1;
        }

        let raw = &self.input[start..self.pos];
        let mut name = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' {
                if let (Some(hi), Some(lo)) = (
                    raw.get(i + 1).copied().and_then(hex_value),
                    raw.get(i + 2).copied().and_then(hex_value),
                ) {
                    name.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            name.push(raw[i]);
            i += 1;
        }
        name
    }

    /// Parse a number (integer or real). A lone sign or dot reads as `0`.
    fn parse_number(&mut self) -> Token {
        let start = self.pos;
        let mut has_dot = false;

        if matches!(self.input[self.pos], b'+' | b'-') {
            self.pos += 1;
        }
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            if b == b'.' && !has_dot {
                has_dot = true;
                self.pos += 1;
            } else if b.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("0");
        if !has_dot {
            if let Ok(v) = text.parse::<i64>() {
                return Token::Integer(v);
            }
        }
        let normalized = match text {
            "" | "+" | "-" | "." | "+." | "-." => return Token::Integer(0),
            t if t.ends_with('.') => format!("{t}0"),
            t => t.to_string(),
        };
        Token::Real(normalized.parse::<f64>().unwrap_or(0.0))
    }

    /// Parse a keyword (operator, `true`, `null`, `obj`, ...).
    fn parse_keyword(&mut self) -> Vec<u8> {
        let start = self.pos;
        while self.pos < self.input.len()
            && !is_whitespace(self.input[self.pos])
            && !is_delimiter(self.input[self.pos])
        {
            self.pos += 1;
        }
        if self.pos == start {
            // Lone delimiter we do not tokenize; consume it as a keyword
            self.pos += 1;
        }
        self.input[start..self.pos].to_vec()
    }

    /// Consume inline image data after an `ID` operator.
    ///
    /// Returns the raw bytes between the single whitespace that follows
    /// `ID` and the `EI` operator, and leaves the cursor after `EI`.
    pub fn take_inline_data(&mut self) -> Vec<u8> {
        let input = self.input;
        if self.pos < input.len() && is_whitespace(input[self.pos]) {
            self.pos += 1;
        }
        let start = self.pos;
        let mut i = start;
        while i + 1 < input.len() {
            let preceded = i == start || is_whitespace(input[i - 1]);
            let followed = input.get(i + 2).is_none_or(|&b| is_whitespace(b));
            if preceded && followed && input[i] == b'E' && input[i + 1] == b'I' {
                let mut end = i;
                if end > start && is_whitespace(input[end - 1]) {
                    end -= 1;
                }
                self.pos = i + 2;
                return input[start..end].to_vec();
            }
            i += 1;
        }
        self.pos = input.len();
        input[start..].to_vec()
    }

    /// Collect every token up to the end of the stream or the first error.
    ///
    /// A lexical error truncates the sequence: the tokens emitted before it
    /// are returned together with a [`ExtractWarningCode::TruncatedTokens`]
    /// warning. [`Token::EndOfStream`] is not included.
    pub fn collect_lossy(mut self) -> ExtractResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            match self.next_token() {
                Ok(Token::EndOfStream) => return ExtractResult::ok(tokens),
                Ok(tok) => {
                    let is_id = tok.is_operator(b"ID");
                    tokens.push(tok);
                    if is_id {
                        self.take_inline_data();
                    }
                }
                Err(err) => {
                    let offset = match &err {
                        BackendError::Tokenize { offset, .. } => *offset,
                        _ => self.pos,
                    };
                    let warning =
                        ExtractWarning::with_code(ExtractWarningCode::TruncatedTokens, err.to_string())
                            .at_offset(offset);
                    return ExtractResult::with_warnings(tokens, vec![warning]);
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Token::EndOfStream) => None,
            other => Some(other),
        }
    }
}

/// Tokenize `input` completely, reporting a lexical error as a truncation
/// warning instead of failing.
pub fn tokenize_lossy(input: &[u8]) -> ExtractResult<Vec<Token>> {
    Lexer::new(input).collect_lossy()
}

/// Collect the value of every string token (TK_STRING) in a content stream.
///
/// Literal and hex strings alike, in stream order. Stops at the first
/// lexical error, keeping what was already collected.
pub fn collect_strings(input: &[u8]) -> ExtractResult<Vec<Vec<u8>>> {
    tokenize_lossy(input).map(|tokens| {
        tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::LiteralString(s) | Token::HexString(s) => Some(s),
                _ => None,
            })
            .collect()
    })
}
