//! Cross-reference checking and recovery.
//!
//! lopdf trusts whatever the cross-reference data claims. [`verify`] checks
//! each in-use entry against the bytes it points at. When the data cannot
//! be trusted, [`scan`] walks the file body for object headers and a
//! [`Patch`] appends a fresh classic section that lopdf then loads.
//!
//! The scan steps over stream data using the declared `/Length` when it
//! lands on `endstream`, and the first `endstream` marker otherwise, so
//! bytes inside a stream are never taken for an object header.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::ops::Range;

use lopdf::ObjectId;
use lopdf::xref::{Xref, XrefEntry};

use crate::error::BackendError;
use crate::lexer::{Lexer, Token, is_delimiter, is_whitespace};

/// Nesting limit for arrays and dictionaries read by the scanner.
const MAX_DEPTH: usize = 64;

/// Trailer keys carried over into a rebuilt trailer.
pub const TRAILER_KEYS: [&[u8]; 4] = [b"Root", b"Info", b"ID", b"Encrypt"];

/// A dictionary located in the file, values kept as raw byte spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictSpan {
    /// From `<<` through `>>`.
    pub range: Range<usize>,
    pub entries: Vec<(Vec<u8>, Range<usize>)>,
}

impl DictSpan {
    /// Raw span of the value under `key`.
    pub fn get(&self, key: &[u8]) -> Option<Range<usize>> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, range)| range.clone())
    }
}

/// How a stream dictionary declares its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredLength {
    Direct(i64),
    Indirect(ObjectId),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpan {
    pub dict: DictSpan,
    /// Stream data without the EOL before `endstream`.
    pub data: Range<usize>,
    /// Offset of the `endstream` keyword.
    pub raw_end: usize,
    pub length: DeclaredLength,
}

impl StreamSpan {
    /// Whether `declared` bytes of data end at the `endstream` marker.
    fn length_matches(&self, declared: Option<i64>) -> bool {
        declared
            .and_then(|n| usize::try_from(n).ok())
            .is_some_and(|n| n == self.data.len() || n == self.raw_end - self.data.start)
    }
}

/// An object definition found by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpan {
    pub id: ObjectId,
    /// Offset of the object number.
    pub offset: usize,
    pub stream: Option<StreamSpan>,
}

/// Object definitions in file order.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub objects: Vec<ObjectSpan>,
}

impl Scan {
    /// The last definition of each object number.
    pub fn latest(&self) -> BTreeMap<u32, &ObjectSpan> {
        self.objects.iter().map(|span| (span.id.0, span)).collect()
    }

    /// `/Length` of `stream`, following an indirect reference to the
    /// integer object it names.
    pub fn resolved_length(&self, data: &[u8], stream: &StreamSpan) -> Option<i64> {
        match stream.length {
            DeclaredLength::Direct(n) => Some(n),
            DeclaredLength::Indirect(id) => {
                let span = self.objects.iter().rev().find(|span| span.id == id)?;
                let mut lexer = Lexer::at(data, span.offset);
                for _ in 0..3 {
                    lexer.next_token().ok()?;
                }
                match lexer.next_token().ok()? {
                    Token::Integer(n) => Some(n),
                    _ => None,
                }
            }
            DeclaredLength::Missing => None,
        }
    }

    /// Latest stream objects whose declared length does not reach their
    /// `endstream` marker.
    pub fn length_mismatches(&self, data: &[u8]) -> Vec<&ObjectSpan> {
        self.latest()
            .into_values()
            .filter(|span| {
                span.stream
                    .as_ref()
                    .is_some_and(|s| !s.length_matches(self.resolved_length(data, s)))
            })
            .collect()
    }
}

/// Find every `N G obj` definition in `data`.
///
/// Each body is read far enough to know where it ends; stream data is
/// skipped. Headers whose body cannot be read are ignored, so a later
/// readable definition of the same number is what [`Scan::latest`] keeps.
pub fn scan(data: &[u8]) -> Scan {
    let mut objects = Vec::new();
    let mut pos = 0;
    while let Some(found) = find(data, b"obj", pos) {
        pos = found + 3;
        let terminated = data
            .get(found + 3)
            .is_none_or(|&b| is_whitespace(b) || is_delimiter(b));
        if !terminated {
            continue;
        }
        let Some((offset, id)) = header_before(data, found) else {
            continue;
        };
        match read_body(data, found + 3) {
            Some((stream, resume)) => {
                objects.push(ObjectSpan { id, offset, stream });
                pos = resume;
            }
            None => tracing::debug!(object = id.0, offset, "unreadable object body skipped"),
        }
    }
    Scan { objects }
}

/// Check that each in-use entry of `xref` points at its object.
pub fn verify(data: &[u8], xref: &Xref) -> Result<(), BackendError> {
    let mut in_use = 0usize;
    for (&num, entry) in &xref.entries {
        match *entry {
            XrefEntry::Normal { offset, generation } => {
                in_use += 1;
                let offset = offset as usize;
                if header_at(data, offset) != Some((num, generation)) {
                    return Err(BackendError::Parse(format!(
                        "xref entry for object {num} points to offset {offset}, which does not hold it"
                    )));
                }
            }
            XrefEntry::Compressed { container, .. } => {
                in_use += 1;
                if !matches!(xref.get(container), Some(XrefEntry::Normal { .. })) {
                    return Err(BackendError::Parse(format!(
                        "object {num} is stored in missing object stream {container}"
                    )));
                }
            }
            XrefEntry::Free | XrefEntry::UnusableFree => {}
        }
    }
    if in_use == 0 {
        return Err(BackendError::Parse("cross-reference table has no objects".into()));
    }
    Ok(())
}

/// The dictionary after the last `trailer` keyword.
pub fn last_trailer(data: &[u8]) -> Option<DictSpan> {
    let pos = rfind(data, b"trailer")?;
    dict_at(data, pos + b"trailer".len())
}

/// The dictionary starting at `pos`, after optional whitespace.
pub fn dict_at(data: &[u8], pos: usize) -> Option<DictSpan> {
    let mut lexer = Lexer::at(data, pos);
    if lexer.next_token().ok()? != Token::DictStart {
        return None;
    }
    let start = lexer.position() - 2;
    let entries = read_entries(&mut lexer, 0)?;
    Some(DictSpan {
        range: start..lexer.position(),
        entries,
    })
}

/// Bytes appended to a file to give lopdf a trustworthy cross-reference
/// section: corrected stream objects, then `xref`, `trailer` and
/// `startxref`.
#[derive(Debug)]
pub struct Patch<'a> {
    data: &'a [u8],
    tail: Vec<u8>,
    entries: BTreeMap<u32, (usize, u16)>,
}

impl<'a> Patch<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            tail: b"\n".to_vec(),
            entries: BTreeMap::new(),
        }
    }

    /// Point `id` at `offset` in the original bytes.
    pub fn keep(&mut self, id: ObjectId, offset: usize) {
        self.entries.insert(id.0, (offset, id.1));
    }

    /// Append a copy of a stream object whose `/Length` is the size of the
    /// data found before its `endstream` marker.
    pub fn rewrite_stream(&mut self, span: &ObjectSpan) {
        let Some(stream) = &span.stream else {
            return;
        };
        let offset = self.data.len() + self.tail.len();
        let dict = stream.dict.range.clone();
        let len = stream.data.len();

        let _ = write!(self.tail, "{} {} obj\n", span.id.0, span.id.1);
        match stream.dict.get(b"Length") {
            Some(value) => {
                self.tail.extend_from_slice(&self.data[dict.start..value.start]);
                let _ = write!(self.tail, " {len}");
                self.tail.extend_from_slice(&self.data[value.end..dict.end]);
            }
            None => {
                self.tail.extend_from_slice(&self.data[dict.start..dict.end - 2]);
                let _ = write!(self.tail, " /Length {len}>>");
            }
        }
        self.tail.extend_from_slice(b"\nstream\n");
        self.tail.extend_from_slice(&self.data[stream.data.clone()]);
        self.tail.extend_from_slice(b"\nendstream\nendobj\n");
        self.entries.insert(span.id.0, (offset, span.id.1));
    }

    /// The patched file. The trailer holds `/Size` and the raw `(key,
    /// value)` pairs given.
    pub fn finish(self, trailer: &[(&[u8], &[u8])]) -> Vec<u8> {
        let mut section = String::from("xref\n0 1\n0000000000 65535 f \n");
        for (num, (offset, generation)) in &self.entries {
            let _ = write!(section, "{num} 1\n{offset:010} {generation:05} n \n");
        }
        let size = self.entries.keys().next_back().map_or(1, |n| n + 1);

        let mut out = Vec::with_capacity(self.data.len() + self.tail.len() + section.len() + 128);
        out.extend_from_slice(self.data);
        out.extend_from_slice(&self.tail);
        let xref_offset = out.len();
        out.extend_from_slice(section.as_bytes());
        out.extend_from_slice(format!("trailer\n<< /Size {size}").as_bytes());
        for (key, value) in trailer {
            out.push(b' ');
            out.push(b'/');
            out.extend_from_slice(key);
            out.extend_from_slice(value);
        }
        out.extend_from_slice(format!(" >>\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());
        out
    }
}

/// First occurrence of `needle` at or after `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// `N G obj` at `offset`.
fn header_at(data: &[u8], offset: usize) -> Option<ObjectId> {
    let mut lexer = Lexer::at(data, offset);
    match (lexer.next_token().ok()?, lexer.next_token().ok()?, lexer.next_token().ok()?) {
        (Token::Integer(n), Token::Integer(g), kw) if kw.is_operator(b"obj") => {
            Some((u32::try_from(n).ok()?, u16::try_from(g).ok()?))
        }
        _ => None,
    }
}

/// Walk backwards from an `obj` keyword over `N G `; returns the offset of
/// `N` and the object id.
fn header_before(data: &[u8], obj_pos: usize) -> Option<(usize, ObjectId)> {
    let mut i = obj_pos;
    let skip_ws = |i: &mut usize| -> bool {
        let before = *i;
        while *i > 0 && is_whitespace(data[*i - 1]) {
            *i -= 1;
        }
        *i < before
    };
    let digits = |i: &mut usize| -> Option<u64> {
        let end = *i;
        while *i > 0 && data[*i - 1].is_ascii_digit() {
            *i -= 1;
        }
        if *i == end || end - *i > 10 {
            return None;
        }
        std::str::from_utf8(&data[*i..end]).ok()?.parse().ok()
    };

    if !skip_ws(&mut i) {
        return None;
    }
    let generation = digits(&mut i)?;
    if !skip_ws(&mut i) {
        return None;
    }
    let num = digits(&mut i)?;
    if i > 0 && !is_whitespace(data[i - 1]) && !is_delimiter(data[i - 1]) {
        return None;
    }
    Some((i, (u32::try_from(num).ok()?, u16::try_from(generation).ok()?)))
}

/// Read an object body starting right after `obj`. Returns its stream, if
/// any, and where scanning resumes.
fn read_body(data: &[u8], start: usize) -> Option<(Option<StreamSpan>, usize)> {
    let mut lexer = Lexer::at(data, start);
    let first = lexer.next_token().ok()?;
    let dict = if first == Token::DictStart {
        let dict_start = lexer.position() - 2;
        let entries = read_entries(&mut lexer, 0)?;
        Some(DictSpan {
            range: dict_start..lexer.position(),
            entries,
        })
    } else {
        skip_value(&mut lexer, first, 0)?;
        None
    };
    let after_value = lexer.position();

    match (dict, lexer.next_token().ok()) {
        (Some(dict), Some(next)) if next.is_operator(b"stream") => {
            let stream = read_stream(data, dict, lexer.position())?;
            let resume = stream.raw_end + b"endstream".len();
            Some((Some(stream), resume))
        }
        (_, Some(next)) if next.is_operator(b"endobj") => Some((None, lexer.position())),
        // No endobj: resume after the value
        _ => Some((None, after_value)),
    }
}

fn read_stream(data: &[u8], dict: DictSpan, after_keyword: usize) -> Option<StreamSpan> {
    let start = skip_stream_eol(data, after_keyword);
    let length = declared_length(data, &dict);
    let hinted = match length {
        DeclaredLength::Direct(n) => usize::try_from(n)
            .ok()
            .and_then(|n| start.checked_add(n))
            .and_then(|end| endstream_at(data, end)),
        _ => None,
    };
    let raw_end = hinted.or_else(|| find(data, b"endstream", start))?;
    Some(StreamSpan {
        dict,
        data: start..trim_eol(data, start, raw_end),
        raw_end,
        length,
    })
}

fn declared_length(data: &[u8], dict: &DictSpan) -> DeclaredLength {
    let Some(value) = dict.get(b"Length") else {
        return DeclaredLength::Missing;
    };
    let mut lexer = Lexer::at(&data[..value.end], value.start);
    match (lexer.next_token(), lexer.next_token(), lexer.next_token()) {
        (Ok(Token::Integer(n)), Ok(Token::Integer(g)), Ok(r)) if r.is_operator(b"R") => {
            match (u32::try_from(n), u16::try_from(g)) {
                (Ok(n), Ok(g)) => DeclaredLength::Indirect((n, g)),
                _ => DeclaredLength::Missing,
            }
        }
        (Ok(Token::Integer(n)), ..) => DeclaredLength::Direct(n),
        _ => DeclaredLength::Missing,
    }
}

/// Top-level entries of a dictionary whose `<<` was just consumed.
fn read_entries(lexer: &mut Lexer<'_>, depth: usize) -> Option<Vec<(Vec<u8>, Range<usize>)>> {
    let mut entries = Vec::new();
    loop {
        match lexer.next_token().ok()? {
            Token::DictEnd => return Some(entries),
            Token::Name(key) => {
                let value_start = Lexer::position(lexer);
                let first = lexer.next_token().ok()?;
                skip_value(lexer, first, depth + 1)?;
                entries.push((key, value_start..Lexer::position(lexer)));
            }
            _ => return None,
        }
    }
}

/// Consume the rest of the value that begins with `token`.
fn skip_value(lexer: &mut Lexer<'_>, token: Token, depth: usize) -> Option<()> {
    if depth > MAX_DEPTH {
        return None;
    }
    match token {
        Token::Integer(_) => {
            // `N G R`
            let mut ahead = lexer.clone();
            if matches!(ahead.next_token(), Ok(Token::Integer(_)))
                && ahead.next_token().is_ok_and(|t| t.is_operator(b"R"))
            {
                *lexer = ahead;
            }
            Some(())
        }
        Token::DictStart => read_entries(lexer, depth).map(|_| ()),
        Token::ArrayStart => loop {
            match lexer.next_token().ok()? {
                Token::ArrayEnd => return Some(()),
                Token::EndOfStream => return None,
                next => skip_value(lexer, next, depth + 1)?,
            }
        },
        Token::Real(_) | Token::Name(_) | Token::LiteralString(_) | Token::HexString(_) => Some(()),
        Token::Operator(kw) if matches!(kw.as_slice(), b"true" | b"false" | b"null") => Some(()),
        _ => None,
    }
}

/// Offset of `endstream` when it follows `end` after at most one EOL.
fn endstream_at(data: &[u8], end: usize) -> Option<usize> {
    let mut pos = end;
    if data.get(pos) == Some(&b'\r') {
        pos += 1;
    }
    if data.get(pos) == Some(&b'\n') {
        pos += 1;
    }
    data.get(pos..)?.starts_with(b"endstream").then_some(pos)
}

/// Skip the EOL after the `stream` keyword.
fn skip_stream_eol(data: &[u8], mut pos: usize) -> usize {
    while matches!(data.get(pos), Some(b' ' | b'\t')) {
        pos += 1;
    }
    match (data.get(pos), data.get(pos + 1)) {
        (Some(b'\r'), Some(b'\n')) => pos + 2,
        (Some(b'\r' | b'\n'), _) => pos + 1,
        _ => pos,
    }
}

/// Drop one EOL sequence just before `end`, never moving before `start`.
fn trim_eol(data: &[u8], start: usize, end: usize) -> usize {
    if end >= start + 2 && &data[end - 2..end] == b"\r\n" {
        end - 2
    } else if end > start && matches!(data[end - 1], b'\n' | b'\r') {
        end - 1
    } else {
        end
    }
}
