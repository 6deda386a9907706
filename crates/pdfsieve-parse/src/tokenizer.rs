//! Content stream tokenizer for PDF operator/operand parsing.
//!
//! Groups the [`Token`]s produced by the [`Lexer`] into a sequence of
//! [`Operator`]s, each carrying its [`Operand`] arguments. Arrays and
//! dictionaries become nested operands; inline images (BI/ID/EI) are
//! captured as a single `BI` operator.

use pdfsieve_core::{ExtractResult, ExtractWarning, ExtractWarningCode};

use crate::error::BackendError;
use crate::lexer::{Lexer, Token};

/// A PDF content stream operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer number (e.g., `42`, `-7`).
    Integer(i64),
    /// Real (floating-point) number (e.g., `3.14`, `.5`).
    Real(f64),
    /// Name object (e.g., `/F1`, `/DeviceRGB`). Stored without the leading `/`.
    Name(String),
    /// Literal string delimited by parentheses, stored as raw bytes.
    LiteralString(Vec<u8>),
    /// Hexadecimal string delimited by angle brackets, stored as decoded bytes.
    HexString(Vec<u8>),
    /// Array of operands (e.g., `[1 2 3]`).
    Array(Vec<Operand>),
    /// Boolean value (`true` or `false`).
    Boolean(bool),
    /// The null object.
    Null,
    /// Dictionary object (`<< /Key value ... >>`).
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    /// String bytes if this is a literal or hex string.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::LiteralString(s) | Operand::HexString(s) => Some(s),
            _ => None,
        }
    }
}

/// A PDF content stream operator with its preceding operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Operator name (e.g., `"BT"`, `"Tf"`, `"Tj"`, `"m"`).
    pub name: String,
    /// Operands that preceded this operator on the operand stack.
    pub operands: Vec<Operand>,
}

/// Parse PDF content stream bytes into a sequence of operators.
///
/// Each operator collects the operands that preceded it on the operand stack.
/// Comments are stripped. Inline images are reported as a `BI` operator whose
/// operands are the flattened key/value array and the raw image bytes.
///
/// # Errors
///
/// Returns [`BackendError::Tokenize`] for malformed content streams.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, BackendError> {
    let mut reader = OperatorReader::new(input);
    let mut ops = Vec::new();
    while let Some(op) = reader.next_operator()? {
        ops.push(op);
    }
    Ok(ops)
}

/// Like [`tokenize`], but a malformed stream yields the operators read
/// before the error plus a [`ExtractWarningCode::TruncatedTokens`] warning.
pub fn operators_lossy(input: &[u8]) -> ExtractResult<Vec<Operator>> {
    let mut reader = OperatorReader::new(input);
    let mut ops = Vec::new();
    loop {
        match reader.next_operator() {
            Ok(Some(op)) => ops.push(op),
            Ok(None) => return ExtractResult::ok(ops),
            Err(err) => {
                let mut warning =
                    ExtractWarning::with_code(ExtractWarningCode::TruncatedTokens, err.to_string());
                if let BackendError::Tokenize { offset, .. } = err {
                    warning = warning.at_offset(offset);
                }
                return ExtractResult::with_warnings(ops, vec![warning]);
            }
        }
    }
}

/// Strings shown by the text-showing operators `Tj`, `'`, `"`, and `TJ`.
///
/// Kerning numbers inside `TJ` arrays are dropped; each string element is
/// returned separately, in stream order.
pub fn show_text_strings(input: &[u8]) -> ExtractResult<Vec<Vec<u8>>> {
    operators_lossy(input).map(|ops| {
        let mut out = Vec::new();
        for op in ops {
            let Some(last) = op.operands.last() else {
                continue;
            };
            match op.name.as_str() {
                "Tj" | "'" | "\"" => {
                    if let Some(s) = last.as_string_bytes() {
                        out.push(s.to_vec());
                    }
                }
                "TJ" => {
                    if let Operand::Array(items) = last {
                        out.extend(
                            items
                                .iter()
                                .filter_map(Operand::as_string_bytes)
                                .map(<[u8]>::to_vec),
                        );
                    }
                }
                _ => {}
            }
        }
        out
    })
}

fn lossy_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Pulls tokens from a [`Lexer`] and assembles them into operators.
struct OperatorReader<'a> {
    lexer: Lexer<'a>,
}

impl<'a> OperatorReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(input),
        }
    }

    fn error(&self, message: impl Into<String>) -> BackendError {
        BackendError::tokenize(self.lexer.position(), message)
    }

    fn next_operator(&mut self) -> Result<Option<Operator>, BackendError> {
        let mut operands = Vec::new();
        loop {
            let token = self.lexer.next_token()?;
            match token {
                Token::EndOfStream => return Ok(None),
                Token::ArrayEnd => return Err(self.error("unexpected ']' outside array")),
                Token::DictEnd => return Err(self.error("unexpected '>>' outside dictionary")),
                Token::Operator(kw) => match kw.as_slice() {
                    b"true" => operands.push(Operand::Boolean(true)),
                    b"false" => operands.push(Operand::Boolean(false)),
                    b"null" => operands.push(Operand::Null),
                    b"BI" => return self.read_inline_image().map(Some),
                    _ => {
                        return Ok(Some(Operator {
                            name: lossy_name(&kw),
                            operands,
                        }));
                    }
                },
                other => operands.push(self.operand_from(other)?),
            }
        }
    }

    /// Convert a value token (possibly the start of a compound) to an operand.
    fn operand_from(&mut self, token: Token) -> Result<Operand, BackendError> {
        Ok(match token {
            Token::Integer(v) => Operand::Integer(v),
            Token::Real(v) => Operand::Real(v),
            Token::Name(n) => Operand::Name(lossy_name(&n)),
            Token::LiteralString(s) => Operand::LiteralString(s),
            Token::HexString(s) => Operand::HexString(s),
            Token::ArrayStart => Operand::Array(self.read_array()?),
            Token::DictStart => Operand::Dictionary(self.read_dictionary()?),
            Token::Operator(kw) => match kw.as_slice() {
                b"true" => Operand::Boolean(true),
                b"false" => Operand::Boolean(false),
                b"null" => Operand::Null,
                // Keywords do not appear inside arrays; keep them name-like
                _ => Operand::Name(lossy_name(&kw)),
            },
            Token::ArrayEnd | Token::DictEnd | Token::Comment(_) | Token::EndOfStream => {
                return Err(self.error("unexpected token in operand position"));
            }
        })
    }

    /// Read array elements until `]`. Assumes `[` already consumed.
    fn read_array(&mut self) -> Result<Vec<Operand>, BackendError> {
        let mut elements = Vec::new();
        loop {
            match self.lexer.next_token()? {
                Token::ArrayEnd => return Ok(elements),
                Token::EndOfStream => return Err(self.error("unterminated array")),
                Token::DictEnd => return Err(self.error("unexpected '>>' in array")),
                other => elements.push(self.operand_from(other)?),
            }
        }
    }

    /// Read dictionary entries until `>>`. Assumes `<<` already consumed.
    fn read_dictionary(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        let mut entries = Vec::new();
        loop {
            let key = match self.lexer.next_token()? {
                Token::DictEnd => return Ok(entries),
                Token::EndOfStream => return Err(self.error("unterminated dictionary")),
                Token::Name(n) => lossy_name(&n),
                _ => return Err(self.error("expected name key in dictionary")),
            };
            let value = match self.lexer.next_token()? {
                Token::EndOfStream => return Err(self.error("unterminated dictionary value")),
                Token::DictEnd => return Err(self.error("missing dictionary value")),
                other => self.operand_from(other)?,
            };
            entries.push((key, value));
        }
    }

    /// Read `<dict entries> ID <data> EI` after the `BI` keyword.
    fn read_inline_image(&mut self) -> Result<Operator, BackendError> {
        let mut flat = Vec::new();
        loop {
            let key = match self.lexer.next_token()? {
                Token::Operator(kw) if kw.as_slice() == b"ID" => break,
                Token::EndOfStream => {
                    return Err(self.error("unterminated inline image (missing ID)"));
                }
                Token::Name(n) => lossy_name(&n),
                _ => return Err(self.error("expected name key in inline image dictionary")),
            };
            let value = match self.lexer.next_token()? {
                Token::EndOfStream => {
                    return Err(self.error("unterminated inline image dictionary"));
                }
                other => self.operand_from(other)?,
            };
            flat.push(Operand::Name(key));
            flat.push(value);
        }

        let data = self.lexer.take_inline_data();
        Ok(Operator {
            name: "BI".to_string(),
            operands: vec![Operand::Array(flat), Operand::LiteralString(data)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Operand parsing tests ----

    #[test]
    fn parse_integer() {
        let ops = tokenize(b"42 m").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "m");
        assert_eq!(ops[0].operands, vec![Operand::Integer(42)]);
    }

    #[test]
    fn parse_negative_real() {
        let ops = tokenize(b"-.002 w").unwrap();
        assert_eq!(ops[0].operands, vec![Operand::Real(-0.002)]);
    }

    #[test]
    fn parse_name_operand() {
        let ops = tokenize(b"/F1 12 Tf").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "Tf");
        assert_eq!(
            ops[0].operands,
            vec![Operand::Name("F1".to_string()), Operand::Integer(12)]
        );
    }

    #[test]
    fn parse_name_with_hex_escape() {
        let ops = tokenize(b"/F#231 12 Tf").unwrap();
        assert_eq!(ops[0].operands[0], Operand::Name("F#1".to_string()));
    }

    #[test]
    fn parse_hex_string_odd_digits() {
        let ops = tokenize(b"<ABC> Tj").unwrap();
        assert_eq!(ops[0].operands, vec![Operand::HexString(vec![0xAB, 0xC0])]);
    }

    #[test]
    fn parse_booleans_and_null() {
        let ops = tokenize(b"true false null m").unwrap();
        assert_eq!(
            ops[0].operands,
            vec![Operand::Boolean(true), Operand::Boolean(false), Operand::Null]
        );
    }

    // ---- Operator parsing tests ----

    #[test]
    fn parse_tj_array_with_kerning() {
        let ops = tokenize(b"[(H) -20 (ello)] TJ").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "TJ");
        assert_eq!(
            ops[0].operands,
            vec![Operand::Array(vec![
                Operand::LiteralString(b"H".to_vec()),
                Operand::Integer(-20),
                Operand::LiteralString(b"ello".to_vec()),
            ])]
        );
    }

    #[test]
    fn parse_path_operators() {
        let ops = tokenize(b"100 200 m 300 400 l S").unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].name, "m");
        assert_eq!(ops[1].name, "l");
        assert_eq!(
            ops[1].operands,
            vec![Operand::Integer(300), Operand::Integer(400)]
        );
        assert_eq!(ops[2].name, "S");
        assert!(ops[2].operands.is_empty());
    }

    #[test]
    fn parse_f_star_operator() {
        let ops = tokenize(b"f*").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "f*");
    }

    #[test]
    fn parse_double_quote_operator() {
        let ops = tokenize(b"1 2 (text) \"").unwrap();
        assert_eq!(ops[0].name, "\"");
        assert_eq!(ops[0].operands.len(), 3);
    }

    #[test]
    fn skip_comments() {
        let ops = tokenize(b"% this is a comment\nBT % begin text\n/F1 12 Tf\nET").unwrap();
        let names: Vec<&str> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["BT", "Tf", "ET"]);
    }

    #[test]
    fn parse_mixed_text_and_graphics() {
        let stream = b"q\n1 0 0 1 72 720 cm\nBT\n/F1 12 Tf\n(Test) Tj\nET\n100 200 300 400 re S\nQ";
        let ops = tokenize(stream).unwrap();
        let names: Vec<&str> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["q", "cm", "BT", "Tf", "Tj", "ET", "re", "S", "Q"]);
        assert_eq!(ops[1].operands.len(), 6);
    }

    #[test]
    fn parse_empty_and_whitespace_streams() {
        assert!(tokenize(b"").unwrap().is_empty());
        assert!(tokenize(b"   \t\n\r  ").unwrap().is_empty());
    }

    #[test]
    fn parse_inline_image() {
        let stream = b"BI\n/W 2 /H 2 /CS /G /BPC 8\nID \x00\xFF\x00\xFF\nEI";
        let ops = tokenize(stream).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "BI");
        if let Operand::Array(ref entries) = ops[0].operands[0] {
            assert_eq!(entries.len(), 8);
            assert_eq!(entries[0], Operand::Name("W".to_string()));
            assert_eq!(entries[1], Operand::Integer(2));
        } else {
            panic!("expected array operand for BI dict");
        }
        assert_eq!(
            ops[0].operands[1],
            Operand::LiteralString(vec![0x00, 0xFF, 0x00, 0xFF])
        );
    }

    #[test]
    fn operators_after_inline_image() {
        let stream = b"q BI /W 1 /H 1 ID \xAA EI Q";
        let ops = tokenize(stream).unwrap();
        let names: Vec<&str> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["q", "BI", "Q"]);
    }

    // ---- Dictionary parsing tests ----

    #[test]
    fn parse_bdc_with_inline_dict() {
        let ops = tokenize(b"/Tag << /MCID 0 >> BDC").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "BDC");
        assert_eq!(
            ops[0].operands[1],
            Operand::Dictionary(vec![("MCID".to_string(), Operand::Integer(0))])
        );
    }

    #[test]
    fn parse_nested_dictionary() {
        let ops = tokenize(b"<< /Outer << /Inner 42 >> >> pop").unwrap();
        assert_eq!(
            ops[0].operands,
            vec![Operand::Dictionary(vec![(
                "Outer".to_string(),
                Operand::Dictionary(vec![("Inner".to_string(), Operand::Integer(42))])
            )])]
        );
    }

    // ---- Errors ----

    #[test]
    fn unterminated_literal_string_error() {
        assert!(tokenize(b"(unclosed").is_err());
    }

    #[test]
    fn unterminated_array_error() {
        assert!(tokenize(b"[1 2 3").is_err());
    }

    #[test]
    fn unexpected_array_close_error() {
        assert!(tokenize(b"]").is_err());
    }

    #[test]
    fn operators_lossy_keeps_prefix() {
        let result = operators_lossy(b"BT (a) Tj [1 2");
        let names: Vec<&str> = result.value.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["BT", "Tj"]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, ExtractWarningCode::TruncatedTokens);
    }

    // ---- Text showing ----

    #[test]
    fn show_text_reassembles_split_operators() {
        let content = b"BT /F1 24 Tf 72 700 Td (Hello ) Tj (DNT!) Tj ET";
        let strings = show_text_strings(content).value;
        assert_eq!(strings.concat(), b"Hello DNT!".to_vec());
    }

    #[test]
    fn show_text_covers_all_operators() {
        let content = b"BT (a) Tj (b) ' 1 2 (c) \" [(d) -250 <65>] TJ (ignored) Tf ET";
        let strings = show_text_strings(content).value;
        assert_eq!(strings, vec![
            b"a".to_vec(),
            b"b".to_vec(),
            b"c".to_vec(),
            b"d".to_vec(),
            b"e".to_vec()
        ]);
    }
}
