//! Signature metadata from AcroForm signature fields.
//!
//! Each signed field (`/FT /Sig` with a `/V` dictionary) carries a detached
//! PKCS#7 `SignedData` blob in `/Contents`. The blob is decoded to find the
//! signing certificate and the signed attributes; optionally the digest over
//! `/ByteRange` is recomputed and checked.

use std::collections::HashSet;

use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::{ObjectIdentifier, OctetString};
use der::{Any, Decode, Encode, Header, SliceReader};
use num_bigint::BigUint;
use sha2::Digest;
use x509_cert::Certificate;
use x509_cert::name::Name;
use x509_cert::time::Time;

use pdfsieve_core::{
    ExtractResult, ExtractWarning, ExtractWarningCode, PdfError, SignatureOptions, SignatureRecord,
};
use pdfsieve_parse::Document;
use pdfsieve_parse::lopdf::{Dictionary, Object, ObjectId};

const MAX_FIELD_DEPTH: usize = 64;

const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
const ID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
const ID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Digest algorithms accepted in a `SignerInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match oid.to_string().as_str() {
            "1.3.14.3.2.26" => Some(Self::Sha1),
            "2.16.840.1.101.3.4.2.1" => Some(Self::Sha256),
            "2.16.840.1.101.3.4.2.2" => Some(Self::Sha384),
            "2.16.840.1.101.3.4.2.3" => Some(Self::Sha512),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Digest of the concatenated `ranges` of `data`. Ranges must be in
    /// bounds.
    fn hash_ranges(self, data: &[u8], ranges: &[(usize, usize)]) -> Vec<u8> {
        match self {
            Self::Sha1 => hash_with::<sha1::Sha1>(data, ranges),
            Self::Sha256 => hash_with::<sha2::Sha256>(data, ranges),
            Self::Sha384 => hash_with::<sha2::Sha384>(data, ranges),
            Self::Sha512 => hash_with::<sha2::Sha512>(data, ranges),
        }
    }
}

fn hash_with<D: Digest>(data: &[u8], ranges: &[(usize, usize)]) -> Vec<u8> {
    let mut hasher = D::new();
    for &(offset, len) in ranges {
        hasher.update(&data[offset..offset + len]);
    }
    hasher.finalize().to_vec()
}

/// Read every signed signature field of `doc`.
///
/// `source` must be the exact bytes `doc` was loaded from; `/ByteRange`
/// offsets refer to it. Records come in field-tree order, one per distinct
/// fully-qualified field name. A field whose blob cannot be decoded is
/// skipped with a [`ExtractWarningCode::SignatureSkipped`] warning.
///
/// # Errors
///
/// In strict mode, [`PdfError::SignatureInvalid`] when a recomputed digest
/// does not match, the `messageDigest` attribute is missing, or the byte
/// ranges fall outside `source`.
pub fn extract_signatures(
    doc: &Document,
    source: &[u8],
    options: &SignatureOptions,
) -> Result<ExtractResult<Vec<SignatureRecord>>, PdfError> {
    let catalog = doc.catalog()?;
    let fields = catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|a| doc.resolve_dict(a))
        .and_then(|form| form.get(b"Fields").ok())
        .and_then(|f| doc.resolve(f).as_array().ok());
    let Some(fields) = fields else {
        return Ok(ExtractResult::ok(Vec::new()));
    };

    let mut walker = FieldWalker {
        doc,
        source,
        options,
        visited: HashSet::new(),
        names: HashSet::new(),
        records: Vec::new(),
        warnings: Vec::new(),
    };
    for field in fields {
        walker.walk(field, None, None, 0)?;
    }
    Ok(ExtractResult::with_warnings(walker.records, walker.warnings))
}

struct FieldWalker<'a> {
    doc: &'a Document,
    source: &'a [u8],
    options: &'a SignatureOptions,
    visited: HashSet<ObjectId>,
    names: HashSet<String>,
    records: Vec<SignatureRecord>,
    warnings: Vec<ExtractWarning>,
}

impl<'a> FieldWalker<'a> {
    fn walk(
        &mut self,
        field: &'a Object,
        parent_name: Option<&str>,
        inherited_ft: Option<&'a [u8]>,
        depth: usize,
    ) -> Result<(), PdfError> {
        if depth >= MAX_FIELD_DEPTH {
            tracing::warn!(depth, "field tree too deep, subtree skipped");
            return Ok(());
        }
        if let Object::Reference(id) = field {
            if !self.visited.insert(*id) {
                tracing::warn!(object = id.0, "field tree cycle, node skipped");
                return Ok(());
            }
        }
        let Some(dict) = self.doc.resolve_dict(field) else {
            return Ok(());
        };

        let name = match (parent_name, self.doc.text_string(dict, b"T")) {
            (Some(parent), Some(partial)) => format!("{parent}.{partial}"),
            (None, Some(partial)) => partial,
            (Some(parent), None) => parent.to_string(),
            (None, None) => String::new(),
        };
        let field_type = dict
            .get(b"FT")
            .and_then(Object::as_name)
            .ok()
            .or(inherited_ft);

        // Kids with /T are child fields; kids without are widget annotations
        let kids = dict
            .get(b"Kids")
            .ok()
            .and_then(|k| self.doc.resolve(k).as_array().ok());
        if let Some(kids) = kids {
            let has_child_fields = kids
                .iter()
                .any(|kid| self.doc.resolve_dict(kid).is_some_and(|d| d.has(b"T")));
            if has_child_fields {
                for kid in kids {
                    self.walk(kid, Some(&name), field_type, depth + 1)?;
                }
                return Ok(());
            }
        }

        if field_type != Some(b"Sig".as_slice()) {
            return Ok(());
        }
        let Some(value) = dict.get(b"V").ok().and_then(|v| self.doc.resolve_dict(v)) else {
            return Ok(());
        };
        if !self.names.insert(name.clone()) {
            tracing::debug!(field = %name, "duplicate signature field name skipped");
            return Ok(());
        }

        match read_signature(self.doc, self.source, self.options, &name, value) {
            Ok(record) => self.records.push(record),
            Err(err @ PdfError::SignatureInvalid { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(field = %name, error = %err, "signature skipped");
                self.warnings.push(
                    ExtractWarning::with_code(ExtractWarningCode::SignatureSkipped, err.to_string())
                        .for_element(format!("field {name}")),
                );
            }
        }
        Ok(())
    }
}

fn read_signature(
    doc: &Document,
    source: &[u8],
    options: &SignatureOptions,
    field: &str,
    value: &Dictionary,
) -> Result<SignatureRecord, PdfError> {
    let malformed = |message: String| PdfError::SignatureMalformed {
        field: field.to_string(),
        message,
    };

    let mut record = SignatureRecord::new(field);
    record.reason = doc.text_string(value, b"Reason");
    record.location = doc.text_string(value, b"Location");
    record.contact_info = doc.text_string(value, b"ContactInfo");
    record.byte_range = byte_range(doc, value);

    let contents = match value.get(b"Contents").map(|c| doc.resolve(c)) {
        Ok(Object::String(bytes, _)) => bytes,
        _ => return Err(malformed("missing /Contents".into())),
    };
    let blob = der_prefix(contents).map_err(&malformed)?;
    let signed = decode_signed_data(blob).map_err(&malformed)?;
    let signer = signed
        .signer_infos
        .0
        .iter()
        .next()
        .ok_or_else(|| malformed("no SignerInfo".into()))?;

    if let Some(cert) = signing_certificate(&signed, signer) {
        let tbs = &cert.tbs_certificate;
        record.sign_name = common_name(&tbs.subject);
        record.subject = Some(tbs.subject.to_string());
        record.issuer = Some(tbs.issuer.to_string());
        record.serial_number = Some(BigUint::from_bytes_be(tbs.serial_number.as_bytes()).to_string());
    }
    if record.sign_name.is_none() {
        record.sign_name = doc.text_string(value, b"Name");
    }
    record.sign_date = signing_time(signer).or_else(|| doc.text_string(value, b"M"));

    let digest = DigestAlgorithm::from_oid(&signer.digest_alg.oid);
    record.digest_algorithm = digest.map(|d| d.name().to_string());

    if options.strict {
        verify_digest(field, source, &record.byte_range, signer, digest)?;
    }
    Ok(record)
}

/// `/ByteRange` as `(offset, length)` pairs; negative entries are dropped.
fn byte_range(doc: &Document, value: &Dictionary) -> Vec<(usize, usize)> {
    let Some(items) = value
        .get(b"ByteRange")
        .ok()
        .and_then(|r| doc.resolve(r).as_array().ok())
    else {
        return Vec::new();
    };
    items
        .chunks_exact(2)
        .filter_map(|pair| {
            let offset = usize::try_from(pair[0].as_i64().ok()?).ok()?;
            let len = usize::try_from(pair[1].as_i64().ok()?).ok()?;
            Some((offset, len))
        })
        .collect()
}

/// The leading DER element of `blob`, without the zero padding PDF
/// writers leave in the reserved `/Contents` space.
fn der_prefix(blob: &[u8]) -> Result<&[u8], String> {
    let mut reader = SliceReader::new(blob).map_err(|e| e.to_string())?;
    let header = Header::decode(&mut reader).map_err(|e| format!("not DER: {e}"))?;
    let total = (header.encoded_len().map_err(|e| e.to_string())? + header.length)
        .and_then(usize::try_from)
        .map_err(|e| e.to_string())?;
    blob.get(..total)
        .ok_or_else(|| format!("blob truncated: {} of {total} bytes", blob.len()))
}

fn decode_signed_data(blob: &[u8]) -> Result<SignedData, String> {
    let info = ContentInfo::from_der(blob).map_err(|e| format!("bad ContentInfo: {e}"))?;
    if info.content_type != ID_SIGNED_DATA {
        return Err(format!("content type {} is not signedData", info.content_type));
    }
    let content = info.content.to_der().map_err(|e| e.to_string())?;
    SignedData::from_der(&content).map_err(|e| format!("bad SignedData: {e}"))
}

/// The certificate named by the signer's issuer and serial number, else
/// the first certificate in the set.
fn signing_certificate<'s>(signed: &'s SignedData, signer: &SignerInfo) -> Option<&'s Certificate> {
    let certs: Vec<&Certificate> = signed
        .certificates
        .iter()
        .flat_map(|set| set.0.iter())
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => Some(cert),
            _ => None,
        })
        .collect();

    let matched = match &signer.sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => certs.iter().copied().find(|cert| {
            cert.tbs_certificate.issuer == isn.issuer
                && cert.tbs_certificate.serial_number == isn.serial_number
        }),
        _ => None,
    };
    matched.or_else(|| certs.first().copied())
}

fn common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == ID_COMMON_NAME)
        .map(|atv| String::from_utf8_lossy(atv.value.value()).into_owned())
}

fn signed_attribute(signer: &SignerInfo, oid: ObjectIdentifier) -> Option<&Any> {
    signer
        .signed_attrs
        .as_ref()?
        .iter()
        .find(|attr| attr.oid == oid)?
        .values
        .iter()
        .next()
}

/// `signingTime` as RFC 3339 (`2024-01-15T10:30:00Z`).
fn signing_time(signer: &SignerInfo) -> Option<String> {
    let value = signed_attribute(signer, ID_SIGNING_TIME)?;
    let time = Time::from_der(&value.to_der().ok()?).ok()?;
    Some(time.to_date_time().to_string())
}

fn verify_digest(
    field: &str,
    source: &[u8],
    ranges: &[(usize, usize)],
    signer: &SignerInfo,
    digest: Option<DigestAlgorithm>,
) -> Result<(), PdfError> {
    let invalid = |message: &str| PdfError::SignatureInvalid {
        field: field.to_string(),
        message: message.to_string(),
    };

    let digest = digest.ok_or_else(|| invalid("unsupported digest algorithm"))?;
    if ranges.is_empty() {
        return Err(invalid("missing /ByteRange"));
    }
    let in_bounds = ranges
        .iter()
        .all(|&(offset, len)| offset.checked_add(len).is_some_and(|end| end <= source.len()));
    if !in_bounds {
        return Err(invalid("/ByteRange outside the document"));
    }

    let expected = signed_attribute(signer, ID_MESSAGE_DIGEST)
        .and_then(|value| OctetString::from_der(&value.to_der().ok()?).ok())
        .ok_or_else(|| invalid("missing messageDigest attribute"))?;
    let actual = digest.hash_ranges(source, ranges);
    if expected.as_bytes() != actual.as_slice() {
        return Err(invalid("digest mismatch"));
    }
    Ok(())
}
