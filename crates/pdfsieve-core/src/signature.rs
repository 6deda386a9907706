//! PDF digital signature record types.
//!
//! Provides [`SignatureRecord`] for the metadata declared by a PDF
//! signature field and its embedded PKCS#7 container, and
//! [`SignatureOptions`] to opt into digest verification.

use std::collections::BTreeMap;

/// Metadata extracted from one AcroForm signature field.
///
/// Values are computed once from the signature dictionary and the PKCS#7
/// blob in `/Contents`, and are not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignatureRecord {
    /// Fully-qualified field name (`parent.child`).
    pub field_name: String,
    /// Signer common name from the signing certificate (falls back to `/Name`).
    pub sign_name: Option<String>,
    /// `/Reason` entry of the signature dictionary.
    pub reason: Option<String>,
    /// `/Location` entry of the signature dictionary.
    pub location: Option<String>,
    /// `/ContactInfo` entry of the signature dictionary.
    pub contact_info: Option<String>,
    /// Signing time from the `signingTime` signed attribute, else `/M`.
    pub sign_date: Option<String>,
    /// Subject distinguished name of the signing certificate.
    pub subject: Option<String>,
    /// Issuer distinguished name of the signing certificate.
    pub issuer: Option<String>,
    /// Certificate serial number in decimal.
    pub serial_number: Option<String>,
    /// Digest algorithm named by the signer info (e.g. `SHA-256`).
    pub digest_algorithm: Option<String>,
    /// `/ByteRange` as `(offset, length)` pairs.
    pub byte_range: Vec<(usize, usize)>,
}

impl SignatureRecord {
    /// Create an empty record for the given field.
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Self::default()
        }
    }

    /// Flatten the record into the field-name → value mapping.
    ///
    /// Keys: `SignName`, `Reason`, `Location`, `SignDate`, `Subject`,
    /// `Issuer`, `SerialNumber`. Absent values are omitted.
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        let entries = [
            ("SignName", &self.sign_name),
            ("Reason", &self.reason),
            ("Location", &self.location),
            ("SignDate", &self.sign_date),
            ("Subject", &self.subject),
            ("Issuer", &self.issuer),
            ("SerialNumber", &self.serial_number),
        ];
        for (key, value) in entries {
            if let Some(v) = value {
                map.insert(key, v.clone());
            }
        }
        map
    }

    /// Total number of signed bytes covered by `/ByteRange`.
    pub fn signed_length(&self) -> usize {
        self.byte_range.iter().map(|(_, len)| len).sum()
    }
}

/// Options for signature extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureOptions {
    /// Recompute the digest over `/ByteRange` and compare it with the
    /// `messageDigest` signed attribute; mismatches fail the extraction.
    pub strict: bool,
}

impl SignatureOptions {
    /// Options with strict digest verification enabled.
    pub fn strict() -> Self {
        Self { strict: true }
    }
}
