//! Shared fixtures for integration tests.
//!
//! Page fixtures are authored through lopdf. Signed fixtures are assembled
//! by hand so the `/ByteRange` and `/Contents` placeholders can be patched
//! in place after layout.

#![allow(dead_code)]

use lopdf::{Object, Stream, dictionary};

/// What to put on one fixture page.
#[derive(Debug, Clone, Default)]
pub struct PageSpec {
    pub content: Option<Vec<u8>>,
    pub font: bool,
    pub image: bool,
}

impl PageSpec {
    pub fn text(text: &str) -> Self {
        Self {
            content: Some(format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET").into_bytes()),
            font: true,
            image: false,
        }
    }

    pub fn raw(content: &[u8]) -> Self {
        Self {
            content: Some(content.to_vec()),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn image() -> Self {
        Self {
            content: Some(b"q 100 0 0 100 0 0 cm /Im0 Do Q".to_vec()),
            font: false,
            image: true,
        }
    }
}

/// A document with one page per spec.
pub fn multi_page_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0x80],
    ));

    let mut kids = Vec::new();
    for spec in pages {
        let mut resources = lopdf::Dictionary::new();
        if spec.font {
            resources.set("Font", dictionary! { "F1" => Object::Reference(font_id) });
        }
        if spec.image {
            resources.set("XObject", dictionary! { "Im0" => Object::Reference(image_id) });
        }
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources,
        };
        if let Some(content) = &spec.content {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.clone()));
            page.set("Contents", Object::Reference(content_id));
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Page 1 has a paragraph of text, page 2 is an empty page, page 3 is
/// marked non-empty by its producer with drawing state but no fonts.
pub fn three_page_scenario() -> Vec<u8> {
    multi_page_pdf(&[
        PageSpec::text("A paragraph of text that fills the first page."),
        PageSpec::empty(),
        PageSpec::raw(b"q\n1 0 0 1 0 0 cm\n0 0 0 rg\n0 0 0 RG\nQ\n"),
    ])
}

/// Number of entries in `dir`.
pub fn dir_entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[cfg(feature = "signatures")]
pub mod signing {
    //! Hand-assembled signed documents and PKCS#7 blobs.

    use std::str::FromStr;
    use std::time::Duration;

    use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
    use cms::content_info::{CmsVersion, ContentInfo};
    use cms::signed_data::{
        CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo,
        SignerInfos,
    };
    use der::asn1::{BitString, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
    use der::{Any, Encode};
    use sha2::{Digest, Sha256};
    use x509_cert::attr::Attribute;
    use x509_cert::certificate::{Certificate, TbsCertificate, Version};
    use x509_cert::name::Name;
    use x509_cert::serial_number::SerialNumber;
    use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
    use x509_cert::time::{Time, Validity};

    const SHA256: &str = "2.16.840.1.101.3.4.2.1";
    const RSA: &str = "1.2.840.113549.1.1.1";
    const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
    const CONTENTS_CAPACITY: usize = 4096;

    fn alg(oid: &str) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: ObjectIdentifier::new_unwrap(oid),
            parameters: None,
        }
    }

    fn utc(unix_secs: u64) -> UtcTime {
        UtcTime::from_unix_duration(Duration::from_secs(unix_secs)).unwrap()
    }

    /// Identity and signed attributes of a test signer.
    #[derive(Debug, Clone)]
    pub struct Signer {
        pub subject: String,
        pub issuer: String,
        pub serial: Vec<u8>,
        /// Seconds since the epoch for the `signingTime` attribute.
        pub signing_time: Option<u64>,
    }

    impl Signer {
        pub fn new(common_name: &str, serial: &[u8]) -> Self {
            Self {
                subject: format!("CN={common_name},O=Acme"),
                issuer: "CN=Acme CA,O=Acme".to_string(),
                serial: serial.to_vec(),
                // 2024-01-15T10:30:00Z
                signing_time: Some(1_705_314_600),
            }
        }

        fn certificate(&self) -> Certificate {
            let tbs = TbsCertificate {
                version: Version::V3,
                serial_number: SerialNumber::new(&self.serial).unwrap(),
                signature: alg(SHA256_WITH_RSA),
                issuer: Name::from_str(&self.issuer).unwrap(),
                validity: Validity {
                    not_before: Time::UtcTime(utc(1_700_000_000)),
                    not_after: Time::UtcTime(utc(1_800_000_000)),
                },
                subject: Name::from_str(&self.subject).unwrap(),
                subject_public_key_info: SubjectPublicKeyInfoOwned {
                    algorithm: alg(RSA),
                    subject_public_key: BitString::from_bytes(&[0x30, 0x00]).unwrap(),
                },
                issuer_unique_id: None,
                subject_unique_id: None,
                extensions: None,
            };
            Certificate {
                tbs_certificate: tbs,
                signature_algorithm: alg(SHA256_WITH_RSA),
                signature: BitString::from_bytes(&[0u8; 16]).unwrap(),
            }
        }

        /// A detached `SignedData` whose `messageDigest` is `digest`.
        ///
        /// The signature value is a placeholder; nothing here checks it.
        pub fn pkcs7(&self, digest: &[u8]) -> Vec<u8> {
            let cert = self.certificate();

            let mut attrs = vec![Attribute {
                oid: ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4"),
                values: SetOfVec::try_from(vec![
                    Any::encode_from(&OctetString::new(digest.to_vec()).unwrap()).unwrap(),
                ])
                .unwrap(),
            }];
            if let Some(secs) = self.signing_time {
                attrs.push(Attribute {
                    oid: ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5"),
                    values: SetOfVec::try_from(vec![Any::encode_from(&utc(secs)).unwrap()]).unwrap(),
                });
            }

            let signer_info = SignerInfo {
                version: CmsVersion::V1,
                sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                    issuer: cert.tbs_certificate.issuer.clone(),
                    serial_number: cert.tbs_certificate.serial_number.clone(),
                }),
                digest_alg: alg(SHA256),
                signed_attrs: Some(SetOfVec::try_from(attrs).unwrap()),
                signature_algorithm: alg(RSA),
                signature: OctetString::new(vec![0x5A; 32]).unwrap(),
                unsigned_attrs: None,
            };

            let signed_data = SignedData {
                version: CmsVersion::V1,
                digest_algorithms: SetOfVec::try_from(vec![alg(SHA256)]).unwrap(),
                encap_content_info: EncapsulatedContentInfo {
                    econtent_type: ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1"),
                    econtent: None,
                },
                certificates: Some(CertificateSet(
                    SetOfVec::try_from(vec![CertificateChoices::Certificate(cert)]).unwrap(),
                )),
                crls: None,
                signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info]).unwrap()),
            };

            ContentInfo {
                content_type: ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2"),
                content: Any::encode_from(&signed_data).unwrap(),
            }
            .to_der()
            .unwrap()
        }
    }

    /// How the `/Contents` of one signature field is filled.
    #[derive(Debug, Clone)]
    pub enum Blob {
        /// PKCS#7 over the real byte range digest.
        Signed(Signer),
        /// PKCS#7 carrying a wrong `messageDigest`.
        WrongDigest(Signer),
        /// Bytes that are not DER.
        Garbage,
    }

    /// One signature field of a fixture document.
    #[derive(Debug, Clone)]
    pub struct SigField {
        pub name: String,
        pub blob: Blob,
    }

    impl SigField {
        pub fn new(name: &str, blob: Blob) -> Self {
            Self {
                name: name.to_string(),
                blob,
            }
        }
    }

    /// A one-page document with the given signature fields.
    ///
    /// Every signature dictionary carries `/Name (Fallback Signer)`,
    /// `/Reason (Approval)`, `/Location (Seoul)` and
    /// `/M (D:20240101000000Z)`. Each `/ByteRange` covers the whole file
    /// except its own `/Contents` hex string; blobs are filled in field
    /// order, so only the last field's digest covers the final bytes.
    pub fn signed_pdf(fields: &[SigField]) -> Vec<u8> {
        let field_refs: Vec<String> = (0..fields.len()).map(|i| format!("{} 0 R", 5 + 2 * i)).collect();
        let mut objects: Vec<String> = vec![
            format!(
                "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [{}] /SigFlags 3 >> >>",
                field_refs.join(" ")
            ),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << >> >>"
                .to_string(),
            "<< /Length 3 >>\nstream\nq Q\nendstream".to_string(),
        ];
        let placeholder = "0".repeat(CONTENTS_CAPACITY * 2);
        for (i, field) in fields.iter().enumerate() {
            objects.push(format!(
                "<< /FT /Sig /T ({}) /V {} 0 R /Rect [0 0 0 0] /Subtype /Widget /P 3 0 R >>",
                field.name,
                6 + 2 * i
            ));
            objects.push(format!(
                "<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /adbe.pkcs7.detached \
                 /Name (Fallback Signer) /Reason (Approval) /Location (Seoul) /M (D:20240101000000Z) \
                 /ByteRange [0000000000 0000000000 0000000000 0000000000] /Contents <{placeholder}> >>"
            ));
        }

        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for off in &offsets {
            out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );

        // Locate each signature's placeholders, in file order
        let mut cursor = 0;
        for field in fields {
            let range_at = find(&out, b"/ByteRange [", cursor) + b"/ByteRange [".len();
            let contents_start = find(&out, b"/Contents <", range_at) + b"/Contents ".len();
            let contents_end = contents_start + CONTENTS_CAPACITY * 2 + 2;
            cursor = contents_end;

            let ranges = [0, contents_start, contents_end, out.len() - contents_end];
            let text = ranges.iter().map(|r| format!("{r:010}")).collect::<Vec<_>>().join(" ");
            out[range_at..range_at + text.len()].copy_from_slice(text.as_bytes());

            let mut hasher = Sha256::new();
            hasher.update(&out[..contents_start]);
            hasher.update(&out[contents_end..]);
            let digest = hasher.finalize().to_vec();

            let blob = match &field.blob {
                Blob::Signed(signer) => signer.pkcs7(&digest),
                Blob::WrongDigest(signer) => signer.pkcs7(&[0u8; 32]),
                Blob::Garbage => b"this is not a PKCS#7 container".to_vec(),
            };
            let hex: String = blob.iter().map(|b| format!("{b:02X}")).collect();
            assert!(hex.len() <= CONTENTS_CAPACITY * 2, "blob too large for placeholder");
            out[contents_start + 1..contents_start + 1 + hex.len()].copy_from_slice(hex.as_bytes());
        }
        out
    }

    fn find(haystack: &[u8], needle: &[u8], from: usize) -> usize {
        haystack[from..]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|p| p + from)
            .expect("placeholder present")
    }
}
