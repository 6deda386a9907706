//! In-memory PDF document.
//!
//! [`Document`] wraps a [`lopdf::Document`]. Loading checks lopdf's view
//! of the cross-reference data against the file. When that view cannot be
//! trusted, or stream lengths are wrong, lopdf is handed patched bytes
//! built from a linear scan of the file body (see [`crate::xref`]).

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::Path;

use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use pdfsieve_core::{ExtractWarning, ExtractWarningCode, PdfError, RepairOptions, RepairResult};

use crate::error::BackendError;
use crate::filters::decode_stream;
use crate::xref::{self, Patch, TRAILER_KEYS, find};

/// Page attributes that may be inherited from ancestor `Pages` nodes.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Maximum reference hops followed by [`Document::resolve`].
const MAX_RESOLVE_HOPS: usize = 32;

/// What missing objects resolve to.
pub static NULL: Object = Object::Null;

/// Resource categories of a page's `/Resources` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Font,
    XObject,
    ExtGState,
    ColorSpace,
    Pattern,
    Shading,
    Properties,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Font,
        ResourceKind::XObject,
        ResourceKind::ExtGState,
        ResourceKind::ColorSpace,
        ResourceKind::Pattern,
        ResourceKind::Shading,
        ResourceKind::Properties,
    ];

    /// Key of this category in a `/Resources` dictionary.
    pub fn key(self) -> &'static [u8] {
        match self {
            ResourceKind::Font => b"Font",
            ResourceKind::XObject => b"XObject",
            ResourceKind::ExtGState => b"ExtGState",
            ResourceKind::ColorSpace => b"ColorSpace",
            ResourceKind::Pattern => b"Pattern",
            ResourceKind::Shading => b"Shading",
            ResourceKind::Properties => b"Properties",
        }
    }
}

/// A parsed PDF document.
#[derive(Debug, Clone)]
pub struct Document {
    inner: lopdf::Document,
    repair: RepairResult,
    warnings: Vec<ExtractWarning>,
}

impl From<lopdf::Document> for Document {
    fn from(inner: lopdf::Document) -> Self {
        Self {
            inner,
            repair: RepairResult::new(),
            warnings: Vec::new(),
        }
    }
}

/// A leaf of the page tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRef {
    /// 1-based position in document order.
    pub number: usize,
    /// Object id of the page dictionary.
    pub id: ObjectId,
    /// Inheritable attributes the page lacks, taken from its nearest
    /// ancestor that defines them.
    pub inherited: Dictionary,
}

impl PageRef {
    /// An attribute of the page, own entries first, then inherited ones.
    pub fn get<'a>(&'a self, doc: &'a Document, key: &[u8]) -> Option<&'a Object> {
        doc.get_object(self.id)
            .as_dict()
            .ok()
            .and_then(|d| d.get(key).ok())
            .or_else(|| self.inherited.get(key).ok())
    }
}

/// Typed view over a page's resource dictionary.
#[derive(Debug, Clone, Copy)]
pub struct Resources<'a> {
    doc: &'a Document,
    dict: Option<&'a Dictionary>,
}

impl<'a> Resources<'a> {
    /// The resolved `/Resources` dictionary, if any.
    pub fn dict(&self) -> Option<&'a Dictionary> {
        self.dict
    }

    /// The sub-dictionary for `kind` (e.g. `/Font`).
    pub fn get(&self, kind: ResourceKind) -> Option<&'a Dictionary> {
        let entry = self.dict?.get(kind.key()).ok()?;
        self.doc.resolve_dict(entry)
    }

    /// Number of named entries of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.get(kind).map_or(0, Dictionary::len)
    }
}

impl Document {
    /// Read and parse a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let bytes = std::fs::read(path)?;
        Self::load_mem(&bytes)
    }

    /// Parse with default [`RepairOptions`].
    pub fn load_mem(bytes: &[u8]) -> Result<Self, BackendError> {
        Self::load_mem_with(bytes, &RepairOptions::default())
    }

    /// Parse `bytes`.
    ///
    /// Repairs are recorded in [`Document::repair_log`]; a rebuilt
    /// cross-reference table and every dropped or corrected object also
    /// leave a [`Document::warnings`] entry.
    ///
    /// # Errors
    ///
    /// [`BackendError::Parse`] when the header is missing or nothing can be
    /// recovered, [`BackendError::Unsupported`] for encrypted files.
    pub fn load_mem_with(bytes: &[u8], options: &RepairOptions) -> Result<Self, BackendError> {
        let data = strip_preamble(bytes)?;
        let raw_trailer = xref::last_trailer(data);
        if raw_trailer.as_ref().is_some_and(|t| t.get(b"Encrypt").is_some()) {
            return Err(encrypted());
        }

        let mut repair = RepairResult::new();
        let mut warnings = Vec::new();
        let scan = xref::scan(data);
        let mismatched = scan.length_mismatches(data);

        let loaded = lopdf::Document::load_mem(data);
        let xref_error = match &loaded {
            Ok(doc) => xref::verify(data, &doc.reference_table).err(),
            Err(err) => Some(BackendError::Parse(format!("cross-reference data unreadable: {err}"))),
        };
        let rebuild = match xref_error {
            None => false,
            Some(err) if options.rebuild_xref => {
                tracing::warn!(error = %err, "cross-reference data unusable, rebuilding from object headers");
                repair.record(format!("rebuilt cross-reference table: {err}"));
                warnings.push(ExtractWarning::with_code(ExtractWarningCode::XrefRebuilt, err.to_string()));
                true
            }
            Some(err) => return Err(err),
        };
        let fix_lengths = options.fix_stream_lengths && !mismatched.is_empty();

        let inner = match loaded {
            Ok(doc) if !rebuild && !fix_lengths => doc,
            loaded => {
                let mut patch = Patch::new(data);
                match &loaded {
                    Ok(doc) if !rebuild => {
                        for (&num, entry) in &doc.reference_table.entries {
                            if let XrefEntry::Normal { offset, generation } = *entry {
                                patch.keep((num, generation), offset as usize);
                            }
                        }
                    }
                    _ => {
                        for span in scan.latest().into_values() {
                            patch.keep(span.id, span.offset);
                        }
                    }
                }
                if fix_lengths {
                    for span in &mismatched {
                        let num = span.id.0;
                        tracing::warn!(object = num, "stream length does not reach endstream, using marker");
                        patch.rewrite_stream(span);
                        repair.record(format!("object {num}: stream length taken from endstream marker"));
                        warnings.push(
                            ExtractWarning::with_code(
                                ExtractWarningCode::MalformedObject,
                                "stream length taken from endstream marker",
                            )
                            .for_element(format!("object {num}")),
                        );
                    }
                }

                let mut carried: Vec<(&[u8], &[u8])> = Vec::new();
                if let Some(trailer) = &raw_trailer {
                    for key in TRAILER_KEYS {
                        if let Some(range) = trailer.get(key) {
                            carried.push((key, &data[range]));
                        }
                    }
                }
                let patched = patch.finish(&carried);
                let mut doc = lopdf::Document::load_mem(&patched)
                    .map_err(|e| BackendError::Parse(format!("repaired document unreadable: {e}")))?;
                recover_root(&mut doc)?;
                if rebuild {
                    repair.record("recovered trailer dictionary".to_string());
                }
                doc
            }
        };

        if inner.trailer.has(b"Encrypt") || inner.was_encrypted() {
            return Err(encrypted());
        }

        for (&num, entry) in &inner.reference_table.entries {
            let XrefEntry::Normal { generation, .. } = *entry else {
                continue;
            };
            if inner.objects.contains_key(&(num, generation)) {
                continue;
            }
            let reason = if mismatched.iter().any(|span| span.id.0 == num) {
                "stream length does not reach endstream"
            } else {
                "unparseable"
            };
            tracing::warn!(object = num, reason, "object dropped");
            repair.record(format!("object {num}: dropped ({reason})"));
            warnings.push(
                ExtractWarning::with_code(ExtractWarningCode::MalformedObject, format!("dropped ({reason})"))
                    .for_element(format!("object {num}")),
            );
        }

        Ok(Self {
            inner,
            repair,
            warnings,
        })
    }

    /// The underlying lopdf document.
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    pub fn into_inner(self) -> lopdf::Document {
        self.inner
    }

    /// PDF version from the header, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.inner.trailer
    }

    pub fn objects(&self) -> &BTreeMap<ObjectId, Object> {
        &self.inner.objects
    }

    /// Repairs performed while loading.
    pub fn repair_log(&self) -> &RepairResult {
        &self.repair
    }

    /// Warnings raised while loading.
    pub fn warnings(&self) -> &[ExtractWarning] {
        &self.warnings
    }

    /// The object with `id`, or `null` when there is none.
    pub fn get_object(&self, id: ObjectId) -> &Object {
        self.inner.objects.get(&id).unwrap_or(&NULL)
    }

    /// Follow references until a direct object. Dangling references and
    /// reference cycles yield `null`.
    pub fn resolve<'a>(&'a self, mut obj: &'a Object) -> &'a Object {
        for _ in 0..MAX_RESOLVE_HOPS {
            match obj {
                Object::Reference(id) => obj = self.get_object(*id),
                direct => return direct,
            }
        }
        &NULL
    }

    /// Resolve `obj` to a dictionary or a stream's dictionary.
    pub fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj) {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<&Dictionary, BackendError> {
        self.trailer()
            .get(b"Root")
            .ok()
            .and_then(|root| self.resolve_dict(root))
            .ok_or_else(|| BackendError::Parse("document has no catalog (/Root)".into()))
    }

    /// The `/Info` dictionary, if present.
    pub fn info(&self) -> Option<&Dictionary> {
        self.trailer().get(b"Info").ok().and_then(|i| self.resolve_dict(i))
    }

    /// Every page in document order.
    ///
    /// Cycles in the page tree are cut; kids that are not references to
    /// dictionaries are skipped.
    pub fn pages(&self) -> Result<Vec<PageRef>, BackendError> {
        let root = self
            .catalog()?
            .get(b"Pages")
            .and_then(Object::as_reference)
            .map_err(|_| BackendError::Parse("catalog has no /Pages reference".into()))?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(root, Dictionary::new())];

        while let Some((id, inherited)) = stack.pop() {
            if !visited.insert(id) {
                tracing::warn!(object = id.0, "page tree cycle, node skipped");
                continue;
            }
            let Ok(node) = self.get_object(id).as_dict() else {
                tracing::warn!(object = id.0, "page tree node is not a dictionary");
                continue;
            };

            let kids = node
                .get(b"Kids")
                .ok()
                .map(|k| self.resolve(k))
                .and_then(|k| k.as_array().ok());
            let is_leaf = node.has_type(b"Page") || (kids.is_none() && !node.has_type(b"Pages"));
            if is_leaf {
                let inherited = INHERITABLE_KEYS
                    .iter()
                    .filter(|key| !node.has(key))
                    .filter_map(|key| inherited.get(key).ok().map(|v| (key.to_vec(), v.clone())))
                    .collect();
                pages.push(PageRef {
                    number: pages.len() + 1,
                    id,
                    inherited,
                });
                continue;
            }

            let mut passed_down = inherited;
            for key in INHERITABLE_KEYS {
                if let Ok(value) = node.get(key) {
                    passed_down.set(key, value.clone());
                }
            }
            // Reverse so the first kid is popped first
            for kid in kids.into_iter().flatten().rev() {
                match kid.as_reference() {
                    Ok(kid_id) => stack.push((kid_id, passed_down.clone())),
                    Err(_) => tracing::warn!(parent = id.0, "direct page tree kid skipped"),
                }
            }
        }
        Ok(pages)
    }

    /// Number of pages.
    pub fn page_count(&self) -> Result<usize, BackendError> {
        Ok(self.pages()?.len())
    }

    /// The 1-based page `number`.
    pub fn page(&self, number: usize) -> Result<PageRef, BackendError> {
        let mut pages = self.pages()?;
        let page_count = pages.len();
        if number == 0 || number > page_count {
            return Err(PdfError::PageNotFound {
                page: number,
                page_count,
            }
            .into());
        }
        Ok(pages.swap_remove(number - 1))
    }

    /// The content streams of a page in drawing order. Entries that do not
    /// resolve to a stream are skipped.
    pub fn content_streams<'a>(&'a self, page: &'a PageRef) -> Vec<&'a Stream> {
        let Some(contents) = page.get(self, b"Contents") else {
            return Vec::new();
        };
        let entries: Vec<&Object> = match self.resolve(contents) {
            Object::Array(items) => items.iter().map(|o| self.resolve(o)).collect(),
            other => vec![other],
        };
        entries
            .into_iter()
            .filter_map(|obj| match obj {
                Object::Stream(stream) => Some(stream),
                Object::Null => None,
                other => {
                    tracing::warn!(page = page.number, kind = other.enum_variant(), "content entry is not a stream");
                    None
                }
            })
            .collect()
    }

    /// Decoded content of a page. Streams are joined with a newline; a page
    /// without `/Contents` yields an empty buffer.
    pub fn page_content(&self, page: &PageRef) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        let mut written = false;
        for stream in self.content_streams(page) {
            if written {
                out.push(b'\n');
            }
            out.extend_from_slice(&decode_stream(stream)?);
            written = true;
        }
        Ok(out)
    }

    /// Total decoded size of a page's content streams, without separators.
    /// A stream whose filters cannot be decoded counts with its raw size.
    pub fn content_length(&self, page: &PageRef) -> usize {
        self.content_streams(page)
            .into_iter()
            .map(|stream| match decode_stream(stream) {
                Ok(data) => data.len(),
                Err(err) => {
                    tracing::warn!(page = page.number, error = %err, "content stream not decodable, using raw length");
                    stream.content.len()
                }
            })
            .sum()
    }

    /// Resources of a page (own or inherited).
    pub fn page_resources<'a>(&'a self, page: &'a PageRef) -> Resources<'a> {
        Resources {
            doc: self,
            dict: page.get(self, b"Resources").and_then(|r| self.resolve_dict(r)),
        }
    }

    /// A text string entry of `dict`, resolved and decoded.
    ///
    /// Strings follow lopdf's text string rules (UTF-16BE or UTF-8 with a
    /// byte order mark, PDFDocEncoding otherwise). Names are accepted too.
    pub fn text_string(&self, dict: &Dictionary, key: &[u8]) -> Option<String> {
        match self.resolve(dict.get(key).ok()?) {
            obj @ Object::String(bytes, _) => lopdf::decode_text_string(obj)
                .ok()
                .or_else(|| Some(String::from_utf8_lossy(bytes).into_owned())),
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }

    /// Serialize with a fresh cross-reference table.
    pub fn save_to<W: Write>(&mut self, out: &mut W) -> Result<(), BackendError> {
        self.inner.save_to(out)?;
        Ok(())
    }

    /// Serialize into a buffer, leaving `self` untouched.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BackendError> {
        let mut copy = self.inner.clone();
        let mut out = Vec::new();
        copy.save_to(&mut out)?;
        Ok(out)
    }
}

fn encrypted() -> BackendError {
    BackendError::Unsupported("encrypted documents (/Encrypt)".into())
}

/// The file from its `%PDF-` header on; the header must sit in the first
/// 1024 bytes.
fn strip_preamble(bytes: &[u8]) -> Result<&[u8], BackendError> {
    let head = &bytes[..bytes.len().min(1024)];
    let pos = find(head, b"%PDF-", 0).ok_or_else(|| BackendError::Parse("missing %PDF- header".into()))?;
    Ok(&bytes[pos..])
}

/// Make sure the trailer names a catalog: take `/Root` from the last
/// cross-reference stream dictionary that has a usable one, else point it
/// at the first `/Type /Catalog` object.
fn recover_root(doc: &mut lopdf::Document) -> Result<(), BackendError> {
    fn names_dict(doc: &lopdf::Document, root: Option<&Object>) -> bool {
        root.and_then(|r| r.as_reference().ok())
            .and_then(|id| doc.objects.get(&id))
            .is_some_and(|o| o.as_dict().is_ok())
    }

    let view: &lopdf::Document = doc;
    if names_dict(view, view.trailer.get(b"Root").ok()) {
        return Ok(());
    }

    let from_stream = view
        .objects
        .values()
        .filter_map(|o| o.as_stream().ok())
        .filter(|s| s.dict.has_type(b"XRef") && names_dict(view, s.dict.get(b"Root").ok()))
        .last()
        .map(|s| s.dict.clone());
    if let Some(dict) = from_stream {
        for key in TRAILER_KEYS {
            if let Ok(value) = dict.get(key) {
                doc.trailer.set(key, value.clone());
            }
        }
        return Ok(());
    }

    let catalog = doc
        .objects
        .iter()
        .find(|(_, o)| o.as_dict().is_ok_and(|d| d.has_type(b"Catalog")))
        .map(|(id, _)| *id)
        .ok_or_else(|| BackendError::Parse("no trailer and no catalog object found".into()))?;
    tracing::warn!(object = catalog.0, "trailer has no usable /Root, using first catalog");
    doc.trailer.set("Root", Object::Reference(catalog));
    Ok(())
}
