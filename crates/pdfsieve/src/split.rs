//! Single-page extraction and batch splitting.
//!
//! An extracted page is a fresh [`Document`] holding renumbered deep copies
//! of everything the page reaches: content streams, resources, and their
//! transitive dependencies. The source document is only read.

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pdfsieve_core::{PageOutcome, PdfError, SplitOptions, SplitReport};
use pdfsieve_parse::Document;
use pdfsieve_parse::lopdf::{self, Dictionary, Object, ObjectId, Stream, dictionary};
use pdfsieve_parse::lopdf::xref::XrefType;
use tempfile::{NamedTempFile, PersistError};

/// Page dictionary entries carried into an extracted page.
pub const PAGE_KEYS: [&[u8]; 11] = [
    b"Type",
    b"MediaBox",
    b"CropBox",
    b"BleedBox",
    b"TrimBox",
    b"ArtBox",
    b"Rotate",
    b"UserUnit",
    b"Resources",
    b"Contents",
    b"Group",
];

const CATALOG_ID: ObjectId = (1, 0);
const PAGES_ID: ObjectId = (2, 0);
const PAGE_ID: ObjectId = (3, 0);

/// Deep copy of objects from one document into another.
///
/// Every reached object gets the next free number in the target, in
/// discovery order. References into the page tree are cut to `null`.
struct Closure<'a> {
    source: &'a Document,
    target: &'a mut lopdf::Document,
    renumbered: HashMap<ObjectId, ObjectId>,
    next: u32,
}

impl<'a> Closure<'a> {
    fn new(source: &'a Document, target: &'a mut lopdf::Document, first_free: u32) -> Self {
        Self {
            source,
            target,
            renumbered: HashMap::new(),
            next: first_free,
        }
    }

    fn copy(&mut self, obj: &Object) -> Object {
        match obj {
            Object::Reference(id) => self.copy_reference(*id),
            Object::Array(items) => Object::Array(items.iter().map(|o| self.copy(o)).collect()),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(dict, &[])),
            // Length is recomputed from the copied bytes; an indirect
            // Length target is never reached
            Object::Stream(stream) => Object::Stream(Stream::new(
                self.copy_dict(&stream.dict, &[b"Length".as_slice()]),
                stream.content.clone(),
            )),
            direct => direct.clone(),
        }
    }

    fn copy_dict(&mut self, dict: &Dictionary, skip: &[&[u8]]) -> Dictionary {
        dict.iter()
            .filter(|(key, _)| !skip.contains(&key.as_slice()))
            .map(|(key, value)| {
                let value = if key.as_slice() == b"Parent" {
                    Object::Null
                } else {
                    self.copy(value)
                };
                (key.clone(), value)
            })
            .collect()
    }

    fn copy_reference(&mut self, id: ObjectId) -> Object {
        if let Some(&new_id) = self.renumbered.get(&id) {
            return Object::Reference(new_id);
        }
        let source = self.source.get_object(id);
        if source.is_null() {
            return Object::Null;
        }
        let is_page_tree = source
            .as_dict()
            .is_ok_and(|d| d.has_type(b"Page") || d.has_type(b"Pages"));
        if is_page_tree {
            tracing::debug!(object = id.0, "reference into page tree cut");
            return Object::Null;
        }

        let new_id = (self.next, 0);
        self.next += 1;
        // Registered before descending so cycles terminate
        self.renumbered.insert(id, new_id);
        let copy = self.copy(source);
        self.target.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}

/// Extract the 1-based page `page_number` into a new one-page document.
///
/// The result carries the source's version, a page dictionary restricted
/// to [`PAGE_KEYS`] with inherited attributes materialized, and a fresh
/// page tree and catalog. It serializes with a classic cross-reference
/// table.
///
/// # Errors
///
/// Returns [`PdfError::PageNotFound`] for a page number outside
/// `[1, page_count]`.
pub fn extract_page(doc: &Document, page_number: usize) -> Result<Document, PdfError> {
    let page = doc.page(page_number)?;
    let mut out = lopdf::Document::with_version(doc.version());
    out.reference_table.cross_reference_type = XrefType::CrossReferenceTable;

    let mut page_dict = Dictionary::new();
    {
        let mut closure = Closure::new(doc, &mut out, PAGE_ID.0 + 1);
        for key in PAGE_KEYS {
            if let Some(value) = page.get(doc, key) {
                let value = closure.copy(value);
                page_dict.set(key, value);
            }
        }
    }
    page_dict.set("Type", "Page");
    page_dict.set("Parent", PAGES_ID);

    out.objects.insert(PAGE_ID, Object::Dictionary(page_dict));
    out.objects.insert(
        PAGES_ID,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(PAGE_ID)],
            "Count" => 1,
        }),
    );
    out.objects.insert(
        CATALOG_ID,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => PAGES_ID,
        }),
    );
    out.max_id = out.objects.keys().map(|id| id.0).max().unwrap_or(0);
    out.trailer.set("Root", CATALOG_ID);

    tracing::debug!(page = page_number, objects = out.objects.len(), "page extracted");
    Ok(Document::from(out))
}

/// Extract a page and serialize it into `out`.
pub fn extract_page_to<W: Write>(
    doc: &Document,
    page_number: usize,
    out: &mut W,
) -> Result<(), PdfError> {
    let mut page = extract_page(doc, page_number)?;
    page.save_to(out)?;
    Ok(())
}

fn write_page(doc: &Document, page_number: usize, tmp: &mut NamedTempFile) -> Result<(), PdfError> {
    let mut writer = BufWriter::new(tmp.as_file_mut());
    extract_page_to(doc, page_number, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Remove a temporary file that will not be persisted.
fn discard(tmp: NamedTempFile) {
    let path = tmp.path().to_path_buf();
    if let Err(err) = tmp.close() {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove temporary file");
    }
}

fn split_one(
    doc: &Document,
    page_number: usize,
    out_dir: &Path,
    options: &SplitOptions,
) -> Result<PathBuf, PdfError> {
    let mut tmp = NamedTempFile::new_in(out_dir)?;
    if let Err(err) = write_page(doc, page_number, &mut tmp) {
        discard(tmp);
        return Err(err);
    }
    let target = out_dir.join(options.file_name(page_number));
    if let Err(PersistError { error, file }) = tmp.persist(&target) {
        discard(file);
        return Err(error.into());
    }
    Ok(target)
}

/// Write each requested page to `{out_dir}/{prefix}-{n}.pdf`.
///
/// Pages are independent: a failed page is recorded in the report and the
/// batch continues. Each page is written to a temporary file in `out_dir`
/// first and only renamed into place once complete, so no partial output
/// and no temporary files remain after the call.
pub fn split_pages(
    doc: &Document,
    page_numbers: &[usize],
    out_dir: &Path,
    options: &SplitOptions,
) -> SplitReport {
    let run = |&page_number: &usize| {
        let result = split_one(doc, page_number, out_dir, options);
        if let Err(err) = &result {
            tracing::warn!(page = page_number, error = %err, "page extraction failed");
        }
        PageOutcome {
            page_number,
            result,
        }
    };

    #[cfg(feature = "parallel")]
    let outcomes = {
        use rayon::prelude::*;
        page_numbers.par_iter().map(run).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes = page_numbers.iter().map(run).collect();

    SplitReport { outcomes }
}
