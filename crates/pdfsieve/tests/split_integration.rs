//! Page extraction and batch splitting against real files on disk.

mod common;

use common::{PageSpec, dir_entries, multi_page_pdf, three_page_scenario};
use pdfsieve::{ClassifyOptions, PdfError, Pdf, SplitOptions};

#[test]
fn extracted_page_reopens_with_same_classification() {
    let pdf = Pdf::open(&three_page_scenario()).unwrap();
    let opts = ClassifyOptions::default();
    let source = pdf.classify_pages(&opts);

    for n in 1..=3 {
        let bytes = pdf.extract_page_bytes(n).unwrap();
        let single = Pdf::open(&bytes).unwrap();
        assert_eq!(single.page_count(), 1);
        assert!(!single.repair_log().has_repairs());
        assert_eq!(single.page_content(1).unwrap(), pdf.page_content(n).unwrap());
        let class = single.classify_pages(&opts)[0].class;
        assert_eq!(class, source[n - 1].class, "page {n}");
    }
}

#[test]
fn extracted_page_reads_back_with_lopdf() {
    let pdf = Pdf::open(&multi_page_pdf(&[PageSpec::text("a"), PageSpec::image()])).unwrap();
    let bytes = pdf.extract_page_bytes(2).unwrap();

    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let image = doc
        .get_object(xobjects.get(b"Im0").unwrap().as_reference().unwrap())
        .unwrap()
        .as_stream()
        .unwrap();
    assert_eq!(image.content, vec![0x80]);
}

#[test]
fn extraction_is_idempotent() {
    let pdf = Pdf::open(&multi_page_pdf(&[PageSpec::text("once"), PageSpec::empty()])).unwrap();
    let first = pdf.extract_page_bytes(1).unwrap();
    let again = Pdf::open(&first).unwrap().extract_page_bytes(1).unwrap();
    assert_eq!(first, again);
}

#[test]
fn unreferenced_objects_are_not_copied() {
    // The shared font and image objects exist in the source for every page
    let pdf = Pdf::open(&multi_page_pdf(&[PageSpec::empty(), PageSpec::text("x")])).unwrap();
    let blank = pdf.extract_page(1).unwrap();
    // Catalog, page tree, page
    assert_eq!(blank.objects().len(), 3);
    let text = pdf.extract_page(2).unwrap();
    // Plus content and font
    assert_eq!(text.objects().len(), 5);
}

#[test]
fn split_writes_one_file_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = Pdf::open(&three_page_scenario()).unwrap();

    let report = pdf.split_pages(&[1, 2, 3], dir.path(), &SplitOptions::default());
    assert!(report.is_complete());
    let written: Vec<usize> = report.succeeded().map(|(n, _)| n).collect();
    assert_eq!(written, vec![1, 2, 3]);
    for n in 1..=3 {
        let path = dir.path().join(format!("page-{n}.pdf"));
        let single = Pdf::open_file(&path).unwrap();
        assert_eq!(single.page_count(), 1);
    }
    assert_eq!(dir_entries(dir.path()), 3);
}

#[test]
fn failed_page_leaves_no_temporary_files() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = Pdf::open(&three_page_scenario()).unwrap();

    let report = pdf.split_pages(&[1, 9, 3], dir.path(), &SplitOptions::with_prefix("scan"));
    assert!(!report.is_complete());
    let failed: Vec<(usize, &PdfError)> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, 9);
    assert!(matches!(failed[0].1, PdfError::PageNotFound { page: 9, page_count: 3 }));

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["scan-1.pdf", "scan-3.pdf"]);
}

#[test]
fn missing_output_directory_fails_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-there");
    let pdf = Pdf::open(&three_page_scenario()).unwrap();

    let report = pdf.split_pages(&[1, 2], &missing, &SplitOptions::default());
    assert_eq!(report.failed().count(), 2);
    assert!(report.failed().all(|(_, err)| matches!(err, PdfError::IoError(_))));
    assert_eq!(dir_entries(dir.path()), 0);
}
