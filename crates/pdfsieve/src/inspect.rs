//! Blank-page classification from a page's resources and content length.

use pdfsieve_core::{ClassifyOptions, PageClass, PageClassification, Rationale};
use pdfsieve_parse::{Document, PageRef, ResourceKind};

/// Classify one page.
///
/// The checks short-circuit in order: a non-empty `/Font` resource makes
/// the page [`PageClass::HasFont`], a non-empty `/XObject` resource makes it
/// [`PageClass::HasImage`], and otherwise the decoded content length is
/// compared against [`ClassifyOptions::blank_threshold`]. The length is the
/// raw byte count summed over the page's content streams; whitespace is not
/// stripped and operators are not parsed. A stream whose filter cannot be
/// decoded counts with its stored size, so one such page never fails a
/// whole document.
pub fn classify_page(doc: &Document, page: &PageRef, options: &ClassifyOptions) -> PageClassification {
    let resources = doc.page_resources(page);

    let (class, rationale) = match (
        resources.count(ResourceKind::Font),
        resources.count(ResourceKind::XObject),
    ) {
        (fonts, _) if fonts > 0 => (PageClass::HasFont, Rationale::FontPresent { count: fonts }),
        (_, xobjects) if xobjects > 0 => (
            PageClass::HasImage,
            Rationale::ImagePresent { count: xobjects },
        ),
        _ => {
            let bytes = doc.content_length(page);
            let threshold = options.blank_threshold;
            let class = if bytes <= threshold {
                PageClass::Blank
            } else {
                PageClass::NonBlankContent
            };
            (class, Rationale::ContentLength { bytes, threshold })
        }
    };

    tracing::debug!(page = page.number, %class, %rationale, "page classified");
    PageClassification {
        page_number: page.number,
        class,
        rationale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfsieve_parse::lopdf::{self, Dictionary, Object, Stream, dictionary};

    /// One page with the given resources and contents, built in memory.
    fn single_page(resources: Dictionary, contents: Vec<Vec<u8>>) -> Document {
        let mut doc = lopdf::Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources,
        };
        if !contents.is_empty() {
            let ids: Vec<Object> = contents
                .into_iter()
                .map(|c| Object::Reference(doc.add_object(Stream::new(Dictionary::new(), c))))
                .collect();
            page.set("Contents", ids);
        }
        let page_id = doc.add_object(page);
        doc.objects.insert(
            pages_id,
            Object::from(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        Document::from(doc)
    }

    fn classify(doc: &Document) -> PageClassification {
        let page = doc.page(1).unwrap();
        classify_page(doc, &page, &ClassifyOptions::default())
    }

    #[test]
    fn font_wins_even_with_empty_content() {
        let resources = dictionary! { "Font" => dictionary! { "F1" => Object::Reference((9, 0)) } };
        let doc = single_page(resources, vec![Vec::new()]);
        let c = classify(&doc);
        assert_eq!(c.class, PageClass::HasFont);
        assert_eq!(c.rationale, Rationale::FontPresent { count: 1 });
    }

    #[test]
    fn xobject_is_image() {
        let resources = dictionary! { "XObject" => dictionary! { "Im0" => Object::Reference((9, 0)) } };
        let doc = single_page(resources, Vec::new());
        assert_eq!(classify(&doc).class, PageClass::HasImage);
    }

    #[test]
    fn empty_font_dictionary_does_not_count() {
        let resources = dictionary! { "Font" => Dictionary::new() };
        let doc = single_page(resources, vec![b"q Q".to_vec()]);
        assert_eq!(classify(&doc).class, PageClass::Blank);
    }

    #[test]
    fn threshold_is_inclusive() {
        let at = single_page(Dictionary::new(), vec![vec![b' '; 20]]);
        assert_eq!(classify(&at).class, PageClass::Blank);

        let over = single_page(Dictionary::new(), vec![vec![b' '; 21]]);
        let c = classify(&over);
        assert_eq!(c.class, PageClass::NonBlankContent);
        assert_eq!(c.rationale.to_string(), "byte-length 21 > 20");
    }

    #[test]
    fn stream_separators_do_not_count_toward_threshold() {
        // 10 + 10 bytes across two streams sits exactly on the threshold
        let at = single_page(Dictionary::new(), vec![vec![b' '; 10], vec![b' '; 10]]);
        let c = classify(&at);
        assert_eq!(c.class, PageClass::Blank);
        assert_eq!(c.rationale, Rationale::ContentLength { bytes: 20, threshold: 20 });

        let over = single_page(Dictionary::new(), vec![vec![b' '; 10], vec![b' '; 11]]);
        assert_eq!(classify(&over).class, PageClass::NonBlankContent);
    }

    #[test]
    fn missing_contents_is_blank() {
        let doc = single_page(Dictionary::new(), Vec::new());
        let c = classify(&doc);
        assert!(c.is_blank());
        assert_eq!(
            c.rationale,
            Rationale::ContentLength {
                bytes: 0,
                threshold: 20
            }
        );
    }

    #[test]
    fn custom_threshold() {
        let doc = single_page(Dictionary::new(), vec![b"0 0 m 10 10 l S".to_vec()]);
        let page = doc.page(1).unwrap();
        let strict = classify_page(&doc, &page, &ClassifyOptions::with_threshold(4));
        assert_eq!(strict.class, PageClass::NonBlankContent);
    }
}
