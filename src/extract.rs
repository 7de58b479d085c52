//! Best-effort text extraction for uploaded files.
//!
//! Extraction never fails an upload: corrupt documents come back as
//! [`Extraction::Failed`], which still has a persisted string form.

use std::panic::{AssertUnwindSafe, catch_unwind};

use lopdf::Document as LopdfDocument;

/// Pages read from a paginated document, regardless of its length.
pub const PDF_MAX_PAGES: usize = 20;

/// Persisted text for a document whose parse failed.
pub const EXTRACTION_FAILED_TEXT: &str = "Error extracting text";

pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(String),
    /// Format carries no extractable text (images, unknown binaries).
    Empty,
    Failed { reason: String },
}

impl Extraction {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The string stored on a vault record. Never absent.
    pub fn into_stored_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Empty => String::new(),
            Self::Failed { .. } => EXTRACTION_FAILED_TEXT.to_string(),
        }
    }
}

/// Dispatch on mime type.
pub fn extract(bytes: &[u8], mime: &str) -> Extraction {
    let mime = mime.trim().to_ascii_lowercase();
    if mime == PDF_MIME {
        extract_pdf(bytes)
    } else if mime.starts_with("text/") {
        Extraction::Text(String::from_utf8_lossy(bytes).into_owned())
    } else {
        Extraction::Empty
    }
}

pub fn extract_pdf(bytes: &[u8]) -> Extraction {
    let outcome = catch_unwind(AssertUnwindSafe(|| pdf_pages_text(bytes)));
    let result = match outcome {
        Ok(result) => result,
        Err(_) => Err("pdf parser panicked".to_string()),
    };
    match result {
        Ok(text) => Extraction::Text(text),
        Err(reason) => {
            tracing::warn!(target: "studyvault::extract", %reason, "PDF extraction failed");
            Extraction::Failed { reason }
        }
    }
}

fn pdf_pages_text(bytes: &[u8]) -> Result<String, String> {
    let mut document =
        LopdfDocument::load_mem(bytes).map_err(|err| format!("failed to load PDF: {err}"))?;

    if document.is_encrypted() && document.decrypt("").is_err() {
        return Err("cannot decrypt password-protected PDF".to_string());
    }
    let () = document.decompress();

    let mut page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();
    if page_numbers.len() > PDF_MAX_PAGES {
        tracing::debug!(
            target: "studyvault::extract",
            pages = page_numbers.len(),
            limit = PDF_MAX_PAGES,
            "truncating PDF page range"
        );
        page_numbers.truncate(PDF_MAX_PAGES);
    }

    let mut full_text = String::new();
    for (idx, page) in page_numbers.iter().enumerate() {
        let raw = document
            .extract_text(&[*page])
            .map_err(|err| format!("failed to extract page {page}: {err}"))?;
        let words: Vec<&str> = raw.split_whitespace().collect();
        full_text.push_str(&format!(" [Page {}] {}", idx + 1, words.join(" ")));
    }
    Ok(full_text)
}

/// Mime type guessed from a file name's extension.
pub fn mime_from_file_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MIME,
        "txt" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// Builds an in-memory PDF whose page N shows "page N body".
    pub(crate) fn sample_pdf(pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for n in 1..=pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("page {n} body"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn plain_text_passes_through() {
        let out = extract(b"Newton's laws\nF = ma", "text/plain");
        assert_eq!(out, Extraction::Text("Newton's laws\nF = ma".to_string()));
    }

    #[test]
    fn images_yield_empty() {
        let out = extract(&[0x89, b'P', b'N', b'G'], "image/png");
        assert_eq!(out, Extraction::Empty);
        assert_eq!(out.into_stored_text(), "");
    }

    #[test]
    fn corrupt_pdf_yields_failure_sentinel() {
        let out = extract(b"%PDF-1.7 this is not really a pdf", PDF_MIME);
        assert!(out.is_failed());
        assert_eq!(out.into_stored_text(), EXTRACTION_FAILED_TEXT);
    }

    #[test]
    fn empty_pdf_bytes_do_not_panic() {
        assert!(extract(&[], PDF_MIME).is_failed());
    }

    #[test]
    fn pdf_pages_are_marked_in_order() {
        let out = extract(&sample_pdf(3), PDF_MIME);
        let text = out.text().expect("text");
        let first = text.find("[Page 1]").unwrap();
        let second = text.find("[Page 2]").unwrap();
        let third = text.find("[Page 3]").unwrap();
        assert!(first < second && second < third);
        assert!(!text.contains("[Page 4]"));
    }

    #[test]
    fn pdf_is_capped_at_twenty_pages() {
        let text = extract(&sample_pdf(25), PDF_MIME).into_stored_text();
        for n in 1..=20 {
            assert!(text.contains(&format!("[Page {n}]")), "missing page {n}");
        }
        for n in 21..=25 {
            assert!(!text.contains(&format!("[Page {n}]")), "unexpected page {n}");
        }
    }

    #[test]
    fn mime_type_is_case_insensitive() {
        assert!(extract(b"garbage", "Application/PDF").is_failed());
        assert!(matches!(extract(b"x", "TEXT/markdown"), Extraction::Text(_)));
    }

    #[test]
    fn guesses_mime_from_extension() {
        assert_eq!(mime_from_file_name("Notes.PDF"), PDF_MIME);
        assert_eq!(mime_from_file_name("summary.md"), "text/markdown");
        assert_eq!(mime_from_file_name("README"), "application/octet-stream");
    }
}
