//! PDF metadata comes from the document information dictionary; the text is
//! whatever `pdf-extract` can lay out from the page content streams.

use crate::{MAX_TEXT_WORDS, Metadata, first_words};
use lopdf::{Dictionary, Document};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::instrument;

/// Extract [`Metadata`] from raw PDF bytes.
///
/// Title, author and date come from the `/Info` dictionary (`/Title`,
/// `/Author`, `/CreationDate`), with the date left in its raw PDF form. A
/// document that can't be parsed yields empty metadata; one whose text can't
/// be extracted keeps its metadata with empty text.
#[instrument(skip(pdf), fields(pdf_size = pdf.as_ref().len()))]
pub fn extract_pdf(pdf: impl AsRef<[u8]>) -> Metadata {
    let pdf = pdf.as_ref();
    let document = match Document::load_mem(pdf) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(error = %err, "Could not parse PDF");
            return Metadata::default();
        },
    };
    let mut metadata = info(&document).map(describe).unwrap_or_default();
    metadata.text = text(pdf);
    metadata
}

fn info(document: &Document) -> Option<&Dictionary> {
    let info = document.trailer.get(b"Info").ok()?;
    let (_, info) = document.dereference(info).ok()?;
    info.as_dict().ok()
}

fn describe(info: &Dictionary) -> Metadata {
    Metadata {
        title: field(info, b"Title"),
        author: field(info, b"Author"),
        date: field(info, b"CreationDate"),
        text: String::new(),
    }
}

fn field(info: &Dictionary, key: &[u8]) -> String {
    info.get(key)
        .and_then(|value| value.as_str())
        .map(|bytes| decode_text(bytes).trim().to_string())
        .unwrap_or_default()
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when marked with a byte order
/// mark, otherwise one byte per character.
fn decode_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().copied().map(char::from).collect()
}

fn text(pdf: &[u8]) -> String {
    // pdf-extract panics on some malformed content streams.
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(pdf))) {
        Ok(Ok(text)) => first_words([text.as_str()], MAX_TEXT_WORDS),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Could not extract PDF text");
            String::new()
        },
        Err(_) => {
            tracing::warn!("PDF text extraction panicked");
            String::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, StringFormat, dictionary};
    use rstest::rstest;

    fn document(info: Option<Dictionary>, body: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(body)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(info) = info {
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_document_info() {
        let info = dictionary! {
            "Title" => Object::string_literal(" Attention Is All You Need "),
            "Author" => Object::string_literal("Vaswani et al."),
            "CreationDate" => Object::string_literal("D:20170612000000Z"),
        };
        let metadata = extract_pdf(document(Some(info), "Hello transformer"));
        assert_eq!(metadata.title, "Attention Is All You Need");
        assert_eq!(metadata.author, "Vaswani et al.");
        assert_eq!(metadata.date, "D:20170612000000Z");
        assert!(metadata.text.contains("Hello"), "{:?}", metadata.text);
    }

    #[test]
    fn test_missing_info_is_empty() {
        let metadata = extract_pdf(document(None, "Untitled"));
        assert_eq!(metadata.title, "");
        assert_eq!(metadata.author, "");
        assert_eq!(metadata.date, "");
    }

    #[test]
    fn test_utf16_title() {
        let mut title = vec![0xFE, 0xFF];
        title.extend("Café".encode_utf16().flat_map(u16::to_be_bytes));
        let info = dictionary! { "Title" => Object::String(title, StringFormat::Hexadecimal) };
        assert_eq!(extract_pdf(document(Some(info), "x")).title, "Café");
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"%PDF-1.7\ntruncated".as_slice())]
    #[case(b"<html>not a pdf</html>".as_slice())]
    fn test_unparseable_is_empty(#[case] bytes: &[u8]) {
        assert_eq!(extract_pdf(bytes), Metadata::default());
    }

    #[rstest]
    #[case(b"plain".as_slice(), "plain")]
    #[case(b"caf\xe9".as_slice(), "caf\u{e9}")]
    #[case(b"\xef\xbb\xbfna\xc3\xafve".as_slice(), "na\u{ef}ve")]
    fn test_decode_text(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(decode_text(bytes), expected);
    }
}
