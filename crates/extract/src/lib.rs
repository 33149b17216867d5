//! Metadata and text extraction from downloaded HTML and PDF documents.
//!
//! Deliberately forgiving: a page without a `<title>` or author simply yields
//! empty fields, and invalid UTF-8 is replaced with U+FFFD rather than
//! rejected. Bookmarks point at all sorts of half-broken documents.

mod consts;
mod pdf;

use scraper::{ElementRef, Html};
use tracing::instrument;

pub use crate::consts::MAX_TEXT_WORDS;
pub use crate::pdf::extract_pdf;

/// Metadata scraped from a single document. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub author: String,
    pub date: String,
    /// Whitespace-normalized document text, cut to [`MAX_TEXT_WORDS`] words.
    pub text: String,
}

/// Extract [`Metadata`] from raw HTML bytes.
///
/// ```
/// use linkstash_extract::extract_html;
/// let html = br#"<html><head><title> Hello </title><meta name="author" content="Ada"></head>
///     <body><p>Some   words</p><script>var x;</script></body></html>"#;
/// let metadata = extract_html(html);
/// assert_eq!(metadata.title, "Hello");
/// assert_eq!(metadata.author, "Ada");
/// assert_eq!(metadata.text, "Hello Some words");
/// ```
#[instrument(skip(html), fields(html_size = html.as_ref().len()))]
pub fn extract_html(html: impl AsRef<[u8]>) -> Metadata {
    let html = String::from_utf8_lossy(html.as_ref());
    let document = Html::parse_document(&html);
    Metadata {
        title: title(&document),
        author: named_meta(&document, "author"),
        date: named_meta(&document, "date"),
        text: text(&document, MAX_TEXT_WORDS),
    }
}

fn title(document: &Html) -> String {
    document
        .select(&consts::TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Content of the first `<meta name="…">` whose name matches, ignoring case.
fn named_meta(document: &Html, name: &str) -> String {
    document
        .select(&consts::NAMED_META_SELECTOR)
        .find(|el| el.value().attr("name").is_some_and(|n| n.trim().eq_ignore_ascii_case(name)))
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

fn text(document: &Html, max_words: usize) -> String {
    let visible = document.root_element().descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| consts::NON_TEXT_ELEMENTS.contains(&el.value().name()));
        (!hidden).then_some(&**text)
    });
    first_words(visible, max_words)
}

/// Whitespace-normalize `chunks` into at most `max_words` space-separated words.
pub(crate) fn first_words<'a>(chunks: impl IntoIterator<Item = &'a str>, max_words: usize) -> String {
    chunks.into_iter().flat_map(str::split_whitespace).take(max_words).collect::<Vec<_>>().join(" ")
}
