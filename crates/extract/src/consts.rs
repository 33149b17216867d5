use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(TITLE_SELECTOR, "title");
selector!(NAMED_META_SELECTOR, "meta[name][content]");

/// Elements whose text content is never prose.
pub(crate) const NON_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Word budget of [`Metadata::text`](crate::Metadata::text).
pub const MAX_TEXT_WORDS: usize = 2000;
