//! Thin typed wrapper over the `scraper` tree.
//!
//! Everything above this module talks to [`Document`] and [`Element`] only,
//! so the parser can be swapped without touching the classification rules.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

pub struct Document {
    html: Html,
}

impl Document {
    /// Parse an HTML document. html5ever recovers from any malformed input,
    /// so this never fails.
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// All `<img>` elements in document order.
    pub fn images(&self) -> impl Iterator<Item = Element<'_>> {
        self.html.select(&IMG_SELECTOR).map(Element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a>(ElementRef<'a>);

impl<'a> Element<'a> {
    /// Lowercase tag name.
    pub fn tag(&self) -> &'a str {
        self.0.value().name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    pub fn id(&self) -> Option<&'a str> {
        self.0.value().id()
    }

    pub fn classes(&self) -> Vec<String> {
        self.0.value().classes().map(|c| c.to_string()).collect()
    }

    pub fn parent(&self) -> Option<Element<'a>> {
        self.0.parent().and_then(ElementRef::wrap).map(Element)
    }

    /// Enclosing elements, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Element<'a>> {
        self.0.ancestors().filter_map(ElementRef::wrap).map(Element)
    }

    #[cfg(test)]
    pub fn children(&self) -> impl Iterator<Item = Element<'a>> {
        self.0.children().filter_map(ElementRef::wrap).map(Element)
    }

    /// Nearest ancestor whose tag is one of `tags`.
    pub fn closest(&self, tags: &[&str]) -> Option<Element<'a>> {
        self.ancestors().find(|a| tags.contains(&a.tag()))
    }

    /// `<img>` descendants in document order.
    pub fn images(&self) -> impl Iterator<Item = Element<'a>> {
        self.0.select(&IMG_SELECTOR).map(Element)
    }
}
