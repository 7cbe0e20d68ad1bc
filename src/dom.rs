//! Typed query layer over `scraper`.
//!
//! Page scrapers only talk to [`Query`] plus the free helpers below, so the
//! same extraction code runs against a whole document or a sub-tree of it.

use crate::SyncError;
use scraper::{ElementRef, Html, Selector};

pub trait Query {
    fn find_all(&self, selector: &Selector) -> Vec<ElementRef<'_>>;

    fn find_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.find_all(selector).into_iter().next()
    }
}

impl Query for Html {
    fn find_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.select(selector).collect()
    }
}

impl<'a> Query for ElementRef<'a> {
    fn find_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.select(selector).collect()
    }
}

pub fn attribute<'a>(node: ElementRef<'a>, name: &str) -> Option<&'a str> {
    node.value().attr(name)
}

/// Visible text of `node`, all descendant text nodes concatenated.
pub fn text(node: ElementRef<'_>) -> String {
    node.text().collect::<String>()
}

pub fn child_elements<'a>(node: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    node.children().filter_map(ElementRef::wrap)
}

/// Selector matching the element whose `id` attribute is exactly `id`.
pub fn id_selector(id: &str) -> Result<Selector, SyncError> {
    if id.is_empty() || id.contains('"') {
        return Err(SyncError::parse(format!("Invalid element id {:?}", id)));
    }
    Selector::parse(&format!(r#"[id="{}"]"#, id))
        .map_err(|_| SyncError::parse(format!("Invalid element id {:?}", id)))
}
