//! Heading ids, table of contents, and title extraction.

use std::collections::{HashMap, HashSet};

use crate::tree::TocEntry;

/// Collects heading anchors across one document.
#[derive(Debug, Default)]
pub(crate) struct HeadingState {
    extract_title: bool,
    title: Option<String>,
    toc: Vec<TocEntry>,
    id_counts: HashMap<String, usize>,
    used_ids: HashSet<String>,
}

impl HeadingState {
    pub(crate) fn new(extract_title: bool) -> Self {
        Self {
            extract_title,
            ..Self::default()
        }
    }

    /// Register a heading and return its unique id.
    ///
    /// With title extraction on, the first H1 becomes the title and is left
    /// out of the toc.
    pub(crate) fn register(&mut self, level: u8, text: &str) -> String {
        let id = self.unique_id(text);
        let text = text.trim();

        if self.extract_title && level == 1 && self.title.is_none() {
            self.title = Some(text.to_owned());
        } else {
            self.toc.push(TocEntry {
                level,
                title: text.to_owned(),
                id: id.clone(),
            });
        }
        id
    }

    fn unique_id(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base.push_str("section");
        }
        let count = self.id_counts.entry(base.clone()).or_default();
        let mut id = if *count == 0 {
            base.clone()
        } else {
            format!("{base}-{count}")
        };
        // a literal heading may already own the suffixed form
        while self.used_ids.contains(&id) {
            *count += 1;
            id = format!("{base}-{count}");
        }
        *count += 1;
        self.used_ids.insert(id.clone());
        id
    }

    pub(crate) fn finish(self) -> (Option<String>, Vec<TocEntry>) {
        (self.title, self.toc)
    }
}

/// URL-safe slug: lowercase ASCII alphanumerics, with runs of whitespace,
/// `-` and `_` collapsed to one `-`. Everything else is dropped.
///
/// # Example
///
/// ```
/// assert_eq!(folio_markup::slugify("  Hello, World_2 "), "hello-world-2");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}
