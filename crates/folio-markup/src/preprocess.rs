//! Splits a raw document into body and side tables.
//!
//! Three things are peeled off before block parsing:
//! - a leading `---` front matter block (parsed as YAML metadata)
//! - a trailing `:::assets` manifest block
//! - footnote definitions (`[^id]: text` plus indented continuation lines)

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::assets::AssetManifest;
use crate::fence::FenceTracker;

static FOOTNOTE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:[ \t]*(.*)$").unwrap());

static ASSETS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A:::assets[ \t]*\n(.*)\n:::[ \t]*\z").unwrap());

/// Footnote definitions in definition order. The first definition of an id
/// wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FootnoteTable {
    entries: Vec<(String, String)>,
}

impl FootnoteTable {
    /// Raw (unparsed) text of a definition.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, text)| text.as_str())
    }

    /// 1-based definition number of `id`.
    #[must_use]
    pub fn number(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing == id)
            .map(|index| index + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, text)| (id.as_str(), text.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, id: &str, text: String) {
        if self.get(id).is_none() {
            self.entries.push((id.to_owned(), text));
        }
    }
}

/// Output of [`preprocess`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Preprocessed {
    pub body: String,
    pub manifest: AssetManifest,
    pub footnotes: FootnoteTable,
    pub metadata: BTreeMap<String, String>,
}

/// Split a raw document. Never fails: malformed side blocks are ignored or
/// left in the body.
///
/// # Example
///
/// ```
/// use folio_markup::preprocess;
///
/// let doc = preprocess("---\ntitle: Hi\n---\nSee[^1].\n\n[^1]: A note.\n:::assets\n{\"a1\":\"https://x/y.png\"}\n:::");
/// assert_eq!(doc.body, "See[^1].\n\n");
/// assert_eq!(doc.metadata["title"], "Hi");
/// assert_eq!(doc.footnotes.get("1"), Some("A note."));
/// assert_eq!(doc.manifest.get("a1"), Some("https://x/y.png"));
/// ```
#[must_use]
pub fn preprocess(raw: &str) -> Preprocessed {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let text = text.replace("\r\n", "\n");

    let (metadata, rest) = split_front_matter(&text);
    let (rest, manifest) = split_manifest(rest);
    let (body, footnotes) = extract_footnotes(rest);

    Preprocessed {
        body,
        manifest,
        footnotes,
        metadata,
    }
}

fn split_front_matter(text: &str) -> (BTreeMap<String, String>, &str) {
    let mut offsets = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offsets.push((offset, line));
        offset += line.len();
    }
    let is_delimiter = |line: &str| line.trim_end() == "---";

    if offsets.len() < 3 || !is_delimiter(offsets[0].1) {
        return (BTreeMap::new(), text);
    }
    let Some(&(close_start, close_line)) = offsets[1..].iter().find(|(_, l)| is_delimiter(l))
    else {
        return (BTreeMap::new(), text);
    };

    let yaml = &text[offsets[0].1.len()..close_start];
    let rest = &text[close_start + close_line.len()..];
    (parse_metadata(yaml), rest)
}

fn parse_metadata(yaml: &str) -> BTreeMap<String, String> {
    let value = match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("ignoring malformed front matter: {e}");
            return BTreeMap::new();
        }
    };
    let Some(mapping) = value.as_mapping() else {
        return BTreeMap::new();
    };
    mapping
        .iter()
        .filter_map(|(key, value)| {
            let key = key.as_str()?.to_owned();
            let value = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}

fn split_manifest(text: &str) -> (&str, AssetManifest) {
    let trimmed = text.trim_end();
    let Some(start) = trimmed.rfind(":::assets") else {
        return (text, AssetManifest::new());
    };
    if start > 0 && !trimmed[..start].ends_with('\n') {
        return (text, AssetManifest::new());
    }
    match ASSETS_BLOCK.captures(&trimmed[start..]) {
        Some(caps) => (&text[..start], AssetManifest::from_json(&caps[1])),
        None => (text, AssetManifest::new()),
    }
}

fn is_continuation(line: &str) -> bool {
    (line.starts_with("  ") || line.starts_with('\t')) && !line.trim().is_empty()
}

fn extract_footnotes(text: &str) -> (String, FootnoteTable) {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut body = Vec::with_capacity(lines.len());
    let mut table = FootnoteTable::default();
    let mut tracker = FenceTracker::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if tracker.update(line) || tracker.in_fence() {
            body.push(line);
            i += 1;
            continue;
        }
        let Some(caps) = FOOTNOTE_DEF.captures(line) else {
            body.push(line);
            i += 1;
            continue;
        };

        let id = caps.get(1).map_or("", |m| m.as_str());
        let mut content = caps.get(2).map_or("", |m| m.as_str()).trim().to_owned();
        i += 1;
        while i < lines.len() {
            if is_continuation(lines[i]) {
                append_continuation(&mut content, lines[i]);
                i += 1;
                continue;
            }
            if !lines[i].trim().is_empty() {
                break;
            }
            // blank lines belong to the footnote only if it continues after them
            let next = lines[i..].iter().position(|l| !l.trim().is_empty());
            match next {
                Some(offset) if is_continuation(lines[i + offset]) => i += offset,
                _ => break,
            }
        }
        table.insert(id, content);
    }

    (body.join("\n"), table)
}

fn append_continuation(content: &mut String, line: &str) {
    if !content.is_empty() {
        content.push(' ');
    }
    content.push_str(line.trim());
}
