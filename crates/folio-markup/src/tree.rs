//! Render tree types.

use std::collections::BTreeMap;
use std::sync::Arc;

use folio_scene::Scene;

use crate::assets::{AssetKind, AssetManifest};

/// Parsed document: block tree plus side tables.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Document {
    pub blocks: Vec<Block>,
    /// Front matter values.
    pub metadata: BTreeMap<String, String>,
    /// Text of the first H1, when title extraction is enabled.
    pub title: Option<String>,
    pub toc: Vec<TocEntry>,
    /// Footnote definitions in definition order, numbered from 1.
    pub footnotes: Vec<Footnote>,
    pub manifest: AssetManifest,
    /// Non-fatal problems found while parsing.
    pub warnings: Vec<String>,
}

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,
    pub title: String,
    /// Anchor id of the heading.
    pub id: String,
}

/// A numbered footnote definition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Footnote {
    pub id: String,
    pub number: usize,
    pub content: Vec<Inline>,
}

/// Block-level node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "type", rename_all = "camelCase")
)]
pub enum Block {
    Heading {
        level: u8,
        /// Stable, document-unique anchor id.
        id: String,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    List(List),
    Table(Table),
    CodeBlock {
        language: Option<String>,
        /// Lines exactly as written, without the fences.
        lines: Vec<String>,
    },
    Quote {
        lines: Vec<Vec<Inline>>,
    },
    Callout {
        kind: CalloutKind,
        title: Vec<Inline>,
        body: Vec<Block>,
    },
    ThematicBreak,
    Directive(Directive),
    Embed(EmbedRef),
    /// Trailing footnotes section.
    Footnotes {
        entries: Vec<Footnote>,
    },
}

/// Marker family of a list, fixed by its first item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum ListKind {
    Unordered,
    Ordered,
    Task,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct List {
    pub kind: ListKind,
    /// Number of the first item of an ordered list.
    pub start: Option<u64>,
    pub items: Vec<ListItem>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ListItem {
    /// `Some` for task items: whether the box is ticked.
    pub checked: Option<bool>,
    pub content: Vec<Inline>,
    /// Continuation paragraphs and nested lists.
    pub children: Vec<Block>,
}

/// Column alignment from a table's delimiter row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// A table cell is an inline sequence.
pub type Cell = Vec<Inline>;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Table {
    pub header: Vec<Cell>,
    pub alignments: Vec<Alignment>,
    pub rows: Vec<Vec<Cell>>,
}

/// Semantic kind of a callout quote.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum CalloutKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
    Custom(String),
}

impl CalloutKind {
    /// Parse a `[!kind]` marker, case-insensitively.
    #[must_use]
    pub fn parse(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "note" => Self::Note,
            "tip" => Self::Tip,
            "important" => Self::Important,
            "warning" => Self::Warning,
            "caution" => Self::Caution,
            other => Self::Custom(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Caution => "caution",
            Self::Custom(kind) => kind,
        }
    }
}

/// Kinds of `:::kind` directive fences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum DirectiveKind {
    Excalidraw,
    Svg,
    Scribble,
    Lab,
    Postmortem,
}

impl DirectiveKind {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "excalidraw" => Some(Self::Excalidraw),
            "svg" => Some(Self::Svg),
            "scribble" => Some(Self::Scribble),
            "lab" => Some(Self::Lab),
            "postmortem" => Some(Self::Postmortem),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excalidraw => "excalidraw",
            Self::Svg => "svg",
            Self::Scribble => "scribble",
            Self::Lab => "lab",
            Self::Postmortem => "postmortem",
        }
    }
}

/// A `:::kind` block.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Body text between the fences.
    pub raw: String,
    pub payload: DirectivePayload,
}

/// Interpreted directive body.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "as", rename_all = "camelCase")
)]
pub enum DirectivePayload {
    /// Diagram body, identified by the hash of its source. `scene` is `None`
    /// when the body could not be decoded.
    Scene {
        key: String,
        scene: Option<Arc<Scene>>,
    },
    /// Body kept verbatim (`svg`).
    Raw,
    /// Body parsed as nested blocks (`lab`, `postmortem`).
    Blocks { blocks: Vec<Block> },
}

/// `![[target|alias]]` reference, resolved through the asset manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EmbedRef {
    pub target: String,
    pub alias: Option<String>,
    /// Resolved URL; empty for an unknown asset token.
    pub url: String,
    pub kind: AssetKind,
}

/// Inline node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "type", rename_all = "camelCase")
)]
pub enum Inline {
    Text {
        text: String,
    },
    Bold {
        children: Vec<Inline>,
    },
    Italic {
        children: Vec<Inline>,
    },
    Strikethrough {
        children: Vec<Inline>,
    },
    Highlight {
        children: Vec<Inline>,
    },
    /// Inline code; only emphasis is parsed inside.
    Code {
        children: Vec<Inline>,
    },
    Link {
        url: String,
        kind: AssetKind,
        children: Vec<Inline>,
    },
    WikiLink {
        target: String,
        alias: Option<String>,
        anchor: Option<String>,
        block_id: Option<String>,
    },
    Image {
        url: String,
        alt: String,
        kind: AssetKind,
    },
    Embed(EmbedRef),
    FootnoteRef {
        id: String,
        /// Definition number; `None` when the id has no definition.
        number: Option<usize>,
    },
    Math {
        tex: String,
        display: bool,
    },
}

impl Inline {
    /// Text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Concatenated visible text of an inline sequence.
#[must_use]
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain_text(inlines, &mut out);
    out
}

fn push_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text { text } => out.push_str(text),
            Inline::Bold { children }
            | Inline::Italic { children }
            | Inline::Strikethrough { children }
            | Inline::Highlight { children }
            | Inline::Code { children }
            | Inline::Link { children, .. } => push_plain_text(children, out),
            Inline::WikiLink { target, alias, .. } => {
                out.push_str(alias.as_deref().unwrap_or(target));
            }
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::Embed(embed) => out.push_str(embed.alias.as_deref().unwrap_or(&embed.target)),
            Inline::Math { tex, .. } => out.push_str(tex),
            Inline::FootnoteRef { .. } => {}
        }
    }
}
