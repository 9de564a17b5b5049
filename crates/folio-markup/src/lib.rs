//! Hybrid markup parsing for Folio.
//!
//! Turns author-written markup (markdown blocks and inlines extended with
//! `:::kind` directives, footnotes, wiki links and embeds, and `asset:` token
//! indirection) into a typed render tree.
//!
//! Parsing runs in stages:
//! 1. [`preprocess`] strips the BOM, front matter, the trailing `:::assets`
//!    manifest and footnote definitions
//! 2. the block parser walks the body line by line
//! 3. the inline parser handles the text of each block
//! 4. diagram directives are decoded through `folio-scene`, optionally via a
//!    shared [`SceneCache`](folio_scene::SceneCache)
//!
//! Parsing never fails. Problems such as an unknown asset token or an
//! undecodable diagram are collected in [`Document::warnings`].
//!
//! # Example
//!
//! ```
//! use folio_markup::{Block, ParseOptions, parse_document};
//!
//! let doc = parse_document(
//!     "# Notes\n\nSee ![chart](asset:a1).\n:::assets\n{\"a1\":\"https://cdn.example/c.png\"}\n:::",
//!     &ParseOptions::default().with_extract_title(true),
//! );
//! assert_eq!(doc.title.as_deref(), Some("Notes"));
//! assert!(matches!(doc.blocks[1], Block::Paragraph { .. }));
//! assert!(doc.warnings.is_empty());
//! ```

mod assets;
mod block;
mod fence;
mod heading;
mod html;
mod inline;
mod list;
mod preprocess;
mod table;
mod tree;

use folio_scene::SceneCache;

pub use assets::{
    AssetKind, AssetManifest, TokenResolver, classify, normalize_path, render_manifest, resolve,
};
pub use heading::slugify;
pub use html::{HtmlRenderer, escape_html};
pub use inline::parse_inline;
pub use preprocess::{FootnoteTable, Preprocessed, preprocess};
pub use tree::{
    Alignment, Block, CalloutKind, Cell, Directive, DirectiveKind, DirectivePayload, Document,
    EmbedRef, Footnote, Inline, List, ListItem, ListKind, Table, TocEntry, plain_text,
};

use assets::AssetResolver;
use block::BlockContext;
use heading::HeadingState;
use inline::{Features, InlineEnv};

/// Options for [`parse_document`].
#[derive(Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    /// Take the first H1 as the document title and leave it out of the toc.
    pub extract_title: bool,
    /// Memo for diagram decodes, shared across documents.
    pub scene_cache: Option<&'a SceneCache>,
    /// Consulted for `asset:` tokens the document's own manifest lacks.
    pub resolver: Option<&'a dyn TokenResolver>,
}

impl<'a> ParseOptions<'a> {
    #[must_use]
    pub fn with_extract_title(mut self, extract: bool) -> Self {
        self.extract_title = extract;
        self
    }

    #[must_use]
    pub fn with_scene_cache(mut self, cache: &'a SceneCache) -> Self {
        self.scene_cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: &'a dyn TokenResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl std::fmt::Debug for ParseOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("extract_title", &self.extract_title)
            .field("scene_cache", &self.scene_cache.is_some())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Raw bodies of the diagram directives in a document, in document order.
///
/// Lets a caller decode diagrams ahead of [`parse_document`], for example in
/// parallel into a shared [`SceneCache`].
#[must_use]
pub fn scene_sources(text: &str) -> Vec<String> {
    block::scene_sources(&preprocess(text).body)
}

/// Parse a document into its render tree.
#[must_use]
pub fn parse_document(text: &str, options: &ParseOptions<'_>) -> Document {
    let pre = preprocess(text);

    let (blocks, footnotes, title, toc, warnings) = {
        let mut ctx = BlockContext {
            inline: InlineEnv::new(
                AssetResolver::new(&pre.manifest, options.resolver),
                &pre.footnotes,
            ),
            headings: HeadingState::new(options.extract_title),
            scene_cache: options.scene_cache,
            depth: 0,
        };
        let mut blocks = block::parse_blocks(&pre.body, &mut ctx);

        let footnotes: Vec<Footnote> = pre
            .footnotes
            .iter()
            .enumerate()
            .map(|(index, (id, text))| Footnote {
                id: id.to_owned(),
                number: index + 1,
                content: inline::parse(text, Features::FOOTNOTE_BODY, &mut ctx.inline),
            })
            .collect();
        if !footnotes.is_empty() {
            blocks.push(Block::Footnotes {
                entries: footnotes.clone(),
            });
        }

        let (title, toc) = ctx.headings.finish();
        (blocks, footnotes, title, toc, ctx.inline.warnings)
    };

    tracing::debug!(
        blocks = blocks.len(),
        footnotes = footnotes.len(),
        warnings = warnings.len(),
        "parsed document"
    );

    Document {
        blocks,
        metadata: pre.metadata,
        title,
        toc,
        footnotes,
        manifest: pre.manifest,
        warnings,
    }
}
