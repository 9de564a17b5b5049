//! HTML rendering of the render tree.
//!
//! Output is semantic HTML5. Every piece of document text goes through
//! [`escape_html`]; `svg` directive bodies are never inlined as markup but
//! referenced as a base64 data URI.

use std::collections::HashMap;
use std::fmt::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use folio_scene::{RenderOptions, ZoomLimits, render_scene, to_svg};

use crate::assets::AssetKind;
use crate::tree::{
    Alignment, Block, CalloutKind, Directive, DirectivePayload, Document, EmbedRef, Footnote,
    Inline, List, ListKind, Table,
};

/// Renders a [`Document`] (or parts of one) to HTML.
///
/// # Example
///
/// ```
/// use folio_markup::{HtmlRenderer, ParseOptions, parse_document};
///
/// let doc = parse_document("# Hi\n\n**bold**", &ParseOptions::default());
/// let html = HtmlRenderer::new().render(&doc);
/// assert_eq!(html, r#"<h1 id="hi">Hi</h1><p><strong>bold</strong></p>"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    scene_options: RenderOptions,
    zoom: ZoomLimits,
}

impl HtmlRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options used when drawing diagram directives.
    #[must_use]
    pub fn with_scene_options(mut self, options: RenderOptions) -> Self {
        self.scene_options = options;
        self
    }

    /// Zoom range announced to the client-side viewer of each diagram.
    #[must_use]
    pub fn with_zoom_limits(mut self, zoom: ZoomLimits) -> Self {
        self.zoom = zoom;
        self
    }

    /// Render a whole document. Footnotes come out through the trailing
    /// footnotes block, so nothing beyond `doc.blocks` is needed.
    #[must_use]
    pub fn render(&self, doc: &Document) -> String {
        self.render_blocks(&doc.blocks)
    }

    #[must_use]
    pub fn render_blocks(&self, blocks: &[Block]) -> String {
        let mut out = HtmlBuffer::default();
        for block in blocks {
            self.block(block, &mut out);
        }
        out.html
    }

    #[must_use]
    pub fn render_inlines(&self, inlines: &[Inline]) -> String {
        let mut out = HtmlBuffer::default();
        inlines_into(inlines, &mut out);
        out.html
    }

    fn block(&self, block: &Block, out: &mut HtmlBuffer) {
        match block {
            Block::Heading { level, id, content } => {
                let _ = write!(out, r#"<h{level} id="{}">"#, escape_html(id));
                inlines_into(content, out);
                let _ = write!(out, "</h{level}>");
            }
            Block::Paragraph { content } => {
                out.push_str("<p>");
                inlines_into(content, out);
                out.push_str("</p>");
            }
            Block::List(list) => self.list(list, out),
            Block::Table(table) => table_into(table, out),
            Block::CodeBlock { language, lines } => {
                match language {
                    Some(lang) => {
                        let _ = write!(out, r#"<pre><code class="language-{}">"#, escape_html(lang));
                    }
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&escape_html(&lines.join("\n")));
                out.push_str("</code></pre>");
            }
            Block::Quote { lines } => {
                out.push_str("<blockquote><p>");
                for (index, line) in lines.iter().enumerate() {
                    if index > 0 {
                        out.push_str("<br>");
                    }
                    inlines_into(line, out);
                }
                out.push_str("</p></blockquote>");
            }
            Block::Callout { kind, title, body } => {
                let _ = write!(
                    out,
                    r#"<div class="alert alert-{}"><div class="alert-title">"#,
                    escape_html(kind.as_str())
                );
                if title.is_empty() {
                    out.push_str(&escape_html(&default_title(kind)));
                } else {
                    inlines_into(title, out);
                }
                out.push_str(r#"</div><div class="alert-content">"#);
                for inner in body {
                    self.block(inner, out);
                }
                out.push_str("</div></div>");
            }
            Block::ThematicBreak => out.push_str("<hr>"),
            Block::Directive(directive) => self.directive(directive, out),
            Block::Embed(embed) => embed_into(embed, out),
            Block::Footnotes { entries } => footnotes_into(entries, out),
        }
    }

    fn list(&self, list: &List, out: &mut HtmlBuffer) {
        let close = match (list.kind, list.start) {
            (ListKind::Ordered, Some(n)) if n != 1 => {
                let _ = write!(out, r#"<ol start="{n}">"#);
                "</ol>"
            }
            (ListKind::Ordered, _) => {
                out.push_str("<ol>");
                "</ol>"
            }
            (ListKind::Task, _) => {
                out.push_str(r#"<ul class="task-list">"#);
                "</ul>"
            }
            (ListKind::Unordered, _) => {
                out.push_str("<ul>");
                "</ul>"
            }
        };

        for item in &list.items {
            match item.checked {
                Some(checked) => {
                    out.push_str(r#"<li class="task-list-item"><input type="checkbox" disabled"#);
                    if checked {
                        out.push_str(" checked");
                    }
                    out.push_str("> ");
                }
                None => out.push_str("<li>"),
            }
            inlines_into(&item.content, out);
            for child in &item.children {
                self.block(child, out);
            }
            out.push_str("</li>");
        }
        out.push_str(close);
    }

    fn directive(&self, directive: &Directive, out: &mut HtmlBuffer) {
        let kind = directive.kind.as_str();
        match &directive.payload {
            DirectivePayload::Scene {
                key,
                scene: Some(scene),
            } => {
                let svg = to_svg(&render_scene(scene, &self.scene_options));
                let _ = write!(
                    out,
                    r#"<figure class="scene scene-{kind}" data-scene-key="{}" data-zoom-min="{}" data-zoom-max="{}">{svg}</figure>"#,
                    escape_html(key),
                    self.zoom.min,
                    self.zoom.max
                );
            }
            DirectivePayload::Scene { key, scene: None } => {
                let _ = write!(
                    out,
                    r#"<div class="scene scene-{kind} scene-error" data-scene-key="{}">Diagram could not be displayed</div>"#,
                    escape_html(key)
                );
            }
            DirectivePayload::Raw => {
                let _ = write!(
                    out,
                    r#"<img class="svg-directive" src="data:image/svg+xml;base64,{}" alt="">"#,
                    STANDARD.encode(directive.raw.as_bytes())
                );
            }
            DirectivePayload::Blocks { blocks } => {
                let _ = write!(out, r#"<section class="directive directive-{kind}">"#);
                for block in blocks {
                    self.block(block, out);
                }
                out.push_str("</section>");
            }
        }
    }
}

/// Output of one render call. Tracks footnote references so each one gets
/// its own element id.
#[derive(Default)]
struct HtmlBuffer {
    html: String,
    footnote_refs: HashMap<String, usize>,
}

impl HtmlBuffer {
    fn push_str(&mut self, s: &str) {
        self.html.push_str(s);
    }

    /// Element id for the next reference to footnote `id`: `fnref-{id}` for
    /// the first, then `fnref-{id}-2`, `fnref-{id}-3`, ...
    fn footnote_ref_id(&mut self, id: &str) -> String {
        let count = self.footnote_refs.entry(id.to_owned()).or_default();
        *count += 1;
        if *count == 1 {
            format!("fnref-{id}")
        } else {
            format!("fnref-{id}-{count}")
        }
    }
}

impl Write for HtmlBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.html.push_str(s);
        Ok(())
    }
}

fn default_title(kind: &CalloutKind) -> String {
    let name = kind.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn alignment_style(alignment: Option<&Alignment>) -> &'static str {
    match alignment {
        Some(Alignment::Left) => r#" style="text-align:left""#,
        Some(Alignment::Center) => r#" style="text-align:center""#,
        Some(Alignment::Right) => r#" style="text-align:right""#,
        Some(Alignment::None) | None => "",
    }
}

fn table_into(table: &Table, out: &mut HtmlBuffer) {
    out.push_str("<table><thead><tr>");
    for (index, cell) in table.header.iter().enumerate() {
        let _ = write!(out, "<th{}>", alignment_style(table.alignments.get(index)));
        inlines_into(cell, out);
        out.push_str("</th>");
    }
    out.push_str("</tr></thead>");

    if !table.rows.is_empty() {
        out.push_str("<tbody>");
        for row in &table.rows {
            out.push_str("<tr>");
            for (index, cell) in row.iter().enumerate() {
                let _ = write!(out, "<td{}>", alignment_style(table.alignments.get(index)));
                inlines_into(cell, out);
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody>");
    }
    out.push_str("</table>");
}

fn embed_into(embed: &EmbedRef, out: &mut HtmlBuffer) {
    let label = embed.alias.as_deref().unwrap_or(&embed.target);
    if embed.url.is_empty() {
        let _ = write!(out, r#"<span class="embed-missing">{}</span>"#, escape_html(label));
        return;
    }
    let url = escape_html(&safe_url(&embed.url));
    let label = escape_html(label);
    match embed.kind {
        AssetKind::Image | AssetKind::VectorDrawing => {
            let _ = write!(out, r#"<img src="{url}" alt="{label}">"#);
        }
        AssetKind::Diagram => {
            let _ = write!(
                out,
                r#"<div class="embed embed-diagram" data-src="{url}">{label}</div>"#
            );
        }
        AssetKind::ExternalLink | AssetKind::PlainText => {
            let _ = write!(out, r#"<a class="embed" href="{url}">{label}</a>"#);
        }
    }
}

fn footnotes_into(entries: &[Footnote], out: &mut HtmlBuffer) {
    out.push_str(r#"<section class="footnotes"><ol>"#);
    for note in entries {
        let id = escape_html(&note.id);
        let _ = write!(out, r#"<li id="fn-{id}">"#);
        inlines_into(&note.content, out);
        let _ = write!(
            out,
            r##" <a href="#fnref-{id}" class="footnote-backref">&#8617;</a></li>"##
        );
    }
    out.push_str("</ol></section>");
}

fn inlines_into(inlines: &[Inline], out: &mut HtmlBuffer) {
    for inline in inlines {
        inline_into(inline, out);
    }
}

fn wrapped(tag: &str, children: &[Inline], out: &mut HtmlBuffer) {
    let _ = write!(out, "<{tag}>");
    inlines_into(children, out);
    let _ = write!(out, "</{tag}>");
}

fn inline_into(inline: &Inline, out: &mut HtmlBuffer) {
    match inline {
        Inline::Text { text } => out.push_str(&escape_html(text)),
        Inline::Bold { children } => wrapped("strong", children, out),
        Inline::Italic { children } => wrapped("em", children, out),
        Inline::Strikethrough { children } => wrapped("s", children, out),
        Inline::Highlight { children } => wrapped("mark", children, out),
        Inline::Code { children } => wrapped("code", children, out),
        Inline::Link { url, children, .. } => {
            let _ = write!(out, r#"<a href="{}">"#, escape_html(&safe_url(url)));
            inlines_into(children, out);
            out.push_str("</a>");
        }
        Inline::WikiLink {
            target,
            alias,
            anchor,
            block_id,
        } => {
            let mut href = target.clone();
            if let Some(anchor) = anchor {
                href.push('#');
                href.push_str(anchor);
            } else if let Some(block) = block_id {
                href.push_str("#^");
                href.push_str(block);
            }
            let label = alias.as_deref().unwrap_or(target);
            let _ = write!(
                out,
                r#"<a class="wikilink" href="{}">{}</a>"#,
                escape_html(&href),
                escape_html(label)
            );
        }
        Inline::Image { url, alt, .. } => {
            if url.is_empty() {
                let _ = write!(out, r#"<span class="embed-missing">{}</span>"#, escape_html(alt));
            } else {
                let _ = write!(
                    out,
                    r#"<img src="{}" alt="{}">"#,
                    escape_html(&safe_url(url)),
                    escape_html(alt)
                );
            }
        }
        Inline::Embed(embed) => embed_into(embed, out),
        Inline::FootnoteRef { id, number } => match number {
            Some(n) => {
                let ref_id = escape_html(&out.footnote_ref_id(id));
                let id = escape_html(id);
                let _ = write!(
                    out,
                    r##"<sup class="footnote-ref" id="{ref_id}"><a href="#fn-{id}">{n}</a></sup>"##
                );
            }
            None => {
                let _ = write!(out, "[^{}]", escape_html(id));
            }
        },
        Inline::Math { tex, display } => {
            let (tag, class) = if *display {
                ("div", "math math-display")
            } else {
                ("span", "math math-inline")
            };
            let _ = write!(out, r#"<{tag} class="{class}">{}</{tag}>"#, escape_html(tex));
        }
    }
}

/// Neutralize script-bearing URL schemes.
fn safe_url(url: &str) -> String {
    let trimmed = url.trim_start();
    let scheme = trimmed.get(..11).unwrap_or(trimmed).to_ascii_lowercase();
    if scheme.starts_with("javascript:") || scheme.starts_with("vbscript:") {
        "#".to_owned()
    } else {
        url.to_owned()
    }
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
