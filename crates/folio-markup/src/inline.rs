//! Inline span parser.
//!
//! At every position the patterns are tried in a fixed priority order; the
//! first one that matches produces a node and the cursor jumps past it. When
//! nothing matches, one character becomes text and the cursor moves by one,
//! so any input is consumed in a linear number of top-level steps.
//!
//! Priority: math, image, embed, link, wiki link, footnote reference,
//! highlight, bold, strikethrough, italic, inline code.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::assets::{AssetManifest, AssetResolver};
use crate::preprocess::FootnoteTable;
use crate::tree::{EmbedRef, Inline};

/// Which constructs are recognized in a span. Emphasis (bold, italic,
/// strikethrough) is always on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct Features {
    math: bool,
    images: bool,
    embeds: bool,
    links: bool,
    wiki_links: bool,
    footnotes: bool,
    highlight: bool,
    code: bool,
}

impl Features {
    pub(crate) const ALL: Self = Self {
        math: true,
        images: true,
        embeds: true,
        links: true,
        wiki_links: true,
        footnotes: true,
        highlight: true,
        code: true,
    };

    /// Inside inline code: emphasis only.
    const CODE: Self = Self {
        math: false,
        images: false,
        embeds: false,
        links: false,
        wiki_links: false,
        footnotes: false,
        highlight: false,
        code: false,
    };

    /// Footnote bodies may not reference footnotes.
    pub(crate) const FOOTNOTE_BODY: Self = Self {
        footnotes: false,
        ..Self::ALL
    };

    /// Link text: no nested links or media.
    fn link_text(self) -> Self {
        Self {
            images: false,
            embeds: false,
            links: false,
            wiki_links: false,
            ..self
        }
    }
}

/// Shared lookups and diagnostics for inline parsing.
pub(crate) struct InlineEnv<'a> {
    pub(crate) assets: AssetResolver<'a>,
    pub(crate) footnotes: &'a FootnoteTable,
    pub(crate) warnings: Vec<String>,
}

impl<'a> InlineEnv<'a> {
    pub(crate) fn new(assets: AssetResolver<'a>, footnotes: &'a FootnoteTable) -> Self {
        Self {
            assets,
            footnotes,
            warnings: Vec::new(),
        }
    }

    /// Resolve a reference, recording unknown tokens.
    pub(crate) fn resolve(&mut self, reference: &str) -> (String, crate::assets::AssetKind) {
        let resolved = self.assets.resolve(reference);
        if let Some(token) = resolved.missing_token {
            tracing::warn!(token, "unknown asset token");
            self.warnings.push(format!("unknown asset token: {token}"));
        }
        (resolved.url, resolved.kind)
    }

    pub(crate) fn embed(&mut self, inner: &str) -> EmbedRef {
        let (target, alias) = split_alias(inner);
        let (url, kind) = self.resolve(target);
        EmbedRef {
            target: target.to_owned(),
            alias,
            url,
            kind,
        }
    }
}

/// Parse a span with no manifest and no footnote definitions.
///
/// # Example
///
/// ```
/// use folio_markup::{Inline, parse_inline};
///
/// let nodes = parse_inline("**a** and *b* and `c`");
/// assert_eq!(nodes, vec![
///     Inline::Bold { children: vec![Inline::text("a")] },
///     Inline::text(" and "),
///     Inline::Italic { children: vec![Inline::text("b")] },
///     Inline::text(" and "),
///     Inline::Code { children: vec![Inline::text("c")] },
/// ]);
/// ```
#[must_use]
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let manifest = AssetManifest::new();
    let footnotes = FootnoteTable::default();
    let mut env = InlineEnv::new(AssetResolver::new(&manifest, None), &footnotes);
    parse(text, Features::ALL, &mut env)
}

/// Parse a span with the given features.
pub(crate) fn parse(text: &str, features: Features, env: &mut InlineEnv<'_>) -> Vec<Inline> {
    let (src, rewritten) = normalize_full_width(text);
    InlineParser {
        env,
        base: &src,
        rewritten,
    }
    .span(&src, features)
}

/// ASCII delimiter a full-width variant stands for.
fn full_width_ascii(c: char) -> Option<char> {
    let ascii = match c {
        '＊' => '*',
        '＿' => '_',
        '～' => '~',
        '＝' => '=',
        '｀' => '`',
        '［' => '[',
        '］' => ']',
        '（' => '(',
        '）' => ')',
        '！' => '!',
        '＄' => '$',
        '｜' => '|',
        '＾' => '^',
        '＃' => '#',
        _ => return None,
    };
    Some(ascii)
}

/// Map full-width delimiter variants to ASCII for matching. Also returns the
/// original character at each rewritten byte offset of the result.
fn normalize_full_width(text: &str) -> (Cow<'_, str>, HashMap<usize, char>) {
    if !text.chars().any(|c| full_width_ascii(c).is_some()) {
        return (Cow::Borrowed(text), HashMap::new());
    }
    let mut out = String::with_capacity(text.len());
    let mut rewritten = HashMap::new();
    for c in text.chars() {
        match full_width_ascii(c) {
            Some(ascii) => {
                rewritten.insert(out.len(), c);
                out.push(ascii);
            }
            None => out.push(c),
        }
    }
    (Cow::Owned(out), rewritten)
}

struct InlineParser<'p, 'a, 's> {
    env: &'p mut InlineEnv<'a>,
    /// Normalized source; every span parsed is a slice of it.
    base: &'s str,
    rewritten: HashMap<usize, char>,
}

impl InlineParser<'_, '_, '_> {
    fn span(&mut self, src: &str, features: Features) -> Vec<Inline> {
        let mut out = Vec::new();
        let mut text = String::new();
        let mut pos = 0;

        while pos < src.len() {
            if let Some((node, consumed)) = self.try_node(src, pos, features) {
                flush_text(&mut text, &mut out);
                out.push(node);
                pos += consumed;
                continue;
            }
            let Some(c) = src[pos..].chars().next() else {
                break;
            };
            text.push(self.original_char(src, pos, c));
            pos += c.len_utf8();
        }
        flush_text(&mut text, &mut out);
        out
    }

    /// Character the author wrote at `src[pos]`, where `c` is its normalized
    /// form.
    fn original_char(&self, src: &str, pos: usize, c: char) -> char {
        if self.rewritten.is_empty() {
            return c;
        }
        let offset = (src.as_ptr() as usize)
            .wrapping_sub(self.base.as_ptr() as usize)
            .wrapping_add(pos);
        self.rewritten.get(&offset).copied().unwrap_or(c)
    }

    fn try_node(&mut self, src: &str, pos: usize, features: Features) -> Option<(Inline, usize)> {
        let rest = &src[pos..];
        let prev = src[..pos].chars().next_back();
        let first = rest.as_bytes().first().copied()?;

        if features.math
            && first == b'$'
            && let Some(found) = try_math(rest)
        {
            return Some(found);
        }
        if features.images
            && rest.starts_with("![")
            && !rest.starts_with("![[")
            && let Some(found) = self.try_image(rest)
        {
            return Some(found);
        }
        if features.embeds
            && rest.starts_with("![[")
            && let Some(found) = self.try_embed(rest)
        {
            return Some(found);
        }
        if features.links
            && first == b'['
            && !rest.starts_with("[[")
            && !rest.starts_with("[^")
            && let Some(found) = self.try_link(rest, features)
        {
            return Some(found);
        }
        if features.wiki_links
            && rest.starts_with("[[")
            && let Some(found) = try_wiki_link(rest)
        {
            return Some(found);
        }
        if features.footnotes
            && rest.starts_with("[^")
            && let Some(found) = self.try_footnote_ref(rest)
        {
            return Some(found);
        }
        if features.highlight
            && rest.starts_with("==")
            && let Some(found) =
                self.try_delimited(rest, prev, "==", features, |children| Inline::Highlight {
                    children,
                })
        {
            return Some(found);
        }
        for delim in ["**", "__"] {
            if rest.starts_with(delim)
                && let Some(found) =
                    self.try_delimited(rest, prev, delim, features, |children| Inline::Bold {
                        children,
                    })
            {
                return Some(found);
            }
        }
        if rest.starts_with("~~")
            && let Some(found) =
                self.try_delimited(rest, prev, "~~", features, |children| Inline::Strikethrough {
                    children,
                })
        {
            return Some(found);
        }
        for delim in ["*", "_"] {
            if rest.starts_with(delim)
                && let Some(found) =
                    self.try_delimited(rest, prev, delim, features, |children| Inline::Italic {
                        children,
                    })
            {
                return Some(found);
            }
        }
        if features.code && first == b'`' {
            return self.try_code(rest);
        }
        None
    }

    fn try_image(&mut self, rest: &str) -> Option<(Inline, usize)> {
        let close = rest[2..].find(']')? + 2;
        let alt = &rest[2..close];
        let (target, consumed) = link_destination(&rest[close + 1..])?;
        let (url, kind) = self.env.resolve(target);
        Some((
            Inline::Image {
                url,
                alt: alt.to_owned(),
                kind,
            },
            close + 1 + consumed,
        ))
    }

    fn try_embed(&mut self, rest: &str) -> Option<(Inline, usize)> {
        let close = rest[3..].find("]]")? + 3;
        let inner = rest[3..close].trim();
        if inner.is_empty() {
            return None;
        }
        Some((Inline::Embed(self.env.embed(inner)), close + 2))
    }

    fn try_link(&mut self, rest: &str, features: Features) -> Option<(Inline, usize)> {
        let close = matching_close(rest, '[', ']')?;
        let (target, consumed) = link_destination(&rest[close + 1..])?;
        let children = self.span(&rest[1..close], features.link_text());
        let (url, kind) = self.env.resolve(target);
        Some((
            Inline::Link {
                url,
                kind,
                children,
            },
            close + 1 + consumed,
        ))
    }

    fn try_footnote_ref(&mut self, rest: &str) -> Option<(Inline, usize)> {
        let close = rest.find(']')?;
        let id = &rest[2..close];
        if id.is_empty() || id.contains(|c: char| c.is_whitespace() || c == '[') {
            return None;
        }
        Some((
            Inline::FootnoteRef {
                id: id.to_owned(),
                number: self.env.footnotes.number(id),
            },
            close + 1,
        ))
    }

    /// Emphasis-style span `<delim>content<delim>`.
    fn try_delimited(
        &mut self,
        rest: &str,
        prev: Option<char>,
        delim: &str,
        features: Features,
        build: impl FnOnce(Vec<Inline>) -> Inline,
    ) -> Option<(Inline, usize)> {
        let underscore = delim.starts_with('_');
        if underscore && prev.is_some_and(char::is_alphanumeric) {
            return None;
        }
        let open = delim.len();
        let close = find_closing(&rest[open..], delim)? + open;
        let after = rest[close + delim.len()..].chars().next();
        if underscore && after.is_some_and(char::is_alphanumeric) {
            return None;
        }
        let children = self.span(&rest[open..close], features);
        Some((build(children), close + delim.len()))
    }

    fn try_code(&mut self, rest: &str) -> Option<(Inline, usize)> {
        let ticks = rest.bytes().take_while(|b| *b == b'`').count();
        let body = &rest[ticks..];
        let mut search = 0;
        while let Some(found) = body[search..].find('`') {
            let start = search + found;
            let run = body[start..].bytes().take_while(|b| *b == b'`').count();
            if run == ticks {
                let content = &body[..start];
                if content.is_empty() {
                    return None;
                }
                let children = self.span(content, Features::CODE);
                return Some((Inline::Code { children }, ticks + start + run));
            }
            search = start + run;
        }
        None
    }
}

fn flush_text(text: &mut String, out: &mut Vec<Inline>) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text { text: last }) = out.last_mut() {
        last.push_str(text);
        text.clear();
    } else {
        out.push(Inline::Text {
            text: std::mem::take(text),
        });
    }
}

fn valid_content(content: &str) -> bool {
    !content.is_empty()
        && !content.starts_with(char::is_whitespace)
        && !content.ends_with(char::is_whitespace)
}

/// Byte offset in `body` of the delimiter closing an emphasis span.
fn find_closing(body: &str, delim: &str) -> Option<usize> {
    let marker = delim.as_bytes()[0];
    let bytes = body.as_bytes();
    let mut search = 0;

    while let Some(found) = body[search..].find(delim) {
        let idx = search + found;
        search = idx + 1;
        let end = idx + delim.len();
        // a longer delimiter run closes at its last position
        if bytes.get(end) == Some(&marker) {
            continue;
        }
        if delim.len() == 1 && idx > 0 && bytes[idx - 1] == marker {
            continue;
        }
        if valid_content(&body[..idx]) {
            return Some(idx);
        }
    }
    None
}

fn try_math(rest: &str) -> Option<(Inline, usize)> {
    if let Some(body) = rest.strip_prefix("$$") {
        let close = body.find("$$")?;
        let tex = body[..close].trim();
        if tex.is_empty() {
            return None;
        }
        return Some((
            Inline::Math {
                tex: tex.to_owned(),
                display: true,
            },
            close + 4,
        ));
    }
    let body = &rest[1..];
    let close = body.find('$')?;
    let tex = &body[..close];
    if !valid_content(tex) {
        return None;
    }
    Some((
        Inline::Math {
            tex: tex.to_owned(),
            display: false,
        },
        close + 2,
    ))
}

fn try_wiki_link(rest: &str) -> Option<(Inline, usize)> {
    let close = rest[2..].find("]]")? + 2;
    let inner = rest[2..close].trim();
    if inner.is_empty() {
        return None;
    }
    let (target_part, alias) = split_alias(inner);
    let (target, anchor, block_id) = match target_part.split_once("#^") {
        Some((target, block)) => (target, None, Some(block.to_owned())),
        None => match target_part.split_once('#') {
            Some((target, anchor)) => (target, Some(anchor.to_owned()), None),
            None => (target_part, None, None),
        },
    };
    Some((
        Inline::WikiLink {
            target: target.trim().to_owned(),
            alias,
            anchor,
            block_id,
        },
        close + 2,
    ))
}

/// Split `target|alias`; an empty alias counts as none.
pub(crate) fn split_alias(inner: &str) -> (&str, Option<String>) {
    match inner.split_once('|') {
        Some((target, alias)) => {
            let alias = alias.trim();
            (
                target.trim(),
                (!alias.is_empty()).then(|| alias.to_owned()),
            )
        }
        None => (inner.trim(), None),
    }
}

/// Index of the bracket matching the one at `rest[0]`.
fn matching_close(rest: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0_usize;
    for (i, c) in rest.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Parse `(destination "optional title")` at the start of `rest`. Returns
/// the destination and the bytes consumed.
fn link_destination(rest: &str) -> Option<(&str, usize)> {
    if !rest.starts_with('(') {
        return None;
    }
    let close = matching_close(rest, '(', ')')?;
    let inner = rest[1..close].trim();
    let target = match inner.strip_prefix('<') {
        Some(bracketed) => bracketed.split('>').next().unwrap_or_default(),
        None => inner.split_whitespace().next().unwrap_or_default(),
    };
    Some((target, close + 1))
}
