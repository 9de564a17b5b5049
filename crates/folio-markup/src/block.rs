//! Line-driven block parser.
//!
//! One forward pass with a cursor. At each line the detectors run in a fixed
//! order and the first match consumes one or more lines:
//!
//! blank, directive fence, embed line, thematic break, code fence, heading,
//! blockquote (quote or callout), table, list, paragraph.
//!
//! A detector whose structural preconditions fail simply declines, so the
//! line ends up in a paragraph. Nothing here returns an error.

use std::sync::{Arc, LazyLock};

use folio_scene::{SceneCache, SceneKey};
use regex::Regex;

use crate::fence::{Fence, FenceTracker};
use crate::heading::HeadingState;
use crate::inline::{self, Features, InlineEnv};
use crate::list;
use crate::table;
use crate::tree::{Block, CalloutKind, Directive, DirectiveKind, DirectivePayload, Inline, plain_text};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})(?:[ \t]+(.*))?$").unwrap());

static EMBED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[\[([^\[\]]+)\]\]$").unwrap());

/// Deepest container body (directive or callout) parsed as blocks. Anything
/// nested further is kept as plain paragraph text.
const MAX_NESTING: usize = 64;

static CALLOUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[!([A-Za-z][\w-]*)\][+-]?(?:[ \t]+(.*))?$").unwrap());

/// State shared by every block of one document, nested bodies included.
pub(crate) struct BlockContext<'a> {
    pub(crate) inline: InlineEnv<'a>,
    pub(crate) headings: HeadingState,
    pub(crate) scene_cache: Option<&'a SceneCache>,
    /// Container bodies currently open around the parse position.
    pub(crate) depth: usize,
}

impl BlockContext<'_> {
    pub(crate) fn inlines(&mut self, text: &str) -> Vec<Inline> {
        inline::parse(text, Features::ALL, &mut self.inline)
    }

    /// Parse the body of a container block one level deeper.
    fn nested(&mut self, text: &str) -> Vec<Block> {
        if self.depth >= MAX_NESTING {
            if text.trim().is_empty() {
                return Vec::new();
            }
            tracing::warn!(limit = MAX_NESTING, "container nesting too deep");
            self.warn(format!("nesting deeper than {MAX_NESTING} levels kept as text"));
            return vec![Block::Paragraph {
                content: vec![Inline::text(text)],
            }];
        }
        self.depth += 1;
        let blocks = parse_blocks(text, self);
        self.depth -= 1;
        blocks
    }

    fn warn(&mut self, message: String) {
        self.inline.warnings.push(message);
    }
}

/// Parse a preprocessed body into blocks.
pub(crate) fn parse_blocks(text: &str, ctx: &mut BlockContext<'_>) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    BlockParser { lines, pos: 0 }.run(ctx)
}

struct BlockParser<'s> {
    lines: Vec<&'s str>,
    pos: usize,
}

impl<'s> BlockParser<'s> {
    fn run(mut self, ctx: &mut BlockContext<'_>) -> Vec<Block> {
        let mut blocks = Vec::new();

        while self.pos < self.lines.len() {
            if self.lines[self.pos].trim().is_empty() {
                self.pos += 1;
                continue;
            }
            let block = self
                .directive(ctx)
                .or_else(|| self.embed_line(ctx))
                .or_else(|| self.thematic_break())
                .or_else(|| self.code_block())
                .or_else(|| self.heading(ctx))
                .or_else(|| self.quote(ctx))
                .or_else(|| self.table(ctx))
                .or_else(|| self.list(ctx))
                .unwrap_or_else(|| self.paragraph(ctx));
            blocks.push(block);
        }
        blocks
    }

    fn current(&self) -> &'s str {
        self.lines[self.pos]
    }

    fn directive(&mut self, ctx: &mut BlockContext<'_>) -> Option<Block> {
        let kind = directive_open(self.current()).and_then(DirectiveKind::parse)?;
        let (body, next) = directive_body(&self.lines, self.pos + 1);
        self.pos = next;

        let raw = body.join("\n");
        let payload = match kind {
            DirectiveKind::Excalidraw | DirectiveKind::Scribble => scene_payload(kind, &raw, ctx),
            DirectiveKind::Svg => DirectivePayload::Raw,
            DirectiveKind::Lab | DirectiveKind::Postmortem => DirectivePayload::Blocks {
                blocks: ctx.nested(&raw),
            },
        };
        Some(Block::Directive(Directive { kind, raw, payload }))
    }

    fn embed_line(&mut self, ctx: &mut BlockContext<'_>) -> Option<Block> {
        let caps = EMBED_LINE.captures(self.current().trim())?;
        let inner = caps.get(1)?.as_str().trim();
        self.pos += 1;
        Some(Block::Embed(ctx.inline.embed(inner)))
    }

    fn thematic_break(&mut self) -> Option<Block> {
        if !is_thematic_break(self.current()) {
            return None;
        }
        self.pos += 1;
        Some(Block::ThematicBreak)
    }

    fn code_block(&mut self) -> Option<Block> {
        let fence = Fence::open(self.current())?;
        let mut lines = Vec::new();
        let mut i = self.pos + 1;
        while i < self.lines.len() {
            let line = self.lines[i];
            i += 1;
            if fence.is_closed_by(line) {
                break;
            }
            lines.push(line.to_owned());
        }
        self.pos = i;
        Some(Block::CodeBlock {
            language: fence.language().map(str::to_owned),
            lines,
        })
    }

    fn heading(&mut self, ctx: &mut BlockContext<'_>) -> Option<Block> {
        let caps = HEADING.captures(self.current().trim())?;
        let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
        let text = strip_closing_hashes(caps.get(2).map_or("", |m| m.as_str()));
        self.pos += 1;

        let content = ctx.inlines(text);
        let id = ctx.headings.register(level, &plain_text(&content));
        Some(Block::Heading { level, id, content })
    }

    fn quote(&mut self, ctx: &mut BlockContext<'_>) -> Option<Block> {
        let mut stripped = Vec::new();
        while self.pos < self.lines.len() {
            let Some(rest) = self.current().trim_start().strip_prefix('>') else {
                break;
            };
            stripped.push(rest.strip_prefix(' ').unwrap_or(rest));
            self.pos += 1;
        }
        let (first, rest) = stripped.split_first()?;

        if let Some(caps) = CALLOUT.captures(first.trim()) {
            let kind = CalloutKind::parse(caps.get(1).map_or("", |m| m.as_str()));
            let title = ctx.inlines(caps.get(2).map_or("", |m| m.as_str()).trim());
            let body = ctx.nested(&rest.join("\n"));
            return Some(Block::Callout { kind, title, body });
        }

        let lines = stripped.iter().map(|line| ctx.inlines(line)).collect();
        Some(Block::Quote { lines })
    }

    fn table(&mut self, ctx: &mut BlockContext<'_>) -> Option<Block> {
        let (table, consumed) = table::parse(&self.lines[self.pos..], ctx)?;
        self.pos += consumed;
        Some(Block::Table(table))
    }

    fn list(&mut self, ctx: &mut BlockContext<'_>) -> Option<Block> {
        let (arena, next) = list::collect(&self.lines, self.pos)?;
        self.pos = next;
        let mut cursor = 0;
        let base = arena[0].indent;
        Some(Block::List(list::build(&arena, &mut cursor, base, ctx)))
    }

    fn paragraph(&mut self, ctx: &mut BlockContext<'_>) -> Block {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.lines.len() {
            let line = self.current();
            if line.trim().is_empty() || starts_block(&self.lines[self.pos..]) {
                break;
            }
            self.pos += 1;
        }
        let text = self.lines[start..self.pos]
            .iter()
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join("\n");
        Block::Paragraph {
            content: ctx.inlines(&text),
        }
    }
}

/// Lines of a directive body starting at `lines[start]`, and the index after
/// its closing fence. Nested directives and code fences are skipped over; an
/// unclosed directive runs to the end.
fn directive_body<'s>(lines: &[&'s str], start: usize) -> (Vec<&'s str>, usize) {
    let mut body = Vec::new();
    let mut depth = 1_usize;
    let mut tracker = FenceTracker::default();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i];
        i += 1;
        let fence_line = tracker.update(line);
        if !fence_line && !tracker.in_fence() {
            if is_directive_close(line) {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            } else if directive_open(line).is_some() {
                depth += 1;
            }
        }
        body.push(line);
    }
    (body, i)
}

/// Raw bodies of the diagram directives in a preprocessed body, including
/// those nested in `lab` and `postmortem` blocks, in document order.
pub(crate) fn scene_sources(body: &str) -> Vec<String> {
    let lines: Vec<&str> = body.lines().collect();
    let mut sources = Vec::new();
    collect_scene_sources(&lines, 0, &mut sources);
    sources
}

fn collect_scene_sources(lines: &[&str], depth: usize, out: &mut Vec<String>) {
    let mut tracker = FenceTracker::default();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if tracker.update(line) || tracker.in_fence() {
            i += 1;
            continue;
        }
        let Some(kind) = directive_open(line).and_then(DirectiveKind::parse) else {
            i += 1;
            continue;
        };
        let (body, next) = directive_body(lines, i + 1);
        match kind {
            DirectiveKind::Excalidraw | DirectiveKind::Scribble => out.push(body.join("\n")),
            DirectiveKind::Lab | DirectiveKind::Postmortem if depth < MAX_NESTING => {
                collect_scene_sources(&body, depth + 1, out);
            }
            DirectiveKind::Lab | DirectiveKind::Postmortem => {}
            DirectiveKind::Svg => {}
        }
        i = next;
    }
}

/// Whether `lines[0]` would start a non-paragraph block.
fn starts_block(lines: &[&str]) -> bool {
    let line = lines[0];
    let trimmed = line.trim();
    directive_open(line).is_some_and(|name| DirectiveKind::parse(name).is_some())
        || EMBED_LINE.is_match(trimmed)
        || is_thematic_break(line)
        || Fence::open(line).is_some()
        || HEADING.is_match(trimmed)
        || trimmed.starts_with('>')
        || table::is_table_start(lines)
        || list::parse_marker(line).is_some()
}

/// Name after a `:::` (three or more colons) opener.
fn directive_open(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let colons = trimmed.bytes().take_while(|b| *b == b':').count();
    if colons < 3 {
        return None;
    }
    trimmed[colons..].split_whitespace().next()
}

fn is_directive_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.bytes().all(|b| b == b':')
}

fn is_thematic_break(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && trimmed.len() >= 3 && trimmed.chars().all(|c| c == first)
}

fn strip_closing_hashes(text: &str) -> &str {
    let text = text.trim_end();
    let without = text.trim_end_matches('#');
    if without.len() == text.len() {
        return text;
    }
    if without.is_empty() || without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        text
    }
}

fn scene_payload(kind: DirectiveKind, raw: &str, ctx: &mut BlockContext<'_>) -> DirectivePayload {
    let key = SceneKey::of(raw);
    let outcome = match ctx.scene_cache {
        Some(cache) => cache.get_or_decode(raw),
        None => folio_scene::decode(raw).map(Arc::new),
    };
    let scene = match outcome {
        Ok(scene) => Some(scene),
        Err(e) => {
            tracing::warn!(kind = kind.as_str(), %key, "undecodable scene block: {e}");
            ctx.warn(format!("{} block {}: {}", kind.as_str(), &key.as_str()[..12], e.code()));
            None
        }
    };
    DirectivePayload::Scene {
        key: key.to_string(),
        scene,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetManifest, AssetResolver};
    use crate::preprocess::FootnoteTable;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> (Vec<Block>, Vec<String>) {
        let manifest = AssetManifest::new();
        let footnotes = FootnoteTable::default();
        let mut ctx = BlockContext {
            inline: InlineEnv::new(AssetResolver::new(&manifest, None), &footnotes),
            headings: HeadingState::new(false),
            scene_cache: None,
            depth: 0,
        };
        let blocks = parse_blocks(text, &mut ctx);
        (blocks, ctx.inline.warnings)
    }

    fn blocks(text: &str) -> Vec<Block> {
        parse(text).0
    }

    fn para(text: &str) -> Block {
        Block::Paragraph {
            content: vec![Inline::text(text)],
        }
    }

    #[test]
    fn test_heading_then_paragraph() {
        assert_eq!(
            blocks("# Title\n\nBody"),
            vec![
                Block::Heading {
                    level: 1,
                    id: "title".to_owned(),
                    content: vec![Inline::text("Title")],
                },
                para("Body"),
            ]
        );
    }

    #[test]
    fn test_heading_levels_and_closing_hashes() {
        let parsed = blocks("###### Six ##\n####### seven\n#nospace");
        assert_eq!(
            parsed[0],
            Block::Heading {
                level: 6,
                id: "six".to_owned(),
                content: vec![Inline::text("Six")],
            }
        );
        assert_eq!(parsed[1], Block::Paragraph {
            content: vec![Inline::text("####### seven\n#nospace")],
        });
    }

    #[test]
    fn test_code_block_verbatim() {
        let text = "```rust\n  fn main() {  \n\n    body();\n}\n```\nafter";
        assert_eq!(
            blocks(text),
            vec![
                Block::CodeBlock {
                    language: Some("rust".to_owned()),
                    lines: vec![
                        "  fn main() {  ".to_owned(),
                        String::new(),
                        "    body();".to_owned(),
                        "}".to_owned(),
                    ],
                },
                para("after"),
            ]
        );
    }

    #[test]
    fn test_unclosed_code_block_runs_to_end() {
        assert_eq!(
            blocks("~~~\na\n# not heading"),
            vec![Block::CodeBlock {
                language: None,
                lines: vec!["a".to_owned(), "# not heading".to_owned()],
            }]
        );
    }

    #[test]
    fn test_thematic_breaks() {
        assert_eq!(
            blocks("---\n***\n___\n--"),
            vec![
                Block::ThematicBreak,
                Block::ThematicBreak,
                Block::ThematicBreak,
                para("--"),
            ]
        );
    }

    #[test]
    fn test_quote_lines() {
        assert_eq!(
            blocks("> one\n>two\n\nafter"),
            vec![
                Block::Quote {
                    lines: vec![vec![Inline::text("one")], vec![Inline::text("two")]],
                },
                para("after"),
            ]
        );
    }

    #[test]
    fn test_callout_with_body_blocks() {
        assert_eq!(
            blocks("> [!WARNING] Careful\n> First **line**\n>\n> - item"),
            vec![Block::Callout {
                kind: CalloutKind::Warning,
                title: vec![Inline::text("Careful")],
                body: vec![
                    Block::Paragraph {
                        content: vec![
                            Inline::text("First "),
                            Inline::Bold {
                                children: vec![Inline::text("line")]
                            },
                        ],
                    },
                    Block::List(crate::tree::List {
                        kind: crate::tree::ListKind::Unordered,
                        start: None,
                        items: vec![crate::tree::ListItem {
                            checked: None,
                            content: vec![Inline::text("item")],
                            children: Vec::new(),
                        }],
                    }),
                ],
            }]
        );
    }

    #[test]
    fn test_custom_callout_kind() {
        let parsed = blocks("> [!recipe]\n> Mix.");
        let Block::Callout { kind, title, .. } = &parsed[0] else {
            panic!("expected callout");
        };
        assert_eq!(kind, &CalloutKind::Custom("recipe".to_owned()));
        assert!(title.is_empty());
    }

    #[test]
    fn test_embed_line() {
        let parsed = blocks("![[diagram.excalidraw|Flow]]");
        let Block::Embed(embed) = &parsed[0] else {
            panic!("expected embed");
        };
        assert_eq!(embed.target, "diagram.excalidraw");
        assert_eq!(embed.alias.as_deref(), Some("Flow"));
        assert_eq!(embed.kind, crate::assets::AssetKind::Diagram);
    }

    #[test]
    fn test_scene_directive_decoded() {
        let text = ":::excalidraw\n{\"elements\":[{\"id\":\"a\",\"type\":\"rectangle\"}]}\n:::\nafter";
        let (parsed, warnings) = parse(text);
        let Block::Directive(Directive {
            kind: DirectiveKind::Excalidraw,
            payload: DirectivePayload::Scene { key, scene },
            raw,
        }) = &parsed[0]
        else {
            panic!("expected scene directive");
        };
        assert_eq!(key, &SceneKey::of(raw).to_string());
        assert_eq!(scene.as_ref().map(|s| s.elements.len()), Some(1));
        assert!(warnings.is_empty());
        assert_eq!(parsed[1], para("after"));
    }

    #[test]
    fn test_undecodable_scene_warns() {
        let (parsed, warnings) = parse(":::scribble\nnope\n:::");
        assert!(matches!(
            &parsed[0],
            Block::Directive(Directive {
                payload: DirectivePayload::Scene { scene: None, .. },
                ..
            })
        ));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].ends_with("unparseable-scene"));
    }

    #[test]
    fn test_svg_directive_keeps_raw() {
        let parsed = blocks(":::svg\n<svg><rect/></svg>\n:::");
        assert_eq!(
            parsed,
            vec![Block::Directive(Directive {
                kind: DirectiveKind::Svg,
                raw: "<svg><rect/></svg>".to_owned(),
                payload: DirectivePayload::Raw,
            })]
        );
    }

    #[test]
    fn test_lab_directive_nests_blocks_and_directives() {
        let text = ":::lab\n## Setup\n:::svg\n<svg/>\n:::\n```\n:::\n```\n:::\ntail";
        let parsed = blocks(text);
        let Block::Directive(Directive {
            kind: DirectiveKind::Lab,
            payload: DirectivePayload::Blocks { blocks: inner },
            ..
        }) = &parsed[0]
        else {
            panic!("expected lab directive");
        };
        assert_eq!(inner.len(), 3);
        assert!(matches!(inner[1], Block::Directive(Directive { kind: DirectiveKind::Svg, .. })));
        assert!(matches!(&inner[2], Block::CodeBlock { lines, .. } if lines == &[":::".to_owned()]));
        assert_eq!(parsed[1], para("tail"));
    }

    #[test]
    fn test_deep_directive_nesting_is_capped() {
        let (parsed, warnings) = parse(&":::lab\n".repeat(MAX_NESTING + 5));
        let mut level = parsed.as_slice();
        let mut directives = 0;
        while let [
            Block::Directive(Directive {
                payload: DirectivePayload::Blocks { blocks },
                ..
            }),
        ] = level
        {
            directives += 1;
            level = blocks;
        }
        assert_eq!(directives, MAX_NESTING + 1);
        assert_eq!(level.to_vec(), vec![para(":::lab\n:::lab\n:::lab\n:::lab")]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_deep_callout_nesting_is_capped() {
        let text: String = (1..=MAX_NESTING + 3)
            .map(|n| format!("{} [!NOTE]\n", ">".repeat(n)))
            .collect();
        let (parsed, warnings) = parse(&text);
        let mut level = parsed.as_slice();
        let mut callouts = 0;
        while let [Block::Callout { body, .. }] = level {
            callouts += 1;
            level = body;
        }
        assert_eq!(callouts, MAX_NESTING + 1);
        assert!(matches!(level, [Block::Paragraph { .. }]));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_unknown_directive_is_paragraph() {
        assert_eq!(blocks(":::weird\nx\n:::"), vec![para(":::weird\nx\n:::")]);
    }

    #[test]
    fn test_scene_sources_skip_code_and_recurse() {
        let body = "```\n:::excalidraw\nin code\n```\n:::scribble\nA\n:::\n:::lab\n:::excalidraw\nB\n:::\n:::\n:::svg\nC\n:::";
        assert_eq!(scene_sources(body), vec!["A".to_owned(), "B".to_owned()]);
    }

    #[test]
    fn test_paragraph_stops_at_block_start() {
        assert_eq!(
            blocks("line one\nline two\n# Heading"),
            vec![
                para("line one\nline two"),
                Block::Heading {
                    level: 1,
                    id: "heading".to_owned(),
                    content: vec![Inline::text("Heading")],
                },
            ]
        );
    }
}
