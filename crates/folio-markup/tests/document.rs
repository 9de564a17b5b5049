//! End-to-end parsing of whole documents.

use std::sync::Arc;

use folio_markup::{
    AssetKind, AssetManifest, Block, CalloutKind, DirectiveKind, DirectivePayload, HtmlRenderer,
    Inline, ListKind, ParseOptions, TocEntry, parse_document, plain_text, render_manifest,
};
use folio_scene::{SceneCache, ZoomLimits};
use pretty_assertions::assert_eq;

fn parse(text: &str) -> folio_markup::Document {
    parse_document(text, &ParseOptions::default())
}

#[test]
fn test_heading_and_paragraph() {
    let doc = parse("# Title\n\nBody");
    assert_eq!(
        doc.blocks,
        vec![
            Block::Heading {
                level: 1,
                id: "title".to_owned(),
                content: vec![Inline::text("Title")],
            },
            Block::Paragraph {
                content: vec![Inline::text("Body")],
            },
        ]
    );
}

#[test]
fn test_nested_list_shape() {
    let doc = parse("- a\n  - b\n  - c\n- d");
    let [Block::List(list)] = doc.blocks.as_slice() else {
        panic!("expected a single list, got {:?}", doc.blocks);
    };
    assert_eq!(list.kind, ListKind::Unordered);
    assert_eq!(list.items.len(), 2);
    assert_eq!(plain_text(&list.items[0].content), "a");
    assert_eq!(plain_text(&list.items[1].content), "d");
    assert!(list.items[1].children.is_empty());

    let [Block::List(sub)] = list.items[0].children.as_slice() else {
        panic!("expected sublist under a");
    };
    let texts: Vec<String> = sub.items.iter().map(|i| plain_text(&i.content)).collect();
    assert_eq!(texts, vec!["b", "c"]);
}

#[test]
fn test_code_block_preserved_verbatim() {
    let doc = parse("```py\n  x = 1   \n\n\tif x:\n        pass\n```");
    assert_eq!(
        doc.blocks,
        vec![Block::CodeBlock {
            language: Some("py".to_owned()),
            lines: vec![
                "  x = 1   ".to_owned(),
                String::new(),
                "\tif x:".to_owned(),
                "        pass".to_owned(),
            ],
        }]
    );
}

#[test]
fn test_single_pipe_line_is_paragraph() {
    let doc = parse("|a|b|");
    assert_eq!(
        doc.blocks,
        vec![Block::Paragraph {
            content: vec![Inline::text("|a|b|")],
        }]
    );
}

#[test]
fn test_table_parsed() {
    let doc = parse("| a | b |\n|---|:-:|\n| 1 | 2 |");
    let [Block::Table(table)] = doc.blocks.as_slice() else {
        panic!("expected table");
    };
    assert_eq!(table.header.len(), 2);
    assert_eq!(table.rows.len(), 1);
}

#[test]
fn test_inline_emphasis_sequence() {
    let doc = parse("**a** and *b* and `c`");
    assert_eq!(
        doc.blocks,
        vec![Block::Paragraph {
            content: vec![
                Inline::Bold {
                    children: vec![Inline::text("a")]
                },
                Inline::text(" and "),
                Inline::Italic {
                    children: vec![Inline::text("b")]
                },
                Inline::text(" and "),
                Inline::Code {
                    children: vec![Inline::text("c")]
                },
            ],
        }]
    );
}

#[test]
fn test_asset_tokens_resolve_through_manifest() {
    let mut manifest = AssetManifest::new();
    let token = manifest.allocate("https://cdn.example/photo.jpg");
    let again = manifest.allocate("https://cdn.example/photo.jpg");
    let other = manifest.allocate("https://cdn.example/doc.pdf");
    assert_eq!(token, again);
    assert_ne!(token, other);

    let text = format!("![pic](asset:{token})\n{}", render_manifest(&manifest));
    let doc = parse(&text);
    assert_eq!(
        doc.blocks,
        vec![Block::Paragraph {
            content: vec![Inline::Image {
                url: "https://cdn.example/photo.jpg".to_owned(),
                alt: "pic".to_owned(),
                kind: AssetKind::ExternalLink,
            }],
        }]
    );
    assert_eq!(doc.manifest, manifest);
    assert!(doc.warnings.is_empty());
}

#[test]
fn test_unknown_token_warns_and_caller_resolver_fills_gaps() {
    let doc = parse("![x](asset:a7)");
    assert_eq!(doc.warnings, vec!["unknown asset token: asset:a7".to_owned()]);

    let lookup = |token: &str| (token == "a7").then(|| "https://img.example/7.png".to_owned());
    let doc = parse_document("![x](asset:a7)", &ParseOptions::default().with_resolver(&lookup));
    assert!(doc.warnings.is_empty());
    let Block::Paragraph { content } = &doc.blocks[0] else {
        panic!("expected paragraph");
    };
    assert!(matches!(&content[0], Inline::Image { url, .. } if url == "https://img.example/7.png"));
}

#[test]
fn test_front_matter_title_and_toc() {
    let doc = parse_document(
        "---\nauthor: Sam\n---\n# Guide\n\n## Install\n\n## Install\n\n> [!NOTE]\n> ### Inside",
        &ParseOptions::default().with_extract_title(true),
    );
    assert_eq!(doc.metadata.get("author").map(String::as_str), Some("Sam"));
    assert_eq!(doc.title.as_deref(), Some("Guide"));
    assert_eq!(
        doc.toc,
        vec![
            TocEntry {
                level: 2,
                title: "Install".to_owned(),
                id: "install".to_owned(),
            },
            TocEntry {
                level: 2,
                title: "Install".to_owned(),
                id: "install-1".to_owned(),
            },
            TocEntry {
                level: 3,
                title: "Inside".to_owned(),
                id: "inside".to_owned(),
            },
        ]
    );
    assert!(matches!(
        doc.blocks.last(),
        Some(Block::Callout {
            kind: CalloutKind::Note,
            ..
        })
    ));
}

#[test]
fn test_footnotes_numbered_and_appended() {
    let doc = parse("Alpha[^b] beta[^a] gamma[^zz].\n\n[^a]: First *defined*.\n[^b]: Second.");
    assert_eq!(doc.footnotes.len(), 2);
    assert_eq!(doc.footnotes[0].id, "a");
    assert_eq!(doc.footnotes[0].number, 1);
    assert_eq!(doc.footnotes[1].number, 2);

    let Block::Paragraph { content } = &doc.blocks[0] else {
        panic!("expected paragraph");
    };
    let refs: Vec<(String, Option<usize>)> = content
        .iter()
        .filter_map(|node| match node {
            Inline::FootnoteRef { id, number } => Some((id.clone(), *number)),
            _ => None,
        })
        .collect();
    assert_eq!(
        refs,
        vec![
            ("b".to_owned(), Some(2)),
            ("a".to_owned(), Some(1)),
            ("zz".to_owned(), None),
        ]
    );
    assert!(matches!(doc.blocks.last(), Some(Block::Footnotes { entries }) if entries.len() == 2));
}

#[test]
fn test_scene_directive_uses_shared_cache() {
    let cache = SceneCache::new();
    let body = r#"{"type":"excalidraw","elements":[{"id":"r","type":"rectangle","x":0,"y":0,"width":10,"height":10}]}"#;
    let text = format!(":::excalidraw\n{body}\n:::\n\n:::excalidraw\n{body}\n:::");
    let options = ParseOptions::default().with_scene_cache(&cache);

    let first = parse_document(&text, &options);
    let second = parse_document(&text, &options);
    assert_eq!(cache.decode_count(), 1);

    let scenes: Vec<_> = first
        .blocks
        .iter()
        .chain(&second.blocks)
        .filter_map(|block| match block {
            Block::Directive(directive) => match &directive.payload {
                DirectivePayload::Scene { scene, .. } => scene.clone(),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(scenes.len(), 4);
    assert!(scenes.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn test_postmortem_directive_nests_blocks() {
    let doc = parse(":::postmortem\n## Timeline\n- 10:00 alert\n:::");
    let [Block::Directive(directive)] = doc.blocks.as_slice() else {
        panic!("expected directive");
    };
    assert_eq!(directive.kind, DirectiveKind::Postmortem);
    let DirectivePayload::Blocks { blocks } = &directive.payload else {
        panic!("expected nested blocks");
    };
    assert_eq!(blocks.len(), 2);
    assert_eq!(doc.toc.len(), 1);
}

#[test]
fn test_html_of_whole_document() {
    let doc = parse("## Steps\n\n1. one\n2. [[Page#Part|see]]\n\n---\n\n> quoted");
    let html = HtmlRenderer::new().render(&doc);
    assert_eq!(
        html,
        concat!(
            r#"<h2 id="steps">Steps</h2>"#,
            r#"<ol><li>one</li><li><a class="wikilink" href="Page#Part">see</a></li></ol>"#,
            "<hr>",
            "<blockquote><p>quoted</p></blockquote>",
        )
    );
}

#[test]
fn test_scene_directive_html_contains_svg() {
    let doc = parse(":::scribble\n{\"elements\":[{\"type\":\"ellipse\",\"width\":4,\"height\":4}]}\n:::");
    let html = HtmlRenderer::new().render(&doc);
    assert!(html.starts_with(r#"<figure class="scene scene-scribble""#));
    assert!(html.contains("<ellipse"));
    assert!(html.contains(r#"data-zoom-min="0.25" data-zoom-max="8""#));

    let html = HtmlRenderer::new()
        .with_zoom_limits(ZoomLimits { min: 0.5, max: 2.0 })
        .render(&doc);
    assert!(html.contains(r#"data-zoom-min="0.5" data-zoom-max="2""#));
}

#[test]
fn test_never_panics_on_odd_input() {
    let inputs = [
        "",
        "\u{feff}",
        ":::",
        ":::lab",
        "> ",
        "- ",
        "|",
        "| a |\n|",
        "[^x]:",
        "**",
        "![[",
        "$$",
        "```",
        "# ",
        ":::assets\n:::",
        "\t- x\n  - y\n- z",
    ];
    for input in inputs {
        let _ = parse(input);
    }
}

#[test]
fn test_deeply_nested_containers_parse_and_render() {
    for text in [
        ":::lab\n".repeat(10_000),
        ":::postmortem\n".repeat(5_000) + &":::\n".repeat(5_000),
        (1..=500).map(|n| format!("{} [!TIP]\n", ">".repeat(n))).collect(),
    ] {
        let doc = parse(&text);
        assert_eq!(doc.blocks.len(), 1);
        assert!(doc.warnings.iter().any(|w| w.starts_with("nesting deeper than")));
        assert!(!HtmlRenderer::new().render(&doc).is_empty());
    }
    assert!(folio_markup::scene_sources(&":::lab\n".repeat(10_000)).is_empty());
}

#[test]
fn test_scene_sources_match_parsed_directives() {
    let text = "Intro\n\n:::excalidraw\n{\"elements\":[]}\n:::\n\n:::postmortem\n:::scribble\n{\"elements\":[{\"type\":\"line\",\"points\":[[0,0],[5,5]]}]}\n:::\n:::\n";
    let sources = folio_markup::scene_sources(text);
    assert_eq!(sources.len(), 2);

    let cache = SceneCache::new();
    for raw in &sources {
        let _ = cache.get_or_decode(raw);
    }
    let _ = parse_document(text, &ParseOptions::default().with_scene_cache(&cache));
    assert_eq!(cache.decode_count(), 2);
}
