//! Nested lists.
//!
//! Parsing happens in two steps. [`collect`] scans the run of lines that make
//! up one list into a flat arena of item and continuation lines with their
//! indentation. [`build`] then walks the arena recursively: a deeper item
//! opens a nested list under the previous item, a shallower one ends the
//! current level.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::BlockContext;
use crate::tree::{Block, List, ListItem, ListKind};

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(?:[-*+]|(\d{1,9})[.)])(?:[ \t]+(.*))?$").unwrap());

static TASK_BOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([ xX])\](?:[ \t]+(.*))?$").unwrap());

const TAB_WIDTH: usize = 4;

/// An item line: marker already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ItemLine<'s> {
    pub indent: usize,
    pub number: Option<u64>,
    pub checked: Option<bool>,
    pub text: &'s str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineKind<'s> {
    Item(ItemLine<'s>),
    /// Indented non-marker text; `after_gap` when blank lines preceded it.
    Continuation { text: &'s str, after_gap: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListLine<'s> {
    pub indent: usize,
    pub kind: LineKind<'s>,
}

/// Parse a list marker (`-`, `*`, `+`, `1.`, `1)`) with an optional task box.
pub(crate) fn parse_marker(line: &str) -> Option<ItemLine<'_>> {
    let caps = MARKER.captures(line)?;
    let number = match caps.get(1) {
        Some(digits) => Some(digits.as_str().parse().ok()?),
        None => None,
    };
    let text = caps.get(2).map_or("", |m| m.as_str().trim_end());

    let (checked, text) = match TASK_BOX.captures(text) {
        Some(task) => {
            let ticked = task.get(1).is_some_and(|m| m.as_str() != " ");
            (Some(ticked), task.get(2).map_or("", |m| m.as_str()))
        }
        None => (None, text),
    };

    Some(ItemLine {
        indent: indent_width(line),
        number,
        checked,
        text,
    })
}

/// Leading whitespace width; a tab counts as four columns.
fn indent_width(line: &str) -> usize {
    line.chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\t' => Some(TAB_WIDTH),
            _ => None,
        })
        .sum()
}

/// Scan the list starting at `lines[start]`. Returns the arena and the index
/// of the first line after the list, or `None` if `lines[start]` is not an
/// item.
pub(crate) fn collect<'s>(lines: &[&'s str], start: usize) -> Option<(Vec<ListLine<'s>>, usize)> {
    let first = parse_marker(lines[start])?;
    let base = first.indent;
    let mut arena = vec![ListLine {
        indent: base,
        kind: LineKind::Item(first),
    }];

    let mut gap = false;
    let mut i = start + 1;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            let next = lines[i..].iter().position(|l| !l.trim().is_empty());
            match next {
                Some(offset) if continues(lines[i + offset], base) => {
                    gap = true;
                    i += offset;
                    continue;
                }
                _ => break,
            }
        }

        if let Some(item) = parse_marker(line) {
            if item.indent < base {
                break;
            }
            arena.push(ListLine {
                indent: item.indent,
                kind: LineKind::Item(item),
            });
        } else {
            let indent = indent_width(line);
            if indent <= base {
                break;
            }
            arena.push(ListLine {
                indent,
                kind: LineKind::Continuation {
                    text: line.trim(),
                    after_gap: gap,
                },
            });
        }
        gap = false;
        i += 1;
    }
    Some((arena, i))
}

fn continues(line: &str, base: usize) -> bool {
    parse_marker(line).map_or_else(|| indent_width(line) > base, |item| item.indent >= base)
}

/// Build one list level from `arena[*cursor..]`. Items at `base_indent`
/// belong to this level; deeper items recurse; shallower lines end it.
pub(crate) fn build(
    arena: &[ListLine<'_>],
    cursor: &mut usize,
    base_indent: usize,
    ctx: &mut BlockContext<'_>,
) -> List {
    let (kind, start) = match arena.get(*cursor).map(|line| &line.kind) {
        Some(LineKind::Item(first)) if first.checked.is_some() => (ListKind::Task, None),
        Some(LineKind::Item(ItemLine {
            number: Some(n), ..
        })) => (ListKind::Ordered, Some(*n)),
        _ => (ListKind::Unordered, None),
    };

    let mut items: Vec<ListItem> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    while let Some(line) = arena.get(*cursor) {
        if line.indent < base_indent {
            break;
        }
        match &line.kind {
            LineKind::Item(item) if line.indent == base_indent || items.is_empty() => {
                flush(&mut pending, &mut items, ctx);
                items.push(ListItem {
                    checked: item.checked,
                    content: ctx.inlines(item.text),
                    children: Vec::new(),
                });
                *cursor += 1;
            }
            LineKind::Item(_) => {
                flush(&mut pending, &mut items, ctx);
                let nested = build(arena, cursor, line.indent, ctx);
                if let Some(parent) = items.last_mut() {
                    parent.children.push(Block::List(nested));
                }
            }
            LineKind::Continuation { text, after_gap } => {
                if *after_gap {
                    flush(&mut pending, &mut items, ctx);
                }
                pending.push(*text);
                *cursor += 1;
            }
        }
    }
    flush(&mut pending, &mut items, ctx);

    List { kind, start, items }
}

fn flush(pending: &mut Vec<&str>, items: &mut [ListItem], ctx: &mut BlockContext<'_>) {
    if pending.is_empty() {
        return;
    }
    let text = pending.join("\n");
    pending.clear();
    if let Some(item) = items.last_mut() {
        item.children.push(Block::Paragraph {
            content: ctx.inlines(&text),
        });
    }
}
