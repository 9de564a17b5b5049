//! Pipe tables.
//!
//! A table is a `|`-prefixed header row followed by a delimiter row such as
//! `| :--- | :---: | ---: |`. Body rows continue while lines start with `|`.
//! Rows are padded or truncated to the header width.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::BlockContext;
use crate::tree::{Alignment, Cell, Table};

static DELIMITER_CELL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:?-+:?$").unwrap());

/// Whether `lines` starts with a header row and a valid delimiter row.
pub(crate) fn is_table_start(lines: &[&str]) -> bool {
    match lines {
        [header, delimiter, ..] => is_row(header) && alignments(delimiter).is_some(),
        _ => false,
    }
}

/// Parse a table at the start of `lines`. Returns the table and the number
/// of lines consumed.
pub(crate) fn parse(lines: &[&str], ctx: &mut BlockContext<'_>) -> Option<(Table, usize)> {
    if !is_table_start(lines) {
        return None;
    }
    let header_cells = split_row(lines[0]);
    let width = header_cells.len();
    let mut alignments = alignments(lines[1])?;
    alignments.resize(width, Alignment::None);

    let header = header_cells.iter().map(|cell| ctx.inlines(cell)).collect();
    let mut rows = Vec::new();
    let mut consumed = 2;
    for line in &lines[2..] {
        if !is_row(line) {
            break;
        }
        let mut cells: Vec<Cell> = split_row(line).iter().map(|cell| ctx.inlines(cell)).collect();
        cells.resize_with(width, Vec::new);
        rows.push(cells);
        consumed += 1;
    }

    Some((
        Table {
            header,
            alignments,
            rows,
        },
        consumed,
    ))
}

fn is_row(line: &str) -> bool {
    line.trim_start()
        .strip_prefix('|')
        .is_some_and(|rest| rest.contains('|'))
}

fn alignments(line: &str) -> Option<Vec<Alignment>> {
    if !is_row(line) {
        return None;
    }
    split_row(line)
        .iter()
        .map(|cell| {
            if !DELIMITER_CELL.is_match(cell) {
                return None;
            }
            Some(match (cell.starts_with(':'), cell.ends_with(':')) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}

/// Split a row into trimmed cell texts. `\|` is a literal pipe.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = match inner.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_owned()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_owned());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetManifest, AssetResolver};
    use crate::heading::HeadingState;
    use crate::inline::InlineEnv;
    use crate::preprocess::FootnoteTable;
    use crate::tree::{Inline, plain_text};
    use pretty_assertions::assert_eq;

    fn parse_lines(text: &str) -> Option<(Table, usize)> {
        let manifest = AssetManifest::new();
        let footnotes = FootnoteTable::default();
        let mut ctx = BlockContext {
            inline: InlineEnv::new(AssetResolver::new(&manifest, None), &footnotes),
            headings: HeadingState::new(false),
            scene_cache: None,
            depth: 0,
        };
        let lines: Vec<&str> = text.lines().collect();
        parse(&lines, &mut ctx)
    }

    fn texts(cells: &[Cell]) -> Vec<String> {
        cells.iter().map(|cell| plain_text(cell)).collect()
    }

    #[test]
    fn test_split_row() {
        assert_eq!(split_row("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_row("|a|b"), vec!["a", "b"]);
        assert_eq!(split_row(r"| a \| b | c |"), vec!["a | b", "c"]);
        assert_eq!(split_row("| | x |"), vec!["", "x"]);
    }

    #[test]
    fn test_alignments() {
        assert_eq!(
            alignments("|:---|:---:|---:|---|"),
            Some(vec![
                Alignment::Left,
                Alignment::Center,
                Alignment::Right,
                Alignment::None,
            ])
        );
        assert_eq!(alignments("| --- | abc |"), None);
        assert_eq!(alignments("--- | ---"), None);
    }

    #[test]
    fn test_table_with_body() {
        let (table, consumed) =
            parse_lines("| Name | Qty |\n|:-----|----:|\n| apple | 3 |\n| **pear** |\nafter").unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(texts(&table.header), vec!["Name", "Qty"]);
        assert_eq!(table.alignments, vec![Alignment::Left, Alignment::Right]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[1],
            vec![
                vec![Inline::Bold {
                    children: vec![Inline::text("pear")]
                }],
                Vec::new(),
            ]
        );
    }

    #[test]
    fn test_extra_cells_truncated() {
        let (table, _) = parse_lines("|a|\n|---|\n|1|2|3|").unwrap();
        assert_eq!(table.rows, vec![vec![vec![Inline::text("1")]]]);
    }

    #[test]
    fn test_header_without_delimiter_is_not_a_table() {
        assert!(parse_lines("|a|b|").is_none());
        assert!(parse_lines("|a|b|\n|c|d|").is_none());
    }
}
