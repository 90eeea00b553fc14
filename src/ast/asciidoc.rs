//! A block-level AsciiDoc reader.
//!
//! Builds the [`AstNode`] tree the checker walks: document header and
//! attribute entries, nested sections, paragraphs, delimited blocks, lists
//! and tables. Inline markup is left untouched.

use crate::ast::{AstNode, SourceLocation};
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref DOC_TITLE: Regex = Regex::new(r"^=\s+(\S.*)$").unwrap();
    static ref SECTION_TITLE: Regex = Regex::new(r"^(={2,6})\s+(\S.*)$").unwrap();
    static ref ATTRIBUTE_ENTRY: Regex =
        Regex::new(r"^:(!?)([A-Za-z0-9_][A-Za-z0-9_-]*)(!?):(?:\s+(.*))?$").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"^\s*(\*{1,5}|-|\.{1,5})\s+(\S.*)$").unwrap();
    static ref BLOCK_TITLE: Regex = Regex::new(r"^\.([^.\s].*)$").unwrap();
    static ref BLOCK_ATTRIBUTES: Regex = Regex::new(r"^\[[^\]]*\]$").unwrap();
    static ref ADMONITION: Regex =
        Regex::new(r"^(NOTE|TIP|IMPORTANT|WARNING|CAUTION):\s+(.*)$").unwrap();
    static ref BLOCK_MACRO: Regex = Regex::new(r"^(image|video|audio|toc)::\S*\[.*\]$").unwrap();
}

const TABLE_DELIMITER: &str = "|===";

/// Read and parse an AsciiDoc file. The file stem becomes the `docname`
/// attribute, as Asciidoctor does.
pub fn parse_file(path: &Path) -> Result<AstNode> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let mut document = parse(&content, Some(path.display().to_string()));
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        document
            .attributes
            .entry("docname".to_string())
            .or_insert_with(|| Value::String(stem.to_string()));
    }

    Ok(document)
}

/// Parse AsciiDoc source into a `document` node.
pub fn parse(content: &str, file: Option<String>) -> AstNode {
    let lines: Vec<&str> = content.lines().collect();
    let mut reader = Reader::new(&lines, 0, file);

    let mut document = AstNode::new("document").with_location(reader.location());
    reader.read_header(&mut document);

    // Open sections, innermost last, each with its level.
    let mut stack: Vec<(usize, AstNode)> = vec![(0, document)];

    loop {
        reader.skip_blank();
        let Some(line) = reader.peek() else { break };

        if let Some((name, value)) = attribute_entry(line) {
            reader.advance();
            let document = &mut stack[0].1;
            match value {
                Some(value) => {
                    document.attributes.insert(name, Value::String(value));
                }
                None => {
                    document.attributes.remove(&name);
                }
            }
            continue;
        }

        if let Some(caps) = SECTION_TITLE.captures(line) {
            let level = caps[1].len() - 1;
            let section = AstNode::section(caps[2].trim()).with_location(reader.location());
            reader.advance();

            while stack.len() > 1 && stack.last().map_or(false, |(l, _)| *l >= level) {
                close_section(&mut stack);
            }
            stack.push((level, section));
            continue;
        }

        if let Some(block) = reader.read_block() {
            if let Some((_, parent)) = stack.last_mut() {
                parent.push(block);
            }
        }
    }

    while stack.len() > 1 {
        close_section(&mut stack);
    }

    stack.pop().map(|(_, document)| document).unwrap_or_default()
}

fn close_section(stack: &mut Vec<(usize, AstNode)>) {
    if let Some((_, closed)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.push(closed);
        }
    }
}

fn attribute_entry(line: &str) -> Option<(String, Option<String>)> {
    let caps = ATTRIBUTE_ENTRY.captures(line)?;
    let name = caps[2].to_string();
    let unset = !caps[1].is_empty() || !caps[3].is_empty();
    if unset {
        return Some((name, None));
    }
    let value = caps.get(4).map(|m| m.as_str().trim().to_string());
    Some((name, Some(value.unwrap_or_default())))
}

/// The block a delimiter line opens and whether its content holds nested
/// blocks (compound) or raw lines (verbatim).
fn delimited_context(line: &str) -> Option<(&'static str, bool)> {
    if line == "--" {
        return Some(("open", true));
    }
    if line.len() < 4 {
        return None;
    }
    let first = line.chars().next()?;
    if !line.chars().all(|c| c == first) {
        return None;
    }
    match first {
        '-' => Some(("listing", false)),
        '.' => Some(("literal", false)),
        '+' => Some(("pass", false)),
        '=' => Some(("example", true)),
        '*' => Some(("sidebar", true)),
        '_' => Some(("quote", true)),
        '/' => Some(("comment", false)),
        _ => None,
    }
}

/// `Some(true)` for `%header`/`options="header"`, `Some(false)` for
/// `noheader`, `None` when the attribute line says neither.
fn header_option(attributes: &str) -> Option<bool> {
    attributes
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| matches!(c, ',' | '%' | '"' | '\'' | '=') || c.is_whitespace())
        .find_map(|token| match token {
            "header" => Some(true),
            "noheader" => Some(false),
            _ => None,
        })
}

fn is_block_boundary(line: &str) -> bool {
    line.trim().is_empty()
        || delimited_context(line).is_some()
        || line == TABLE_DELIMITER
        || BLOCK_ATTRIBUTES.is_match(line)
        || SECTION_TITLE.is_match(line)
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") && !line.starts_with("///")
}

struct Reader<'a> {
    lines: &'a [&'a str],
    /// Line number (0-based) of `lines[0]` in the source file.
    offset: usize,
    pos: usize,
    file: Option<String>,
}

impl<'a> Reader<'a> {
    fn new(lines: &'a [&'a str], offset: usize, file: Option<String>) -> Self {
        Self {
            lines,
            offset,
            pos: 0,
            file,
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.offset + self.pos + 1)
    }

    fn skip_blank(&mut self) {
        while let Some(line) = self.peek() {
            if line.trim().is_empty() || is_comment(line) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn next_nonblank(&self) -> Option<&'a str> {
        self.lines[self.pos.min(self.lines.len())..]
            .iter()
            .copied()
            .find(|line| !line.trim().is_empty())
    }

    fn read_header(&mut self, document: &mut AstNode) {
        self.skip_blank();
        let Some(caps) = self.peek().and_then(|line| DOC_TITLE.captures(line)) else {
            return;
        };
        document.title = Some(caps[1].trim().to_string());
        document.source_location = Some(self.location());
        self.advance();

        while let Some(line) = self.peek() {
            if is_comment(line) {
                self.advance();
                continue;
            }
            match attribute_entry(line) {
                Some((name, Some(value))) => {
                    document.attributes.insert(name, Value::String(value));
                }
                Some((name, None)) => {
                    document.attributes.remove(&name);
                }
                // Author and revision lines.
                None if !line.trim().is_empty() && !is_block_boundary(line) => {}
                None => break,
            }
            self.advance();
        }
    }

    /// Read the next block, skipping leading blank lines, comments and block
    /// metadata. Returns `None` once the input is exhausted.
    fn read_block(&mut self) -> Option<AstNode> {
        let mut title = None;
        let mut attributes = None;

        loop {
            self.skip_blank();
            let line = self.peek()?;

            if let Some(caps) = BLOCK_TITLE.captures(line) {
                title = Some(caps[1].to_string());
                self.advance();
                continue;
            }
            if BLOCK_ATTRIBUTES.is_match(line) {
                attributes = Some(line);
                self.advance();
                continue;
            }

            let mut block = if let Some((context, compound)) = delimited_context(line) {
                let block = self.read_delimited(context, compound);
                if context == "comment" {
                    title = None;
                    attributes = None;
                    continue;
                }
                block
            } else if line == TABLE_DELIMITER {
                self.read_table(attributes.and_then(header_option))
            } else if let Some(caps) = LIST_ITEM.captures(line) {
                let marker = caps[1].to_string();
                self.read_list(&marker, &mut Vec::new())
            } else if BLOCK_MACRO.is_match(line) {
                let context = line.split("::").next().unwrap_or("image").to_string();
                let block = AstNode::new(context).with_location(self.location());
                self.advance();
                block
            } else if line == "'''" {
                let block = AstNode::new("thematic_break").with_location(self.location());
                self.advance();
                block
            } else if line == "<<<" {
                let block = AstNode::new("page_break").with_location(self.location());
                self.advance();
                block
            } else {
                self.read_paragraph()
            };

            if block.title.is_none() {
                block.title = title;
            }
            return Some(block);
        }
    }

    fn read_paragraph(&mut self) -> AstNode {
        let location = self.location();
        let mut lines = Vec::new();

        // The first line always belongs to the paragraph so the reader
        // makes progress on stray boundary lines inside compound blocks.
        if let Some(first) = self.advance() {
            lines.push(first.to_string());
        }
        while let Some(line) = self.peek() {
            if is_block_boundary(line) {
                break;
            }
            if !is_comment(line) {
                lines.push(line.to_string());
            }
            self.advance();
        }

        let literal = lines
            .first()
            .map_or(false, |first| first.starts_with(char::is_whitespace));

        if literal {
            return AstNode {
                lines: lines.iter().map(|l| l.trim().to_string()).collect(),
                ..AstNode::new("literal")
            }
            .with_location(location);
        }

        if let Some(caps) = lines.first().and_then(|first| ADMONITION.captures(first)) {
            let first = caps[2].to_string();
            lines[0] = first;
            return AstNode {
                lines,
                ..AstNode::new("admonition")
            }
            .with_location(location);
        }

        AstNode {
            lines,
            ..AstNode::new("paragraph")
        }
        .with_location(location)
    }

    /// Compound blocks are located at their opening delimiter. Verbatim
    /// blocks are located at their first content line, which `lines[0]` is.
    fn read_delimited(&mut self, context: &str, compound: bool) -> AstNode {
        let delimiter_location = self.location();
        let delimiter = self.advance().unwrap_or_default();
        let start = self.pos;
        let location = if compound {
            delimiter_location
        } else {
            self.location()
        };

        while let Some(line) = self.peek() {
            if line == delimiter {
                break;
            }
            self.advance();
        }
        let end = self.pos;
        // Closing delimiter; an unterminated block runs to the end of input.
        self.advance();

        let content = &self.lines[start..end];
        let mut block = AstNode::new(context).with_location(location);

        if compound {
            let mut inner = Reader::new(content, self.offset + start, self.file.clone());
            while let Some(child) = inner.read_block() {
                block.push(child);
            }
        } else {
            block.lines = content.iter().map(|l| l.to_string()).collect();
        }

        block
    }

    /// Read a `|===` table. The first row is a header when `header` says so
    /// or, with no explicit option, when the first line is followed by a
    /// blank line. Header rows are kept out of `rows`.
    fn read_table(&mut self, header: Option<bool>) -> AstNode {
        let location = self.location();
        self.advance();

        let implicit_header = match (self.peek(), self.lines.get(self.pos + 1)) {
            (Some(first), Some(second)) => {
                first.trim_start().starts_with('|')
                    && first != TABLE_DELIMITER
                    && second.trim().is_empty()
            }
            _ => false,
        };
        let has_header = header.unwrap_or(implicit_header);

        let mut cells: Vec<String> = Vec::new();
        let mut columns: Option<usize> = None;
        let mut first_line_cells = 0;
        let mut seen_blank = false;

        while let Some(line) = self.advance() {
            if line == TABLE_DELIMITER {
                break;
            }
            if line.trim().is_empty() {
                if columns.is_none() && !cells.is_empty() {
                    seen_blank = true;
                    columns = Some(cells.len());
                }
                continue;
            }

            let mut segments = line.split('|');
            // Text before the first separator continues the previous cell.
            if let Some(leading) = segments.next() {
                let leading = leading.trim();
                if !leading.is_empty() {
                    match cells.last_mut() {
                        Some(cell) => {
                            cell.push('\n');
                            cell.push_str(leading);
                        }
                        None => cells.push(leading.to_string()),
                    }
                }
            }
            let new_cells: Vec<String> = segments.map(|s| s.trim().to_string()).collect();

            if columns.is_none() && !seen_blank && cells.is_empty() {
                first_line_cells = new_cells.len();
                if first_line_cells > 1 {
                    columns = Some(first_line_cells);
                }
            }
            cells.extend(new_cells);
        }

        let columns = columns.unwrap_or(first_line_cells.max(1)).max(1);
        let mut rows: Vec<Vec<String>> = cells.chunks(columns).map(|row| row.to_vec()).collect();
        let header_rows = if has_header && !rows.is_empty() {
            rows.drain(..1).collect()
        } else {
            Vec::new()
        };

        AstNode::table(rows)
            .with_header_rows(header_rows)
            .with_location(location)
    }

    fn read_list(&mut self, marker: &str, ancestors: &mut Vec<String>) -> AstNode {
        let context = if marker.starts_with('.') { "olist" } else { "ulist" };
        let mut list = AstNode::new(context).with_location(self.location());
        ancestors.push(marker.to_string());

        'items: while let Some(line) = self.peek() {
            let Some((item_marker, text)) = list_item(line) else {
                break;
            };
            if item_marker != marker {
                break;
            }

            let mut item = AstNode::list_item(text).with_location(self.location());
            self.advance();

            loop {
                let Some(line) = self.peek() else {
                    list.push(item);
                    break 'items;
                };

                if line.trim().is_empty() {
                    if self.next_nonblank().and_then(list_item).is_some() {
                        self.skip_blank();
                        continue;
                    }
                    list.push(item);
                    break 'items;
                }

                if let Some((next_marker, _)) = list_item(line) {
                    if next_marker == marker {
                        break;
                    }
                    if ancestors.iter().any(|m| *m == next_marker) {
                        list.push(item);
                        break 'items;
                    }
                    let nested = self.read_list(&next_marker, ancestors);
                    item.push(nested);
                    continue;
                }

                if line == "+" {
                    self.advance();
                    if let Some(attached) = self.read_block() {
                        item.push(attached);
                    }
                    continue;
                }

                if is_block_boundary(line) {
                    list.push(item);
                    break 'items;
                }

                if !is_comment(line) {
                    let text = item.text.get_or_insert_with(String::new);
                    text.push('\n');
                    text.push_str(line.trim());
                }
                self.advance();
            }

            list.push(item);
        }

        ancestors.pop();
        list
    }
}

fn list_item(line: &str) -> Option<(String, String)> {
    let caps = LIST_ITEM.captures(line)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}
