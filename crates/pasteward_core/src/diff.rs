//! Line-level diff tables between two pastes.

use serde::Serialize;
use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::fmt::Write;

/// How a row of the table relates the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Equal,
    Delete,
    Insert,
    Replace,
}

/// One numbered line on one side of the table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DiffLine {
    /// 1-based line number.
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub kind: RowKind,
    pub left: Option<DiffLine>,
    pub right: Option<DiffLine>,
}

/// Side-by-side diff of two pastes, left side first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffTable {
    pub left_id: String,
    pub right_id: String,
    pub rows: Vec<DiffRow>,
}

fn numbered(lines: &[&str], index: usize) -> Option<DiffLine> {
    lines.get(index).map(|text| DiffLine {
        number: index + 1,
        text: (*text).to_string(),
    })
}

/// Diff `left_code` against `right_code`, splitting both on `\n`.
pub fn diff_lines(left_id: &str, left_code: &str, right_id: &str, right_code: &str) -> DiffTable {
    let left: Vec<&str> = left_code.split('\n').collect();
    let right: Vec<&str> = right_code.split('\n').collect();

    let mut rows = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &left, &right) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let kind = match tag {
            DiffTag::Equal => RowKind::Equal,
            DiffTag::Delete => RowKind::Delete,
            DiffTag::Insert => RowKind::Insert,
            DiffTag::Replace => RowKind::Replace,
        };
        let span = old_range.len().max(new_range.len());
        for offset in 0..span {
            let left_line = (offset < old_range.len())
                .then(|| numbered(&left, old_range.start + offset))
                .flatten();
            let right_line = (offset < new_range.len())
                .then(|| numbered(&right, new_range.start + offset))
                .flatten();
            rows.push(DiffRow {
                kind,
                left: left_line,
                right: right_line,
            });
        }
    }

    DiffTable {
        left_id: left_id.to_string(),
        right_id: right_id.to_string(),
        rows,
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn paste_link(id: &str) -> String {
    let id = escape_html(id);
    format!("<a href=\"/{}\">{}</a>", id, id)
}

impl DiffTable {
    /// Rows where the two sides differ.
    pub fn changed_rows(&self) -> impl Iterator<Item = &DiffRow> {
        self.rows.iter().filter(|row| row.kind != RowKind::Equal)
    }

    pub fn has_changes(&self) -> bool {
        self.changed_rows().next().is_some()
    }

    /// Render as an HTML table whose header links back to both pastes.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<table class=\"diff\">\n<thead><tr>");
        let _ = write!(
            html,
            "<th colspan=\"2\">{}</th><th colspan=\"2\">{}</th>",
            paste_link(&self.left_id),
            paste_link(&self.right_id)
        );
        html.push_str("</tr></thead>\n<tbody>\n");
        for row in &self.rows {
            let class = match row.kind {
                RowKind::Equal => "diff_eq",
                RowKind::Delete => "diff_sub",
                RowKind::Insert => "diff_add",
                RowKind::Replace => "diff_chg",
            };
            let _ = write!(html, "<tr class=\"{}\">", class);
            for side in [&row.left, &row.right] {
                match side {
                    Some(line) => {
                        let _ = write!(
                            html,
                            "<td class=\"diff_next\">{}</td><td>{}</td>",
                            line.number,
                            escape_html(&line.text)
                        );
                    }
                    None => html.push_str("<td class=\"diff_next\"></td><td></td>"),
                }
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
        html
    }
}
