// src/process/table.rs

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::trace;

use super::{
    normalize::{normalize_cell, normalize_header},
    ScheduleTable,
};

/// The schedule table carries the container id itself, or sits inside an
/// element that does. Layout, login and error pages have neither.
static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table#dersProgramContainer, #dersProgramContainer table")
        .expect("table selector should parse")
});
static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("row selector should parse"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no schedule table in payload")]
    MissingTable,
    #[error("schedule table has no header row")]
    MissingHeader,
}

/// Cell text exactly as it sits in the page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    /// May be ragged; [`RawTable::normalize`] fixes the width.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn normalize(self) -> ScheduleTable {
        let mut table = ScheduleTable::new(self.headers.iter().map(|h| normalize_header(h)).collect());
        for row in self.rows {
            table.push_row(row.iter().map(|c| normalize_cell(c)).collect());
        }
        table
    }
}

struct HtmlRow {
    has_th: bool,
    cells: Vec<String>,
}

/// Locate the schedule table and normalize it.
pub fn parse(html: &str) -> Result<ScheduleTable, ParseError> {
    Ok(parse_raw(html)?.normalize())
}

/// Locate the schedule table and split it into a header and data rows.
///
/// Only the `#dersProgramContainer` table counts; a page without it is
/// [`ParseError::MissingTable`] however many other tables it holds.
///
/// The header is the first multi-cell row containing `<th>` cells, else the
/// first multi-cell row, else the first non-empty row; anything above it
/// (title rows) is ignored. A data row consisting of a single spanning cell is
/// a notice, not a section, and is dropped.
pub fn parse_raw(html: &str) -> Result<RawTable, ParseError> {
    let doc = Html::parse_document(html);
    let table = doc
        .select(&TABLE_SELECTOR)
        .next()
        .ok_or(ParseError::MissingTable)?;

    let rows: Vec<HtmlRow> = table
        .select(&ROW_SELECTOR)
        .map(|tr| {
            let mut has_th = false;
            let cells = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|el| matches!(el.value().name(), "th" | "td"))
                .map(|el| {
                    has_th |= el.value().name() == "th";
                    cell_text(el)
                })
                .collect();
            HtmlRow { has_th, cells }
        })
        .collect();

    let header_idx = rows
        .iter()
        .position(|r| r.has_th && r.cells.len() > 1)
        .or_else(|| rows.iter().position(|r| r.cells.len() > 1))
        .or_else(|| rows.iter().position(|r| !r.cells.is_empty()))
        .ok_or(ParseError::MissingHeader)?;

    let mut rows = rows.into_iter().skip(header_idx);
    let headers = rows.next().map(|r| r.cells).unwrap_or_default();
    let width = headers.len();

    let rows: Vec<Vec<String>> = rows
        .map(|r| r.cells)
        .filter(|cells| !cells.is_empty() && !(cells.len() == 1 && width > 1))
        .collect();

    trace!(columns = width, rows = rows.len(), "parsed schedule table");
    Ok(RawTable { headers, rows })
}

/// Text content with `<br>` kept as a line break.
fn cell_text(cell: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}
