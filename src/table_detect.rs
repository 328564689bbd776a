use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::model::{DetectedTable, PageText, Row, TEXT_COLUMN};
use crate::table_parse::{
    leading_indent, modal_width, normalize_row, soft_split_line_into_cells, split_line_into_cells,
};
use crate::warning::{ExtractWarning, WarningCode};

/// Lines indented at least this far continue the previous row's text.
const CONTINUATION_INDENT: usize = 2;

/// How a line of page text is cut into cells. Strategies are tried in order
/// until one yields tables with the expected column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Cells separated by tabs or runs of two or more spaces.
    Columnar,
    /// Every whitespace-separated token is a cell.
    Tokenized,
}

impl ExtractionStrategy {
    pub const ALL: [Self; 2] = [Self::Columnar, Self::Tokenized];

    fn split(self, line: &str) -> Vec<String> {
        match self {
            Self::Columnar => split_line_into_cells(line),
            Self::Tokenized => soft_split_line_into_cells(line),
        }
    }
}

impl Display for ExtractionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Columnar => f.write_str("columnar"),
            Self::Tokenized => f.write_str("tokenized"),
        }
    }
}

impl FromStr for ExtractionStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "columnar" => Ok(Self::Columnar),
            "tokenized" => Ok(Self::Tokenized),
            other => Err(format!(
                "unknown extraction strategy '{other}', expected columnar or tokenized"
            )),
        }
    }
}

fn keyed_width(rows: &[Vec<String>]) -> usize {
    let keyed = rows
        .iter()
        .filter(|row| row.first().is_some_and(|cell| !cell.is_empty()))
        .cloned()
        .collect::<Vec<_>>();
    modal_width(&keyed)
}

fn detect_tables_in_page(page: &PageText, strategy: ExtractionStrategy) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut current_rows: Vec<Vec<String>> = Vec::new();

    let flush_current = |rows: &mut Vec<Vec<String>>, tables: &mut Vec<DetectedTable>| {
        if rows.is_empty() {
            return;
        }
        tables.push(DetectedTable {
            page: page.page_number,
            rows: std::mem::take(rows),
        });
    };

    for line in page.text.lines() {
        let cells = strategy.split(line);
        let indented = leading_indent(line) >= CONTINUATION_INDENT;
        let open_width = keyed_width(&current_rows);

        // An indented line is wrapped text only when it is narrower than the
        // rows already collected; a full-width indented line is a record.
        let is_record = cells.len() >= 2 && (!indented || cells.len() >= open_width);
        if is_record {
            current_rows.push(cells);
        } else if indented && !cells.is_empty() && !current_rows.is_empty() {
            let mut row = vec![String::new(); TEXT_COLUMN];
            row.push(cells.join(" "));
            current_rows.push(row);
        } else {
            // Blank lines and flush-left lone cells (footers, totals) end the run.
            flush_current(&mut current_rows, &mut tables);
        }
    }

    flush_current(&mut current_rows, &mut tables);
    tables
}

pub(crate) fn detect_tables(pages: &[PageText], strategy: ExtractionStrategy) -> Vec<DetectedTable> {
    pages
        .iter()
        .flat_map(|page| detect_tables_in_page(page, strategy))
        .collect()
}

/// Width of a candidate table, judged from its rows that carry a key cell.
pub(crate) fn table_width(table: &DetectedTable) -> usize {
    keyed_width(&table.rows)
}

/// Keeps tables whose width equals `expected` and lays their rows out on
/// exactly that many columns.
pub(crate) fn rows_matching_width(
    tables: &[DetectedTable],
    expected: usize,
    warnings: &mut Vec<ExtractWarning>,
) -> (Vec<Row>, usize) {
    let mut rows = Vec::new();
    let mut accepted = 0;

    for (index, table) in tables.iter().enumerate() {
        let table_id = index + 1;
        let width = table_width(table);
        if width != expected {
            tracing::warn!(
                page = table.page,
                table_id,
                width,
                expected,
                "skipping table with unexpected column count"
            );
            warnings.push(
                ExtractWarning::new(
                    WarningCode::ColumnCountMismatch,
                    format!("table has {width} columns, expected {expected}"),
                )
                .with_page(table.page)
                .with_table_id(table_id),
            );
            continue;
        }

        accepted += 1;
        rows.extend(table.rows.iter().map(|cells| normalize_row(cells, expected)));
    }

    (rows, accepted)
}
