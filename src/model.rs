use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Position of the item/code column every row is classified by.
pub const KEY_COLUMN: usize = 0;

/// Position of the free-text description column continuation text is merged into.
pub const TEXT_COLUMN: usize = 1;

/// Token earlier stringification steps leave behind for an absent value.
const NAN_TOKEN: &str = "nan";

static MISSING: Cell = Cell::Missing;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// True for cells carrying no usable value: missing, NaN, whitespace only,
    /// or the literal `nan` token.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(value) => value.is_nan(),
            Self::Text(value) => {
                let trimmed = value.trim();
                trimmed.is_empty() || trimmed == NAN_TOKEN
            }
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// String form of the cell, empty for missing values.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    #[must_use]
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    #[must_use]
    pub fn key(&self) -> &Cell {
        self.cell(KEY_COLUMN)
    }

    #[must_use]
    pub fn description(&self) -> &Cell {
        self.cell(TEXT_COLUMN)
    }

    #[must_use]
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&MISSING)
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    /// Space-joined string form of every non-missing cell.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.cells
            .iter()
            .filter(|cell| !cell.is_missing())
            .map(Cell::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<C: Into<Cell>> FromIterator<C> for Row {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Row-oriented table with a fixed, ordered column list.
///
/// Every row is guaranteed to have exactly `columns().len()` cells; the
/// only way to build a table is through [`Table::new`] or [`Table::empty`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, ExtractError> {
        validate_columns(&columns)?;

        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.cells.len() != columns.len())
        {
            return Err(ExtractError::ShapeMismatch {
                row: index,
                expected: columns.len(),
                found: row.cells.len(),
            });
        }

        Ok(Self { columns, rows })
    }

    #[must_use]
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Rebuilds a table from rows derived from an already validated table.
    pub(crate) fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|row| row.cells.len() == columns.len()));
        Self { columns, rows }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }

    /// Column values as display strings, for assertions and exports.
    #[must_use]
    pub fn column_values(&self, index: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.cell(index).to_string())
            .collect()
    }
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Row>,
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawTable::deserialize(deserializer)?;
        Table::new(raw.columns, raw.rows).map_err(serde::de::Error::custom)
    }
}

/// Text of one PDF page as produced by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// Candidate table found in page text, before it is checked against the
/// expected column layout. An empty string marks a cell with no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
}

pub(crate) fn validate_columns(columns: &[String]) -> Result<(), ExtractError> {
    let mut seen = HashSet::new();
    for name in columns {
        if !seen.insert(name.as_str()) {
            return Err(ExtractError::InvalidColumns(format!(
                "duplicate column name '{name}'"
            )));
        }
    }
    Ok(())
}
