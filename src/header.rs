use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ExtractError;
use crate::model::{Row, Table};

/// A row must hit at least this many distinct keywords to count as a header.
pub const HEADER_KEYWORD_THRESHOLD: usize = 2;

const DEFAULT_KEYWORDS: &[&str] = &[
    "Item",
    "Descrição",
    "Unid.",
    "Quant.",
    "Vlr. Unit.",
    "Vlr. Total",
    "Quantidade",
    "Valor",
    "Código",
    "Nome",
    "Preço",
    "Total",
    "Qtd",
    "Desc",
    "Quantity",
    "Price",
];

/// Keywords that identify a repeated table header.
///
/// Keywords are matched case-insensitively as substrings of a row's text, so
/// they are kept lowercased and de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderKeywords {
    keywords: Vec<String>,
}

impl HeaderKeywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self {
            keywords: Vec::new(),
        };
        out.extend(keywords);
        out
    }

    #[must_use]
    pub fn with_extra<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extend(keywords);
        self
    }

    /// Reads one keyword per line; blank lines and `#` comments are skipped.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ExtractError> {
        let mut keywords = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            keywords.push(line.to_string());
        }

        if keywords.is_empty() {
            return Err(ExtractError::InvalidOption(
                "keyword list cannot be empty".to_string(),
            ));
        }

        Ok(Self::new(keywords))
    }

    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    #[must_use]
    pub fn count_matches(&self, text: &str) -> usize {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|keyword| haystack.contains(keyword.as_str()))
            .count()
    }

    #[must_use]
    pub fn is_header_row(&self, row: &Row) -> bool {
        self.count_matches(&row.search_text()) >= HEADER_KEYWORD_THRESHOLD
    }

    fn extend<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
    }
}

impl Default for HeaderKeywords {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderReport {
    pub headers_removed: usize,
    pub blank_rows_removed: usize,
}

/// Drops rows that repeat the table header mid-document, then drops rows with
/// no usable cell at all.
pub fn remove_duplicate_headers(table: Table, keywords: &HeaderKeywords) -> (Table, HeaderReport) {
    if table.is_empty() {
        return (table, HeaderReport::default());
    }

    let (columns, rows) = table.into_parts();
    let mut report = HeaderReport::default();

    let rows = rows
        .into_iter()
        .enumerate()
        .filter(|(index, row)| {
            if keywords.is_header_row(row) {
                tracing::debug!(row = index, text = %row.search_text(), "removed repeated header");
                report.headers_removed += 1;
                return false;
            }
            true
        })
        .map(|(_, row)| row)
        .collect::<Vec<_>>();

    let before_blank = rows.len();
    let rows = rows
        .into_iter()
        .filter(|row| !row.is_blank())
        .collect::<Vec<_>>();
    report.blank_rows_removed = before_blank - rows.len();

    (Table::with_rows(columns, rows), report)
}
