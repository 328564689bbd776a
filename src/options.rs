use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ExtractError;
use crate::model::validate_columns;
use crate::pipeline::RepairOptions;
use crate::table_detect::ExtractionStrategy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }
}

impl FromStr for PageSelection {
    type Err = ExtractError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = ExtractError::InvalidPageSelection;
        let mut pages = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("invalid page range start: '{start}'")))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("invalid page range end: '{end}'")))?;
                if start == 0 || end == 0 {
                    return Err(invalid("pages are 1-based".to_string()));
                }
                if end < start {
                    return Err(invalid(format!(
                        "invalid range '{token}': end is smaller than start"
                    )));
                }
                pages.extend(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| invalid(format!("invalid page number: '{token}'")))?;
                if page == 0 {
                    return Err(invalid("pages are 1-based".to_string()));
                }
                pages.insert(page);
            }
        }

        if pages.is_empty() {
            return Err(invalid("page selection cannot be empty".to_string()));
        }

        Ok(Self { pages })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Expected output columns; only tables with this many columns are kept.
    pub columns: Vec<String>,
    pub pages: Option<PageSelection>,
    pub delimiter: u8,
    pub strategies: Vec<ExtractionStrategy>,
    pub repair: RepairOptions,
}

impl ExtractOptions {
    #[must_use]
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ExtractError> {
        if self.columns.len() < 2 {
            return Err(ExtractError::InvalidOption(
                "at least two columns (item code and description) are required".to_string(),
            ));
        }
        if self.columns.iter().any(|name| name.trim().is_empty()) {
            return Err(ExtractError::InvalidOption(
                "column names must be non-empty".to_string(),
            ));
        }
        if self.strategies.is_empty() {
            return Err(ExtractError::InvalidOption(
                "at least one extraction strategy is required".to_string(),
            ));
        }
        validate_columns(&self.columns)
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            pages: None,
            delimiter: b',',
            strategies: ExtractionStrategy::ALL.to_vec(),
            repair: RepairOptions::default(),
        }
    }
}
