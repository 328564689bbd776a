//! Table extraction from text PDFs (invoices, price lists) with repair of
//! the damage page-oriented extraction leaves behind: header rows repeated on
//! every page and descriptions wrapped across several physical rows.

mod consolidate;
mod error;
mod header;
mod model;
mod options;
mod output;
mod pdf_reader;
mod pipeline;
mod table_detect;
mod table_parse;
mod warning;

use std::path::Path;

use crate::pdf_reader::{PdfSource, read_pdf_pages};
use crate::table_detect::{detect_tables, rows_matching_width};

pub use consolidate::{
    ConsolidationReport, MIN_KEY_LEN, RowKind, classify_row, consolidate_broken_rows, merge_text,
};
pub use error::ExtractError;
pub use header::{HEADER_KEYWORD_THRESHOLD, HeaderKeywords, HeaderReport, remove_duplicate_headers};
pub use model::{Cell, KEY_COLUMN, PageText, Row, TEXT_COLUMN, Table};
pub use options::{ExtractOptions, PageSelection};
pub use output::{write_csv, write_csv_to_string, write_json, write_xlsx, write_xlsx_to_buffer};
pub use pipeline::{PipelineOrder, RepairOptions, RepairReport, repair_table};
pub use table_detect::ExtractionStrategy;
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

use crate::warning::WarningCode;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub row_count: usize,
    pub table_count: usize,
    /// Strategy whose tables were used, `None` when nothing matched.
    pub strategy: Option<ExtractionStrategy>,
    pub repair: RepairReport,
    pub warnings: Vec<ExtractWarning>,
}

/// Turns page text into one repaired table, trying each configured strategy
/// until one produces tables of the expected width.
pub fn extract_from_pages(
    pages: &[PageText],
    options: &ExtractOptions,
) -> Result<(Table, ExtractionReport), ExtractError> {
    options.validate()?;

    let mut warnings = Vec::new();
    let expected = options.columns.len();

    for (attempt, strategy) in options.strategies.iter().copied().enumerate() {
        let detected = detect_tables(pages, strategy);
        let mut attempt_warnings = Vec::new();
        let (rows, table_count) = rows_matching_width(&detected, expected, &mut attempt_warnings);
        if table_count == 0 {
            tracing::debug!(%strategy, detected = detected.len(), "no matching tables");
            continue;
        }

        warnings.extend(attempt_warnings);
        if attempt > 0 {
            warnings.push(ExtractWarning::new(
                WarningCode::StrategyFallback,
                format!("earlier strategies found no matching tables; used {strategy}"),
            ));
        }

        let rows = rows.into_iter().filter(|row| !row.is_blank()).collect();
        let table = Table::new(options.columns.clone(), rows)?;
        let (table, repair) = repair_table(table, &options.repair);
        if table.is_empty() {
            warnings.push(ExtractWarning::new(
                WarningCode::EmptyResult,
                "no rows with an item code survived repair",
            ));
        }

        tracing::info!(%strategy, table_count, rows = table.len(), "extraction completed");
        let report = ExtractionReport {
            row_count: table.len(),
            table_count,
            strategy: Some(strategy),
            repair,
            warnings,
        };
        return Ok((table, report));
    }

    tracing::warn!(expected, "no table matched the expected column count");
    warnings.push(ExtractWarning::new(
        WarningCode::NoMatchingTables,
        format!("no table with {expected} columns was found"),
    ));

    Ok((
        Table::empty(options.columns.clone()),
        ExtractionReport {
            row_count: 0,
            table_count: 0,
            strategy: None,
            repair: RepairReport::default(),
            warnings,
        },
    ))
}

pub fn extract_tables_from_pdf(
    input_pdf: &Path,
    options: &ExtractOptions,
) -> Result<(Table, ExtractionReport), ExtractError> {
    options.validate()?;
    let pages = read_pdf_pages(PdfSource::Path(input_pdf), options.pages.as_ref())?;
    extract_from_pages(&pages, options)
}

pub fn extract_tables_from_pdf_bytes(
    input_pdf: &[u8],
    options: &ExtractOptions,
) -> Result<(Table, ExtractionReport), ExtractError> {
    options.validate()?;
    let pages = read_pdf_pages(PdfSource::Bytes(input_pdf), options.pages.as_ref())?;
    extract_from_pages(&pages, options)
}

pub fn extract_pdf_to_csv(
    input_pdf: &Path,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let (table, report) = extract_tables_from_pdf(input_pdf, options)?;
    write_csv(output_csv, &table, options.delimiter)?;
    Ok(report)
}

pub fn extract_pdf_to_xlsx(
    input_pdf: &Path,
    output_xlsx: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let (table, report) = extract_tables_from_pdf(input_pdf, options)?;
    write_xlsx(output_xlsx, &table)?;
    Ok(report)
}

pub fn extract_pdf_bytes_to_csv_string(
    input_pdf: &[u8],
    options: &ExtractOptions,
) -> Result<(String, ExtractionReport), ExtractError> {
    let (table, report) = extract_tables_from_pdf_bytes(input_pdf, options)?;
    let csv = write_csv_to_string(&table, options.delimiter)?;
    Ok((csv, report))
}

#[cfg(test)]
mod tests {
    use super::{ExtractOptions, ExtractionStrategy, extract_from_pages};
    use crate::model::PageText;
    use crate::warning::WarningCode;

    fn options() -> ExtractOptions {
        ExtractOptions::with_columns(["Item", "Descrição", "Quantidade", "Valor"])
    }

    fn pages(texts: &[&str]) -> Vec<PageText> {
        texts
            .iter()
            .zip(1..)
            .map(|(text, page_number)| PageText {
                page_number,
                text: (*text).to_string(),
            })
            .collect()
    }

    #[test]
    fn repairs_tables_across_pages() {
        let pages = pages(&[
            "Item  Descrição  Quantidade  Valor\n001  Produto com nome muito  10  100.0\n      longo que foi quebrado\n002  Produto B  20  200.0",
            "Item  Descrição  Quantidade  Valor\n003  Produto C  30  300.0",
        ]);

        let (table, report) = extract_from_pages(&pages, &options()).expect("extraction");
        assert_eq!(table.column_values(0), vec!["001", "002", "003"]);
        assert_eq!(
            table.column_values(1)[0],
            "Produto com nome muito longo que foi quebrado"
        );
        assert_eq!(report.table_count, 2);
        assert_eq!(report.repair.headers_removed, 2);
        assert_eq!(report.strategy, Some(ExtractionStrategy::Columnar));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn keeps_indented_records_and_drops_page_footers() {
        let pages = pages(&[
            "Item  Descrição  Quantidade  Valor\n001  Produto A  10  100.0\n   002  Produto B  20  200.0\n003  Produto C  30  300.0\nPagina 1 de 2",
        ]);

        let (table, report) = extract_from_pages(&pages, &options()).expect("extraction");
        assert_eq!(table.column_values(0), vec!["001", "002", "003"]);
        assert_eq!(
            table.column_values(1),
            vec!["Produto A", "Produto B", "Produto C"]
        );
        assert_eq!(report.repair.continuations_merged, 0);
    }

    #[test]
    fn falls_back_to_tokenized_strategy() {
        let pages = pages(&["001 Parafuso 10 2.50\n002 Porca 5 0.75"]);
        let (table, report) = extract_from_pages(&pages, &options()).expect("extraction");
        assert_eq!(table.len(), 2);
        assert_eq!(report.strategy, Some(ExtractionStrategy::Tokenized));
        assert!(
            report
                .warnings
                .iter()
                .any(|warning| warning.code == WarningCode::StrategyFallback)
        );
    }

    #[test]
    fn returns_empty_table_when_nothing_matches() {
        let pages = pages(&["Relatório  mensal"]);
        let (table, report) = extract_from_pages(&pages, &options()).expect("extraction");
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 4);
        assert_eq!(report.strategy, None);
        assert_eq!(report.warnings[0].code, WarningCode::NoMatchingTables);
    }

    #[test]
    fn rejects_single_column_layout() {
        let pages = pages(&["001  A"]);
        let options = ExtractOptions::with_columns(["Item"]);
        assert!(extract_from_pages(&pages, &options).is_err());
    }
}
