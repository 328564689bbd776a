use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::consolidate::consolidate_broken_rows;
use crate::header::{HeaderKeywords, remove_duplicate_headers};
use crate::model::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineOrder {
    /// Strip repeated headers first so a header row without an item code is
    /// never folded into the preceding record as a continuation.
    #[default]
    DedupThenConsolidate,
    ConsolidateThenDedup,
}

impl FromStr for PipelineOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "dedup-first" => Ok(Self::DedupThenConsolidate),
            "consolidate-first" => Ok(Self::ConsolidateThenDedup),
            other => Err(format!(
                "unknown pipeline order '{other}', expected dedup-first or consolidate-first"
            )),
        }
    }
}

impl Display for PipelineOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DedupThenConsolidate => f.write_str("dedup-first"),
            Self::ConsolidateThenDedup => f.write_str("consolidate-first"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairOptions {
    pub keywords: HeaderKeywords,
    pub order: PipelineOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub headers_removed: usize,
    pub blank_rows_removed: usize,
    pub continuations_merged: usize,
    pub orphans_merged: usize,
    pub rows_dropped: usize,
}

/// Runs both repair passes over `table` in the configured order.
pub fn repair_table(table: Table, options: &RepairOptions) -> (Table, RepairReport) {
    let mut report = RepairReport {
        input_rows: table.len(),
        ..RepairReport::default()
    };

    let dedup = |table: Table, report: &mut RepairReport| {
        let (table, header) = remove_duplicate_headers(table, &options.keywords);
        report.headers_removed = header.headers_removed;
        report.blank_rows_removed = header.blank_rows_removed;
        table
    };
    let consolidate = |table: Table, report: &mut RepairReport| {
        let (table, merged) = consolidate_broken_rows(table);
        report.continuations_merged = merged.continuations_merged;
        report.orphans_merged = merged.orphans_merged;
        report.rows_dropped = merged.rows_dropped;
        table
    };

    let table = match options.order {
        PipelineOrder::DedupThenConsolidate => {
            let table = dedup(table, &mut report);
            consolidate(table, &mut report)
        }
        PipelineOrder::ConsolidateThenDedup => {
            let table = consolidate(table, &mut report);
            dedup(table, &mut report)
        }
    };
    report.output_rows = table.len();

    tracing::info!(
        order = %options.order,
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        headers_removed = report.headers_removed,
        blank_rows_removed = report.blank_rows_removed,
        continuations_merged = report.continuations_merged,
        orphans_merged = report.orphans_merged,
        rows_dropped = report.rows_dropped,
        "table repaired"
    );

    (table, report)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{PipelineOrder, RepairOptions, repair_table};
    use crate::model::{Row, Table};

    fn table(rows: &[(Option<&str>, Option<&str>)]) -> Table {
        let rows = rows
            .iter()
            .map(|(key, text)| Row::from_iter([*key, *text]))
            .collect();
        Table::new(vec!["Item".to_string(), "Descrição".to_string()], rows)
            .expect("fixture should be rectangular")
    }

    #[test]
    fn parses_pipeline_order() {
        assert_eq!(
            PipelineOrder::from_str("consolidate-first"),
            Ok(PipelineOrder::ConsolidateThenDedup)
        );
        assert!(PipelineOrder::from_str("sideways").is_err());
        assert_eq!(PipelineOrder::default().to_string(), "dedup-first");
    }

    #[test]
    fn dedup_first_keeps_keyless_header_out_of_descriptions() {
        let rows = [
            (Some("001"), Some("Produto A")),
            (None, Some("Descrição Valor")),
            (Some("002"), Some("Produto B")),
        ];

        let (dedup_first, report) = repair_table(table(&rows), &RepairOptions::default());
        assert_eq!(dedup_first.column_values(1), vec!["Produto A", "Produto B"]);
        assert_eq!(report.headers_removed, 1);

        let options = RepairOptions {
            order: PipelineOrder::ConsolidateThenDedup,
            ..RepairOptions::default()
        };
        let (consolidate_first, _) = repair_table(table(&rows), &options);
        assert_eq!(consolidate_first.column_values(0), vec!["002"]);
    }

    #[test]
    fn reports_row_counts() {
        let rows = [
            (Some("Item"), Some("Descrição")),
            (Some("001"), Some("Produto A")),
            (None, Some("cont.")),
        ];
        let (out, report) = repair_table(table(&rows), &RepairOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(report.input_rows, 3);
        assert_eq!(report.output_rows, 1);
        assert_eq!(report.continuations_merged, 1);
    }
}
