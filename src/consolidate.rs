use crate::model::{Cell, Row, TEXT_COLUMN, Table};

/// Shortest trimmed key value (in characters) accepted as an item code.
pub const MIN_KEY_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Carries an item code and starts a new record.
    Primary,
    /// No item code, but has description text to attach to a record.
    Continuation,
    /// Neither an item code nor description text.
    Blank,
}

#[must_use]
pub fn classify_row(row: &Row) -> RowKind {
    if has_item_code(row.key()) {
        RowKind::Primary
    } else if row.description().is_blank() {
        RowKind::Blank
    } else {
        RowKind::Continuation
    }
}

fn has_item_code(cell: &Cell) -> bool {
    !cell.is_blank() && cell.as_text().trim().chars().count() >= MIN_KEY_LEN
}

/// Appends `continuation` to `existing` with a single separating space.
#[must_use]
pub fn merge_text(existing: &Cell, continuation: &str) -> String {
    let existing = if existing.is_blank() {
        String::new()
    } else {
        existing.as_text()
    };
    format!("{} {}", existing.trim(), continuation.trim())
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub continuations_merged: usize,
    pub orphans_merged: usize,
    pub rows_dropped: usize,
}

/// Folds wrapped description lines back into the record they belong to.
///
/// A primary row opens a record; continuation rows that directly follow it
/// extend its description. A blank row closes the record, after which any
/// further continuation is an orphan and is still attached to the last
/// emitted record. Rows that precede every primary row have nowhere to go
/// and are dropped, so a table without item codes comes back empty.
pub fn consolidate_broken_rows(table: Table) -> (Table, ConsolidationReport) {
    if table.is_empty() {
        return (table, ConsolidationReport::default());
    }

    let (columns, rows) = table.into_parts();
    let input_len = rows.len();
    let mut report = ConsolidationReport::default();
    let mut records: Vec<Row> = Vec::new();
    let mut open = false;

    for (index, row) in rows.into_iter().enumerate() {
        match classify_row(&row) {
            RowKind::Primary => {
                records.push(row);
                open = true;
            }
            RowKind::Continuation => {
                let Some(record) = records.last_mut() else {
                    tracing::debug!(row = index, "dropped continuation with no preceding record");
                    report.rows_dropped += 1;
                    continue;
                };

                let text = row.description().as_text();
                let merged = merge_text(record.description(), &text);
                if let Some(cell) = record.cells.get_mut(TEXT_COLUMN) {
                    *cell = Cell::Text(merged);
                }

                if open {
                    report.continuations_merged += 1;
                } else {
                    tracing::debug!(row = index, text = %text.trim(), "attached orphan continuation");
                    report.orphans_merged += 1;
                }
            }
            RowKind::Blank => {
                open = false;
                report.rows_dropped += 1;
            }
        }
    }

    tracing::debug!(
        input_rows = input_len,
        output_rows = records.len(),
        "consolidated broken rows"
    );

    (Table::with_rows(columns, records), report)
}

#[cfg(test)]
mod tests {
    use super::{RowKind, classify_row, consolidate_broken_rows, merge_text};
    use crate::model::{Cell, Row, Table};

    fn table(rows: &[(Option<&str>, Option<&str>)]) -> Table {
        let rows = rows
            .iter()
            .map(|(key, text)| Row::from_iter([*key, *text]))
            .collect();
        Table::new(vec!["Item".to_string(), "Descrição".to_string()], rows)
            .expect("fixture should be rectangular")
    }

    #[test]
    fn classifies_by_key_length_and_text() {
        let row = |key: Option<&str>, text: Option<&str>| Row::from_iter([key, text]);
        assert_eq!(classify_row(&row(Some("001"), None)), RowKind::Primary);
        assert_eq!(classify_row(&row(Some(" 12 "), Some("x"))), RowKind::Continuation);
        assert_eq!(classify_row(&row(Some("nan"), Some("x"))), RowKind::Continuation);
        assert_eq!(classify_row(&row(None, Some("nan"))), RowKind::Blank);
    }

    #[test]
    fn numeric_item_codes_count_as_primary() {
        let row = Row::new(vec![Cell::Number(1001.0), Cell::text("Parafuso")]);
        assert_eq!(classify_row(&row), RowKind::Primary);
    }

    #[test]
    fn merge_treats_missing_description_as_empty() {
        assert_eq!(merge_text(&Cell::Missing, "  cont. "), "cont.");
        assert_eq!(merge_text(&Cell::text("nan"), "cont."), "cont.");
        assert_eq!(merge_text(&Cell::text(" Produto "), "longo"), "Produto longo");
    }

    #[test]
    fn blank_row_ends_record_but_orphans_still_attach() {
        let input = table(&[
            (Some("001"), Some("Produto A")),
            (Some("x"), Some("linha dois")),
            (None, None),
            (None, Some("linha órfã")),
            (Some("002"), Some("Produto B")),
        ]);

        let (out, report) = consolidate_broken_rows(input);
        assert_eq!(out.column_values(1), vec![
            "Produto A linha dois linha órfã",
            "Produto B"
        ]);
        assert_eq!(report.continuations_merged, 1);
        assert_eq!(report.orphans_merged, 1);
        assert_eq!(report.rows_dropped, 1);
    }

    #[test]
    fn leading_continuations_are_dropped() {
        let input = table(&[(None, Some("solto")), (Some("001"), Some("Produto A"))]);
        let (out, report) = consolidate_broken_rows(input);
        assert_eq!(out.column_values(0), vec!["001"]);
        assert_eq!(report.rows_dropped, 1);
    }

    #[test]
    fn single_column_tables_drop_non_primary_rows() {
        let rows = vec![Row::from_iter(["001"]), Row::from_iter(["-"])];
        let input = Table::new(vec!["Item".to_string()], rows).expect("valid table");
        let (out, _) = consolidate_broken_rows(input);
        assert_eq!(out.column_values(0), vec!["001"]);
    }

    #[test]
    fn other_columns_of_primary_row_are_kept() {
        let rows = vec![
            Row::from_iter(["001", "Produto", "10"]),
            Row::new(vec![Cell::Missing, Cell::text("longo"), Cell::text("99")]),
        ];
        let columns = ["Item", "Descrição", "Quantidade"].map(str::to_string).to_vec();
        let input = Table::new(columns, rows).expect("valid table");
        let (out, _) = consolidate_broken_rows(input);
        assert_eq!(out.rows()[0].cells, vec![
            Cell::text("001"),
            Cell::text("Produto longo"),
            Cell::text("10")
        ]);
    }
}
