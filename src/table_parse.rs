use std::collections::HashMap;

use crate::model::{Cell, Row};

/// Leading whitespace (in columns, tabs count as four) before a line's first
/// glyph.
pub(crate) fn leading_indent(line: &str) -> usize {
    line.chars()
        .take_while(|ch| ch.is_whitespace())
        .map(|ch| if ch == '\t' { 4 } else { 1 })
        .sum()
}

pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in trimmed.chars() {
        if ch == '\t' {
            if !current.trim().is_empty() {
                cells.push(current.trim().to_string());
                current.clear();
            }
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                if !current.trim().is_empty() {
                    cells.push(current.trim().to_string());
                    current.clear();
                }
                continue;
            }
            current.push(' ');
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }

    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }

    cells
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Fits raw cells to exactly `width` columns. Short rows are padded with
/// missing cells; overflow cells are folded into the last column.
pub(crate) fn normalize_row(cells: &[String], width: usize) -> Row {
    let mut out = cells
        .iter()
        .take(width)
        .map(|cell| to_cell(cell))
        .collect::<Vec<_>>();

    if cells.len() > width && width > 0 {
        let overflow = cells[width - 1..]
            .iter()
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        out[width - 1] = to_cell(&overflow);
    }

    out.resize(width, Cell::Missing);
    Row::new(out)
}

fn to_cell(value: &str) -> Cell {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Cell::Missing
    } else {
        Cell::text(trimmed)
    }
}

pub(crate) fn modal_width(rows: &[Vec<String>]) -> usize {
    let mut freq = HashMap::new();
    for width in rows.iter().map(Vec::len) {
        *freq.entry(width).or_insert(0_usize) += 1;
    }

    freq.into_iter()
        .max_by_key(|(width, count)| (*count, *width))
        .map_or(0, |(width, _)| width)
}

#[cfg(test)]
mod tests {
    use super::{
        leading_indent, modal_width, normalize_row, soft_split_line_into_cells,
        split_line_into_cells,
    };
    use crate::model::Cell;

    #[test]
    fn splits_double_space_separated_cells() {
        let cells = split_line_into_cells("001  Produto A  10  100.0");
        assert_eq!(cells, vec!["001", "Produto A", "10", "100.0"]);
    }

    #[test]
    fn splits_tab_separated_cells() {
        let cells = split_line_into_cells("001\tParafuso\t3");
        assert_eq!(cells, vec!["001", "Parafuso", "3"]);
    }

    #[test]
    fn soft_splits_single_space_cells() {
        let cells = soft_split_line_into_cells("001 Parafuso 3");
        assert_eq!(cells, vec!["001", "Parafuso", "3"]);
    }

    #[test]
    fn measures_indentation() {
        assert_eq!(leading_indent("      longo"), 6);
        assert_eq!(leading_indent("\tlongo"), 4);
        assert_eq!(leading_indent("001  longo"), 0);
    }

    #[test]
    fn pads_short_rows_with_missing_cells() {
        let row = normalize_row(&["".to_string(), "longo".to_string()], 4);
        assert_eq!(row.cells, vec![
            Cell::Missing,
            Cell::text("longo"),
            Cell::Missing,
            Cell::Missing
        ]);
    }

    #[test]
    fn folds_overflow_into_last_column() {
        let cells = ["001", "Produto", "10", "1.234", "56"].map(str::to_string);
        let row = normalize_row(&cells, 4);
        assert_eq!(row.cells[3], Cell::text("1.234 56"));
    }

    #[test]
    fn detects_modal_width() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["1".to_string(), "2".to_string()],
            vec!["x".to_string()],
        ];
        assert_eq!(modal_width(&rows), 2);
    }
}
