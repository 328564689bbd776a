use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::ExtractError;
use crate::model::{Cell, Table};

fn write_records<W: Write>(
    writer: &mut csv::Writer<W>,
    table: &Table,
) -> Result<(), ExtractError> {
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.cells.iter().map(Cell::to_string))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, table: &Table, delimiter: u8) -> Result<(), ExtractError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_records(&mut writer, table)
}

pub fn write_csv_to_string(table: &Table, delimiter: u8) -> Result<String, ExtractError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_records(&mut writer, table)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ExtractError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| ExtractError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

/// Writes the table as `{"columns": [...], "rows": [[...], ...]}`.
pub fn write_json(path: &Path, table: &Table) -> Result<(), ExtractError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, table)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn build_workbook(table: &Table) -> Result<Workbook, ExtractError> {
    let too_large = || ExtractError::InvalidOption("table does not fit in a worksheet".to_string());

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    for (col, name) in table.columns().iter().enumerate() {
        let col = u16::try_from(col).map_err(|_| too_large())?;
        sheet.write_string_with_format(0, col, name, &header)?;
    }

    for (index, row) in table.rows().iter().enumerate() {
        let line = u32::try_from(index + 1).map_err(|_| too_large())?;
        for (col, cell) in row.cells.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| too_large())?;
            match cell {
                Cell::Number(value) if value.is_finite() => {
                    sheet.write_number(line, col, *value)?;
                }
                Cell::Text(text) => {
                    sheet.write_string(line, col, text)?;
                }
                // Missing values stay empty cells.
                _ => {}
            }
        }
    }

    Ok(workbook)
}

/// Writes the table to a single-sheet `.xlsx` workbook with a bold header row.
pub fn write_xlsx(path: &Path, table: &Table) -> Result<(), ExtractError> {
    build_workbook(table)?.save(path)?;
    Ok(())
}

pub fn write_xlsx_to_buffer(table: &Table) -> Result<Vec<u8>, ExtractError> {
    Ok(build_workbook(table)?.save_to_buffer()?)
}
