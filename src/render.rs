use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, DocProperties, ExcelDateTime, Format, Workbook, Worksheet};

use crate::error::WriteError;
use crate::layout::{CellValue, Column, Statement, Style};

const SHADE: u32 = 0xDDDDDD;
const CURRENCY_FORMAT: &str = r#"_($* #,##0.00_);_($* (#,##0.00);_($* "-"??_);_(@_)"#;
const DATE_FORMAT: &str = "m/d/yy";

/// Renders the statement as an XLSX workbook with a single sheet.
///
/// The workbook is fully built in memory; nothing touches the disk until [`persist`].
pub fn to_xlsx(statement: &Statement) -> Result<Vec<u8>, WriteError> {
    let mut workbook = Workbook::new();
    // Fixed creation time, so that identical runs produce identical files
    let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

    let worksheet = workbook.add_worksheet();
    let mut cells: BTreeMap<(u32, Column), Option<&CellValue>> = BTreeMap::new();
    for cell in &statement.cells {
        cells.insert((cell.row, cell.column), Some(&cell.value));
    }
    for directive in &statement.directives {
        for row in directive.first_row..=directive.last_row {
            for column in directive.first_column.0..=directive.last_column.0 {
                cells.entry((row, Column(column))).or_insert(None);
            }
        }
    }

    for ((row, column), value) in cells {
        let styles = statement
            .directives
            .iter()
            .filter(|directive| directive.covers(row, column))
            .map(|directive| directive.style);
        let format = format_for(styles);
        write_cell(worksheet, row - 1, column.0, value, &format)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn format_for(styles: impl Iterator<Item = Style>) -> Format {
    styles.fold(Format::new(), |format, style| match style {
        Style::Bold => format.set_bold(),
        Style::Shaded => format.set_background_color(Color::RGB(SHADE)),
        Style::Currency => format.set_num_format(CURRENCY_FORMAT),
        Style::Date => format.set_num_format(DATE_FORMAT),
    })
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    column: u16,
    value: Option<&CellValue>,
    format: &Format,
) -> Result<(), WriteError> {
    match value {
        Some(CellValue::Text(text)) => {
            worksheet.write_string_with_format(row, column, text, format)?;
        }
        Some(CellValue::Number(number)) => {
            let number = number.to_f64().unwrap_or_default();
            worksheet.write_number_with_format(row, column, number, format)?;
        }
        Some(CellValue::Date(date)) => {
            let date = ExcelDateTime::from_ymd(
                u16::try_from(date.year()).unwrap_or_default(),
                date.month() as u8,
                date.day() as u8,
            )?;
            worksheet.write_datetime_with_format(row, column, &date, format)?;
        }
        Some(CellValue::Formula(formula)) => {
            worksheet.write_formula_with_format(row, column, formula.as_str(), format)?;
        }
        None => {
            worksheet.write_blank(row, column, format)?;
        }
    }
    Ok(())
}

/// Writes `bytes` to `path` in one step: either the whole file is replaced, or it is left
/// untouched
pub fn persist(bytes: &[u8], path: &Path) -> Result<(), WriteError> {
    let persist_error = |source| WriteError::Persist {
        path: path.to_owned(),
        source,
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
        _ => PathBuf::from("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(directory).map_err(persist_error)?;
    file.write_all(bytes).map_err(persist_error)?;
    file.persist(path).map_err(|err| persist_error(err.error))?;
    Ok(())
}
