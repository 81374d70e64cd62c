use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::classify::{Entry, PeriodBucket};
use crate::period::Period;

pub const DATE_COLUMN: Column = Column(0);
pub const DESCRIPTION_COLUMN: Column = Column(1);
pub const DEBIT_COLUMN: Column = Column(2);
pub const CREDIT_COLUMN: Column = Column(3);
/// Summary values sit next to their label, in the description column
pub const BALANCE_COLUMN: Column = DESCRIPTION_COLUMN;

const HEADER: [&str; 4] = ["Last Posted Date", "Description", "Debit", "Credit"];
const PREVIOUS_BALANCE_LABEL: &str = "Previous Balance";
const TOTAL_DEBITS_LABEL: &str = "Total Debits";
const TOTAL_CREDITS_LABEL: &str = "Total Credits";
const NEW_BALANCE_LABEL: &str = "New Balance";

/// 0-based output column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(pub u16);

impl Column {
    pub fn letter(self) -> char {
        char::from(b'A' + self.0 as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
    /// Formula expression, including the leading `=`
    Formula(String),
}

/// A value at a 1-based row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub row: u32,
    pub column: Column,
    pub value: CellValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Style {
    Bold,
    /// Light grey background
    Shaded,
    /// Accounting number format
    Currency,
    Date,
}

/// A style applied to every cell of a rectangular range, bounds included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub style: Style,
    pub first_row: u32,
    pub last_row: u32,
    pub first_column: Column,
    pub last_column: Column,
}

impl Directive {
    pub fn covers(&self, row: u32, column: Column) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_column..=self.last_column).contains(&column)
    }
}

/// Row positions of one period's block.
///
/// A block is a title row, four summary rows, a column header row, one row per statement line
/// and a blank separator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub title_row: u32,
    pub line_count: u32,
}

impl BlockLayout {
    pub fn previous_balance_row(&self) -> u32 {
        self.title_row + 1
    }

    pub fn total_debits_row(&self) -> u32 {
        self.title_row + 2
    }

    pub fn total_credits_row(&self) -> u32 {
        self.title_row + 3
    }

    pub fn new_balance_row(&self) -> u32 {
        self.title_row + 4
    }

    pub fn header_row(&self) -> u32 {
        self.title_row + 5
    }

    pub fn first_line_row(&self) -> u32 {
        self.title_row + 6
    }

    /// Last statement line, which is the header row when the block has no line
    pub fn last_line_row(&self) -> u32 {
        self.title_row + 5 + self.line_count
    }

    pub fn next_title_row(&self) -> u32 {
        self.last_line_row() + 2
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Debits add to the balance and credits subtract from it, instead of the reverse
    pub positive_debits: bool,
    /// Statement lines ordered by description instead of first appearance
    pub sort_by_description: bool,
}

/// A laid out statement, ready to be handed to a renderer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    pub cells: Vec<Cell>,
    pub directives: Vec<Directive>,
    pub blocks: Vec<BlockLayout>,
}

impl Statement {
    #[cfg(test)]
    pub fn cell(&self, row: u32, column: Column) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|cell| cell.row == row && cell.column == column)
            .map(|cell| &cell.value)
    }

    /// Row after the last written row
    pub fn end_row(&self) -> u32 {
        self.blocks
            .last()
            .map_or(1, |block| block.next_title_row())
    }

    fn put(&mut self, row: u32, column: Column, value: CellValue) {
        self.cells.push(Cell { row, column, value });
    }

    fn put_text(&mut self, row: u32, column: Column, text: &str) {
        self.put(row, column, CellValue::Text(text.to_owned()));
    }

    fn put_line(&mut self, row: u32, entry: &Entry) {
        self.put(row, DATE_COLUMN, CellValue::Date(entry.date));
        self.put_text(row, DESCRIPTION_COLUMN, &entry.description);
        self.put(row, DEBIT_COLUMN, CellValue::Number(entry.debit));
        self.put(row, CREDIT_COLUMN, CellValue::Number(entry.credit));
    }

    /// Adds a directive unless its range is empty
    fn style(&mut self, style: Style, rows: (u32, u32), columns: (Column, Column)) {
        if rows.0 > rows.1 {
            return;
        }
        self.directives.push(Directive {
            style,
            first_row: rows.0,
            last_row: rows.1,
            first_column: columns.0,
            last_column: columns.1,
        });
    }
}

/// Lays out one block per period, each carrying the previous block's new balance forward
pub fn lay_out(periods: &[Period], buckets: &[PeriodBucket], options: LayoutOptions) -> Statement {
    let mut statement = Statement::default();
    let mut title_row = 1;
    for (period, bucket) in periods.iter().zip(buckets) {
        let block = BlockLayout {
            title_row,
            line_count: (bucket.credit.line_count() + bucket.debit.line_count()) as u32,
        };
        let previous = statement.blocks.last().copied();
        lay_out_block(&mut statement, period, bucket, block, previous, options);
        statement.blocks.push(block);
        title_row = block.next_title_row();
    }
    statement
}

fn lay_out_block(
    statement: &mut Statement,
    period: &Period,
    bucket: &PeriodBucket,
    block: BlockLayout,
    previous: Option<BlockLayout>,
    options: LayoutOptions,
) {
    let (debit_sign, credit_sign) = if options.positive_debits {
        ("", "-")
    } else {
        ("-", "")
    };
    let lines = (block.first_line_row(), block.last_line_row());
    let balance = BALANCE_COLUMN.letter();

    statement.put_text(block.title_row, DATE_COLUMN, &period.label());

    statement.put_text(block.previous_balance_row(), DATE_COLUMN, PREVIOUS_BALANCE_LABEL);
    let previous_balance = match previous {
        Some(previous) => CellValue::Formula(format!("={balance}{}", previous.new_balance_row())),
        None => CellValue::Number(Decimal::ZERO),
    };
    statement.put(block.previous_balance_row(), BALANCE_COLUMN, previous_balance);

    statement.put_text(block.total_debits_row(), DATE_COLUMN, TOTAL_DEBITS_LABEL);
    statement.put(
        block.total_debits_row(),
        BALANCE_COLUMN,
        CellValue::Formula(signed_sum(debit_sign, DEBIT_COLUMN, lines)),
    );

    statement.put_text(block.total_credits_row(), DATE_COLUMN, TOTAL_CREDITS_LABEL);
    statement.put(
        block.total_credits_row(),
        BALANCE_COLUMN,
        CellValue::Formula(signed_sum(credit_sign, CREDIT_COLUMN, lines)),
    );

    statement.put_text(block.new_balance_row(), DATE_COLUMN, NEW_BALANCE_LABEL);
    statement.put(
        block.new_balance_row(),
        BALANCE_COLUMN,
        CellValue::Formula(format!(
            "=SUM({balance}{}:{balance}{})",
            block.previous_balance_row(),
            block.total_credits_row()
        )),
    );

    for (i, title) in HEADER.iter().enumerate() {
        statement.put_text(block.header_row(), Column(i as u16), title);
    }

    let groups = bucket
        .credit
        .ordered(options.sort_by_description)
        .into_iter()
        .chain(bucket.debit.ordered(options.sort_by_description));
    let mut row = block.first_line_row();
    for entry in groups.flat_map(|group| group.entries()) {
        statement.put_line(row, entry);
        row += 1;
    }
    debug_assert_eq!(block.last_line_row() + 1, row);

    let band = (DATE_COLUMN, CREDIT_COLUMN);
    statement.style(Style::Bold, (block.title_row, block.header_row()), band);
    statement.style(Style::Shaded, (block.title_row, block.new_balance_row()), band);
    statement.style(
        Style::Currency,
        (block.previous_balance_row(), block.new_balance_row()),
        (BALANCE_COLUMN, BALANCE_COLUMN),
    );
    statement.style(Style::Date, lines, (DATE_COLUMN, DATE_COLUMN));
    statement.style(Style::Currency, lines, (DEBIT_COLUMN, CREDIT_COLUMN));
}

fn signed_sum(sign: &str, column: Column, (first, last): (u32, u32)) -> String {
    let column = column.letter();
    format!("={sign}SUM({column}{first}:{column}{last})")
}
