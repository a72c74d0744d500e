//! One-shot import of the "Resumen" workbook into the store.
//!
//! The sheet is read into a plain [`Sheet`] grid first so that the table
//! detection in [`extract`] does not depend on the workbook reader.

use crate::db::{Db, Session};
use crate::domain::{MAX_AMOUNT, RecordInput};
use crate::error::{Error, Result};
use crate::month::{Month, MonthInput, MonthParse, parse_month_at};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::path::Path;

/// Column B, where both tables keep their month labels.
const LABEL_COL: usize = 1;
const MAIN_HEADER: &str = "mes";
const MAIN_END: &str = "TOTAL";
const EVOLUCION_MARKER: &str = "evolución de la bolsa mensual";
/// Data rows start this many rows below the evolución marker.
const EVOLUCION_OFFSET: usize = 3;
const COMMENT_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    fn text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn month(&self) -> Option<Month> {
        let input = match self {
            Cell::Date(dt) => MonthInput::DateTime(*dt),
            Cell::Text(s) => MonthInput::Text(s.split_whitespace().next().unwrap_or_default()),
            Cell::Empty | Cell::Number(_) => return None,
        };
        // The fallback is never used: defaulted results are dropped.
        match parse_month_at(input, Month::current()) {
            MonthParse::Parsed(m) => Some(m),
            MonthParse::Defaulted(_) => None,
        }
    }

    fn amount(&self) -> Decimal {
        let value = match self {
            Cell::Number(n) => Decimal::from_f64(*n),
            Cell::Text(s) if s.trim().is_empty() => Some(Decimal::ZERO),
            Cell::Text(s) => s.trim().parse::<Decimal>().ok(),
            Cell::Empty | Cell::Date(_) => Some(Decimal::ZERO),
        };
        match value {
            Some(v) if v.abs() <= MAX_AMOUNT => v.round_dp(2),
            _ => {
                tracing::warn!(cell = ?self, "unusable amount imported as 0");
                Decimal::ZERO
            }
        }
    }

    fn comment(&self) -> Option<String> {
        let raw = match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(dt) => dt.to_string(),
            Cell::Empty => return None,
        };
        if raw.is_empty() {
            None
        } else {
            Some(raw.chars().take(COMMENT_LIMIT).collect())
        }
    }
}

/// A worksheet in absolute coordinates: `rows[0][0]` is cell A1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    fn label(&self, row: usize) -> String {
        match self.cell(row, LABEL_COL) {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(dt) => dt.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .map(Cell::Date)
                .unwrap_or_else(|_| Cell::Text(s.clone())),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::DateTime(dt) => dt.as_datetime().map(Cell::Date).unwrap_or(Cell::Empty),
            _ => Cell::Empty,
        }
    }
}

pub fn read_workbook(path: &Path, sheet: &str) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Spreadsheet(format!("{}: {e}", path.display())))?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| Error::Spreadsheet(format!("sheet {sheet:?}: {e}")))?;

    let (row0, col0) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut rows = vec![Vec::new(); row0];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col0];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }
    tracing::debug!(rows = rows.len(), sheet, "worksheet loaded");
    Ok(Sheet::from_rows(rows))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRecord {
    pub month: Month,
    pub values: RecordInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedEvolucion {
    pub month: Month,
    pub increment: Decimal,
    pub accumulated: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub records: Vec<ImportedRecord>,
    pub evolucion: Vec<ImportedEvolucion>,
    /// Rows whose month cell did not parse.
    pub skipped: usize,
}

/// Locates the main table and the optional evolución table in `sheet`.
pub fn extract(sheet: &Sheet) -> Result<Extracted> {
    let header = (0..sheet.height())
        .find(|&r| sheet.label(r).eq_ignore_ascii_case(MAIN_HEADER))
        .ok_or_else(|| {
            Error::Spreadsheet("main table header ('mes' in column B) not found".into())
        })?;

    let mut out = Extracted::default();
    for r in header + 1..sheet.height() {
        if sheet.label(r).eq_ignore_ascii_case(MAIN_END) {
            break;
        }
        let Some(month) = sheet.cell(r, LABEL_COL).month() else {
            if !matches!(sheet.cell(r, LABEL_COL), Cell::Empty) {
                out.skipped += 1;
            }
            continue;
        };
        // Column G (index 6) holds the spreadsheet's own "restante" formula.
        out.records.push(ImportedRecord {
            month,
            values: RecordInput {
                forecast: sheet.cell(r, 2).amount(),
                billed: sheet.cell(r, 3).amount(),
                pending_to_incur: sheet.cell(r, 4).amount(),
                pending_invoice: sheet.cell(r, 5).amount(),
                adjustment: sheet.cell(r, 7).amount(),
                new_forecast: sheet.cell(r, 8).amount(),
                real_plus_pending_debt: sheet.cell(r, 9).amount(),
                comment: sheet.cell(r, 10).comment(),
            },
        });
    }

    let marker = (0..sheet.height()).find(|&r| {
        sheet
            .cell(r, LABEL_COL)
            .text()
            .is_some_and(|s| s.trim().to_lowercase().contains(EVOLUCION_MARKER))
    });
    if let Some(marker) = marker {
        for r in marker + EVOLUCION_OFFSET..sheet.height() {
            let cell = sheet.cell(r, LABEL_COL);
            if matches!(cell, Cell::Empty) {
                continue;
            }
            match cell.month() {
                Some(month) => out.evolucion.push(ImportedEvolucion {
                    month,
                    increment: sheet.cell(r, 2).amount(),
                    accumulated: sheet.cell(r, 3).amount(),
                }),
                None => out.skipped += 1,
            }
        }
    }

    Ok(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub records_inserted: usize,
    pub records_updated: usize,
    pub evolucion_inserted: usize,
    pub evolucion_updated: usize,
    pub skipped: usize,
}

/// Upserts the extracted rows by month. Accumulated values are stored as
/// found in the sheet.
pub fn apply(session: &Session<'_>, data: &Extracted) -> Result<ImportReport> {
    let mut report = ImportReport {
        skipped: data.skipped,
        ..ImportReport::default()
    };

    for row in &data.records {
        match session.find_record_by_month(row.month)? {
            Some(existing) => {
                session.update_record(existing.id, row.month, &row.values)?;
                report.records_updated += 1;
            }
            None => {
                session.insert_record(row.month, &row.values)?;
                report.records_inserted += 1;
            }
        }
    }

    for row in &data.evolucion {
        match session.find_evolucion_by_month(row.month)? {
            Some(existing) => {
                session.update_evolucion(existing.id, row.month, row.increment, row.accumulated)?;
                report.evolucion_updated += 1;
            }
            None => {
                session.insert_evolucion(row.month, row.increment, row.accumulated)?;
                report.evolucion_inserted += 1;
            }
        }
    }

    Ok(report)
}

pub fn run(db: &Db, path: &Path, sheet: &str) -> Result<ImportReport> {
    let grid = read_workbook(path, sheet)?;
    let data = extract(&grid)?;
    let report = db.transact(|session| apply(session, &data))?;
    tracing::info!(
        records_inserted = report.records_inserted,
        records_updated = report.records_updated,
        evolucion_inserted = report.evolucion_inserted,
        evolucion_updated = report.evolucion_updated,
        skipped = report.skipped,
        "import finished"
    );
    Ok(report)
}
