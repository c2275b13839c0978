use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How many leading rows are searched for the statement header.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 50;

const AMOUNT_KEYWORD: &str = "monto";
const DESCRIPTION_KEYWORD: &str = "descrip";

pub type Cell = Option<String>;
pub type RawRow = Vec<Cell>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Sheet has no rows")]
    EmptyGrid,
    #[error("Sheet has no columns")]
    NoColumns,
}

/// A decoded spreadsheet: rows of optional string cells, possibly ragged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<RawRow>,
}

impl Grid {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Grid { rows }
    }

    /// Convenience for literal sheets; empty strings become empty cells.
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|s| {
                        let s = s.as_ref();
                        (!s.is_empty()).then(|| s.to_string())
                    })
                    .collect()
            })
            .collect();
        Grid { rows }
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Fails for sheets no pipeline can work on: no rows, or no columns.
    pub fn ensure_usable(&self) -> Result<(), InputError> {
        if self.rows.is_empty() {
            return Err(InputError::EmptyGrid);
        }
        if self.width() == 0 {
            return Err(InputError::NoColumns);
        }
        Ok(())
    }
}

/// Outcome of the header scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSearch {
    Found { index: usize },
    NotFound,
}

/// Finds the first row among the first `scan_rows` that has a cell containing
/// `monto` and a cell containing `descrip` (trimmed, case-insensitive).
pub fn locate_header(grid: &Grid, scan_rows: usize) -> HeaderSearch {
    grid.rows()
        .iter()
        .take(scan_rows)
        .position(is_header_row)
        .map_or(HeaderSearch::NotFound, |index| HeaderSearch::Found { index })
}

fn is_header_row(row: &RawRow) -> bool {
    let folded: Vec<String> = row
        .iter()
        .flatten()
        .map(|cell| cell.trim().to_lowercase())
        .collect();
    folded.iter().any(|c| c.contains(AMOUNT_KEYWORD))
        && folded.iter().any(|c| c.contains(DESCRIPTION_KEYWORD))
}

/// A grid split into a header row and the body below it. Body rows are padded
/// to the header width, so `row[i]` always lines up with `headers[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    /// `Found` promotes that row to headers and keeps only the rows below it.
    /// `NotFound` assumes the sheet already starts with its header on row 0.
    pub fn from_grid(grid: &Grid, search: HeaderSearch) -> Result<Table, InputError> {
        grid.ensure_usable()?;
        let header_index = match search {
            HeaderSearch::Found { index } => index,
            HeaderSearch::NotFound => 0,
        };
        let width = grid.width();

        let headers = (0..width)
            .map(|col| {
                grid.rows()[header_index]
                    .get(col)
                    .cloned()
                    .flatten()
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            })
            .collect();

        let rows = grid.rows()[header_index + 1..]
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.resize(width, None);
                row
            })
            .collect();

        Ok(Table { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement_grid() -> Grid {
        Grid::from_strings(vec![
            vec!["banco", "x", "y"],
            vec!["Fecha", "Descripción Movimiento", "Monto", "Cargo/Abono"],
            vec!["01/01/2025", "Compra Super", "50.000", "C"],
        ])
    }

    // ── locate_header ─────────────────────────────────────────────────────────

    #[test]
    fn finds_header_below_preamble() {
        assert_eq!(
            locate_header(&statement_grid(), DEFAULT_HEADER_SCAN_ROWS),
            HeaderSearch::Found { index: 1 }
        );
    }

    #[test]
    fn header_match_is_case_and_space_insensitive() {
        let grid = Grid::from_strings(vec![vec!["  MONTO TOTAL ", " DESCRIPCION "]]);
        assert_eq!(locate_header(&grid, 50), HeaderSearch::Found { index: 0 });
    }

    #[test]
    fn needs_both_keywords() {
        let grid = Grid::from_strings(vec![
            vec!["Monto", "Fecha"],
            vec!["Descripción", "Fecha"],
        ]);
        assert_eq!(locate_header(&grid, 50), HeaderSearch::NotFound);
    }

    #[test]
    fn scan_window_is_bounded() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["relleno"]; 50];
        rows.push(vec!["Monto", "Descripción"]);
        let grid = Grid::from_strings(rows);
        assert_eq!(locate_header(&grid, DEFAULT_HEADER_SCAN_ROWS), HeaderSearch::NotFound);
        assert_eq!(locate_header(&grid, 51), HeaderSearch::Found { index: 50 });
    }

    // ── Table::from_grid ──────────────────────────────────────────────────────

    #[test]
    fn found_header_reslices_body() {
        let grid = statement_grid();
        let table = Table::from_grid(&grid, locate_header(&grid, 50)).unwrap();
        assert_eq!(
            table.headers,
            vec!["Fecha", "Descripción Movimiento", "Monto", "Cargo/Abono"]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1].as_deref(), Some("Compra Super"));
    }

    #[test]
    fn not_found_falls_back_to_first_row() {
        let grid = Grid::from_strings(vec![vec!["date", "amount"], vec!["2025-01-01", "10"]]);
        let table = Table::from_grid(&grid, HeaderSearch::NotFound).unwrap();
        assert_eq!(table.headers, vec!["date", "amount"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn ragged_rows_are_padded_to_width() {
        let grid = Grid::from_strings(vec![vec!["a"], vec!["1", "2", "3"]]);
        let table = Table::from_grid(&grid, HeaderSearch::NotFound).unwrap();
        assert_eq!(table.headers, vec!["a", "", ""]);
        assert_eq!(table.rows[0].len(), 3);
    }

    #[test]
    fn empty_grids_are_structural_errors() {
        assert_eq!(
            Table::from_grid(&Grid::default(), HeaderSearch::NotFound),
            Err(InputError::EmptyGrid)
        );
        let no_columns = Grid::new(vec![vec![], vec![]]);
        assert_eq!(
            Table::from_grid(&no_columns, HeaderSearch::NotFound),
            Err(InputError::NoColumns)
        );
    }
}
