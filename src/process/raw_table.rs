use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::process::utils::{normalize_columns, ColumnKeyStyle};

/// One untyped spreadsheet cell, as handed over by a loader.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Missing, or text with nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Text(s) => s.trim().is_empty(),
            other => other.is_missing(),
        }
    }

    /// Missing marker: empty cells and NaN numbers.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// String form of the cell, `None` when missing.
    /// Integral numbers drop their fractional part so `2025.0` reads as `2025`.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.is_nan() => None,
            Cell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            Cell::Bool(true) => Some("True".to_string()),
            Cell::Bool(false) => Some("False".to_string()),
            Cell::Date(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// Rows below a located header, with normalized column keys.
#[derive(Debug)]
pub struct Table {
    /// Normalized column keys, in source order (duplicates allowed).
    pub columns: Vec<String>,
    /// Data rows, one `Vec<Cell>` per source row below the header.
    pub rows: Vec<Vec<Cell>>,
    /// Absolute index of the header row in the raw sheet.
    pub header_row: usize,
    index: HashMap<String, usize>,
}

impl Table {
    /// Split `raw` at `header_row`: that row becomes the column labels and every
    /// non-blank row after it becomes data.
    pub fn from_header(raw: Vec<Vec<Cell>>, header_row: usize, style: ColumnKeyStyle) -> Self {
        let mut iter = raw.into_iter().skip(header_row);
        let labels: Vec<String> = iter
            .next()
            .map(|row| {
                row.iter()
                    .map(|c| c.as_string().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let columns = normalize_columns(&labels, style);

        let rows: Vec<Vec<Cell>> = iter
            .filter(|row| !row.iter().all(Cell::is_blank))
            .collect();

        // later duplicates overwrite earlier ones
        let mut index = HashMap::with_capacity(columns.len());
        for (i, key) in columns.iter().enumerate() {
            index.insert(key.clone(), i);
        }

        Table {
            columns,
            rows,
            header_row,
            index,
        }
    }

    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Cell at `col` in `row`; short rows read as empty.
    pub fn cell<'a>(row: &'a [Cell], col: Option<usize>) -> &'a Cell {
        const EMPTY: &Cell = &Cell::Empty;
        col.and_then(|i| row.get(i)).unwrap_or(EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(2025.0).as_string().as_deref(), Some("2025"));
        assert_eq!(Cell::Number(2.5).as_string().as_deref(), Some("2.5"));
        assert_eq!(Cell::Number(f64::NAN).as_string(), None);
        assert!(Cell::Number(f64::NAN).is_missing());
        assert_eq!(Cell::Bool(true).as_string().as_deref(), Some("True"));
    }

    #[test]
    fn from_header_skips_preamble_and_blank_rows() {
        let raw = vec![
            vec![Cell::text("Reporte"), Cell::Empty],
            vec![Cell::text("Producto"), Cell::text("Año")],
            vec![Cell::text("Rosa"), Cell::Number(2025.0)],
            vec![Cell::Empty, Cell::Empty],
            vec![Cell::text("  "), Cell::Empty],
            vec![Cell::text("Clavel")],
        ];
        let table = Table::from_header(raw, 1, ColumnKeyStyle::default());
        assert_eq!(table.columns, vec!["producto", "ano"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.header_row, 1);

        let year_col = table.column_index("ano");
        assert_eq!(Table::cell(&table.rows[1], year_col), &Cell::Empty);
    }

    #[test]
    fn duplicate_keys_resolve_to_last_column() {
        let raw = vec![
            vec![Cell::text("País"), Cell::text("PAIS "), Cell::text("x")],
            vec![Cell::text("a"), Cell::text("b"), Cell::text("c")],
        ];
        let table = Table::from_header(raw, 0, ColumnKeyStyle::default());
        assert_eq!(table.columns, vec!["pais", "pais", "x"]);
        assert_eq!(table.column_index("pais"), Some(1));
    }
}
