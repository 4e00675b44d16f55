//! Row-oriented table payload.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// Named numeric columns, stored row by row.
///
/// This is the payload of every `Table` object produced by this crate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Table {
    /// Empty table with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, each as long as [`columns`](Self::columns).
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Appends a row, padding with NaN or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<f64>) {
        row.resize(self.columns.len(), f64::NAN);
        self.rows.push(row);
    }

    /// Values of column `name`, if present.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[index]).collect())
    }

    /// Appends `other`'s rows, matching columns by name.
    ///
    /// Columns only `other` has are added; cells with no source are NaN.
    pub fn append(&mut self, other: &Table) {
        for name in &other.columns {
            if !self.columns.contains(name) {
                self.columns.push(name.clone());
                for row in &mut self.rows {
                    row.push(f64::NAN);
                }
            }
        }
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|name| other.columns.iter().position(|c| c == name))
            .collect();
        for row in &other.rows {
            self.rows
                .push(mapping.iter().map(|m| m.map_or(f64::NAN, |i| row[i])).collect());
        }
    }

    /// Sum of every finite cell.
    pub fn sum(&self) -> f64 {
        self.rows.iter().flatten().filter(|v| v.is_finite()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_push_row_pads_and_truncates() {
        let mut t = Table::new(names(&["a", "b"]));
        t.push_row(vec![1.0]);
        t.push_row(vec![1.0, 2.0, 3.0]);
        assert!(t.rows()[0][1].is_nan());
        assert_eq!(t.rows()[1], vec![1.0, 2.0]);
    }

    #[test]
    fn test_append_matches_by_name() {
        let mut a = Table::new(names(&["x", "y"]));
        a.push_row(vec![1.0, 2.0]);
        let mut b = Table::new(names(&["y", "z"]));
        b.push_row(vec![5.0, 6.0]);
        a.append(&b);
        assert_eq!(a.columns(), &names(&["x", "y", "z"])[..]);
        assert_eq!(a.row_count(), 2);
        assert_eq!(a.column("y").unwrap(), vec![2.0, 5.0]);
        assert!(a.rows()[0][2].is_nan());
        assert!(a.rows()[1][0].is_nan());
        assert_eq!(a.sum(), 14.0);
    }
}
