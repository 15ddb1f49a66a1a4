use std::fmt;

use crate::dataset::{Column, ColumnData, Table};
use crate::error::SelectionError;

/// Whether a column holds labels or quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Categorical,
    Numerical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Categorical => f.write_str("categorical"),
            ColumnKind::Numerical => f.write_str("numerical"),
        }
    }
}

/// Text storage is categorical; numbers and dates are numerical
pub fn classify(column: &Column) -> ColumnKind {
    match column.data() {
        ColumnData::Text(_) => ColumnKind::Categorical,
        ColumnData::Number(_) | ColumnData::Date(_) => ColumnKind::Numerical,
    }
}

/// Look up `name` and classify it
pub fn classify_named<'t>(
    table: &'t Table,
    name: &str,
) -> Result<(&'t Column, ColumnKind), SelectionError> {
    let column = table
        .column(name)
        .ok_or_else(|| SelectionError::UnknownColumn(name.to_string()))?;
    Ok((column, classify(column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table() -> Table {
        Table::new(vec![
            Column::new("Gender", ColumnData::Text(vec!["Male".into(), "Female".into()])),
            Column::new("Rating", ColumnData::Number(vec![9.1, 7.4])),
            Column::new(
                "Date",
                ColumnData::Date(vec![
                    NaiveDate::from_ymd_opt(2019, 1, 5).unwrap(),
                    NaiveDate::from_ymd_opt(2019, 3, 8).unwrap(),
                ]),
            ),
            Column::new("Time", ColumnData::Text(vec!["13:08".into(), "10:29".into()])),
        ])
        .unwrap()
    }

    #[test]
    fn test_classify_by_storage() {
        let table = table();
        assert_eq!(classify_named(&table, "Gender").unwrap().1, ColumnKind::Categorical);
        assert_eq!(classify_named(&table, "Rating").unwrap().1, ColumnKind::Numerical);
        assert_eq!(classify_named(&table, "Date").unwrap().1, ColumnKind::Numerical);
        assert_eq!(classify_named(&table, "Time").unwrap().1, ColumnKind::Categorical);
    }

    #[test]
    fn test_classify_is_stable() {
        let table = table();
        for column in table.columns() {
            let first = classify(column);
            for _ in 0..3 {
                assert_eq!(classify(column), first);
            }
        }
    }

    #[test]
    fn test_unknown_column() {
        let table = table();
        assert_eq!(
            classify_named(&table, "Branch").unwrap_err(),
            SelectionError::UnknownColumn("Branch".to_string())
        );
    }
}
