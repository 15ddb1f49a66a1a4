//! Record table for the supermarket sales dataset.
//!
//! The table is loaded once from CSV and is read-only afterwards. Values are
//! held column-wise; each column has one storage type decided at load time.

use chrono::{Datelike, NaiveDate};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::DatasetError;

/// Header row every dataset file must provide
pub const REQUIRED_COLUMNS: [&str; 14] = [
    "Invoice ID",
    "Branch",
    "City",
    "Customer type",
    "Gender",
    "Product line",
    "Unit price",
    "Quantity",
    "Tax 5%",
    "Total",
    "Date",
    "Time",
    "Payment",
    "Rating",
];

/// The one column parsed as a calendar date rather than inferred
pub const DATE_COLUMN: &str = "Date";

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Cells read as missing values rather than data
const MISSING_TOKENS: [&str; 12] = [
    "", "NA", "N/A", "n/a", "#N/A", "<NA>", "NaN", "nan", "NULL", "null", "None", "-nan",
];

/// Descriptive names accepted in place of the file header
const ALIASES: [(&str, &str); 1] = [("Payment Method", "Payment")];

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<String>),
    /// Empty cells are stored as NaN
    Number(Vec<f64>),
    Date(Vec<NaiveDate>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Number(v) => v.len(),
            ColumnData::Date(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_date(&self) -> bool {
        matches!(self.data, ColumnData::Date(_))
    }

    /// Value at `row` as shown to the user and used as a grouping key
    pub fn display(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Text(v) => v[row].clone(),
            ColumnData::Number(v) => format_number(v[row]),
            ColumnData::Date(v) => v[row].format("%Y-%m-%d").to_string(),
        }
    }

    /// Value at `row` on a continuous axis. Dates map to their day number.
    pub fn numeric(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Text(_) => None,
            ColumnData::Number(v) => Some(v[row]).filter(|x| x.is_finite()),
            ColumnData::Date(v) => Some(date_to_axis(v[row])),
        }
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

pub fn date_to_axis(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

pub fn axis_to_date(value: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(value.round() as i32)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Assemble a table from columns of equal length
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(DatasetError::LengthMismatch {
                column: bad.name.clone(),
                expected: rows,
                actual: bad.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Load the dataset file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "loaded dataset"
        );
        Ok(table)
    }

    /// Parse CSV with the fixed header. Extra columns are kept with inferred types.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(DatasetError::MissingColumn(required.to_string()));
            }
        }

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (idx, field) in record.iter().enumerate() {
                raw[idx].push(field.to_string());
            }
        }

        if raw.first().map_or(true, Vec::is_empty) {
            return Err(DatasetError::Empty);
        }

        let mut columns = Vec::with_capacity(headers.len());
        for (name, values) in headers.into_iter().zip(raw) {
            let data = if name == DATE_COLUMN {
                parse_dates(&values)?
            } else {
                infer_column(values)
            };
            debug!(column = %name, storage = storage_name(&data), "parsed column");
            columns.push(Column::new(name, data));
        }

        Self::new(columns)
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Find a column by header (case-insensitive) or by its descriptive alias
    pub fn column(&self, name: &str) -> Option<&Column> {
        let name = name.trim();
        let target = ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, header)| *header)
            .unwrap_or(name);
        self.columns
            .iter()
            .find(|c| c.name == target)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(target)))
    }

    /// Display values of one row, in header order
    pub fn row(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.display(row)).collect()
    }

    /// Row indices sorted ascending by `name`. The sort is stable; rows
    /// without a numeric value go last, and text columns sort lexically.
    pub fn order_by(&self, name: &str) -> Option<Vec<usize>> {
        let column = self.column(name)?;
        let mut order: Vec<usize> = (0..self.rows).collect();
        match column.data() {
            ColumnData::Text(values) => order.sort_by(|&a, &b| values[a].cmp(&values[b])),
            _ => order.sort_by(|&a, &b| match (column.numeric(a), column.numeric(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }),
        }
        Some(order)
    }
}

fn parse_dates(values: &[String]) -> Result<ColumnData, DatasetError> {
    let mut dates = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        let parsed = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .ok_or_else(|| DatasetError::InvalidDate {
                // header is line 1
                row: idx + 2,
                value: value.clone(),
            })?;
        dates.push(parsed);
    }
    Ok(ColumnData::Date(dates))
}

fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

/// Number when every present cell parses as a float, Text otherwise.
/// Missing cells become NaN in numbers and empty strings in text.
fn infer_column(values: Vec<String>) -> ColumnData {
    let mut any_value = false;
    let mut numbers = Vec::with_capacity(values.len());
    for value in &values {
        if is_missing(value) {
            numbers.push(f64::NAN);
            continue;
        }
        match value.parse::<f64>() {
            Ok(n) => {
                any_value = true;
                numbers.push(n);
            }
            Err(_) => return text_column(values),
        }
    }
    if any_value {
        ColumnData::Number(numbers)
    } else {
        text_column(values)
    }
}

fn text_column(values: Vec<String>) -> ColumnData {
    ColumnData::Text(
        values
            .into_iter()
            .map(|v| if is_missing(&v) { String::new() } else { v })
            .collect(),
    )
}

fn storage_name(data: &ColumnData) -> &'static str {
    match data {
        ColumnData::Text(_) => "text",
        ColumnData::Number(_) => "number",
        ColumnData::Date(_) => "date",
    }
}
