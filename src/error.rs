use thiserror::Error;

use crate::ir::{AnalysisMode, ChartKind};

/// A chart kind that the selected column types do not support.
/// The message is shown to the user verbatim as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidCombination {
    #[error("Box plot is only applicable for numerical data.")]
    BoxPlotNeedsNumerical,
    #[error("Pie chart is only applicable for categorical data.")]
    PieChartNeedsCategorical,
    #[error("Scatter plot is only applicable for numerical data.")]
    ScatterPlotNeedsNumerical,
    #[error("Histogram is only applicable for numerical data or categorical data.")]
    HistogramAllCategorical,
    #[error("Line chart is only applicable for numerical data.")]
    LineChartNeedsNumerical,
}

/// Why a chart request produced a warning instead of a chart
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Invalid(#[from] InvalidCombination),
    #[error("Column '{0}' does not exist in the dataset.")]
    UnknownColumn(String),
    #[error("Column '{column}' cannot be selected in {mode}.")]
    ColumnNotOffered { column: String, mode: AnalysisMode },
    #[error("Unknown chart type '{0}'.")]
    UnknownChart(String),
    #[error("{chart} is not offered in {mode}.")]
    ChartNotOffered { chart: ChartKind, mode: AnalysisMode },
    #[error("{0} has no selectable columns.")]
    NoColumns(AnalysisMode),
}

/// Failures while loading the record table
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),
    #[error("Dataset contains no rows")]
    Empty,
    #[error("Row {row}: '{value}' is not a valid date")]
    InvalidDate { row: usize, value: String },
    #[error("Column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// A shell line or `render` argument that is not a valid request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Could not parse request: {0}")]
    Syntax(String),
    #[error("{mode} does not take a '{key}' selection")]
    UnexpectedArgument { mode: AnalysisMode, key: String },
}
