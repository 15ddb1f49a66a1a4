use std::fmt;
use std::str::FromStr;

use crate::error::SelectionError;

// =============================================================================
// Navigation: modes and chart kinds
// =============================================================================

/// Top-level page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisMode {
    Home,
    Univariate,
    Bivariate,
    Multivariate,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::Home,
        AnalysisMode::Univariate,
        AnalysisMode::Bivariate,
        AnalysisMode::Multivariate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Home => "Home",
            AnalysisMode::Univariate => "Uni-variate Analysis",
            AnalysisMode::Bivariate => "Bi-variate Analysis",
            AnalysisMode::Multivariate => "Multi-variate Analysis",
        }
    }

    /// Columns never offered in this mode's selectors
    pub fn excluded_columns(&self) -> &'static [&'static str] {
        match self {
            AnalysisMode::Home => &[],
            AnalysisMode::Univariate | AnalysisMode::Multivariate => {
                &["Invoice ID", "Time", "Date"]
            }
            AnalysisMode::Bivariate => &["Invoice ID"],
        }
    }

    /// Whether `column` appears in this mode's column selectors
    pub fn offers(&self, column: &str) -> bool {
        !self.excluded_columns().iter().any(|excluded| *excluded == column)
    }

    /// Chart kinds in selector order; the first one is the default
    pub fn chart_kinds(&self) -> &'static [ChartKind] {
        match self {
            AnalysisMode::Home => &[],
            AnalysisMode::Univariate => {
                &[ChartKind::Histogram, ChartKind::BoxPlot, ChartKind::PieChart]
            }
            AnalysisMode::Bivariate => {
                &[ChartKind::ScatterPlot, ChartKind::Histogram, ChartKind::LineChart]
            }
            AnalysisMode::Multivariate => &[ChartKind::Histogram, ChartKind::BoxPlot],
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Histogram,
    BoxPlot,
    PieChart,
    ScatterPlot,
    LineChart,
}

impl ChartKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Histogram => "Histogram",
            ChartKind::BoxPlot => "Box Plot",
            ChartKind::PieChart => "Pie Chart",
            ChartKind::ScatterPlot => "Scatter Plot",
            ChartKind::LineChart => "Line Chart",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartKind {
    type Err = SelectionError;

    /// Accepts "Box Plot", "box_plot", "boxplot" or the short form "box"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "histogram" | "hist" => Ok(ChartKind::Histogram),
            "boxplot" | "box" => Ok(ChartKind::BoxPlot),
            "piechart" | "pie" => Ok(ChartKind::PieChart),
            "scatterplot" | "scatter" => Ok(ChartKind::ScatterPlot),
            "linechart" | "line" => Ok(ChartKind::LineChart),
            _ => Err(SelectionError::UnknownChart(s.to_string())),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Raw selector state for one page render. Unset fields fall back to the
/// page defaults (first offered column, first chart kind).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub first: Option<String>,
    pub second: Option<String>,
    pub color: Option<String>,
    pub chart: Option<String>,
}

/// One user interaction: which page, and what is selected on it
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub mode: AnalysisMode,
    pub selection: Selection,
}

impl PageRequest {
    pub fn new(mode: AnalysisMode, selection: Selection) -> Self {
        Self { mode, selection }
    }

    pub fn home() -> Self {
        Self::new(AnalysisMode::Home, Selection::default())
    }
}

/// A fully resolved chart request: every column named, chart kind parsed
#[derive(Debug, Clone, PartialEq)]
pub enum ChartRequest {
    Univariate {
        column: String,
        chart: ChartKind,
    },
    Bivariate {
        first: String,
        second: String,
        chart: ChartKind,
    },
    Multivariate {
        first: String,
        second: String,
        color: String,
        chart: ChartKind,
    },
}

impl ChartRequest {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            ChartRequest::Univariate { .. } => AnalysisMode::Univariate,
            ChartRequest::Bivariate { .. } => AnalysisMode::Bivariate,
            ChartRequest::Multivariate { .. } => AnalysisMode::Multivariate,
        }
    }

    pub fn chart(&self) -> ChartKind {
        match self {
            ChartRequest::Univariate { chart, .. }
            | ChartRequest::Bivariate { chart, .. }
            | ChartRequest::Multivariate { chart, .. } => *chart,
        }
    }

    /// Selected column names in selector order (colour column last)
    pub fn columns(&self) -> Vec<&str> {
        match self {
            ChartRequest::Univariate { column, .. } => vec![column.as_str()],
            ChartRequest::Bivariate { first, second, .. } => vec![first.as_str(), second.as_str()],
            ChartRequest::Multivariate { first, second, color, .. } => {
                vec![first.as_str(), second.as_str(), color.as_str()]
            }
        }
    }
}

// =============================================================================
// Selection result: what to draw
// =============================================================================

/// The selector's accepted decision
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    pub title: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Bars(BarLayout),
    Box {
        value: String,
        group: Option<Grouping>,
        color: Option<Grouping>,
    },
    Pie {
        names: String,
    },
    Scatter {
        x: String,
        y: String,
    },
    /// Rows are ordered by `x` ascending before the line is traced
    Line {
        x: String,
        y: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub slots: Slots,
    pub value: BarValue,
    pub series: SeriesBy,
    pub orientation: Orientation,
    pub show_values: bool,
}

/// Where the bars sit along the category axis
#[derive(Debug, Clone, PartialEq)]
pub enum Slots {
    Categories(Grouping),
    Bins { column: String },
}

/// A column used to split rows, with the order its distinct values appear in
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub column: String,
    pub order: CategoryOrder,
}

impl Grouping {
    pub fn new(column: &str, order: CategoryOrder) -> Self {
        Self {
            column: column.to_string(),
            order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOrder {
    /// First appearance in the table
    Appearance,
    /// Most frequent first; ties keep first appearance
    Frequency,
    /// Numeric ascending
    Ascending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BarValue {
    Count,
    Sum(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesBy {
    Single,
    /// One colour per slot
    Slot,
    Column(Grouping),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

// =============================================================================
// Figures: aggregated data ready for drawing
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub body: FigureBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FigureBody {
    Bars(BarData),
    Boxes(BoxData),
    Pie(PieData),
    Points(XyData),
    Line(XyData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarData {
    pub orientation: Orientation,
    pub slots: Vec<String>,
    pub series: Vec<BarSeries>,
    pub show_values: bool,
    pub legend: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub key: String,
    /// One entry per slot; `None` where the series has no rows
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxData {
    pub slots: Vec<String>,
    pub series: Vec<BoxSeries>,
    pub legend: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSeries {
    pub key: String,
    pub stats: Vec<Option<BoxStats>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieData {
    pub slices: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyData {
    pub points: Vec<(f64, f64)>,
    pub x_axis: AxisFormat,
    pub y_axis: AxisFormat,
}

/// How tick values on a continuous axis are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisFormat {
    Number,
    Date,
}
