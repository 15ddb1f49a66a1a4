//! Chart selection rules.
//!
//! Decides whether a (chart kind, column kinds) combination is drawable and,
//! if so, which geometry to build. Each mode has its own rule table:
//!
//! ```text
//! Uni-variate    Histogram  always          Box Plot  numerical   Pie Chart  categorical
//! Bi-variate     Scatter    both numerical  Histogram not both categorical
//!                Line       both numerical
//! Multi-variate  Histogram  not all three categorical
//!                Box Plot   none categorical
//! ```
//!
//! The bi-variate histogram rejects only when both columns are categorical,
//! while the multi-variate box plot rejects when any column is.

use tracing::{debug, warn};

use crate::classify::ColumnKind::{Categorical, Numerical};
use crate::classify::{classify_named, ColumnKind};
use crate::dataset::Table;
use crate::error::{InvalidCombination, SelectionError};
use crate::ir::{
    AnalysisMode, BarLayout, BarValue, CategoryOrder, ChartKind, ChartPlan, ChartRequest, Geometry,
    Grouping, Orientation, SeriesBy, Slots,
};

/// Validate a request against the table and pick the chart to draw
pub fn select(table: &Table, request: &ChartRequest) -> Result<ChartPlan, SelectionError> {
    let mode = request.mode();
    let chart = request.chart();
    if !mode.chart_kinds().contains(&chart) {
        return Err(SelectionError::ChartNotOffered { chart, mode });
    }

    let mut columns = Vec::new();
    for name in request.columns() {
        let (column, kind) = classify_named(table, name)?;
        if !mode.offers(column.name()) {
            return Err(SelectionError::ColumnNotOffered {
                column: column.name().to_string(),
                mode,
            });
        }
        columns.push((column.name(), kind));
    }

    let result = match columns.as_slice() {
        [c] => univariate(chart, *c),
        [c1, c2] => bivariate(chart, *c1, *c2),
        [c1, c2, c3] => multivariate(chart, *c1, *c2, *c3),
        _ => unreachable!("chart requests select one to three columns"),
    };

    match &result {
        Ok(_) => debug!(%mode, %chart, ?columns, "chart accepted"),
        Err(e) => warn!(%mode, %chart, ?columns, reason = %e, "chart rejected"),
    }

    let geometry = result?;
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    Ok(ChartPlan {
        title: title(&names),
        geometry,
    })
}

/// Chart title from the selected column names
pub fn title(columns: &[&str]) -> String {
    match columns {
        [col] => format!("{} Distribution", col),
        [first, second] => format!("{} vs {} Distribution", first, second),
        [first, second, color, ..] => format!("{} vs {} by {} Distribution", first, second, color),
        [] => String::new(),
    }
}

/// Rules for a single column
pub fn univariate(
    chart: ChartKind,
    (column, kind): (&str, ColumnKind),
) -> Result<Geometry, SelectionError> {
    match (chart, kind) {
        (ChartKind::Histogram, Categorical) => Ok(Geometry::Bars(BarLayout {
            slots: Slots::Categories(Grouping::new(column, CategoryOrder::Frequency)),
            value: BarValue::Count,
            series: SeriesBy::Slot,
            orientation: Orientation::Horizontal,
            show_values: true,
        })),
        (ChartKind::Histogram, Numerical) => Ok(Geometry::Bars(BarLayout {
            slots: Slots::Bins {
                column: column.to_string(),
            },
            value: BarValue::Count,
            series: SeriesBy::Single,
            orientation: Orientation::Horizontal,
            show_values: true,
        })),
        (ChartKind::BoxPlot, Categorical) => Err(InvalidCombination::BoxPlotNeedsNumerical.into()),
        (ChartKind::BoxPlot, Numerical) => Ok(Geometry::Box {
            value: column.to_string(),
            group: None,
            color: None,
        }),
        (ChartKind::PieChart, Categorical) => Ok(Geometry::Pie {
            names: column.to_string(),
        }),
        (ChartKind::PieChart, Numerical) => {
            Err(InvalidCombination::PieChartNeedsCategorical.into())
        }
        (chart, _) => Err(SelectionError::ChartNotOffered {
            chart,
            mode: AnalysisMode::Univariate,
        }),
    }
}

/// Rules for a pair of columns
pub fn bivariate(
    chart: ChartKind,
    first: (&str, ColumnKind),
    second: (&str, ColumnKind),
) -> Result<Geometry, SelectionError> {
    let both_numerical = first.1 == Numerical && second.1 == Numerical;
    match chart {
        ChartKind::ScatterPlot if both_numerical => Ok(Geometry::Scatter {
            x: first.0.to_string(),
            y: second.0.to_string(),
        }),
        ChartKind::ScatterPlot => Err(InvalidCombination::ScatterPlotNeedsNumerical.into()),
        ChartKind::Histogram => {
            if first.1 == Categorical && second.1 == Categorical {
                return Err(InvalidCombination::HistogramAllCategorical.into());
            }
            Ok(Geometry::Bars(aggregated_bars(first, second, SeriesBy::Single)))
        }
        ChartKind::LineChart if both_numerical => Ok(Geometry::Line {
            x: first.0.to_string(),
            y: second.0.to_string(),
        }),
        ChartKind::LineChart => Err(InvalidCombination::LineChartNeedsNumerical.into()),
        chart => Err(SelectionError::ChartNotOffered {
            chart,
            mode: AnalysisMode::Bivariate,
        }),
    }
}

/// Rules for two columns plus a colour column
pub fn multivariate(
    chart: ChartKind,
    first: (&str, ColumnKind),
    second: (&str, ColumnKind),
    color: (&str, ColumnKind),
) -> Result<Geometry, SelectionError> {
    let kinds = [first.1, second.1, color.1];
    match chart {
        ChartKind::Histogram => {
            if kinds.iter().all(|k| *k == Categorical) {
                return Err(InvalidCombination::HistogramAllCategorical.into());
            }
            let series = SeriesBy::Column(grouping(color));
            Ok(Geometry::Bars(aggregated_bars(first, second, series)))
        }
        ChartKind::BoxPlot => {
            if kinds.iter().any(|k| *k == Categorical) {
                return Err(InvalidCombination::BoxPlotNeedsNumerical.into());
            }
            Ok(Geometry::Box {
                value: second.0.to_string(),
                group: Some(grouping(first)),
                color: Some(grouping(color)),
            })
        }
        chart => Err(SelectionError::ChartNotOffered {
            chart,
            mode: AnalysisMode::Multivariate,
        }),
    }
}

/// Bars for an x/y histogram. The categorical column (if any) provides the
/// slots and the numerical one is summed; two numerical columns bin x and sum
/// y; two categorical columns count rows.
fn aggregated_bars(
    first: (&str, ColumnKind),
    second: (&str, ColumnKind),
    series: SeriesBy,
) -> BarLayout {
    let (slots, value, orientation) = match (first.1, second.1) {
        (Numerical, Numerical) => (
            Slots::Bins {
                column: first.0.to_string(),
            },
            BarValue::Sum(second.0.to_string()),
            Orientation::Vertical,
        ),
        (Categorical, Numerical) => (
            Slots::Categories(Grouping::new(first.0, CategoryOrder::Appearance)),
            BarValue::Sum(second.0.to_string()),
            Orientation::Vertical,
        ),
        (Numerical, Categorical) => (
            Slots::Categories(Grouping::new(second.0, CategoryOrder::Appearance)),
            BarValue::Sum(first.0.to_string()),
            Orientation::Horizontal,
        ),
        (Categorical, Categorical) => (
            Slots::Categories(Grouping::new(first.0, CategoryOrder::Appearance)),
            BarValue::Count,
            Orientation::Vertical,
        ),
    };
    BarLayout {
        slots,
        value,
        series,
        orientation,
        show_values: true,
    }
}

fn grouping((column, kind): (&str, ColumnKind)) -> Grouping {
    let order = match kind {
        Numerical => CategoryOrder::Ascending,
        Categorical => CategoryOrder::Appearance,
    };
    Grouping::new(column, order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, ColumnData};

    const KINDS: [ColumnKind; 2] = [Categorical, Numerical];

    fn table() -> Table {
        let text = |v: &[&str]| ColumnData::Text(v.iter().map(|s| s.to_string()).collect());
        Table::new(vec![
            Column::new("Invoice ID", text(&["a", "b", "c"])),
            Column::new("Branch", text(&["A", "C", "A"])),
            Column::new("City", text(&["Yangon", "Naypyitaw", "Yangon"])),
            Column::new("Gender", text(&["Female", "Male", "Female"])),
            Column::new("Unit price", ColumnData::Number(vec![74.69, 15.28, 46.33])),
            Column::new("Quantity", ColumnData::Number(vec![7.0, 5.0, 7.0])),
            Column::new("Total", ColumnData::Number(vec![548.97, 80.22, 340.52])),
            Column::new("Time", text(&["13:08", "10:29", "13:23"])),
            Column::new("Rating", ColumnData::Number(vec![9.1, 9.6, 7.4])),
        ])
        .unwrap()
    }

    fn uni(column: &str, chart: ChartKind) -> ChartRequest {
        ChartRequest::Univariate {
            column: column.to_string(),
            chart,
        }
    }

    fn bi(first: &str, second: &str, chart: ChartKind) -> ChartRequest {
        ChartRequest::Bivariate {
            first: first.to_string(),
            second: second.to_string(),
            chart,
        }
    }

    fn multi(first: &str, second: &str, color: &str, chart: ChartKind) -> ChartRequest {
        ChartRequest::Multivariate {
            first: first.to_string(),
            second: second.to_string(),
            color: color.to_string(),
            chart,
        }
    }

    #[test]
    fn test_univariate_pie_and_box_are_opposites() {
        for kind in KINDS {
            let pie = univariate(ChartKind::PieChart, ("c", kind));
            let boxplot = univariate(ChartKind::BoxPlot, ("c", kind));
            assert_eq!(pie.is_ok(), kind == Categorical);
            assert_eq!(boxplot.is_ok(), kind == Numerical);
            assert!(univariate(ChartKind::Histogram, ("c", kind)).is_ok());
        }
    }

    #[test]
    fn test_bivariate_rules() {
        for k1 in KINDS {
            for k2 in KINDS {
                let both_numerical = k1 == Numerical && k2 == Numerical;
                let both_categorical = k1 == Categorical && k2 == Categorical;
                assert_eq!(bivariate(ChartKind::ScatterPlot, ("a", k1), ("b", k2)).is_ok(), both_numerical);
                assert_eq!(bivariate(ChartKind::LineChart, ("a", k1), ("b", k2)).is_ok(), both_numerical);
                assert_eq!(bivariate(ChartKind::Histogram, ("a", k1), ("b", k2)).is_err(), both_categorical);
            }
        }
    }

    #[test]
    fn test_multivariate_rules() {
        for k1 in KINDS {
            for k2 in KINDS {
                for k3 in KINDS {
                    let kinds = [k1, k2, k3];
                    let hist = multivariate(ChartKind::Histogram, ("a", k1), ("b", k2), ("c", k3));
                    let boxplot = multivariate(ChartKind::BoxPlot, ("a", k1), ("b", k2), ("c", k3));
                    assert_eq!(hist.is_err(), kinds.iter().all(|k| *k == Categorical));
                    assert_eq!(boxplot.is_err(), kinds.iter().any(|k| *k == Categorical));
                }
            }
        }
    }

    #[test]
    fn test_rejection_messages() {
        let err = univariate(ChartKind::BoxPlot, ("City", Categorical)).unwrap_err();
        assert_eq!(err.to_string(), "Box plot is only applicable for numerical data.");
        let err = univariate(ChartKind::PieChart, ("Rating", Numerical)).unwrap_err();
        assert_eq!(err.to_string(), "Pie chart is only applicable for categorical data.");
        let err = bivariate(ChartKind::ScatterPlot, ("Branch", Categorical), ("Total", Numerical)).unwrap_err();
        assert_eq!(err.to_string(), "Scatter plot is only applicable for numerical data.");
        let err = bivariate(ChartKind::Histogram, ("Branch", Categorical), ("City", Categorical)).unwrap_err();
        assert_eq!(err.to_string(), "Histogram is only applicable for numerical data or categorical data.");
        let err = bivariate(ChartKind::LineChart, ("Total", Numerical), ("Time", Categorical)).unwrap_err();
        assert_eq!(err.to_string(), "Line chart is only applicable for numerical data.");
    }

    #[test]
    fn test_titles() {
        assert_eq!(title(&["Gender"]), "Gender Distribution");
        assert_eq!(title(&["Unit price", "Quantity"]), "Unit price vs Quantity Distribution");
        assert_eq!(title(&["Total", "Rating", "Branch"]), "Total vs Rating by Branch Distribution");
    }

    #[test]
    fn test_gender_pie_accepted() {
        let plan = select(&table(), &uni("Gender", ChartKind::PieChart)).unwrap();
        assert_eq!(plan.title, "Gender Distribution");
        assert_eq!(plan.geometry, Geometry::Pie { names: "Gender".to_string() });
    }

    #[test]
    fn test_rating_box_accepted() {
        let plan = select(&table(), &uni("Rating", ChartKind::BoxPlot)).unwrap();
        assert!(matches!(plan.geometry, Geometry::Box { group: None, color: None, .. }));
    }

    #[test]
    fn test_city_box_rejected() {
        let err = select(&table(), &uni("City", ChartKind::BoxPlot)).unwrap_err();
        assert_eq!(err, SelectionError::Invalid(InvalidCombination::BoxPlotNeedsNumerical));
    }

    #[test]
    fn test_branch_city_histogram_rejected() {
        let err = select(&table(), &bi("Branch", "City", ChartKind::Histogram)).unwrap_err();
        assert_eq!(err, SelectionError::Invalid(InvalidCombination::HistogramAllCategorical));
    }

    #[test]
    fn test_price_quantity_line_accepted() {
        // lookup is case-insensitive; the title uses the header name
        let plan = select(&table(), &bi("Unit Price", "Quantity", ChartKind::LineChart)).unwrap();
        assert_eq!(plan.title, "Unit price vs Quantity Distribution");
        assert_eq!(
            plan.geometry,
            Geometry::Line {
                x: "Unit price".to_string(),
                y: "Quantity".to_string()
            }
        );
    }

    #[test]
    fn test_box_with_categorical_color_rejected() {
        let err = select(&table(), &multi("Total", "Rating", "Branch", ChartKind::BoxPlot)).unwrap_err();
        assert_eq!(err, SelectionError::Invalid(InvalidCombination::BoxPlotNeedsNumerical));
    }

    #[test]
    fn test_multivariate_histogram_groups_by_color() {
        let plan = select(&table(), &multi("Branch", "Total", "Gender", ChartKind::Histogram)).unwrap();
        assert_eq!(plan.title, "Branch vs Total by Gender Distribution");
        match plan.geometry {
            Geometry::Bars(layout) => {
                assert_eq!(layout.series, SeriesBy::Column(Grouping::new("Gender", CategoryOrder::Appearance)));
                assert_eq!(layout.value, BarValue::Sum("Total".to_string()));
            }
            other => panic!("Expected bars, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_histogram_puts_categories_on_slots() {
        let geometry = bivariate(ChartKind::Histogram, ("Total", Numerical), ("City", Categorical)).unwrap();
        match geometry {
            Geometry::Bars(layout) => {
                assert_eq!(layout.orientation, Orientation::Horizontal);
                assert_eq!(layout.slots, Slots::Categories(Grouping::new("City", CategoryOrder::Appearance)));
                assert_eq!(layout.value, BarValue::Sum("Total".to_string()));
            }
            other => panic!("Expected bars, got {:?}", other),
        }
    }

    #[test]
    fn test_excluded_columns_not_offered() {
        let err = select(&table(), &uni("Invoice ID", ChartKind::Histogram)).unwrap_err();
        assert!(matches!(err, SelectionError::ColumnNotOffered { .. }));
        let err = select(&table(), &multi("Time", "Total", "Rating", ChartKind::Histogram)).unwrap_err();
        assert!(matches!(err, SelectionError::ColumnNotOffered { .. }));
        // Time is offered in bi-variate mode
        assert!(select(&table(), &bi("Time", "Total", ChartKind::Histogram)).is_ok());
    }

    #[test]
    fn test_chart_not_offered_in_mode() {
        let err = select(&table(), &bi("Total", "Rating", ChartKind::PieChart)).unwrap_err();
        assert_eq!(
            err,
            SelectionError::ChartNotOffered {
                chart: ChartKind::PieChart,
                mode: AnalysisMode::Bivariate
            }
        );
    }

    #[test]
    fn test_unknown_column() {
        let err = select(&table(), &uni("Discount", ChartKind::Histogram)).unwrap_err();
        assert_eq!(err, SelectionError::UnknownColumn("Discount".to_string()));
    }
}
