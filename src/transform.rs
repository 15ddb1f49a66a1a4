use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tracing::debug;

use crate::dataset::{axis_to_date, Column, Table};
use crate::ir::{
    AxisFormat, BarData, BarLayout, BarSeries, BarValue, BoxData, BoxSeries, BoxStats, CategoryOrder,
    ChartPlan, Figure, FigureBody, Geometry, Grouping, Orientation, PieData, PieSlice, SeriesBy, Slots,
    XyData,
};
use crate::RenderOptions;

/// Main entry point: aggregate the table into drawable figure data
pub fn build_figure(table: &Table, plan: &ChartPlan, options: &RenderOptions) -> Result<Figure> {
    let figure = match &plan.geometry {
        Geometry::Bars(layout) => build_bars(table, &plan.title, layout, options.bins)?,
        Geometry::Box { value, group, color } => {
            build_boxes(table, &plan.title, value, group.as_ref(), color.as_ref())?
        }
        Geometry::Pie { names } => build_pie(table, &plan.title, names)?,
        Geometry::Scatter { x, y } => {
            let (x_col, y_col) = (column(table, x)?, column(table, y)?);
            let rows: Vec<usize> = (0..table.len()).collect();
            Figure {
                title: plan.title.clone(),
                x_label: x_col.name().to_string(),
                y_label: y_col.name().to_string(),
                body: FigureBody::Points(xy_data(x_col, y_col, &rows)),
            }
        }
        Geometry::Line { x, y } => {
            let (x_col, y_col) = (column(table, x)?, column(table, y)?);
            let rows = table
                .order_by(x)
                .ok_or_else(|| anyhow!("Column '{}' not found", x))?;
            Figure {
                title: plan.title.clone(),
                x_label: x_col.name().to_string(),
                y_label: y_col.name().to_string(),
                body: FigureBody::Line(xy_data(x_col, y_col, &rows)),
            }
        }
    };
    debug!(title = %figure.title, "built figure");
    Ok(figure)
}

fn column<'t>(table: &'t Table, name: &str) -> Result<&'t Column> {
    table
        .column(name)
        .ok_or_else(|| anyhow!("Column '{}' not found", name))
}

/// Distinct labels plus the label index of every row (`None` for empty cells)
#[derive(Debug, Clone)]
struct Partition {
    labels: Vec<String>,
    index_of_row: Vec<Option<usize>>,
}

impl Partition {
    fn single(label: &str, rows: usize) -> Self {
        Partition {
            labels: vec![label.to_string()],
            index_of_row: vec![Some(0); rows],
        }
    }
}

fn partition(column: &Column, order: CategoryOrder) -> Partition {
    let mut labels: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut sort_keys: Vec<Option<f64>> = Vec::new();
    let mut lookup: HashMap<String, usize> = HashMap::new();
    let mut index_of_row = Vec::with_capacity(column.len());

    for row in 0..column.len() {
        let key = column.display(row);
        if key.is_empty() {
            index_of_row.push(None);
            continue;
        }
        let idx = match lookup.get(&key) {
            Some(&idx) => idx,
            None => {
                lookup.insert(key.clone(), labels.len());
                labels.push(key);
                counts.push(0);
                sort_keys.push(column.numeric(row));
                labels.len() - 1
            }
        };
        counts[idx] += 1;
        index_of_row.push(Some(idx));
    }

    let mut permutation: Vec<usize> = (0..labels.len()).collect();
    match order {
        CategoryOrder::Appearance => {}
        // stable sort: ties keep first appearance
        CategoryOrder::Frequency => permutation.sort_by(|&a, &b| counts[b].cmp(&counts[a])),
        CategoryOrder::Ascending => permutation.sort_by(|&a, &b| match (sort_keys[a], sort_keys[b]) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => labels[a].cmp(&labels[b]),
        }),
    }

    let mut position = vec![0; labels.len()];
    for (pos, &old) in permutation.iter().enumerate() {
        position[old] = pos;
    }

    Partition {
        labels: permutation.iter().map(|&old| labels[old].clone()).collect(),
        index_of_row: index_of_row.into_iter().map(|i| i.map(|old| position[old])).collect(),
    }
}

/// Equal-width bins over the column's range. The maximum falls in the last bin.
fn bin(column: &Column, bin_count: usize) -> Partition {
    let values: Vec<Option<f64>> = (0..column.len()).map(|row| column.numeric(row)).collect();
    let finite = values.iter().flatten();
    let min = finite.clone().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = finite.fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    if !min.is_finite() || !max.is_finite() {
        return Partition {
            labels: Vec::new(),
            index_of_row: vec![None; values.len()],
        };
    }

    let (count, width) = if max > min {
        (bin_count.max(1), (max - min) / bin_count.max(1) as f64)
    } else {
        (1, 1.0)
    };

    let format = |v: f64| format_bound(v, column.is_date());
    let labels = (0..count)
        .map(|i| {
            let lo = min + i as f64 * width;
            format!("{} - {}", format(lo), format(lo + width))
        })
        .collect();

    let index_of_row = values
        .iter()
        .map(|v| v.map(|v| (((v - min) / width).floor() as usize).min(count - 1)))
        .collect();

    Partition { labels, index_of_row }
}

fn format_bound(value: f64, is_date: bool) -> String {
    if is_date {
        if let Some(date) = axis_to_date(value) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    format_value(value)
}

/// Up to two decimals, trailing zeros dropped
pub fn format_value(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn build_bars(table: &Table, title: &str, layout: &BarLayout, bins: usize) -> Result<Figure> {
    let (slot_column, slots) = match &layout.slots {
        Slots::Categories(grouping) => {
            let col = column(table, &grouping.column)?;
            (col, partition(col, grouping.order))
        }
        Slots::Bins { column: name } => {
            let col = column(table, name)?;
            (col, bin(col, bins))
        }
    };

    let value_column = match &layout.value {
        BarValue::Count => None,
        BarValue::Sum(name) => Some(column(table, name)?),
    };
    let value_label = match value_column {
        None => "count".to_string(),
        Some(col) => format!("sum of {}", col.name()),
    };

    let series = match &layout.series {
        SeriesBy::Single => Partition::single(&value_label, table.len()),
        SeriesBy::Slot => slots.clone(),
        SeriesBy::Column(grouping) => partition(column(table, &grouping.column)?, grouping.order),
    };

    let mut values = vec![vec![None::<f64>; slots.labels.len()]; series.labels.len()];
    for row in 0..table.len() {
        let (Some(slot), Some(key)) = (slots.index_of_row[row], series.index_of_row[row]) else {
            continue;
        };
        let contribution = match value_column {
            None => Some(1.0),
            Some(col) => col.numeric(row),
        };
        if let Some(v) = contribution {
            *values[key][slot].get_or_insert(0.0) += v;
        }
    }

    let series: Vec<BarSeries> = series
        .labels
        .into_iter()
        .zip(values)
        .map(|(key, values)| BarSeries { key, values })
        .collect();

    let (x_label, y_label) = match layout.orientation {
        Orientation::Vertical => (slot_column.name().to_string(), value_label),
        Orientation::Horizontal => (value_label, slot_column.name().to_string()),
    };

    Ok(Figure {
        title: title.to_string(),
        x_label,
        y_label,
        body: FigureBody::Bars(BarData {
            orientation: layout.orientation,
            slots: slots.labels,
            series,
            show_values: layout.show_values,
            legend: matches!(layout.series, SeriesBy::Column(_)),
        }),
    })
}

fn build_boxes(
    table: &Table,
    title: &str,
    value: &str,
    group: Option<&Grouping>,
    color: Option<&Grouping>,
) -> Result<Figure> {
    let value_col = column(table, value)?;
    let slots = match group {
        Some(g) => partition(column(table, &g.column)?, g.order),
        None => Partition::single(value_col.name(), table.len()),
    };
    let series = match color {
        Some(g) => partition(column(table, &g.column)?, g.order),
        None => Partition::single(value_col.name(), table.len()),
    };

    let mut samples = vec![vec![Vec::<f64>::new(); slots.labels.len()]; series.labels.len()];
    for row in 0..table.len() {
        let (Some(slot), Some(key), Some(v)) =
            (slots.index_of_row[row], series.index_of_row[row], value_col.numeric(row))
        else {
            continue;
        };
        samples[key][slot].push(v);
    }

    let series = series
        .labels
        .into_iter()
        .zip(samples)
        .map(|(key, per_slot)| BoxSeries {
            key,
            stats: per_slot.into_iter().map(box_stats).collect(),
        })
        .collect();

    let x_label = match group {
        Some(g) => column(table, &g.column)?.name().to_string(),
        None => String::new(),
    };

    Ok(Figure {
        title: title.to_string(),
        x_label,
        y_label: value_col.name().to_string(),
        body: FigureBody::Boxes(BoxData {
            slots: slots.labels,
            series,
            legend: color.is_some(),
        }),
    })
}

/// Quartiles with linear interpolation; whiskers reach the furthest points
/// within 1.5 IQR of the box, anything beyond is an outlier.
fn box_stats(mut ys: Vec<f64>) -> Option<BoxStats> {
    if ys.is_empty() {
        return None;
    }
    ys.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);
    let outliers = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

fn build_pie(table: &Table, title: &str, names: &str) -> Result<Figure> {
    let col = column(table, names)?;
    let groups = partition(col, CategoryOrder::Frequency);
    let mut counts = vec![0usize; groups.labels.len()];
    for idx in groups.index_of_row.iter().flatten() {
        counts[*idx] += 1;
    }
    let slices = groups
        .labels
        .into_iter()
        .zip(counts)
        .map(|(label, count)| PieSlice { label, count })
        .collect();

    Ok(Figure {
        title: title.to_string(),
        x_label: String::new(),
        y_label: col.name().to_string(),
        body: FigureBody::Pie(PieData { slices }),
    })
}

fn xy_data(x: &Column, y: &Column, rows: &[usize]) -> XyData {
    let points = rows
        .iter()
        .filter_map(|&row| Some((x.numeric(row)?, y.numeric(row)?)))
        .collect();
    XyData {
        points,
        x_axis: axis_format(x),
        y_axis: axis_format(y),
    }
}

fn axis_format(column: &Column) -> AxisFormat {
    if column.is_date() {
        AxisFormat::Date
    } else {
        AxisFormat::Number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnData;
    use chrono::NaiveDate;

    fn text(values: &[&str]) -> ColumnData {
        ColumnData::Text(values.iter().map(|s| s.to_string()).collect())
    }

    fn make_data() -> Table {
        Table::new(vec![
            Column::new("City", text(&["Yangon", "Mandalay", "Mandalay", "Naypyitaw", "Mandalay", "Yangon"])),
            Column::new("Gender", text(&["Female", "Male", "Female", "Male", "Male", "Female"])),
            Column::new("Unit price", ColumnData::Number(vec![40.0, 10.0, 30.0, 20.0, 60.0, 50.0])),
            Column::new("Quantity", ColumnData::Number(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
            Column::new(
                "Date",
                ColumnData::Date(
                    [5, 1, 3, 2, 4, 6]
                        .iter()
                        .map(|d| NaiveDate::from_ymd_opt(2019, 1, *d).unwrap())
                        .collect(),
                ),
            ),
        ])
        .unwrap()
    }

    fn plan(geometry: Geometry) -> ChartPlan {
        ChartPlan {
            title: "T".to_string(),
            geometry,
        }
    }

    fn bars(figure: &Figure) -> &BarData {
        match &figure.body {
            FigureBody::Bars(b) => b,
            other => panic!("Expected bars, got {:?}", other),
        }
    }

    #[test]
    fn test_categorical_histogram_orders_by_frequency() {
        let layout = BarLayout {
            slots: Slots::Categories(Grouping::new("City", CategoryOrder::Frequency)),
            value: BarValue::Count,
            series: SeriesBy::Slot,
            orientation: Orientation::Horizontal,
            show_values: true,
        };
        let figure = build_figure(&make_data(), &plan(Geometry::Bars(layout)), &RenderOptions::default()).unwrap();
        let data = bars(&figure);
        assert_eq!(data.slots, vec!["Mandalay", "Yangon", "Naypyitaw"]);
        // one coloured series per category, each present only in its own slot
        assert_eq!(data.series.len(), 3);
        assert_eq!(data.series[0].values, vec![Some(3.0), None, None]);
        assert_eq!(data.series[1].values, vec![None, Some(2.0), None]);
        assert_eq!(figure.x_label, "count");
        assert_eq!(figure.y_label, "City");
    }

    #[test]
    fn test_numerical_histogram_bins_cover_all_rows() {
        let layout = BarLayout {
            slots: Slots::Bins { column: "Quantity".to_string() },
            value: BarValue::Count,
            series: SeriesBy::Single,
            orientation: Orientation::Horizontal,
            show_values: true,
        };
        let options = RenderOptions { bins: 5, ..RenderOptions::default() };
        let figure = build_figure(&make_data(), &plan(Geometry::Bars(layout)), &options).unwrap();
        let data = bars(&figure);
        assert_eq!(data.slots.len(), 5);
        assert_eq!(data.slots[0], "1 - 2");
        let total: f64 = data.series[0].values.iter().flatten().sum();
        assert_eq!(total, 6.0);
        // maximum lands in the last bin alongside 5
        assert_eq!(data.series[0].values[4], Some(2.0));
    }

    #[test]
    fn test_sum_by_category_with_color_groups() {
        let layout = BarLayout {
            slots: Slots::Categories(Grouping::new("City", CategoryOrder::Appearance)),
            value: BarValue::Sum("Quantity".to_string()),
            series: SeriesBy::Column(Grouping::new("Gender", CategoryOrder::Appearance)),
            orientation: Orientation::Vertical,
            show_values: true,
        };
        let figure = build_figure(&make_data(), &plan(Geometry::Bars(layout)), &RenderOptions::default()).unwrap();
        let data = bars(&figure);
        assert_eq!(data.slots, vec!["Yangon", "Mandalay", "Naypyitaw"]);
        assert!(data.legend);
        let female = &data.series[0];
        let male = &data.series[1];
        assert_eq!(female.key, "Female");
        assert_eq!(female.values, vec![Some(7.0), Some(3.0), None]);
        assert_eq!(male.values, vec![None, Some(7.0), Some(4.0)]);
        assert_eq!(figure.y_label, "sum of Quantity");
    }

    #[test]
    fn test_pie_slices_per_value() {
        let figure = build_figure(
            &make_data(),
            &plan(Geometry::Pie { names: "Gender".to_string() }),
            &RenderOptions::default(),
        )
        .unwrap();
        match figure.body {
            FigureBody::Pie(pie) => {
                assert_eq!(pie.slices.len(), 2);
                assert_eq!(pie.slices[0], PieSlice { label: "Female".to_string(), count: 3 });
                assert_eq!(pie.slices[1], PieSlice { label: "Male".to_string(), count: 3 });
            }
            other => panic!("Expected pie, got {:?}", other),
        }
    }

    #[test]
    fn test_line_rows_sorted_by_first_column() {
        let figure = build_figure(
            &make_data(),
            &plan(Geometry::Line { x: "Unit price".to_string(), y: "Quantity".to_string() }),
            &RenderOptions::default(),
        )
        .unwrap();
        match figure.body {
            FigureBody::Line(xy) => {
                let xs: Vec<f64> = xy.points.iter().map(|p| p.0).collect();
                assert_eq!(xs, vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
                assert_eq!(xy.points[0], (10.0, 2.0));
            }
            other => panic!("Expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_line_drops_rows_without_x() {
        let table = Table::new(vec![
            Column::new("Unit price", ColumnData::Number(vec![3.0, f64::NAN, 1.0, 3.0])),
            Column::new("Quantity", ColumnData::Number(vec![1.0, 2.0, 3.0, 4.0])),
        ])
        .unwrap();
        let figure = build_figure(
            &table,
            &plan(Geometry::Line { x: "Unit price".to_string(), y: "Quantity".to_string() }),
            &RenderOptions::default(),
        )
        .unwrap();
        match figure.body {
            FigureBody::Line(xy) => assert_eq!(xy.points, vec![(1.0, 3.0), (3.0, 1.0), (3.0, 4.0)]),
            other => panic!("Expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_scatter_keeps_row_order_and_date_axis() {
        let figure = build_figure(
            &make_data(),
            &plan(Geometry::Scatter { x: "Date".to_string(), y: "Quantity".to_string() }),
            &RenderOptions::default(),
        )
        .unwrap();
        match figure.body {
            FigureBody::Points(xy) => {
                assert_eq!(xy.x_axis, AxisFormat::Date);
                assert_eq!(xy.y_axis, AxisFormat::Number);
                assert_eq!(xy.points.len(), 6);
                assert_eq!(xy.points[0].1, 1.0);
            }
            other => panic!("Expected points, got {:?}", other),
        }
    }

    #[test]
    fn test_box_stats_quartiles_and_outliers() {
        let stats = box_stats(vec![5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!((stats.q1, stats.median, stats.q3), (2.0, 3.0, 4.0));
        assert_eq!((stats.lower_whisker, stats.upper_whisker), (1.0, 5.0));
        assert!(stats.outliers.is_empty());

        let stats = box_stats(vec![1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.upper_whisker, 4.0);
        assert!(box_stats(Vec::new()).is_none());
    }

    #[test]
    fn test_grouped_boxes() {
        let figure = build_figure(
            &make_data(),
            &plan(Geometry::Box {
                value: "Unit price".to_string(),
                group: Some(Grouping::new("Quantity", CategoryOrder::Ascending)),
                color: Some(Grouping::new("Gender", CategoryOrder::Appearance)),
            }),
            &RenderOptions::default(),
        )
        .unwrap();
        match figure.body {
            FigureBody::Boxes(data) => {
                assert_eq!(data.slots, vec!["1", "2", "3", "4", "5", "6"]);
                assert_eq!(data.series.len(), 2);
                assert!(data.series[0].stats[0].is_some());
                assert!(data.series[0].stats[1].is_none());
                assert!(data.legend);
            }
            other => panic!("Expected boxes, got {:?}", other),
        }
        assert_eq!(figure.x_label, "Quantity");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(26.1415), "26.14");
        assert_eq!(format_value(0.5), "0.5");
    }
}
