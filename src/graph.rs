use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::ops::Range;
use tracing::debug;

use crate::dataset::axis_to_date;
use crate::ir::{AxisFormat, BarData, BoxData, Figure, FigureBody, Orientation, PieData, XyData};
use crate::palette::ColorPalette;
use crate::transform::format_value;
use crate::{OutputFormat, RenderOptions};

/// Share of a slot taken by its bars (or boxes), split between dodged series
const SLOT_WIDTH: f64 = 0.8;

/// Render a figure to PNG or SVG bytes
pub fn render_figure(figure: &Figure, options: &RenderOptions) -> Result<Vec<u8>> {
    debug!(title = %figure.title, format = options.format.extension(), "rendering figure");
    options.validate()?;
    match options.format {
        OutputFormat::Png => render_png(figure, options.width, options.height),
        OutputFormat::Svg => render_svg(figure, options.width, options.height),
    }
}

fn render_png(figure: &Figure, width: u32, height: u32) -> Result<Vec<u8>> {
    let len = rgb_buffer_len(width, height)
        .with_context(|| format!("Image size {}x{} is too large", width, height))?;
    let mut buffer = vec![0u8; len];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

fn render_svg(figure: &Figure, width: u32, height: u32) -> Result<Vec<u8>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present().context("Failed to present drawing")?;
    }
    Ok(svg.into_bytes())
}

fn draw_figure<DB>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;
    let palette = ColorPalette::default();
    match &figure.body {
        FigureBody::Bars(bars) => draw_bars(root, figure, bars, &palette),
        FigureBody::Boxes(boxes) => draw_boxes(root, figure, boxes, &palette),
        FigureBody::Pie(pie) => draw_pie(root, figure, pie, &palette),
        FigureBody::Points(xy) => draw_xy(root, figure, xy, false, &palette),
        FigureBody::Line(xy) => draw_xy(root, figure, xy, true, &palette),
    }
}

fn draw_bars<DB>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    bars: &BarData,
    palette: &ColorPalette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = bars.slots.len();
    if n == 0 || bars.series.is_empty() {
        anyhow::bail!("Cannot draw bar chart with no data");
    }

    let values = bars.series.iter().flat_map(|s| s.values.iter().flatten().copied());
    let value_range = value_range(values);
    let present: Vec<Vec<bool>> = bars
        .series
        .iter()
        .map(|s| s.values.iter().map(Option::is_some).collect())
        .collect();
    let placements = dodge(&present, SLOT_WIDTH);

    let vertical = bars.orientation == Orientation::Vertical;
    let (x_range, y_range) = if vertical {
        (slot_range(n), value_range)
    } else {
        (value_range, slot_range(n))
    };

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&figure.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(if vertical { 60 } else { 140 })
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    let slot_formatter = |v: &f64| slot_label(&bars.slots, *v);
    let value_formatter = |v: &f64| format_value(*v);
    {
        let mut mesh = chart.configure_mesh();
        mesh.x_desc(&figure.x_label).y_desc(&figure.y_label);
        if vertical {
            mesh.disable_x_mesh()
                .x_labels(n)
                .x_label_formatter(&slot_formatter)
                .y_label_formatter(&value_formatter);
        } else {
            mesh.disable_y_mesh()
                .y_labels(n)
                .y_label_formatter(&slot_formatter)
                .x_label_formatter(&value_formatter);
        }
        mesh.draw().context("Failed to draw mesh")?;
    }

    for (series_idx, series) in bars.series.iter().enumerate() {
        let color = palette.nth(series_idx);
        let rects: Vec<(f64, f64, f64)> = series
            .values
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| {
                let (center, width) = placements[series_idx][slot]?;
                Some((center, width, (*value)?))
            })
            .collect();

        let drawn = chart
            .draw_series(rects.iter().map(|&(center, width, value)| {
                let half = width / 2.0;
                let corners = if vertical {
                    [(center - half, 0.0), (center + half, value)]
                } else {
                    [(0.0, center - half), (value, center + half)]
                };
                Rectangle::new(corners, color.filled())
            }))
            .context("Failed to draw bars")?;
        if bars.legend {
            drawn
                .label(series.key.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        if bars.show_values {
            chart
                .draw_series(rects.iter().map(|&(center, _, value)| {
                    let pos = if vertical { (center, value) } else { (value, center) };
                    Text::new(format_value(value), pos, ("sans-serif", 12).into_font())
                }))
                .context("Failed to draw bar labels")?;
        }
    }

    if bars.legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_boxes<DB>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    boxes: &BoxData,
    palette: &ColorPalette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = boxes.slots.len();
    let extent = boxes
        .series
        .iter()
        .flat_map(|s| s.stats.iter().flatten())
        .flat_map(|st| {
            [st.lower_whisker, st.upper_whisker]
                .into_iter()
                .chain(st.outliers.iter().copied())
        });
    let y_range = padded_range(extent).context("Cannot draw box plot with no data")?;

    let present: Vec<Vec<bool>> = boxes
        .series
        .iter()
        .map(|s| s.stats.iter().map(Option::is_some).collect())
        .collect();
    let placements = dodge(&present, SLOT_WIDTH);

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&figure.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(slot_range(n), y_range)
        .context("Failed to build chart")?;

    let slot_formatter = |v: &f64| slot_label(&boxes.slots, *v);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&slot_formatter)
        .x_desc(&figure.x_label)
        .y_desc(&figure.y_label)
        .draw()
        .context("Failed to draw mesh")?;

    for (series_idx, series) in boxes.series.iter().enumerate() {
        let color = palette.nth(series_idx);
        let placed: Vec<_> = series
            .stats
            .iter()
            .enumerate()
            .filter_map(|(slot, stats)| Some((placements[series_idx][slot]?, stats.as_ref()?)))
            .collect();

        let mut whiskers = Vec::new();
        let mut medians = Vec::new();
        let mut outliers = Vec::new();
        for &((x, width), st) in &placed {
            let cap = width * 0.2;
            whiskers.push(vec![(x, st.lower_whisker), (x, st.q1)]);
            whiskers.push(vec![(x, st.q3), (x, st.upper_whisker)]);
            whiskers.push(vec![(x - cap, st.lower_whisker), (x + cap, st.lower_whisker)]);
            whiskers.push(vec![(x - cap, st.upper_whisker), (x + cap, st.upper_whisker)]);
            medians.push(vec![(x - width / 2.0, st.median), (x + width / 2.0, st.median)]);
            outliers.extend(st.outliers.iter().map(|&v| (x, v)));
        }

        chart
            .draw_series(whiskers.into_iter().map(|pts| PathElement::new(pts, color.stroke_width(2))))
            .context("Failed to draw whiskers")?;

        let drawn = chart
            .draw_series(placed.iter().map(|&((x, width), st)| {
                let half = width / 2.0;
                Rectangle::new([(x - half, st.q3), (x + half, st.q1)], color.mix(0.7).filled())
            }))
            .context("Failed to draw boxes")?;
        if boxes.legend {
            drawn
                .label(series.key.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .draw_series(medians.into_iter().map(|pts| PathElement::new(pts, WHITE.stroke_width(2))))
            .context("Failed to draw medians")?;
        chart
            .draw_series(outliers.into_iter().map(|p| Circle::new(p, 3, color.filled())))
            .context("Failed to draw outliers")?;
    }

    if boxes.legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_pie<DB>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    pie: &PieData,
    palette: &ColorPalette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let total: usize = pie.slices.iter().map(|s| s.count).sum();
    if total == 0 {
        anyhow::bail!("Cannot draw pie chart with no data");
    }

    let area = root
        .titled(&figure.title, ("sans-serif", 20))
        .context("Failed to draw title")?;
    let (width, height) = area.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = width.min(height) as f64 * 0.35;
    let to_pixel = |angle: f64, r: f64| {
        (
            (center.0 + r * angle.cos()).round() as i32,
            (center.1 + r * angle.sin()).round() as i32,
        )
    };

    // clockwise from twelve o'clock
    let mut start = -PI / 2.0;
    for (idx, slice) in pie.slices.iter().enumerate() {
        let share = slice.count as f64 / total as f64;
        let sweep = 2.0 * PI * share;
        let steps = ((share * 360.0).ceil() as usize).max(2);

        let mut points = vec![to_pixel(0.0, 0.0)];
        points.extend((0..=steps).map(|k| to_pixel(start + sweep * k as f64 / steps as f64, radius)));
        area.draw(&Polygon::new(points, palette.nth(idx).filled()))
            .context("Failed to draw pie slice")?;

        let label = format!("{} ({:.1}%)", slice.label, share * 100.0);
        area.draw(&Text::new(
            label,
            to_pixel(start + sweep / 2.0, radius * 1.12),
            ("sans-serif", 14).into_font(),
        ))
        .context("Failed to draw pie label")?;

        start += sweep;
    }

    Ok(())
}

fn draw_xy<DB>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    xy: &XyData,
    as_line: bool,
    palette: &ColorPalette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_range = padded_range(xy.points.iter().map(|p| p.0))
        .context("Cannot draw chart with no data points")?;
    let y_range = padded_range(xy.points.iter().map(|p| p.1))
        .context("Cannot draw chart with no data points")?;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&figure.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    let x_formatter = |v: &f64| axis_label(*v, xy.x_axis);
    let y_formatter = |v: &f64| axis_label(*v, xy.y_axis);
    chart
        .configure_mesh()
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc(&figure.x_label)
        .y_desc(&figure.y_label)
        .draw()
        .context("Failed to draw mesh")?;

    let color = palette.nth(0);
    if as_line {
        chart
            .draw_series(LineSeries::new(xy.points.iter().copied(), color.stroke_width(2)))
            .context("Failed to draw line series")?;
    } else {
        chart
            .draw_series(xy.points.iter().map(|&p| Circle::new(p, 3, color.filled())))
            .context("Failed to draw point series")?;
    }

    Ok(())
}

/// Bytes in an RGB8 buffer of the given size, `None` on overflow
fn rgb_buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
}

/// Center and width of each (series, slot) cell. Series present at a slot
/// share it side by side in series order; absent cells get `None`.
pub fn dodge(present: &[Vec<bool>], slot_width: f64) -> Vec<Vec<Option<(f64, f64)>>> {
    let slots = present.iter().map(Vec::len).max().unwrap_or(0);
    let mut placements: Vec<Vec<Option<(f64, f64)>>> =
        present.iter().map(|row| vec![None; row.len()]).collect();

    for slot in 0..slots {
        let occupants: Vec<usize> = (0..present.len())
            .filter(|&s| present[s].get(slot).copied().unwrap_or(false))
            .collect();
        let count = occupants.len() as f64;
        let width = slot_width / count;
        for (rank, &series) in occupants.iter().enumerate() {
            let offset = (rank as f64 - (count - 1.0) / 2.0) * width;
            placements[series][slot] = Some((slot as f64 + offset, width));
        }
    }

    placements
}

/// Categorical axis: slot `i` is centred on `i`
fn slot_range(n: usize) -> Range<f64> {
    -0.5..(n as f64 - 0.5)
}

fn slot_label(slots: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    slots.get(idx as usize).cloned().unwrap_or_default()
}

/// Always includes zero, with headroom above the tallest bar for its label
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if max == min {
        return min..(min + 1.0);
    }
    let padding = (max - min) * 0.1;
    let lo = if min < 0.0 { min - padding } else { 0.0 };
    lo..(max + padding)
}

fn padded_range(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    if min == max {
        Some((min - 1.0)..(max + 1.0))
    } else {
        let padding = (max - min) * 0.05;
        Some((min - padding)..(max + padding))
    }
}

fn axis_label(value: f64, format: AxisFormat) -> String {
    match format {
        AxisFormat::Date => axis_to_date(value)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        AxisFormat::Number => format_value(value),
    }
}
