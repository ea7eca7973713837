use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;

use crate::series::{ChartSeries, FillColor, Series};

/// The supported chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
    Doughnut,
    PolarArea,
    Radar,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Render a chart series structure to PNG bytes.
pub fn render_chart(
    data: &ChartSeries,
    kind: ChartKind,
    title: &str,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    if data.labels.is_empty() || data.series.is_empty() {
        bail!("Cannot render a chart with no data points");
    }

    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        match kind {
            ChartKind::Line | ChartKind::Bar | ChartKind::Scatter => {
                draw_cartesian(&root, data, kind, title)?
            }
            ChartKind::Pie | ChartKind::Doughnut | ChartKind::PolarArea => {
                draw_radial(&root, data, kind, title)?
            }
            ChartKind::Radar => draw_radar(&root, data, title)?,
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(buffer, width, height)
}

/// Line, bar and scatter charts share a categorical x axis: labels sit at
/// index positions and a formatter maps ticks back to label text.
fn draw_cartesian(
    root: &DrawingArea<BitMapBackend, Shift>,
    data: &ChartSeries,
    kind: ChartKind,
    title: &str,
) -> Result<()> {
    let num_labels = data.labels.len();
    let y_range = value_range(data, kind == ChartKind::Bar)?;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..(num_labels as f64), y_range)
        .context("Failed to build chart")?;

    let labels = data.labels.clone();
    chart
        .configure_mesh()
        .x_labels(num_labels)
        .x_label_formatter(&|x| {
            let idx = *x as usize;
            if idx < labels.len() {
                labels[idx].clone()
            } else {
                String::new()
            }
        })
        .draw()
        .context("Failed to draw mesh")?;

    let num_series = data.series.len();
    for (series_idx, series) in data.series.iter().enumerate() {
        let color = parse_color(&series.border_color);

        match kind {
            ChartKind::Line => {
                let points: Vec<(f64, f64)> = series
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, &v)| (i as f64 + 0.5, v))
                    .collect();
                chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)))
                    .context("Failed to draw line series")?
                    .label(series.name.clone())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                    });
            }
            ChartKind::Scatter => {
                let points: Vec<(f64, f64)> = series
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, &v)| (i as f64 + 0.5, v))
                    .collect();
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                    )
                    .context("Failed to draw point series")?
                    .label(series.name.clone())
                    .legend(move |(x, y)| Circle::new((x + 9, y), 4, color.filled()));
            }
            ChartKind::Bar => {
                // Dodge: side-by-side bars per series at each label slot.
                let slot = 0.8 / num_series as f64;
                let offset = (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * slot;

                for (i, &value) in series.values.iter().enumerate() {
                    if !value.is_finite() {
                        continue;
                    }
                    let x_center = i as f64 + 0.5 + offset;
                    let fill = parse_color(slice_color(series, i));
                    chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [
                                (x_center - slot / 2.0, 0.0),
                                (x_center + slot / 2.0, value),
                            ],
                            fill.filled(),
                        )))
                        .context("Failed to draw bar")?;
                }
                chart
                    .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())
                    .context("Failed to register bar legend")?
                    .label(series.name.clone())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 4), (x + 12, y + 4)], color.filled())
                    });
            }
            _ => unreachable!(),
        }
    }

    if num_series > 1 {
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

/// Pie, doughnut and polar-area charts draw the first series as sectors.
fn draw_radial(
    root: &DrawingArea<BitMapBackend, Shift>,
    data: &ChartSeries,
    kind: ChartKind,
    title: &str,
) -> Result<()> {
    let area = root
        .titled(title, ("sans-serif", 20))
        .context("Failed to draw title")?;

    let series = &data.series[0];
    let values: Vec<f64> = series
        .values
        .iter()
        .map(|&v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect();
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        bail!("Cannot render a radial chart without positive values");
    }

    let (width, height) = area.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = (width.min(height) as f64 / 2.0) * 0.8;
    let inner = match kind {
        ChartKind::Doughnut => radius * 0.5,
        _ => 0.0,
    };

    let max_value = values.iter().cloned().fold(0.0_f64, f64::max);
    let mut start = -PI / 2.0;

    for (i, &value) in values.iter().enumerate() {
        let (sweep, outer) = match kind {
            // Pie/doughnut: angle proportional to value, fixed radius.
            ChartKind::Pie | ChartKind::Doughnut => (value / total * 2.0 * PI, radius),
            // Polar area: equal angles, radius proportional to value.
            _ => (2.0 * PI / values.len() as f64, radius * value / max_value),
        };

        if sweep > 0.0 && outer > 0.0 {
            let color = parse_color(slice_color(series, i));
            let sector = sector_points(center, inner, outer, start, start + sweep);
            area.draw(&Polygon::new(sector, color.filled()))
                .context("Failed to draw sector")?;

            // Label at the sector's mid-angle, just outside the rim.
            let mid = start + sweep / 2.0;
            let lx = center.0 + (radius * 1.02) * mid.cos();
            let ly = center.1 + (radius * 1.02) * mid.sin();
            area.draw(&Text::new(
                data.labels[i].clone(),
                (lx as i32, ly as i32),
                ("sans-serif", 12),
            ))
            .context("Failed to draw sector label")?;
        }

        start += sweep;
    }

    Ok(())
}

/// Radar chart: one spoke per label, one closed polygon per series.
fn draw_radar(
    root: &DrawingArea<BitMapBackend, Shift>,
    data: &ChartSeries,
    title: &str,
) -> Result<()> {
    let area = root
        .titled(title, ("sans-serif", 20))
        .context("Failed to draw title")?;

    let num_axes = data.labels.len();
    if num_axes < 3 {
        bail!("Radar charts need at least three labels");
    }

    let max_value = data
        .series
        .iter()
        .flat_map(|s| s.values.iter())
        .cloned()
        .filter(|v: &f64| v.is_finite())
        .fold(0.0_f64, f64::max);
    if max_value <= 0.0 {
        bail!("Cannot render a radar chart without positive values");
    }

    let (width, height) = area.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = (width.min(height) as f64 / 2.0) * 0.75;
    let angle_of = |i: usize| -PI / 2.0 + i as f64 * 2.0 * PI / num_axes as f64;

    // Grid: four concentric rings plus the spokes.
    let grid = RGBColor(200, 200, 200);
    for ring in 1..=4 {
        let r = radius * ring as f64 / 4.0;
        let mut points: Vec<(i32, i32)> = (0..=num_axes)
            .map(|i| {
                let a = angle_of(i % num_axes);
                ((center.0 + r * a.cos()) as i32, (center.1 + r * a.sin()) as i32)
            })
            .collect();
        points.dedup();
        area.draw(&PathElement::new(points, grid))
            .context("Failed to draw radar grid")?;
    }
    for i in 0..num_axes {
        let a = angle_of(i);
        let end = (
            (center.0 + radius * a.cos()) as i32,
            (center.1 + radius * a.sin()) as i32,
        );
        area.draw(&PathElement::new(
            vec![(center.0 as i32, center.1 as i32), end],
            grid,
        ))
        .context("Failed to draw radar spoke")?;

        let lx = center.0 + radius * 1.06 * a.cos();
        let ly = center.1 + radius * 1.06 * a.sin();
        area.draw(&Text::new(
            data.labels[i].clone(),
            (lx as i32, ly as i32),
            ("sans-serif", 12),
        ))
        .context("Failed to draw radar label")?;
    }

    for series in &data.series {
        let color = parse_color(&series.border_color);
        let mut points: Vec<(i32, i32)> = (0..num_axes)
            .map(|i| {
                let v = series.values.get(i).copied().unwrap_or(0.0);
                let v = if v.is_finite() && v > 0.0 { v } else { 0.0 };
                let r = radius * v / max_value;
                let a = angle_of(i);
                ((center.0 + r * a.cos()) as i32, (center.1 + r * a.sin()) as i32)
            })
            .collect();

        area.draw(&Polygon::new(points.clone(), color.mix(0.25).filled()))
            .context("Failed to draw radar area")?;
        points.push(points[0]);
        area.draw(&PathElement::new(points, color.stroke_width(2)))
            .context("Failed to draw radar outline")?;
    }

    Ok(())
}

/// Approximate an annular sector as a polygon (outer arc forward, inner arc
/// back; a plain pie slice has inner radius 0).
fn sector_points(
    center: (f64, f64),
    inner: f64,
    outer: f64,
    start: f64,
    end: f64,
) -> Vec<(i32, i32)> {
    let steps = (((end - start).abs() / (PI / 90.0)).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps * 2 + 2);

    for i in 0..=steps {
        let a = start + (end - start) * i as f64 / steps as f64;
        points.push((
            (center.0 + outer * a.cos()) as i32,
            (center.1 + outer * a.sin()) as i32,
        ));
    }
    if inner > 0.0 {
        for i in (0..=steps).rev() {
            let a = start + (end - start) * i as f64 / steps as f64;
            points.push((
                (center.0 + inner * a.cos()) as i32,
                (center.1 + inner * a.sin()) as i32,
            ));
        }
    } else {
        points.push((center.0 as i32, center.1 as i32));
    }

    points
}

/// Padded y range over every finite value; 5% headroom so the data does
/// not touch the frame.
fn value_range(data: &ChartSeries, include_zero: bool) -> Result<std::ops::Range<f64>> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in data.series.iter().flat_map(|s| s.values.iter()) {
        if value.is_finite() {
            min = min.min(*value);
            max = max.max(*value);
        }
    }
    if include_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    if min > max {
        bail!("Cannot render a chart with no numeric values");
    }

    if min == max {
        Ok((min - 1.0)..(max + 1.0))
    } else {
        let padding = (max - min) * 0.05;
        Ok((min - padding)..(max + padding))
    }
}

fn slice_color(series: &Series, index: usize) -> &str {
    match &series.fill_color {
        FillColor::Single(color) => color,
        FillColor::PerPoint(colors) => &colors[index % colors.len()],
    }
}

/// Parse a "#rrggbb" hex string (palette output) or a basic color name.
fn parse_color(color: &str) -> RGBColor {
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() == 6 {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return RGBColor(r, g, b);
            }
        }
    }
    match color {
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "black" => BLACK,
        "yellow" => YELLOW,
        "cyan" => CYAN,
        "magenta" => MAGENTA,
        "white" => WHITE,
        _ => BLUE,
    }
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_csv;
    use crate::series::build_series;

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && &bytes[0..8] == &[137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn sample_chart(grouped: bool) -> ChartSeries {
        let data = decode_csv(
            "month,region,sales\n2024-01,east,100\n2024-01,west,50\n2024-02,east,80\n2024-03,west,60\n"
                .as_bytes(),
        )
        .unwrap();
        let group = if grouped { Some("region") } else { None };
        build_series(&data, "month", "sales", group).unwrap()
    }

    #[test]
    fn test_render_every_kind() {
        let options = RenderOptions::default();
        let grouped = sample_chart(true);
        let flat = sample_chart(false);
        for kind in [
            ChartKind::Line,
            ChartKind::Bar,
            ChartKind::Scatter,
            ChartKind::Radar,
        ] {
            let png = render_chart(&grouped, kind, "sales vs month", &options).unwrap();
            assert!(is_valid_png(&png), "{:?} produced invalid PNG", kind);
        }
        for kind in [ChartKind::Pie, ChartKind::Doughnut, ChartKind::PolarArea] {
            let png = render_chart(&flat, kind, "sales vs month", &options).unwrap();
            assert!(is_valid_png(&png), "{:?} produced invalid PNG", kind);
        }
    }

    #[test]
    fn test_render_empty_fails() {
        let empty = ChartSeries::empty();
        let result = render_chart(&empty, ChartKind::Line, "", &RenderOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_render_custom_size() {
        let chart = sample_chart(false);
        let options = RenderOptions {
            width: 320,
            height: 240,
        };
        let png = render_chart(&chart, ChartKind::Line, "t", &options).unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_radar_needs_three_labels() {
        let data = decode_csv("x,y\na,1\nb,2\n".as_bytes()).unwrap();
        let chart = build_series(&data, "x", "y", None).unwrap();
        let result = render_chart(&chart, ChartKind::Radar, "", &RenderOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#1f77b4"), RGBColor(0x1f, 0x77, 0xb4));
        assert_eq!(parse_color("red"), RED);
        assert_eq!(parse_color("nonsense"), BLUE);
    }

    #[test]
    fn test_value_range_padding() {
        let chart = sample_chart(false);
        let range = value_range(&chart, false).unwrap();
        assert!(range.start < 50.0);
        assert!(range.end > 100.0);
    }
}
