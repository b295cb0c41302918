//! Line charts with stacked panels, reference lines and legends, drawn with
//! plotters onto an in-memory SVG backend.
//!
//! A [`Figure`] is a pure value: building it has no side effects, and
//! [`Figure::into_img_tag`] consumes it, so no chart state survives a render.

use crate::{
    engine::ImageFormat,
    error::{EngineError, Result},
    raster,
};
use plotters::{
    chart::{ChartBuilder, ChartContext, SeriesAnno, SeriesLabelPosition},
    coord::{
        Shift,
        cartesian::Cartesian2d,
        combinators::{BindKeyPoints, WithKeyPoints},
        ranged1d::Ranged,
        types::RangedCoordf64,
    },
    drawing::{DrawingArea, IntoDrawingArea},
    element::PathElement,
    series::{DashedLineSeries, LineSeries as PathSeries},
    style::{Color, RGBColor, ShapeStyle, TRANSPARENT, WHITE},
};
use plotters_svg::SVGBackend;

pub const FONT_FAMILY: &str = "DejaVu Sans, Arial, Helvetica, sans-serif";

// matplotlib single-letter colours
pub const MAGENTA: &str = "#bf00bf";
pub const BLUE: &str = "#0000ff";
pub const RED: &str = "#ff0000";
pub const CYAN: &str = "#00bfbf";
pub const YELLOW: &str = "#bfbf00";
pub const GREEN: &str = "#008000";
pub const GREY: &str = "#808080";
pub const BLACK: &str = "#000000";

/// pandas/matplotlib default property cycle
pub const COLOR_CYCLE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const PANEL_RIGHT: i32 = 20;
const Y_LABEL_AREA: i32 = 64;
const X_LABEL_AREA: i32 = 28;
const X_DESC_AREA: i32 = 44;
const AUTO_TICKS: usize = 6;
pub const MAX_TICKS: usize = 1000;

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;
type PanelChart<'a, 's> =
    ChartContext<'a, SVGBackend<'s>, Cartesian2d<WithKeyPoints<RangedCoordf64>, RangedCoordf64>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f32,
    pub dashed: bool,
}

impl Stroke {
    pub fn solid(color: &str, width: f32) -> Self {
        Self {
            color: color.to_string(),
            width,
            dashed: false,
        }
    }

    pub fn dashed(color: &str, width: f32) -> Self {
        Self {
            dashed: true,
            ..Self::solid(color, width)
        }
    }

    fn style(&self) -> ShapeStyle {
        rgb(&self.color).stroke_width(self.width.round().max(1.0) as u32)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineSeries {
    pub label: Option<String>,
    pub points: Vec<(f64, f64)>,
    pub stroke: Stroke,
}

impl LineSeries {
    /// Series over x = start, start + 1, ...
    pub fn indexed(values: &[f64], start: f64, stroke: Stroke) -> Self {
        Self {
            label: None,
            points: values
                .iter()
                .enumerate()
                .map(|(i, y)| (start + i as f64, *y))
                .collect(),
            stroke,
        }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RefLine {
    pub value: f64,
    pub stroke: Stroke,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Locator {
    #[default]
    Auto,
    Multiple(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub stroke: Stroke,
}

#[derive(Clone, Debug, Default)]
pub struct Axes {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_limits: Option<(f64, f64)>,
    pub y_limits: Option<(f64, f64)>,
    pub major_x: Locator,
    pub minor_x: Option<f64>,
    pub grid: bool,
    pub series: Vec<LineSeries>,
    pub hlines: Vec<RefLine>,
    pub vlines: Vec<RefLine>,
    /// Explicit legend; when empty, labelled series form the legend.
    pub legend: Vec<LegendEntry>,
    pub show_legend: bool,
}

impl Axes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn labels(mut self, x_label: Option<&str>, y_label: Option<&str>) -> Self {
        if let Some(x) = x_label {
            self.x_label = Some(x.to_string());
        }
        if let Some(y) = y_label {
            self.y_label = Some(y.to_string());
        }
        self
    }

    pub fn add_series(&mut self, series: LineSeries) {
        self.series.push(series);
    }

    pub fn axhline(&mut self, value: f64, stroke: Stroke) {
        self.hlines.push(RefLine { value, stroke });
    }

    pub fn axvline(&mut self, value: f64, stroke: Stroke) {
        self.vlines.push(RefLine { value, stroke });
    }

    pub fn x_range(&self) -> (f64, f64) {
        self.x_limits.unwrap_or_else(|| {
            let xs = self
                .series
                .iter()
                .flat_map(|s| s.points.iter().map(|p| p.0))
                .chain(self.vlines.iter().map(|l| l.value));
            with_margin(data_limits(xs))
        })
    }

    pub fn y_range(&self) -> (f64, f64) {
        self.y_limits.unwrap_or_else(|| {
            let ys = self
                .series
                .iter()
                .flat_map(|s| s.points.iter().map(|p| p.1))
                .chain(self.hlines.iter().map(|l| l.value));
            with_margin(data_limits(ys))
        })
    }

    /// Major x positions: the fixed multiples of a `Multiple` locator, or
    /// the plotters key points of the range.
    pub fn x_ticks(&self) -> Vec<f64> {
        let (lo, hi) = self.x_range();
        match self.major_x {
            Locator::Multiple(step) => multiples(lo, hi, step),
            Locator::Auto => RangedCoordf64::from(lo..hi).key_points(AUTO_TICKS),
        }
    }

    pub fn minor_x_ticks(&self) -> Vec<f64> {
        let (lo, hi) = self.x_range();
        self.minor_x
            .map(|step| multiples(lo, hi, step))
            .unwrap_or_default()
    }

    fn draw(&self, area: &DrawingArea<SVGBackend<'_>, Shift>, bottom_gap: i32) -> DrawResult<()> {
        let (x_lo, x_hi) = checked_range("x", self.x_range())?;
        let (y_lo, y_hi) = checked_range("y", self.y_range())?;

        let mut builder = ChartBuilder::on(area);
        builder
            .margin_top(6)
            .margin_right(PANEL_RIGHT)
            .margin_bottom(bottom_gap)
            .x_label_area_size(if self.x_label.is_some() {
                X_DESC_AREA
            } else {
                X_LABEL_AREA
            })
            .y_label_area_size(Y_LABEL_AREA);
        if let Some(title) = &self.title {
            builder.caption(title, (FONT_FAMILY, 13));
        }
        let mut chart = builder.build_cartesian_2d(
            (x_lo..x_hi).with_key_points(self.x_ticks()),
            y_lo..y_hi,
        )?;

        let mut mesh = chart.configure_mesh();
        mesh.label_style((FONT_FAMILY, 10))
            .axis_desc_style((FONT_FAMILY, 11))
            .y_labels(AUTO_TICKS)
            .bold_line_style(RGBColor(176, 176, 176).stroke_width(1))
            .light_line_style(TRANSPARENT.stroke_width(0));
        if !self.grid {
            mesh.disable_mesh();
        }
        if let Some(x_label) = &self.x_label {
            mesh.x_desc(x_label.as_str());
        }
        if let Some(y_label) = &self.y_label {
            mesh.y_desc(y_label.as_str());
        }
        mesh.draw()?;

        let tick = (y_hi - y_lo) * 0.02;
        let minor_style = rgb(BLACK).stroke_width(1);
        chart.draw_series(
            self.minor_x_ticks()
                .into_iter()
                .map(|x| PathElement::new(vec![(x, y_lo), (x, y_lo + tick)], minor_style)),
        )?;

        for line in self.vlines.iter().filter(|l| l.value >= x_lo && l.value <= x_hi) {
            draw_path(&mut chart, &[(line.value, y_lo), (line.value, y_hi)], &line.stroke)?;
        }
        for line in self.hlines.iter().filter(|l| l.value >= y_lo && l.value <= y_hi) {
            draw_path(&mut chart, &[(x_lo, line.value), (x_hi, line.value)], &line.stroke)?;
        }

        let implicit_legend = self.legend.is_empty();
        let mut labelled = false;
        for series in &self.series {
            for (idx, segment) in finite_segments(&series.points).into_iter().enumerate() {
                let anno = draw_path(&mut chart, segment, &series.stroke)?;
                if let (true, 0, Some(label)) = (implicit_legend, idx, &series.label) {
                    let style = series.stroke.style();
                    anno.label(label.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                    labelled = true;
                }
            }
        }
        for entry in &self.legend {
            let style = entry.stroke.style();
            chart
                .draw_series(PathSeries::new(std::iter::empty::<(f64, f64)>(), style))?
                .label(entry.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            labelled = true;
        }

        if self.show_legend && labelled {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::LowerRight)
                .label_font((FONT_FAMILY, 9))
                .background_style(WHITE.mix(0.8).filled())
                .border_style(RGBColor(204, 204, 204).stroke_width(1))
                .draw()?;
        }
        Ok(())
    }
}

fn draw_path<'b, 'a, 's>(
    chart: &'b mut PanelChart<'a, 's>,
    points: &[(f64, f64)],
    stroke: &Stroke,
) -> DrawResult<&'b mut SeriesAnno<'a, SVGBackend<'s>>> {
    let style = stroke.style();
    let anno = if stroke.dashed {
        chart.draw_series(DashedLineSeries::new(points.iter().copied(), 6, 3, style))?
    } else {
        chart.draw_series(PathSeries::new(points.iter().copied(), style))?
    };
    Ok(anno)
}

/// A column of axes panels sharing the figure width.
#[derive(Clone, Debug)]
pub struct Figure {
    width: u32,
    height: u32,
    title: Option<String>,
    panels: Vec<(Axes, f32)>,
    hspace: u32,
}

impl Figure {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            title: None,
            panels: vec![],
            hspace: 24,
        }
    }

    pub fn with_title(mut self, title: Option<&str>) -> Self {
        self.title = title.map(str::to_string);
        self
    }

    /// Vertical gap between panels, in pixels.
    pub fn with_hspace(mut self, hspace: u32) -> Self {
        self.hspace = hspace;
        self
    }

    pub fn add_panel(&mut self, axes: Axes, height_ratio: f32) {
        self.panels.push((axes, height_ratio.max(0.01)));
    }

    pub fn panels(&self) -> impl Iterator<Item = &Axes> {
        self.panels.iter().map(|(axes, _)| axes)
    }

    pub fn to_svg(&self) -> Result<String> {
        let mut svg = String::new();
        self.draw(&mut svg).map_err(|err| match err.downcast::<EngineError>() {
            Ok(err) => *err,
            Err(err) => EngineError::Render(err.to_string()),
        })?;
        Ok(svg)
    }

    fn draw(&self, buffer: &mut String) -> DrawResult<()> {
        let root = SVGBackend::with_string(buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let body = match &self.title {
            Some(title) => root.titled(title, (FONT_FAMILY, 15))?,
            None => root.clone(),
        };
        let (_, body_height) = body.dim_in_pixel();
        let gaps = self.hspace * self.panels.len().saturating_sub(1) as u32;
        let available = body_height.saturating_sub(gaps).max(1) as f32;
        let ratio_sum: f32 = self.panels.iter().map(|(_, r)| r).sum();

        let mut rest = body;
        for (idx, (axes, ratio)) in self.panels.iter().enumerate() {
            if idx + 1 == self.panels.len() {
                axes.draw(&rest, 0)?;
            } else {
                let slot = (available * ratio / ratio_sum).round() as i32 + self.hspace as i32;
                let (panel, lower) = rest.split_vertically(slot);
                axes.draw(&panel, self.hspace as i32)?;
                rest = lower;
            }
        }
        root.present()?;
        Ok(())
    }

    /// Rasterizes the figure into an `<img>` tag. The figure is dropped
    /// before the image is encoded.
    pub fn into_img_tag(self, format: ImageFormat) -> Result<String> {
        let svg = self.to_svg()?;
        let panels = self.panels.len();
        drop(self);
        tracing::debug!(panels, "released figure");
        raster::img_tag(&svg, format)
    }
}

fn rgb(hex: &str) -> RGBColor {
    let hex = hex.trim_start_matches('#');
    let channel = |at: usize| {
        hex.get(at..at + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0)
    };
    RGBColor(channel(0), channel(2), channel(4))
}

fn data_limits(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi { (0.0, 1.0) } else { (lo, hi) }
}

/// Pads a data range by 5%. A single value gets 5% of its magnitude, at
/// least 0.5, on each side.
fn with_margin((lo, hi): (f64, f64)) -> (f64, f64) {
    let margin = if hi > lo {
        (hi - lo) * 0.05
    } else {
        (lo.abs() * 0.05).max(0.5)
    };
    (lo - margin, hi + margin)
}

fn checked_range(axis: &str, (lo, hi): (f64, f64)) -> Result<(f64, f64)> {
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Ok((lo, hi))
    } else {
        Err(EngineError::Render(format!(
            "empty {axis} range [{lo}, {hi}]"
        )))
    }
}

/// Multiples of `step` inside [lo, hi]. When that would exceed
/// [`MAX_TICKS`] positions the step is widened by a whole factor.
pub fn multiples(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || !lo.is_finite() || !hi.is_finite() || hi < lo {
        return vec![];
    }
    let span = |step: f64| {
        let first = (lo / step - 1e-9).ceil();
        let last = (hi / step + 1e-9).floor();
        (first, (last - first + 1.0).max(0.0))
    };
    let (mut first, mut count) = span(step);
    let mut step = step;
    if count > MAX_TICKS as f64 {
        let stride = (count / MAX_TICKS as f64).ceil();
        tracing::debug!(step, stride, count, "thinned tick positions");
        step *= stride;
        (first, count) = span(step);
    }
    (0..count as usize).map(|i| (first + i as f64) * step).collect()
}

fn finite_segments(points: &[(f64, f64)]) -> Vec<&[(f64, f64)]> {
    points
        .split(|(x, y)| !x.is_finite() || !y.is_finite())
        .filter(|segment| !segment.is_empty())
        .collect()
}
