//! Line charts and depth profiles.
//!
//! A chart plots one or more series of `(x, y)` points inside a framed
//! plot area with five ticks per axis. Consecutive finite points are
//! joined; a NaN or infinite point breaks the line. With `invert_y` the
//! vertical axis grows downward, the usual orientation for CTD profiles
//! where `y` is depth or pressure.

use tracing::debug;

use crate::canvas::{Canvas, Color};
use crate::RenderError;

/// Smallest accepted chart dimension in pixels.
pub const MIN_CHART_SIZE: usize = 32;

const TICKS_PER_AXIS: usize = 5;
const TICK_LENGTH: i64 = 4;

const BACKGROUND: Color = [255, 255, 255, 255];
const AXIS_COLOR: Color = [60, 60, 60, 255];
const GRID_COLOR: Color = [225, 225, 225, 255];

/// Colors cycled across series.
pub const SERIES_COLORS: [Color; 8] = [
    [31, 119, 180, 255],  // blue
    [255, 127, 14, 255],  // orange
    [44, 160, 44, 255],   // green
    [214, 39, 40, 255],   // red
    [148, 103, 189, 255], // purple
    [140, 86, 75, 255],   // brown
    [227, 119, 194, 255], // pink
    [23, 190, 207, 255],  // cyan
];

/// One plotted line.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
    /// Explicit color; otherwise taken from [`SERIES_COLORS`] by position.
    pub color: Option<Color>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
            color: None,
        }
    }

    fn finite_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }
}

/// Data extent of a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Widen zero-width ranges so every point maps inside the plot.
    fn padded(mut self) -> Self {
        if self.max_x - self.min_x <= f64::EPSILON {
            self.min_x -= 1.0;
            self.max_x += 1.0;
        }
        if self.max_y - self.min_y <= f64::EPSILON {
            self.min_y -= 1.0;
            self.max_y += 1.0;
        }
        self
    }
}

/// A chart ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub width: usize,
    pub height: usize,
    pub invert_y: bool,
    pub series: Vec<Series>,
}

/// Pixel rectangle of the plot area, inclusive.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Chart {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            invert_y: false,
            series: Vec::new(),
        }
    }

    /// Plot depth increasing downward.
    pub fn inverted_y(mut self, invert: bool) -> Self {
        self.invert_y = invert;
        self
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    /// Extent of all finite points, or `None` if there are none.
    pub fn bounds(&self) -> Option<Bounds> {
        self.series
            .iter()
            .flat_map(|s| s.finite_points())
            .fold(None, |acc: Option<Bounds>, (x, y)| {
                Some(match acc {
                    None => Bounds {
                        min_x: x,
                        max_x: x,
                        min_y: y,
                        max_y: y,
                    },
                    Some(b) => Bounds {
                        min_x: b.min_x.min(x),
                        max_x: b.max_x.max(x),
                        min_y: b.min_y.min(y),
                        max_y: b.max_y.max(y),
                    },
                })
            })
    }

    /// Rasterize to a canvas.
    pub fn render_canvas(&self) -> Result<Canvas, RenderError> {
        if self.width < MIN_CHART_SIZE || self.height < MIN_CHART_SIZE {
            return Err(RenderError::InvalidSize {
                width: self.width,
                height: self.height,
                min: MIN_CHART_SIZE,
            });
        }
        let bounds = self.bounds().ok_or(RenderError::NoData)?.padded();

        let mut canvas = Canvas::new(self.width, self.height, BACKGROUND);
        let area = self.plot_area();

        draw_grid_and_ticks(&mut canvas, area);
        canvas.draw_rect(area.left, area.top, area.right, area.bottom, AXIS_COLOR);

        for (i, series) in self.series.iter().enumerate() {
            let color = series
                .color
                .unwrap_or(SERIES_COLORS[i % SERIES_COLORS.len()]);
            self.draw_series(&mut canvas, area, bounds, series, color);
        }

        debug!(
            width = self.width,
            height = self.height,
            series = self.series.len(),
            "Rendered chart"
        );
        Ok(canvas)
    }

    /// Rasterize and encode as PNG.
    pub fn render(&self) -> Result<Vec<u8>, RenderError> {
        self.render_canvas()?.to_png()
    }

    fn plot_area(&self) -> PlotArea {
        let margin = (self.width.min(self.height) / 10).clamp(4, 32) as i64;
        PlotArea {
            left: margin,
            top: margin,
            right: self.width as i64 - 1 - margin,
            bottom: self.height as i64 - 1 - margin,
        }
    }

    fn to_pixel(&self, area: PlotArea, bounds: Bounds, x: f64, y: f64) -> (i64, i64) {
        let fx = (x - bounds.min_x) / (bounds.max_x - bounds.min_x);
        let fy = (y - bounds.min_y) / (bounds.max_y - bounds.min_y);
        let px = area.left as f64 + fx * (area.right - area.left) as f64;
        let py = if self.invert_y {
            area.top as f64 + fy * (area.bottom - area.top) as f64
        } else {
            area.bottom as f64 - fy * (area.bottom - area.top) as f64
        };
        (px.round() as i64, py.round() as i64)
    }

    fn draw_series(
        &self,
        canvas: &mut Canvas,
        area: PlotArea,
        bounds: Bounds,
        series: &Series,
        color: Color,
    ) {
        let mut previous: Option<(i64, i64)> = None;
        for &(x, y) in &series.points {
            if !(x.is_finite() && y.is_finite()) {
                previous = None;
                continue;
            }
            let (px, py) = self.to_pixel(area, bounds, x, y);
            match previous {
                Some((qx, qy)) => canvas.draw_line(qx, qy, px, py, color),
                // isolated starts get a marker so single points stay visible
                None => canvas.fill_rect(px - 1, py - 1, px + 1, py + 1, color),
            }
            previous = Some((px, py));
        }
    }
}

fn draw_grid_and_ticks(canvas: &mut Canvas, area: PlotArea) {
    let steps = (TICKS_PER_AXIS - 1) as i64;
    for i in 0..TICKS_PER_AXIS as i64 {
        let x = area.left + (area.right - area.left) * i / steps;
        let y = area.top + (area.bottom - area.top) * i / steps;

        canvas.draw_line(x, area.top, x, area.bottom, GRID_COLOR);
        canvas.draw_line(area.left, y, area.right, y, GRID_COLOR);

        canvas.draw_line(x, area.bottom, x, area.bottom + TICK_LENGTH, AXIS_COLOR);
        canvas.draw_line(area.left - TICK_LENGTH, y, area.left, y, AXIS_COLOR);
    }
}
