use crate::utils::error::{PvError, Result};
use plotters::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    /// Bounding box over all finite points, widened when degenerate.
    pub fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        let finite = self
            .series
            .iter()
            .flat_map(|s| s.points.iter())
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        let (mut x0, mut x1, mut y0, mut y1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for &(x, y) in finite {
            x0 = x0.min(x);
            x1 = x1.max(x);
            y0 = y0.min(y);
            y1 = y1.max(y);
        }
        if x0 > x1 {
            return ((0.0, 1.0), (0.0, 1.0));
        }
        if x1 - x0 < f64::EPSILON {
            x1 = x0 + 1.0;
        }
        if y1 - y0 < f64::EPSILON {
            y1 = y0 + 1.0;
        }
        let pad = (y1 - y0) * 0.05;
        ((x0, x1), (y0 - pad, y1 + pad))
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> PvError {
    PvError::PlotError {
        message: e.to_string(),
    }
}

/// Render figures stacked vertically into one SVG document.
pub fn render_svg(figures: &[Figure], width: u32, panel_height: u32) -> Result<String> {
    let mut svg = String::new();
    {
        let height = panel_height * figures.len().max(1) as u32;
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let panels = root.split_evenly((figures.len().max(1), 1));

        for (figure, area) in figures.iter().zip(panels.iter()) {
            let ((x0, x1), (y0, y1)) = figure.bounds();
            let mut chart = ChartBuilder::on(area)
                .caption(&figure.title, ("sans-serif", 22))
                .margin(12)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x0..x1, y0..y1)
                .map_err(plot_err)?;

            chart
                .configure_mesh()
                .x_desc(figure.x_label.as_str())
                .y_desc(figure.y_label.as_str())
                .draw()
                .map_err(plot_err)?;

            for (i, series) in figure.series.iter().enumerate() {
                let color = Palette99::pick(i).mix(0.9);
                chart
                    .draw_series(LineSeries::new(
                        series
                            .points
                            .iter()
                            .copied()
                            .filter(|(x, y)| x.is_finite() && y.is_finite()),
                        color.stroke_width(1),
                    ))
                    .map_err(plot_err)?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }

            if !figure.series.is_empty() {
                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(plot_err)?;
            }
        }
        root.present().map_err(plot_err)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_cover_all_series() {
        let figure = Figure::new("t", "x", "y")
            .with_series(Series::new("a", vec![(0.0, 1.0), (2.0, 3.0)]))
            .with_series(Series::new("b", vec![(5.0, -1.0), (f64::NAN, 100.0)]));
        let ((x0, x1), (y0, y1)) = figure.bounds();
        assert_eq!((x0, x1), (0.0, 5.0));
        assert!(y0 < -1.0 && y1 > 3.0 && y1 < 100.0);
    }

    #[test]
    fn test_bounds_of_empty_figure() {
        let figure = Figure::new("t", "x", "y");
        assert_eq!(figure.bounds(), ((0.0, 1.0), (0.0, 1.0)));
    }
}
