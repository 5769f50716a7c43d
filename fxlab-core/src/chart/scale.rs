//! Data-to-pixel mapping for a padded canvas.

use super::ChartGeometry;

/// Relative tolerance under which a value range counts as constant.
const FLAT_TOLERANCE: f64 = 1e-9;

/// Linear projection of (index, value) points onto the plot area.
///
/// X maps `[x_min, x_max]` onto `[padding, width - padding]`. Y maps
/// `[y_min, y_max]` onto `[padding, height - padding]` inverted, so larger
/// values sit higher on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    geometry: ChartGeometry,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl PlotArea {
    /// Fit the area to `points`. `None` when there are no points.
    ///
    /// A constant value range is widened by ±1 so the plot keeps a non-zero
    /// height.
    pub fn fit(points: &[(usize, f64)], geometry: ChartGeometry) -> Option<Self> {
        let first = points.first()?;
        let (mut x_min, mut x_max) = (first.0, first.0);
        let (mut y_min, mut y_max) = (first.1, first.1);
        for &(x, y) in &points[1..] {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        if is_close(y_min, y_max) {
            y_min -= 1.0;
            y_max += 1.0;
        }

        Some(Self {
            geometry,
            x_min: x_min as f64,
            x_max: x_max as f64,
            y_min,
            y_max,
        })
    }

    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    fn plot_width(&self) -> f64 {
        self.geometry.width as f64 - 2.0 * self.geometry.padding as f64
    }

    fn plot_height(&self) -> f64 {
        self.geometry.height as f64 - 2.0 * self.geometry.padding as f64
    }

    /// Horizontal pixel for a data index. A single-index range maps to the
    /// horizontal centre.
    pub fn x(&self, index: f64) -> f64 {
        let padding = self.geometry.padding as f64;
        if self.x_max == self.x_min {
            return padding + self.plot_width() / 2.0;
        }
        padding + (index - self.x_min) / (self.x_max - self.x_min) * self.plot_width()
    }

    /// Vertical pixel for a value.
    pub fn y(&self, value: f64) -> f64 {
        let padding = self.geometry.padding as f64;
        padding + (self.y_max - value) / (self.y_max - self.y_min) * self.plot_height()
    }

    /// Whether a horizontal pixel lies inside the plot area.
    pub fn contains_x(&self, px: f64) -> bool {
        let padding = self.geometry.padding as f64;
        px >= padding - 1e-9 && px <= self.geometry.width as f64 - padding + 1e-9
    }

    /// `intervals + 1` evenly spaced values from `y_min` to `y_max`.
    pub fn value_ticks(&self, intervals: usize) -> Vec<f64> {
        if intervals == 0 {
            return vec![self.y_min];
        }
        let step = (self.y_max - self.y_min) / intervals as f64;
        (0..=intervals).map(|i| self.y_min + step * i as f64).collect()
    }
}

fn is_close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= FLAT_TOLERANCE * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> ChartGeometry {
        ChartGeometry {
            width: 1200,
            height: 600,
            padding: 50,
        }
    }

    #[test]
    fn maps_extremes_to_padding_edges() {
        let area = PlotArea::fit(&[(0, 1.0), (10, 3.0)], geometry()).unwrap();
        assert_eq!(area.x(0.0), 50.0);
        assert_eq!(area.x(10.0), 1150.0);
        assert_eq!(area.y(3.0), 50.0);
        assert_eq!(area.y(1.0), 550.0);
        assert_eq!(area.y(2.0), 300.0);
    }

    #[test]
    fn single_point_sits_at_horizontal_centre() {
        let area = PlotArea::fit(&[(7, 1.25)], geometry()).unwrap();
        assert_eq!(area.x(7.0), 600.0);
        assert_eq!(area.y(1.25), 300.0);
    }

    #[test]
    fn constant_values_are_widened() {
        let area = PlotArea::fit(&[(0, 2.0), (1, 2.0), (2, 2.0)], geometry()).unwrap();
        assert_eq!(area.y_min(), 1.0);
        assert_eq!(area.y_max(), 3.0);
        assert!(area.y(2.0).is_finite());
    }

    #[test]
    fn ticks_span_the_value_range() {
        let area = PlotArea::fit(&[(0, 0.0), (1, 10.0)], geometry()).unwrap();
        let ticks = area.value_ticks(10);
        assert_eq!(ticks.len(), 11);
        assert_eq!(ticks[0], 0.0);
        assert!((ticks[10] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn empty_points_do_not_fit() {
        assert!(PlotArea::fit(&[], geometry()).is_none());
    }
}
