//! Rectangles, point transforms and background fitting.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two corner points.
    #[must_use]
    pub fn from_edges(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Right edge.
    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// All components finite and both dimensions strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Grow by `amount` on every side.
    #[must_use]
    pub fn expand(&self, amount: f64) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    /// Shift by an offset.
    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Corner points, clockwise from the origin.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x, self.y),
            (self.max_x(), self.y),
            (self.max_x(), self.max_y()),
            (self.x, self.max_y()),
        ]
    }

    /// Bounding box of a set of points, `None` when empty.
    #[must_use]
    pub fn bounding(points: &[(f64, f64)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut min_x, mut min_y) = *first;
        let (mut max_x, mut max_y) = *first;
        for &(px, py) in rest {
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        Some(Self::from_edges(min_x, min_y, max_x, max_y))
    }
}

/// An integer-aligned rectangle, used for raster regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width, always positive.
    pub width: u32,
    /// Height, always positive.
    pub height: u32,
}

impl PixelRect {
    /// Same region in floating point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.x as f64,
            self.y as f64,
            f64::from(self.width),
            f64::from(self.height),
        )
    }

    /// Floor the origin and ceil the far edge so no boundary pixel is lost.
    ///
    /// Returns `None` if the rectangle is not valid.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn enclosing(rect: &Rect) -> Option<Self> {
        if !rect.is_valid() {
            return None;
        }
        let x = rect.x.floor();
        let y = rect.y.floor();
        let width = (rect.max_x() - x).ceil();
        let height = (rect.max_y() - y).ceil();
        if width < 1.0 || height < 1.0 || width > f64::from(u32::MAX) || height > f64::from(u32::MAX)
        {
            return None;
        }
        Some(Self {
            x: x as i64,
            y: y as i64,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// How a background bitmap is fitted to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFit {
    /// Whole image visible, letterboxed.
    #[default]
    Contain,
    /// Canvas fully covered, image cropped.
    Cover,
}

/// Place an `image_w` x `image_h` bitmap centered on the canvas.
#[must_use]
pub fn fit_background(
    image_w: f64,
    image_h: f64,
    canvas_w: f64,
    canvas_h: f64,
    fit: BackgroundFit,
) -> Rect {
    if image_w <= 0.0 || image_h <= 0.0 {
        return Rect::new(0.0, 0.0, canvas_w, canvas_h);
    }
    let image_ratio = image_w / image_h;
    let canvas_ratio = canvas_w / canvas_h;
    let wider = image_ratio > canvas_ratio;
    let scale = match (fit, wider) {
        (BackgroundFit::Cover, true) | (BackgroundFit::Contain, false) => canvas_h / image_h,
        (BackgroundFit::Cover, false) | (BackgroundFit::Contain, true) => canvas_w / image_w,
    };
    let w = image_w * scale;
    let h = image_h * scale;
    Rect::new((canvas_w - w) / 2.0, (canvas_h - h) / 2.0, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing_floors_and_ceils() {
        let r = Rect::new(10.4, -3.6, 20.2, 5.0);
        let p = PixelRect::enclosing(&r).expect("valid");
        assert_eq!(p.x, 10);
        assert_eq!(p.y, -4);
        // far edge 30.6 -> width ceil(30.6 - 10) = 21
        assert_eq!(p.width, 21);
        // far edge 1.4 -> height ceil(1.4 + 4) = 6
        assert_eq!(p.height, 6);
    }

    #[test]
    fn test_invalid_rects() {
        assert!(!Rect::new(0.0, 0.0, 0.0, 10.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, 10.0, -1.0).is_valid());
        assert!(!Rect::new(f64::NAN, 0.0, 10.0, 10.0).is_valid());
        assert!(PixelRect::enclosing(&Rect::new(0.0, 0.0, f64::INFINITY, 1.0)).is_none());
    }

    #[test]
    fn test_fit_contain_wide_image() {
        // 2:1 image on a 4:3 canvas: width-bound
        let r = fit_background(200.0, 100.0, 1600.0, 1200.0, BackgroundFit::Contain);
        assert_eq!(r, Rect::new(0.0, 200.0, 1600.0, 800.0));
    }

    #[test]
    fn test_fit_cover_wide_image() {
        let r = fit_background(200.0, 100.0, 1600.0, 1200.0, BackgroundFit::Cover);
        assert_eq!(r, Rect::new(-400.0, 0.0, 2400.0, 1200.0));
    }

    #[test]
    fn test_bounding_points() {
        let b = Rect::bounding(&[(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]).expect("some");
        assert_eq!(b, Rect::new(-2.0, -1.0, 6.0, 6.0));
        assert!(Rect::bounding(&[]).is_none());
    }
}
