//! Deterministic procedural pattern tiles.
//!
//! A tile is a pure function of its [`PatternConfig`]: every random draw
//! comes from one xorshift stream seeded by `config.seed`, consumed in a
//! fixed order, so the same config always produces the same pixels.

use std::f64::consts::PI;

use sheet_core::{Color, PatternConfig, ShapeKind};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::{RenderError, RenderResult};

/// Stroke width of outlined shapes.
const LINE_WIDTH: f32 = 3.0;

/// 32-bit xorshift (13, 17, 5).
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// Seed the generator. Zero is a fixed point of xorshift, so it is mapped to 1.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next raw value.
    pub fn next_u32(&mut self) -> u32 {
        let mut t = self.state;
        t ^= t << 13;
        t ^= t >> 17;
        t ^= t << 5;
        self.state = t;
        t
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Next value in `[a, b)`.
    pub fn range(&mut self, a: f64, b: f64) -> f64 {
        a + (b - a) * self.next_f64()
    }
}

/// A seed for the "randomize" action, in `[1, 100000]`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn random_seed() -> u32 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos() ^ (d.as_secs() as u32));
    XorShift32::new(nanos).next_u32() % 100_000 + 1
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn stroke() -> Stroke {
    Stroke {
        width: LINE_WIDTH,
        ..Stroke::default()
    }
}

struct Canvas<'a> {
    pixmap: &'a mut Pixmap,
    base: Transform,
}

impl Canvas<'_> {
    fn circle(&mut self, x: f32, y: f32, r: f32, color: Color, filled: bool) {
        let Some(path) = PathBuilder::from_circle(x, y, r) else {
            return;
        };
        if filled {
            self.pixmap
                .fill_path(&path, &paint(color), FillRule::Winding, self.base, None);
        } else {
            self.pixmap
                .stroke_path(&path, &paint(color), &stroke(), self.base, None);
        }
    }

    fn triangle(&mut self, x: f32, y: f32, s: f32, color: Color, filled: bool, rot_rad: f64) {
        let mut pb = PathBuilder::new();
        pb.move_to(0.0, -s);
        pb.line_to(s, s);
        pb.line_to(-s, s);
        pb.close();
        let Some(path) = pb.finish() else {
            return;
        };
        #[allow(clippy::cast_possible_truncation)]
        let local = self
            .base
            .pre_concat(Transform::from_translate(x, y))
            .pre_concat(Transform::from_rotate(rot_rad.to_degrees() as f32));
        if filled {
            self.pixmap
                .fill_path(&path, &paint(color), FillRule::Winding, local, None);
        } else {
            self.pixmap
                .stroke_path(&path, &paint(color), &stroke(), local, None);
        }
    }

    fn plus(&mut self, x: f32, y: f32, s: f32, color: Color) {
        let mut pb = PathBuilder::new();
        pb.move_to(x - s, y);
        pb.line_to(x + s, y);
        pb.move_to(x, y - s);
        pb.line_to(x, y + s);
        if let Some(path) = pb.finish() {
            self.pixmap
                .stroke_path(&path, &paint(color), &stroke(), self.base, None);
        }
    }

    fn zigzag(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let step = (w / 8.0).max(6.0);
        let mut pb = PathBuilder::new();
        pb.move_to(x, y);
        let mut t = 0.0_f32;
        while t <= w {
            let up = ((t / step).floor() as i64) % 2 == 0;
            let ny = if up { y - h / 2.0 } else { y + h / 2.0 };
            pb.line_to(x + t, ny);
            t += step;
        }
        if let Some(path) = pb.finish() {
            self.pixmap
                .stroke_path(&path, &paint(color), &stroke(), self.base, None);
        }
    }
}

/// Render a pattern tile.
///
/// # Errors
///
/// Returns an error if the tile pixmap cannot be allocated.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn generate_pattern(config: &PatternConfig) -> RenderResult<Pixmap> {
    let cfg = config.normalized();
    let size = cfg.canvas_size;
    let mut pixmap = Pixmap::new(size, size)
        .ok_or_else(|| RenderError::Resource(format!("cannot allocate {size}x{size} pattern")))?;

    if !cfg.transparent {
        let bg = cfg.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
    }

    let edge = f64::from(size);
    let half = (edge / 2.0) as f32;
    let base = if cfg.rotation_degrees == 0.0 {
        Transform::identity()
    } else {
        Transform::from_rotate_at(cfg.rotation_degrees as f32, half, half)
    };

    let mut rng = XorShift32::new(cfg.seed);
    let mut canvas = Canvas {
        pixmap: &mut pixmap,
        base,
    };
    let base_size = cfg.shape_size;
    let count = cfg.shape_count();

    for _ in 0..count {
        let x = rng.range(0.0, edge) as f32;
        let y = rng.range(0.0, edge) as f32;
        let s = rng.range(base_size * 0.5, base_size * 1.25) as f32;
        let color = if rng.next_f64() > 0.5 {
            cfg.primary
        } else {
            cfg.secondary
        };

        match cfg.shape_kind {
            ShapeKind::Dots => {
                let filled = rng.next_f64() > 0.35;
                canvas.circle(x, y, s * 0.5, color, filled);
            }
            ShapeKind::Triangles => {
                let filled = rng.next_f64() > 0.5;
                let rot = rng.range(0.0, PI);
                canvas.triangle(x, y, s * 0.65, color, filled, rot);
            }
            ShapeKind::Plus => canvas.plus(x, y, s * 0.5, color),
            ShapeKind::Zigzag => canvas.zigzag(x - s * 0.8, y, s * 1.6, s * 0.8, color),
            ShapeKind::Rings => {
                canvas.circle(x, y, s * 0.7, color, false);
                canvas.circle(x, y, s * 0.35, color, true);
            }
        }
    }

    tracing::debug!(
        kind = %cfg.shape_kind,
        seed = cfg.seed,
        size,
        shapes = count,
        "pattern generated"
    );
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(kind: ShapeKind, seed: u32) -> PatternConfig {
        PatternConfig {
            shape_kind: kind,
            seed,
            canvas_size: 200,
            density: 10.0,
            ..PatternConfig::default()
        }
    }

    #[test]
    fn test_xorshift_reference_values() {
        // t = 1: 1 ^ (1 << 13) = 8193; ^ (8193 >> 17) = 8193; ^ (8193 << 5) = 270369
        let mut rng = XorShift32::new(1);
        assert_eq!(rng.next_u32(), 270_369);
        let v = rng.next_f64();
        assert!((0.0..1.0).contains(&v));
    }

    #[test]
    fn test_zero_seed_is_not_stuck() {
        let mut rng = XorShift32::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn test_identical_configs_identical_pixels() {
        for kind in [
            ShapeKind::Dots,
            ShapeKind::Triangles,
            ShapeKind::Plus,
            ShapeKind::Zigzag,
            ShapeKind::Rings,
        ] {
            let a = generate_pattern(&small(kind, 7)).expect("a");
            let b = generate_pattern(&small(kind, 7)).expect("b");
            assert_eq!(a.data(), b.data(), "{kind} not deterministic");
        }
    }

    #[test]
    fn test_neighbouring_seeds_differ() {
        let mut differing = 0;
        for seed in 1..=20 {
            let a = generate_pattern(&small(ShapeKind::Dots, seed)).expect("a");
            let b = generate_pattern(&small(ShapeKind::Dots, seed + 1)).expect("b");
            if a.data() != b.data() {
                differing += 1;
            }
        }
        assert!(differing >= 19, "only {differing} of 20 seed pairs differ");
    }

    #[test]
    fn test_transparent_background_leaves_alpha_zero_corners() {
        let cfg = PatternConfig {
            transparent: true,
            density: 1.0,
            shape_size: 6.0,
            ..small(ShapeKind::Plus, 3)
        };
        let pixmap = generate_pattern(&cfg).expect("pattern");
        let transparent = pixmap.pixels().iter().filter(|p| p.alpha() == 0).count();
        assert!(transparent > pixmap.pixels().len() / 2);
    }

    #[test]
    fn test_opaque_background_fill() {
        let cfg = PatternConfig {
            background: Color::rgb(10, 20, 30),
            density: 1.0,
            ..small(ShapeKind::Dots, 9)
        };
        let pixmap = generate_pattern(&cfg).expect("pattern");
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 255));
    }

    #[test]
    fn test_random_seed_range() {
        for _ in 0..10 {
            let s = random_seed();
            assert!((1..=100_000).contains(&s));
        }
    }
}
