//! Configuration for procedurally generated pattern tiles.
//!
//! The generator itself lives in the renderer; this is plain data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Color;

/// Smallest tile edge the generator produces.
pub const MIN_CANVAS_SIZE: u32 = 200;
/// Smallest base shape size.
pub const MIN_SHAPE_SIZE: f64 = 6.0;
/// Smallest density.
pub const MIN_DENSITY: f64 = 1.0;

/// Shape family drawn by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Filled or outlined circles.
    #[default]
    Dots,
    /// Randomly rotated triangles.
    Triangles,
    /// Plus signs.
    Plus,
    /// Horizontal zigzag strokes.
    Zigzag,
    /// Outlined ring around a filled core.
    Rings,
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dots" => Ok(Self::Dots),
            "triangles" => Ok(Self::Triangles),
            "plus" => Ok(Self::Plus),
            "zigzag" => Ok(Self::Zigzag),
            "rings" => Ok(Self::Rings),
            _ => Err(format!("Unknown pattern kind: {s}")),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dots => "dots",
            Self::Triangles => "triangles",
            Self::Plus => "plus",
            Self::Zigzag => "zigzag",
            Self::Rings => "rings",
        };
        f.write_str(s)
    }
}

/// Full description of a pattern tile. Identical configs yield identical rasters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Shape family.
    pub shape_kind: ShapeKind,
    /// Generator seed.
    pub seed: u32,
    /// First shape color.
    pub primary: Color,
    /// Second shape color.
    pub secondary: Color,
    /// Background fill, ignored when `transparent` is set.
    pub background: Color,
    /// Leave the background unpainted.
    pub transparent: bool,
    /// Node opacity in `[0, 1]`.
    pub opacity: f64,
    /// Whole-tile rotation about the center, in degrees.
    pub rotation_degrees: f64,
    /// Base shape size in pixels.
    pub shape_size: f64,
    /// Shapes per 1000 px of edge, in units of 14 shapes.
    pub density: f64,
    /// Tile edge length in pixels.
    pub canvas_size: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            shape_kind: ShapeKind::Dots,
            seed: 1,
            primary: Color::rgb(0x0e, 0xa5, 0xe9),
            secondary: Color::rgb(0xef, 0x2c, 0x90),
            background: Color::WHITE,
            transparent: false,
            opacity: 1.0,
            rotation_degrees: 0.0,
            shape_size: 56.0,
            density: 18.0,
            canvas_size: 1200,
        }
    }
}

impl PatternConfig {
    /// Copy with every numeric field clamped into its usable range.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            seed: self.seed.max(1),
            opacity: if self.opacity.is_finite() {
                self.opacity.clamp(0.0, 1.0)
            } else {
                1.0
            },
            rotation_degrees: if self.rotation_degrees.is_finite() {
                self.rotation_degrees
            } else {
                0.0
            },
            shape_size: finite_at_least(self.shape_size, MIN_SHAPE_SIZE),
            density: finite_at_least(self.density, MIN_DENSITY),
            canvas_size: self.canvas_size.max(MIN_CANVAS_SIZE),
            ..self.clone()
        }
    }

    /// Number of shapes the generator draws for this config.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn shape_count(&self) -> usize {
        let cfg = self.normalized();
        let per_block = (cfg.density * f64::from(cfg.canvas_size) / 1000.0).round();
        per_block as usize * 14
    }
}

fn finite_at_least(value: f64, min: f64) -> f64 {
    if value.is_finite() {
        value.max(min)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_count_formula() {
        let cfg = PatternConfig {
            density: 12.0,
            canvas_size: 1000,
            ..PatternConfig::default()
        };
        assert_eq!(cfg.shape_count(), 12 * 14);

        let cfg = PatternConfig {
            density: 18.0,
            canvas_size: 1200,
            ..PatternConfig::default()
        };
        // round(21.6) = 22
        assert_eq!(cfg.shape_count(), 22 * 14);
    }

    #[test]
    fn test_normalized_clamps() {
        let cfg = PatternConfig {
            seed: 0,
            shape_size: 1.0,
            density: f64::NAN,
            canvas_size: 10,
            opacity: 4.0,
            ..PatternConfig::default()
        }
        .normalized();
        assert_eq!(cfg.seed, 1);
        assert!((cfg.shape_size - MIN_SHAPE_SIZE).abs() < f64::EPSILON);
        assert!((cfg.density - MIN_DENSITY).abs() < f64::EPSILON);
        assert_eq!(cfg.canvas_size, MIN_CANVAS_SIZE);
        assert!((cfg.opacity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shape_kind_parse() {
        assert_eq!("Rings".parse::<ShapeKind>(), Ok(ShapeKind::Rings));
        assert!("hexagons".parse::<ShapeKind>().is_err());
    }
}
