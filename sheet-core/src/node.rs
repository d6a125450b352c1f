//! Visual nodes - the units of composition placed on a sheet.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dataset::ChartConfig;
use crate::pattern::PatternConfig;
use crate::Color;

/// Unique identifier for a node. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new unique node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a node, without its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKindTag {
    /// Typeset text.
    Text,
    /// User-supplied raster image.
    Image,
    /// Radar chart.
    Chart,
    /// Procedural pattern tile.
    Pattern,
}

impl NodeKindTag {
    /// Base used for generated display names (`Text_1`, `Radar_2`, ...).
    #[must_use]
    pub fn display_base(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Chart => "Radar",
            Self::Pattern => "Pattern",
        }
    }
}

impl fmt::Display for NodeKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Chart => "chart",
            Self::Pattern => "pattern",
        };
        f.write_str(s)
    }
}

/// Typography and content of a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    /// Text, possibly multi-line.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Fill color.
    pub fill: Color,
    /// Outline color.
    pub stroke: Color,
    /// Outline width in pixels.
    pub stroke_width: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
    /// CSS-style weight (`normal`, `bold`, `300`...).
    pub font_weight: String,
    /// Font family name.
    pub font_family: String,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 64.0,
            fill: Color::rgb(0x11, 0x11, 0x11),
            stroke: Color::WHITE,
            stroke_width: 2.0,
            line_height: 1.2,
            font_weight: "normal".to_string(),
            font_family: "Inter".to_string(),
        }
    }
}

impl TextContent {
    /// Create text content with default typography.
    ///
    /// Literal `\n` escape sequences become line breaks.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.replace("\\n", "\n"),
            ..Self::default()
        }
    }

    /// Lines of the text.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

/// A decoded RGBA8 bitmap (straight alpha, row-major).
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Bitmap {
    /// Wrap raw RGBA pixels. Returns `None` if the buffer size does not match.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if width == 0 || height == 0 || pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Content of an image node.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageContent {
    /// Decoded pixels.
    pub bitmap: Bitmap,
    /// False when the pixels came from a foreign origin without CORS
    /// approval; such a bitmap taints any region it is rasterized into.
    pub origin_clean: bool,
}

impl ImageContent {
    /// Image content from a same-origin bitmap.
    #[must_use]
    pub fn new(bitmap: Bitmap) -> Self {
        Self {
            bitmap,
            origin_clean: true,
        }
    }
}

/// The kind-specific content of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    /// Text with typography.
    Text(TextContent),
    /// Decoded raster image.
    Image(ImageContent),
    /// Radar chart configuration.
    Chart(ChartConfig),
    /// Procedural pattern configuration.
    Pattern(PatternConfig),
}

impl NodeContent {
    /// Tag of this content.
    #[must_use]
    pub fn tag(&self) -> NodeKindTag {
        match self {
            Self::Text(_) => NodeKindTag::Text,
            Self::Image(_) => NodeKindTag::Image,
            Self::Chart(_) => NodeKindTag::Chart,
            Self::Pattern(_) => NodeKindTag::Pattern,
        }
    }
}

/// Position, scale and rotation of a node.
///
/// Rotation and scale pivot around the node origin `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// X position (pixels from left).
    pub x: f64,
    /// Y position (pixels from top).
    pub y: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in degrees, clockwise.
    pub rotation: f64,
    /// Whether the node can be dragged on the canvas.
    pub draggable: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

impl Transform {
    /// Identity transform placed at `(x, y)`.
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            draggable: true,
        }
    }

    /// Map a point from node-local space to canvas space.
    #[must_use]
    pub fn apply(&self, local_x: f64, local_y: f64) -> (f64, f64) {
        let sx = local_x * self.scale_x;
        let sy = local_y * self.scale_y;
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (
            self.x + sx * cos - sy * sin,
            self.y + sx * sin + sy * cos,
        )
    }
}

/// Drop shadow settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shadow {
    /// Shadow color.
    pub color: Color,
    /// Blur radius in pixels.
    pub blur: f64,
    /// Horizontal offset.
    pub offset_x: f64,
    /// Vertical offset.
    pub offset_y: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Whether the shadow is drawn.
    pub enabled: bool,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            blur: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            opacity: 0.0,
            enabled: false,
        }
    }
}

impl Shadow {
    /// Whether the shadow produces any visible pixels.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.opacity > 0.0
    }

    /// Padding a cached raster needs so the shadow is not cut off.
    #[must_use]
    pub fn cache_padding(&self) -> f64 {
        let ox = self.offset_x.abs();
        let oy = self.offset_y.abs();
        ((self.blur + ox).max(self.blur + oy) + 8.0).ceil()
    }
}

/// Hue/saturation/luminance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HslAdjust {
    /// Hue rotation in degrees, normalized into `[0, 360)`.
    pub hue: f64,
    /// Saturation delta (`0` = unchanged).
    pub saturation: f64,
    /// Luminance delta (`0` = unchanged).
    pub luminance: f64,
}

impl HslAdjust {
    /// Create an adjustment, normalizing the hue.
    #[must_use]
    pub fn new(hue: f64, saturation: f64, luminance: f64) -> Self {
        Self {
            hue: hue.rem_euclid(360.0),
            saturation,
            luminance,
        }
    }
}

/// Filters that only apply to image nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFilters {
    /// Gaussian blur radius, ignored unless positive.
    pub blur_radius: Option<f64>,
    /// HSL adjustment.
    pub hsl: Option<HslAdjust>,
}

impl ImageFilters {
    /// True when no filter would change any pixel.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.blur_radius.map_or(true, |r| r <= 0.0) && self.hsl.is_none()
    }
}

/// Visual effects on a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Effects {
    /// Drop shadow.
    pub shadow: Shadow,
    /// Image-only filters.
    pub filters: ImageFilters,
}

/// A visual node with content, placement and effects.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualNode {
    /// Unique identifier; the scene indexes nodes by it.
    pub(crate) id: NodeId,
    /// Kind-specific content.
    pub content: NodeContent,
    /// Stacking position, dense over the scene. Only the scene assigns it.
    pub(crate) z_index: usize,
    /// Hidden nodes are neither rasterized nor measured.
    pub visible: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Placement.
    pub transform: Transform,
    /// Shadow and filters.
    pub effects: Effects,
}

impl VisualNode {
    /// Create a new visible node with the given content.
    #[must_use]
    pub fn new(content: NodeContent) -> Self {
        Self {
            id: NodeId::new(),
            content,
            z_index: 0,
            visible: true,
            opacity: 1.0,
            transform: Transform::default(),
            effects: Effects::default(),
        }
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Stacking position: `0` is the bottom, `len - 1` the top.
    #[must_use]
    pub fn z_index(&self) -> usize {
        self.z_index
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the opacity, clamped into `[0, 1]`.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Set the effects.
    #[must_use]
    pub fn with_effects(mut self, effects: Effects) -> Self {
        self.effects = effects;
        self
    }

    /// Kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKindTag {
        self.content.tag()
    }
}
