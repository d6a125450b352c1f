//! Bitmap loading and image filters.
//!
//! Supports loading bitmaps from raw bytes, files, and base64-encoded data URIs,
//! plus the blur and HSL filters applied to image nodes before compositing.

use std::path::Path;

use image::RgbaImage;
use sheet_core::{Bitmap, HslAdjust, ImageFilters};

use crate::error::{RenderError, RenderResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF (first frame only).
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::WebP,
            "gif" => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }
}

/// Convert a decoded RGBA image into a core bitmap.
///
/// # Errors
///
/// Returns an error for zero-sized images.
pub fn bitmap_from_image(img: RgbaImage) -> RenderResult<Bitmap> {
    let (width, height) = img.dimensions();
    Bitmap::from_rgba(width, height, img.into_raw())
        .ok_or_else(|| RenderError::Resource(format!("Invalid bitmap size {width}x{height}")))
}

/// Borrow a core bitmap as an RGBA image buffer.
///
/// # Errors
///
/// Returns an error if the pixel buffer does not match the dimensions.
pub fn image_from_bitmap(bitmap: &Bitmap) -> RenderResult<RgbaImage> {
    RgbaImage::from_raw(bitmap.width(), bitmap.height(), bitmap.pixels().to_vec())
        .ok_or_else(|| RenderError::Resource("Invalid bitmap data".to_string()))
}

/// Load a bitmap from raw encoded bytes.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
pub fn load_bitmap_from_bytes(data: &[u8]) -> RenderResult<Bitmap> {
    let format = ImageFormat::from_magic_bytes(data);

    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;

    let bitmap = bitmap_from_image(img.to_rgba8())?;
    tracing::debug!(
        ?format,
        width = bitmap.width(),
        height = bitmap.height(),
        "bitmap decoded"
    );
    Ok(bitmap)
}

/// Load a bitmap from a file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_bitmap_from_file(path: impl AsRef<Path>) -> RenderResult<Bitmap> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        RenderError::Resource(format!("Failed to read {}: {e}", path.display()))
    })?;
    load_bitmap_from_bytes(&bytes)
}

/// Load a bitmap from a data URI (base64 or percent-encoded).
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed or the image cannot be decoded.
pub fn load_bitmap_from_data_uri(uri: &str) -> RenderResult<Bitmap> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Resource("Not a data URI".to_string()))?;

    let (metadata, encoded_data) = uri_data
        .split_once(',')
        .ok_or_else(|| RenderError::Resource("Invalid data URI: missing comma".to_string()))?;

    let bytes = if metadata.contains(";base64") {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data)
            .map_err(|e| RenderError::Resource(format!("Failed to decode base64: {e}")))?
    } else {
        percent_decode(encoded_data)?
    };

    load_bitmap_from_bytes(&bytes)
}

/// Encode PNG bytes as a `data:image/png;base64,` URI.
#[must_use]
pub fn png_data_uri(png: &[u8]) -> String {
    use base64::Engine;
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

fn percent_decode(input: &str) -> RenderResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| RenderError::Resource("Invalid URL encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

/// Apply blur and HSL filters to a bitmap.
///
/// Returns a clone of the input when the filters are the identity.
///
/// # Errors
///
/// Returns an error if the bitmap cannot be converted.
pub fn apply_filters(bitmap: &Bitmap, filters: &ImageFilters) -> RenderResult<Bitmap> {
    if filters.is_identity() {
        return Ok(bitmap.clone());
    }

    let mut img = image_from_bitmap(bitmap)?;

    if let Some(radius) = filters.blur_radius.filter(|r| *r > 0.0) {
        #[allow(clippy::cast_possible_truncation)]
        let sigma = (radius / 2.0).max(0.5) as f32;
        img = image::imageops::blur(&img, sigma);
    }

    if let Some(hsl) = filters.hsl {
        adjust_hsl(&mut img, hsl);
    }

    bitmap_from_image(img)
}

/// Hue rotation, exponential saturation and additive luminance.
///
/// Saturation `s` scales chroma by `2^s`; luminance `l` in `[-1, 1]` shifts
/// every channel by `l * 127`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
pub fn adjust_hsl(img: &mut RgbaImage, hsl: HslAdjust) {
    let v = 2f64.powf(hsl.saturation);
    let (sin, cos) = hsl.hue.to_radians().sin_cos();
    let vsu = v * cos;
    let vsw = v * sin;
    let l = hsl.luminance * 127.0;

    let m = [
        [
            0.299 * v + 0.701 * vsu + 0.167 * vsw,
            0.587 * v - 0.587 * vsu + 0.330 * vsw,
            0.114 * v - 0.114 * vsu - 0.497 * vsw,
        ],
        [
            0.299 * v - 0.299 * vsu - 0.328 * vsw,
            0.587 * v + 0.413 * vsu + 0.035 * vsw,
            0.114 * v - 0.114 * vsu + 0.293 * vsw,
        ],
        [
            0.299 * v - 0.300 * vsu + 1.250 * vsw,
            0.587 * v - 0.586 * vsu - 1.050 * vsw,
            0.114 * v + 0.886 * vsu - 0.200 * vsw,
        ],
    ];

    for pixel in img.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let src = [f64::from(r), f64::from(g), f64::from(b)];
        let mut out = [0u8; 3];
        for (channel, row) in out.iter_mut().zip(m.iter()) {
            let value = row[0] * src[0] + row[1] * src[1] + row[2] * src[2] + l;
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
        pixel.0 = [out[0], out[1], out[2], a];
    }
}
