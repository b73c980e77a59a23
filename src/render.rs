use crate::error::{Result, WatermarkError};
use crate::layout::{Placement, auto_font_size, place};
use ab_glyph::{FontVec, PxScale};
use image::{ColorType, DynamicImage, GenericImageView, GrayImage, Luma, Rgb, Rgba, RgbaImage, imageops};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_text_mut, text_size};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::morphology::dilate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub const MIN_FONT_SIZE: f32 = 8.0;
pub const MAX_FONT_SIZE: f32 = 1000.0;

/// Bundled font looked up relative to the working directory.
pub const BUNDLED_FONT: &str = "static/DejaVuSans.ttf";

const SYSTEM_FONTS: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Text color: either fixed or picked from the background it lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextColor {
    Auto,
    Rgb(u8, u8, u8),
}

impl Default for TextColor {
    fn default() -> Self {
        TextColor::Rgb(255, 255, 255)
    }
}

impl FromStr for TextColor {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_lowercase();
        let named = match value.as_str() {
            "auto" => return Ok(TextColor::Auto),
            "white" => Some((255, 255, 255)),
            "black" => Some((0, 0, 0)),
            "red" => Some((255, 0, 0)),
            "green" => Some((0, 128, 0)),
            "blue" => Some((0, 0, 255)),
            "yellow" => Some((255, 255, 0)),
            "orange" => Some((255, 165, 0)),
            "gray" | "grey" => Some((128, 128, 128)),
            _ => None,
        };
        if let Some((r, g, b)) = named {
            return Ok(TextColor::Rgb(r, g, b));
        }

        let hex = value.strip_prefix('#').unwrap_or(&value);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WatermarkError::InvalidColor(s.to_string()));
        }
        let expanded: String = match hex.len() {
            6 => hex.to_string(),
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            _ => return Err(WatermarkError::InvalidColor(s.to_string())),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map_err(|_| WatermarkError::InvalidColor(s.to_string()))
        };
        Ok(TextColor::Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for TextColor {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TextColor> for String {
    fn from(color: TextColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextColor::Auto => f.write_str("auto"),
            TextColor::Rgb(r, g, b) => write!(f, "#{:02X}{:02X}{:02X}", r, g, b),
        }
    }
}

/// How the timestamp text is drawn.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TextStyle {
    /// Pixel size; `None` scales with the image.
    pub font_size: Option<f32>,
    pub color: TextColor,
    /// 0 is invisible, 255 fully opaque.
    pub opacity: u8,
    /// Degrees, counter-clockwise.
    pub rotation: f32,
    pub position: Placement,
    pub margin: u32,
    /// Offset copy drawn under the text.
    pub shadow: bool,
    pub shadow_style: ShadowStyle,
    pub stroke_width: u32,
    pub stroke_color: TextColor,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: None,
            color: TextColor::default(),
            opacity: 255,
            rotation: 0.0,
            position: Placement::default(),
            margin: 10,
            shadow: true,
            shadow_style: ShadowStyle::default(),
            stroke_width: 0,
            stroke_color: TextColor::Rgb(0, 0, 0),
        }
    }
}

/// Drop shadow geometry and color.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShadowStyle {
    pub offset_x: i32,
    pub offset_y: i32,
    /// `auto` contrasts with the text color.
    pub color: TextColor,
    /// Falls back to the text opacity when unset.
    pub opacity: Option<u8>,
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            offset_x: 1,
            offset_y: 1,
            color: TextColor::Auto,
            opacity: None,
        }
    }
}

impl TextStyle {
    /// Effective font size for an image of the given dimensions.
    pub fn font_size_for(&self, width: u32, height: u32) -> f32 {
        self.font_size
            .unwrap_or_else(|| auto_font_size(width, height))
            .clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    }
}

/// Load the first usable font: `configured`, then the bundled font, then
/// common system locations.
pub fn load_font(configured: Option<&Path>) -> Result<FontVec> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = configured {
        candidates.push(path.to_path_buf());
    }
    candidates.push(PathBuf::from(BUNDLED_FONT));
    candidates.extend(SYSTEM_FONTS.iter().map(PathBuf::from));

    for path in &candidates {
        if !path.exists() {
            continue;
        }
        let font_data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read font {:?}: {}", path, e);
                continue;
            }
        };
        match FontVec::try_from_vec(font_data) {
            Ok(font) => {
                debug!("Using font {:?}", path);
                return Ok(font);
            }
            Err(_) => warn!("Failed to parse font {:?}", path),
        }
    }

    Err(WatermarkError::FontUnavailable(candidates))
}

/// Draw `text` onto a copy of `image`.
///
/// The result keeps the source's color type, so 16-bit and float inputs stay
/// at their depth. Blending itself happens at 8 bits per channel.
pub fn render_watermark(
    image: &DynamicImage,
    text: &str,
    style: &TextStyle,
    font: &FontVec,
) -> DynamicImage {
    if text.trim().is_empty() {
        debug!("Empty watermark text, leaving image unchanged");
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let scale = PxScale::from(style.font_size_for(width, height));

    let Some(mask) = text_mask(text, scale, font, style.rotation) else {
        debug!("Watermark text produced no visible pixels");
        return image.clone();
    };

    let mut rgba_image = image.to_rgba8();
    let (x, y) = place(
        (width, height),
        mask.dimensions(),
        style.position,
        style.margin,
    );

    let text_color = match style.color {
        TextColor::Auto => {
            determine_text_color(&rgba_image, x, y, mask.width(), mask.height())
        }
        TextColor::Rgb(r, g, b) => Rgba([r, g, b, 255]),
    };
    let text_rgb = Rgb([text_color[0], text_color[1], text_color[2]]);
    let contrast = contrasting_color(text_rgb);

    if style.shadow {
        let shadow = &style.shadow_style;
        let shadow_color = match shadow.color {
            TextColor::Auto => contrast,
            TextColor::Rgb(r, g, b) => Rgb([r, g, b]),
        };
        blend_mask(
            &mut rgba_image,
            &mask,
            x as i64 + shadow.offset_x as i64,
            y as i64 + shadow.offset_y as i64,
            shadow_color,
            shadow.opacity.unwrap_or(style.opacity),
        );
    }

    if style.stroke_width > 0 {
        let radius = style.stroke_width.min(u8::MAX as u32);
        let stroke_color = match style.stroke_color {
            TextColor::Auto => contrast,
            TextColor::Rgb(r, g, b) => Rgb([r, g, b]),
        };
        let stroke = dilate(&pad_mask(&mask, radius), Norm::LInf, radius as u8);
        blend_mask(
            &mut rgba_image,
            &stroke,
            x as i64 - radius as i64,
            y as i64 - radius as i64,
            stroke_color,
            style.opacity,
        );
    }

    blend_mask(
        &mut rgba_image,
        &mask,
        x as i64,
        y as i64,
        text_rgb,
        style.opacity,
    );

    restore_color_type(DynamicImage::ImageRgba8(rgba_image), image.color())
}

fn restore_color_type(rendered: DynamicImage, color: ColorType) -> DynamicImage {
    match color {
        ColorType::Rgb16 | ColorType::L16 => DynamicImage::ImageRgb16(rendered.to_rgb16()),
        ColorType::Rgba16 | ColorType::La16 => DynamicImage::ImageRgba16(rendered.to_rgba16()),
        ColorType::Rgb32F => DynamicImage::ImageRgb32F(rendered.to_rgb32f()),
        ColorType::Rgba32F => DynamicImage::ImageRgba32F(rendered.to_rgba32f()),
        color if color.has_alpha() => rendered,
        _ => DynamicImage::ImageRgb8(rendered.to_rgb8()),
    }
}

/// Coverage mask of the rendered text, rotated and trimmed to its ink.
fn text_mask(text: &str, scale: PxScale, font: &FontVec, rotation: f32) -> Option<GrayImage> {
    let (text_width, text_height) = text_size(scale, font, text);
    // Room for glyph overhang beyond the advance box
    let pad = (scale.y / 2.0).ceil() as u32 + 2;

    let canvas = if rotation.rem_euclid(360.0) == 0.0 {
        let mut canvas = GrayImage::new(text_width + 2 * pad, text_height + 2 * pad);
        draw_text_mut(&mut canvas, Luma([255]), pad as i32, pad as i32, scale, font, text);
        canvas
    } else {
        let diagonal = ((text_width as f32).hypot(text_height as f32)).ceil() as u32;
        let side = diagonal + 2 * pad;
        let mut canvas = GrayImage::new(side, side);
        draw_text_mut(
            &mut canvas,
            Luma([255]),
            ((side - text_width) / 2) as i32,
            ((side - text_height) / 2) as i32,
            scale,
            font,
            text,
        );
        // imageproc rotates clockwise
        rotate_about_center(
            &canvas,
            -rotation.to_radians(),
            Interpolation::Bilinear,
            Luma([0]),
        )
    };

    trim_to_content(&canvas)
}

/// Crop to the bounding box of non-zero pixels.
fn trim_to_content(mask: &GrayImage) -> Option<GrayImage> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;

    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] > 0 {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if min_x == u32::MAX {
        return None;
    }

    Some(
        imageops::crop_imm(mask, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image(),
    )
}

fn pad_mask(mask: &GrayImage, border: u32) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2 * border, mask.height() + 2 * border);
    imageops::replace(&mut padded, mask, border as i64, border as i64);
    padded
}

/// Source-over blend of a solid color through `mask` at (`x`, `y`).
fn blend_mask(target: &mut RgbaImage, mask: &GrayImage, x: i64, y: i64, color: Rgb<u8>, opacity: u8) {
    for (mx, my, coverage) in mask.enumerate_pixels() {
        if coverage[0] == 0 {
            continue;
        }
        let tx = x + mx as i64;
        let ty = y + my as i64;
        if tx < 0 || ty < 0 || tx >= target.width() as i64 || ty >= target.height() as i64 {
            continue;
        }

        let alpha = coverage[0] as f32 / 255.0 * opacity as f32 / 255.0;
        let pixel = target.get_pixel_mut(tx as u32, ty as u32);
        for channel in 0..3 {
            let blended = color[channel] as f32 * alpha + pixel[channel] as f32 * (1.0 - alpha);
            pixel[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
        let dst_alpha = pixel[3] as f32 / 255.0;
        pixel[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
}

fn relative_luminance(r: u8, g: u8, b: u8) -> f32 {
    let linear = |c: u8| {
        let c = c as f32 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

fn contrasting_color(color: Rgb<u8>) -> Rgb<u8> {
    if relative_luminance(color[0], color[1], color[2]) < 0.5 {
        Rgb([255, 255, 255])
    } else {
        Rgb([0, 0, 0])
    }
}

/// Determine whether to use black or white text based on the background
fn determine_text_color(image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> Rgba<u8> {
    let mut total_luminance = 0.0;
    let mut pixel_count = 0;

    let x_end = (x + width).min(image.width());
    let y_end = (y + height).min(image.height());

    for py in y..y_end {
        for px in x..x_end {
            let pixel = image.get_pixel(px, py);
            total_luminance += relative_luminance(pixel[0], pixel[1], pixel[2]);
            pixel_count += 1;
        }
    }

    if pixel_count == 0 {
        return Rgba([255, 255, 255, 255]);
    }

    let average_luminance = total_luminance / pixel_count as f32;

    if average_luminance < 0.5 {
        Rgba([255, 255, 255, 255])
    } else {
        Rgba([0, 0, 0, 255])
    }
}
