//! Turning a [`QrCode`] into pixels: PNG and data URL output, plus SVG and terminal text.

use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba, RgbaImage};

use crate::error::EncodeError;
use crate::qrcode::{QrCode, QrCodeEcc, Version};

/// Fixed rendering parameters for the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Output width and height in pixels.
    pub width: u32,
    /// Quiet zone, in modules, on every side.
    pub margin: u32,
    pub dark: Rgba<u8>,
    pub light: Rgba<u8>,
    pub ecc: QrCodeEcc,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 300,
            margin: 2,
            dark: Rgba([0, 0, 0, 255]),
            light: Rgba([255, 255, 255, 255]),
            ecc: QrCodeEcc::Medium,
        }
    }
}

/// An encoded, rasterized QR code ready for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    source_text: String,
    qr: QrCode,
    width: u32,
    png: Vec<u8>,
    data_url: String,
}

impl RenderedImage {
    /// The text this image encodes.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn version(&self) -> Version {
        self.qr.version()
    }

    /// The module matrix the PNG was drawn from.
    pub fn qr(&self) -> &QrCode {
        &self.qr
    }

    /// Pixel width (and height) of the PNG.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// `data:image/png;base64,...`
    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

/// Encodes `text` and renders it to PNG and data URL.
///
/// Pure: the same text and options always give byte-identical output.
///
/// # Errors
///
/// [`EncodeError::CapacityExceeded`] when the text does not fit, [`EncodeError::Png`] if the
/// PNG writer fails.
///
/// # Example
///
/// ```
/// use qrsmith::render::{render_text, RenderOptions};
///
/// let image = render_text("https://example.com", &RenderOptions::default()).unwrap();
/// assert_eq!(image.width(), 300);
/// assert!(image.data_url().starts_with("data:image/png;base64,"));
/// ```
pub fn render_text(text: &str, options: &RenderOptions) -> Result<RenderedImage, EncodeError> {
    let qr = QrCode::encode_text(text, options.ecc)?;
    let img = rasterize(&qr, options);
    let png = encode_png(img)?;
    let data_url = to_data_url(&png);
    log::debug!(
        "rendered {} chars as version {} ({} PNG bytes)",
        text.chars().count(),
        qr.version().value(),
        png.len()
    );
    Ok(RenderedImage {
        source_text: text.to_owned(),
        width: options.width.max(module_span(&qr, options.margin)),
        qr,
        png,
        data_url,
    })
}

fn module_span(qr: &QrCode, margin: u32) -> u32 {
    qr.size() as u32 + 2 * margin
}

/// Draws `qr` with its quiet zone into a square RGBA image.
///
/// The image is `options.width` pixels wide, or one pixel per module if the symbol plus quiet
/// zone is wider than that. Pixel `p` shows module `floor(p * span / width) - margin`.
pub fn rasterize(qr: &QrCode, options: &RenderOptions) -> RgbaImage {
    let span = module_span(qr, options.margin);
    let width = options.width.max(span);
    let margin = options.margin as i32;
    let to_module = |p: u32| (u64::from(p) * u64::from(span) / u64::from(width)) as i32 - margin;

    ImageBuffer::from_fn(width, width, |x, y| {
        if qr.get_module(to_module(x), to_module(y)) {
            options.dark
        } else {
            options.light
        }
    })
}

/// Writes the image as PNG bytes.
pub fn encode_png(img: RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn to_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png))
}

/// Returns SVG markup for `qr` with `border` light modules around it.
///
/// Colors come from `options`; the string always uses Unix newlines.
pub fn to_svg_string(qr: &QrCode, border: u32, options: &RenderOptions) -> String {
    let border = border as i32;
    let dimension = qr.size() + border * 2;
    let mut path = String::new();
    for y in 0..qr.size() {
        for x in 0..qr.size() {
            if qr.get_module(x, y) {
                if !path.is_empty() {
                    path.push(' ');
                }
                path += &format!("M{},{}h1v1h-1z", x + border, y + border);
            }
        }
    }

    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {0} {0}\" stroke=\"none\">\n",
        dimension
    );
    result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n", hex(options.light));
    result += &format!("\t<path d=\"{}\" fill=\"{}\"/>\n", path, hex(options.dark));
    result += "</svg>\n";
    result
}

fn hex(color: Rgba<u8>) -> String {
    let [r, g, b, _] = color.0;
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Draws `qr` with full-block characters, two per module so it looks square in a terminal.
pub fn to_terminal_string(qr: &QrCode, border: u32) -> String {
    let border = border as i32;
    let mut out = String::new();
    for y in -border..qr.size() + border {
        for x in -border..qr.size() + border {
            out.push_str(if qr.get_module(x, y) { "██" } else { "  " });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QrCode {
        QrCode::encode_text("HELLO WORLD", QrCodeEcc::Medium).unwrap()
    }

    #[test]
    fn test_to_svg_string() {
        let svg = to_svg_string(&sample(), 4, &RenderOptions::default());
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(svg.contains("viewBox=\"0 0 29 29\""));
        assert!(svg.contains("fill=\"#000000\""));
        assert!(svg.contains("fill=\"#FFFFFF\""));
    }

    #[test]
    fn test_rasterize_fixed_width() {
        let img = rasterize(&sample(), &RenderOptions::default());
        assert_eq!(img.dimensions(), (300, 300));
        // Corners are quiet zone
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*img.get_pixel(299, 299), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_rasterize_maps_modules() {
        let qr = sample();
        let options = RenderOptions::default();
        let img = rasterize(&qr, &options);
        // 21 modules + 2 * 2 margin = 25 modules over 300 px -> 12 px per module
        let center = |m: u32| (m + 2) * 12 + 6;
        for (mx, my) in [(0, 0), (3, 3), (7, 7), (8, 13)] {
            let expected = if qr.get_module(mx as i32, my as i32) { options.dark } else { options.light };
            assert_eq!(*img.get_pixel(center(mx), center(my)), expected);
        }
    }

    #[test]
    fn test_rasterize_never_shrinks_below_one_pixel_per_module() {
        let options = RenderOptions { width: 10, ..RenderOptions::default() };
        let img = rasterize(&sample(), &options);
        assert_eq!(img.dimensions(), (25, 25));
    }

    #[test]
    fn test_png_is_deterministic() {
        let options = RenderOptions::default();
        let a = render_text("determinism", &options).unwrap();
        let b = render_text("determinism", &options).unwrap();
        assert_eq!(a.png(), b.png());
        assert_eq!(a.data_url(), b.data_url());
        assert_eq!(&a.png()[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_data_url_round_trips_png() {
        let image = render_text("data url", &RenderOptions::default()).unwrap();
        let payload = image.data_url().trim_start_matches("data:image/png;base64,");
        let decoded = general_purpose::STANDARD.decode(payload).unwrap();
        assert_eq!(decoded, image.png());
    }

    #[test]
    fn test_rendered_image_keeps_matrix() {
        let options = RenderOptions::default();
        let image = render_text("keep the matrix", &options).unwrap();
        let qr = QrCode::encode_text("keep the matrix", options.ecc).unwrap();
        assert_eq!(image.qr(), &qr);
        assert_eq!(image.version(), qr.version());
        // The PNG is exactly what the kept matrix rasterizes to
        assert_eq!(image.png(), encode_png(rasterize(image.qr(), &options)).unwrap());
    }

    #[test]
    fn test_capacity_error_surfaces() {
        let err = render_text(&"x".repeat(5000), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, EncodeError::CapacityExceeded(_)));
    }

    #[test]
    fn test_terminal_string_dimensions() {
        let qr = sample();
        let text = to_terminal_string(&qr, 1);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 23);
        assert!(lines.iter().all(|l| l.chars().count() == 46));
    }
}
