//! SVG rasterization and data-URI embedding.

use crate::{
    FONT_DATABASE,
    engine::ImageFormat,
    error::{EngineError, Result},
};
use base64::Engine;
use image::{DynamicImage, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;

pub const JPEG_QUALITY: u8 = 90;

/// Renders an SVG document onto a white canvas and encodes it.
pub fn rasterize(svg: &str, format: ImageFormat) -> Result<Vec<u8>> {
    let options = usvg::Options {
        fontdb: FONT_DATABASE.clone(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| EngineError::Render(format!("could not parse SVG: {e}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        EngineError::Render(format!(
            "invalid canvas size {}x{}",
            size.width(),
            size.height()
        ))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // Opaque canvas, so premultiplied and straight RGBA coincide.
    let rgba = RgbaImage::from_raw(size.width(), size.height(), pixmap.take())
        .ok_or_else(|| EngineError::Render("pixel buffer size mismatch".to_string()))?;
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                Cursor::new(&mut bytes),
                JPEG_QUALITY,
            );
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png => {
            DynamicImage::ImageRgba8(rgba)
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        }
    }
    tracing::debug!(
        width = size.width(),
        height = size.height(),
        bytes = bytes.len(),
        "rasterized figure"
    );
    Ok(bytes)
}

pub fn data_uri(bytes: &[u8], format: ImageFormat) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:image/{};base64,{encoded}", format.mime_subtype())
}

pub fn img_tag(svg: &str, format: ImageFormat) -> Result<String> {
    let bytes = rasterize(svg, format)?;
    Ok(format!("<img src=\"{}\">", data_uri(&bytes, format)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10" viewBox="0 0 20 10"><rect width="10" height="10" fill="#ff0000"/></svg>"##;

    #[test]
    fn test_rasterize_png() {
        let bytes = rasterize(SQUARE, ImageFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (20, 10));
        assert_eq!(decoded.get_pixel(2, 2).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(15, 5).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_img_tag_jpeg() {
        let tag = img_tag(SQUARE, ImageFormat::Jpeg).unwrap();
        assert!(tag.starts_with("<img src=\"data:image/jpg;base64,/9j/"));
    }

    #[test]
    fn test_invalid_svg() {
        assert!(matches!(
            rasterize("<not-svg", ImageFormat::Png),
            Err(EngineError::Render(_))
        ));
    }
}
