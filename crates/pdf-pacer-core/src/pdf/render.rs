use image::{ImageEncoder, RgbaImage};
use mupdf::{Colorspace, Matrix, Page};
use webp::Encoder as WebpEncoder;

use super::document::PdfDocument;
use crate::cancellation::CancellationToken;
use crate::error::{Error, Result};

/// WebP quality used for page images
pub const WEBP_QUALITY: f32 = 85.0;

/// Rasterizes pages of a document
pub struct PageRenderer<'a> {
    pub doc: &'a PdfDocument,
    /// Pixels per PDF point
    pub scale: f32,
}

impl<'a> PageRenderer<'a> {
    pub const fn new(doc: &'a PdfDocument) -> Self {
        Self { doc, scale: 1.0 }
    }

    pub const fn with_scale(doc: &'a PdfDocument, scale: f32) -> Self {
        Self { doc, scale }
    }

    /// Render a page to an RGBA image buffer
    pub fn render_page(&self, page_num: usize) -> Result<RgbaImage> {
        self.render_page_cancellable(page_num, &CancellationToken::new())
    }

    /// Render a page, giving up early once `cancel` fires
    pub fn render_page_cancellable(&self, page_num: usize, cancel: &CancellationToken) -> Result<RgbaImage> {
        cancel.check_cancelled(page_num, "open")?;
        let doc = self.doc.open_document()?;
        let page = self.doc.load_page(&doc, page_num)?;
        self.rasterize(&page, page_num, cancel)
    }

    pub(crate) fn rasterize(&self, page: &Page, page_num: usize, cancel: &CancellationToken) -> Result<RgbaImage> {
        cancel.check_cancelled(page_num, "rasterize")?;

        let matrix = Matrix::new_scale(self.scale, self.scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), 1.0, true)
            .map_err(|e| Error::PdfRender {
                page: page_num,
                reason: format!("Failed to render: {e}"),
            })?;

        // The pixmap is the expensive part; don't convert one nobody wants
        cancel.check_cancelled(page_num, "convert")?;

        let pixels = pixmap.samples();
        let img_width = pixmap.width();
        let img_height = pixmap.height();

        let n = pixmap.n() as usize;
        let mut rgba_pixels = Vec::with_capacity((img_width * img_height * 4) as usize);

        for chunk in pixels.chunks(n) {
            match n {
                3 => {
                    rgba_pixels.extend_from_slice(chunk);
                    rgba_pixels.push(255);
                }
                4 => rgba_pixels.extend_from_slice(chunk),
                1 => {
                    rgba_pixels.extend_from_slice(&[chunk[0], chunk[0], chunk[0], 255]);
                }
                _ => {
                    return Err(Error::PdfRender {
                        page: page_num,
                        reason: format!("Unexpected pixel format with {n} components"),
                    });
                }
            }
        }

        RgbaImage::from_raw(img_width, img_height, rgba_pixels).ok_or_else(|| Error::PdfRender {
            page: page_num,
            reason: "Failed to create image buffer".to_string(),
        })
    }

    pub fn render_page_png(&self, page_num: usize) -> Result<Vec<u8>> {
        encode_png(&self.render_page(page_num)?, page_num)
    }

    pub fn render_page_webp(&self, page_num: usize) -> Result<Vec<u8>> {
        Ok(encode_webp(&self.render_page(page_num)?))
    }
}

/// Encode a page bitmap as PNG, favouring speed over size
pub fn encode_png(img: &RgbaImage, page_num: usize) -> Result<Vec<u8>> {
    let mut png_data = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut png_data,
        image::codecs::png::CompressionType::Fast,
        image::codecs::png::FilterType::Adaptive,
    );

    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| Error::PdfRender {
            page: page_num,
            reason: format!("Failed to encode PNG: {e}"),
        })?;

    Ok(png_data)
}

/// Encode a page bitmap as lossy WebP
pub fn encode_webp(img: &RgbaImage) -> Vec<u8> {
    let encoder = WebpEncoder::from_rgba(img.as_raw(), img.width(), img.height());
    encoder.encode(WEBP_QUALITY).to_vec()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encoders_produce_their_formats() {
        let img = RgbaImage::from_pixel(8, 4, Rgba([200, 10, 10, 255]));

        let png = encode_png(&img, 0).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));

        let webp = encode_webp(&img);
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }
}
