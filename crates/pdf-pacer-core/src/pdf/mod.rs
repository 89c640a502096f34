mod document;
mod outline;
mod render;
mod text;

pub use document::{DocumentMetadata, PdfDocument};
pub use render::{PageRenderer, WEBP_QUALITY, encode_png, encode_webp};
pub use text::TextExtractor;

use mupdf::Page;

use crate::error::{Error, Result};

/// Page width and height in PDF points
fn page_dimensions(page: &Page, page_num: usize) -> Result<(f32, f32)> {
    let bounds = page.bounds().map_err(|e| Error::PdfRender {
        page: page_num,
        reason: format!("Failed to get bounds: {e}"),
    })?;
    Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
}
