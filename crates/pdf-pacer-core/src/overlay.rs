//! Compositing the reveal mask over a rendered page bitmap.

use image::{Rgba, RgbaImage};

use crate::animator::{MaskRect, ShadowMask};

/// Translucent black, the same shade the reading screen draws
pub const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 148]);

/// Blend `color` over every pixel the mask covers
///
/// The mask and the bitmap must come from the same render scale; rectangles
/// are clipped to the image.
pub fn paint_shadow(image: &mut RgbaImage, mask: &ShadowMask, color: Rgba<u8>) {
    for rect in mask.rects() {
        let Some((x0, y0, x1, y1)) = pixel_bounds(rect, image.width(), image.height()) else {
            continue;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                blend(image.get_pixel_mut(x, y), color);
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to image size first
fn pixel_bounds(rect: &MaskRect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    #[allow(clippy::cast_precision_loss)]
    let clamp = |value: f32, max: u32| value.round().clamp(0.0, max as f32) as u32;

    let x0 = clamp(rect.x, width);
    let y0 = clamp(rect.y, height);
    let x1 = clamp(rect.x + rect.width, width);
    let y1 = clamp(rect.y + rect.height, height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

fn blend(pixel: &mut Rgba<u8>, color: Rgba<u8>) {
    let alpha = u16::from(color[3]);
    let inverse = 255 - alpha;
    for channel in 0..3 {
        let mixed = (u16::from(color[channel]) * alpha + u16::from(pixel[channel]) * inverse) / 255;
        pixel[channel] = u8::try_from(mixed).unwrap_or(u8::MAX);
    }
    pixel[3] = pixel[3].max(color[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paints_only_masked_area() {
        let mut image = RgbaImage::from_pixel(100, 60, Rgba([255, 255, 255, 255]));
        let mask = ShadowMask {
            page_width: 100.0,
            page_height: 60.0,
            above: Some(MaskRect::new(0.0, 0.0, 100.0, 10.0)),
            line: Some(MaskRect::new(0.0, 10.0, 40.0, 20.0)),
        };

        paint_shadow(&mut image, &mask, SHADOW_COLOR);

        let shaded = image.get_pixel(5, 5);
        assert!(shaded[0] < 255);
        assert_eq!(shaded[0], shaded[1]);
        assert_eq!(*image.get_pixel(39, 29), *shaded);
        assert_eq!(*image.get_pixel(40, 20), Rgba([255, 255, 255, 255]));
        assert_eq!(*image.get_pixel(10, 30), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_out_of_bounds_rects_are_clipped() {
        let mut image = RgbaImage::from_pixel(10, 10, Rgba([200, 200, 200, 255]));
        let mask = ShadowMask {
            page_width: 10.0,
            page_height: 10.0,
            above: Some(MaskRect::new(-5.0, -5.0, 50.0, 8.0)),
            line: Some(MaskRect::new(20.0, 20.0, 5.0, 5.0)),
        };
        paint_shadow(&mut image, &mask, SHADOW_COLOR);
        assert!(image.get_pixel(9, 2)[0] < 200);
        assert_eq!(image.get_pixel(9, 3)[0], 200);
    }
}
