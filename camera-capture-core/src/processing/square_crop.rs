use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

/// Crop the largest centered square out of an encoded image and re-encode it as JPEG.
///
/// Returns the JPEG bytes and the side length of the square.
pub fn crop_center_square(blob: &[u8]) -> Result<(Vec<u8>, u32), String> {
    let decoded = image::load_from_memory(blob).map_err(|e| format!("failed to decode photo: {}", e))?;
    let cropped = crop_image(&decoded);
    let side = cropped.width();

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(cropped.to_rgb8())
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| format!("failed to encode square photo: {}", e))?;
    Ok((out.into_inner(), side))
}

/// The largest centered square of `image`.
pub fn crop_image(image: &DynamicImage) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    image.crop_imm(x, y, side, side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn landscape_is_cropped_to_height() {
        let (square, side) = crop_center_square(&jpeg(64, 32)).unwrap();
        let decoded = image::load_from_memory(&square).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
        assert_eq!(side, 32);
    }

    #[test]
    fn portrait_is_cropped_to_width() {
        let (square, side) = crop_center_square(&jpeg(24, 40)).unwrap();
        let decoded = image::load_from_memory(&square).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 24));
        assert_eq!(side, 24);
    }

    #[test]
    fn crop_is_centered() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 10, |x, _| Rgb([x as u8, 0, 0])));
        let cropped = crop_image(&img).to_rgb8();
        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(9, 0)[0], 19);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(crop_center_square(b"not an image").is_err());
    }
}
