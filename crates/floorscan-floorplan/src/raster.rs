use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, BresenhamLineIter},
    rect::Rect,
};

use crate::FloorplanError;

/// Draws a thick line on an image inplace.
///
/// The line follows Bresenham's algorithm and a square brush is stamped at every
/// point, so corners of joined segments stay filled. Pixels outside the image are
/// skipped.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `p0` - The start point of the line as a tuple of (x, y).
/// * `p1` - The end point of the line as a tuple of (x, y).
/// * `color` - The color of the line.
/// * `thickness` - The side of the square brush in pixels.
pub fn draw_thick_line(
    img: &mut RgbImage,
    p0: (i32, i32),
    p1: (i32, i32),
    color: Rgb<u8>,
    thickness: u32,
) {
    let thickness = thickness.max(1);
    // even thicknesses extend one pixel further towards negative coordinates
    let offset = (thickness / 2) as i32;

    let start = (p0.0 as f32, p0.1 as f32);
    let end = (p1.0 as f32, p1.1 as f32);
    for (x, y) in BresenhamLineIter::new(start, end) {
        let brush = Rect::at(x - offset, y - offset).of_size(thickness, thickness);
        draw_filled_rect_mut(img, brush, color);
    }
}

/// Writes the given image as an 8-bit RGB PNG file.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image to encode.
pub fn write_image_png_rgb8(
    file_path: impl AsRef<Path>,
    image: &RgbImage,
) -> Result<(), FloorplanError> {
    image.save_with_format(file_path, ImageFormat::Png)?;
    Ok(())
}
