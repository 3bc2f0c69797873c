use std::path::Path;

use ab_glyph::{FontArc, FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::models::BoundingBox;

const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BOX_THICKNESS: u32 = 2;
const LABEL_COLOR: [u8; 3] = [0, 255, 255];
const LABEL_TEXT_COLOR: [u8; 3] = [0, 0, 0];
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_PADDING: u32 = 2;
const LABEL_GAP: i32 = 4;

/// DejaVu Sans, embedded so labels render without any system font
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Draws accepted boxes and recognized plate text onto the working image
pub struct Annotator {
    font: FontArc,
    font_size: f32,
}

impl Annotator {
    pub fn new(font: FontArc) -> Self {
        Self {
            font,
            font_size: LABEL_FONT_SIZE,
        }
    }

    /// Annotator using the embedded font
    pub fn bundled() -> Self {
        let font = FontRef::try_from_slice(BUNDLED_FONT).expect("embedded font is a valid TTF");
        Self::new(FontArc::new(font))
    }

    /// Use the font at `path` as an override, keeping the embedded one if it cannot be loaded
    pub fn from_font_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::bundled();
        };

        match load_font(path) {
            Some(font) => {
                debug!("Using label font {}", path.display());
                Self::new(font)
            }
            None => {
                warn!("Cannot load label font {}, using the embedded font", path.display());
                Self::bundled()
            }
        }
    }

    /// Outline the box, clamped to the image. Degenerate boxes draw nothing.
    pub fn draw_box(&self, image: &mut RgbImage, bbox: &BoundingBox) {
        let (x, y, width, height) = bbox.clamp_to(image.width(), image.height());

        for inset in 0..BOX_THICKNESS {
            if width <= 2 * inset || height <= 2 * inset {
                break;
            }
            let rect = Rect::at((x + inset) as i32, (y + inset) as i32)
                .of_size(width - 2 * inset, height - 2 * inset);
            draw_hollow_rect_mut(image, rect, Rgb(BOX_COLOR));
        }
    }

    /// Write `Plate: <text>` just above the box, kept inside the image
    pub fn draw_plate_text(&self, image: &mut RgbImage, bbox: &BoundingBox, text: &str) {
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 {
            return;
        }

        let label = format!("Plate: {}", text);
        let scale = PxScale::from(self.font_size);

        let (text_w, text_h) = text_size(scale, &self.font, &label);
        let label_w = (text_w + 2 * LABEL_PADDING).min(img_w);
        let label_h = (text_h + 2 * LABEL_PADDING).min(img_h);

        let (box_x, box_y, _, _) = bbox.clamp_to(img_w, img_h);
        let label_x = (box_x as i32).min((img_w - label_w) as i32).max(0);
        let label_y = (box_y as i32 - label_h as i32 - LABEL_GAP).max(0);

        let background = Rect::at(label_x, label_y).of_size(label_w, label_h);
        draw_filled_rect_mut(image, background, Rgb(LABEL_COLOR));

        draw_text_mut(
            image,
            Rgb(LABEL_TEXT_COLOR),
            label_x + LABEL_PADDING as i32,
            label_y + LABEL_PADDING as i32,
            scale,
            &self.font,
            &label,
        );
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::bundled()
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let data = std::fs::read(path).ok()?;
    FontArc::try_from_vec(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_outline_is_drawn_in_place() {
        let mut image = RgbImage::new(50, 30);
        let annotator = Annotator::bundled();
        annotator.draw_box(&mut image, &BoundingBox::new(10, 5, 30, 20, 0.8));

        assert_eq!(image.get_pixel(10, 5).0, BOX_COLOR);
        assert_eq!(image.get_pixel(11, 6).0, BOX_COLOR);
        assert_eq!(image.get_pixel(29, 19).0, BOX_COLOR);
        assert_eq!(image.get_pixel(20, 12).0, [0, 0, 0]);
    }

    #[test]
    fn degenerate_box_draws_nothing() {
        let mut image = RgbImage::new(20, 20);
        let annotator = Annotator::bundled();
        annotator.draw_box(&mut image, &BoundingBox::new(25, 25, 40, 40, 0.9));
        annotator.draw_box(&mut image, &BoundingBox::new(5, 5, 5, 15, 0.9));

        assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn label_stays_inside_small_images() {
        let mut image = RgbImage::new(40, 10);
        let annotator = Annotator::bundled();
        annotator.draw_plate_text(&mut image, &BoundingBox::new(30, 2, 39, 9, 0.9), "AB12CD");

        assert_eq!(image.get_pixel(0, 0).0, LABEL_COLOR);
    }

    #[test]
    fn label_glyphs_are_rendered() {
        let mut image = RgbImage::from_pixel(200, 80, Rgb([255, 255, 255]));
        let annotator = Annotator::bundled();
        annotator.draw_plate_text(&mut image, &BoundingBox::new(10, 40, 120, 70, 0.9), "AB12CD");

        let above_box = (0..200).flat_map(|x| (0..40).map(move |y| (x, y)));
        let glyph_pixels = above_box
            .filter(|&(x, y)| is_dark(image.get_pixel(x, y)))
            .count();
        assert!(glyph_pixels > 20, "only {} glyph pixels", glyph_pixels);
    }

    #[test]
    fn unreadable_font_override_falls_back() {
        let mut image = RgbImage::from_pixel(200, 80, Rgb([255, 255, 255]));
        let annotator = Annotator::from_font_path(Some(Path::new("/nonexistent/font.ttf")));
        annotator.draw_plate_text(&mut image, &BoundingBox::new(10, 40, 120, 70, 0.9), "XY99");

        assert!(image.pixels().any(is_dark));
    }

    fn is_dark(pixel: &Rgb<u8>) -> bool {
        pixel.0.iter().all(|&c| c < 100)
    }
}
