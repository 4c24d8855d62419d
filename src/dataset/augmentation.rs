//! Data Augmentation Module
//!
//! Produces the per-sample variant group used during training and
//! validation: the base image plus a horizontal flip, a random rotation,
//! and a random translation/scale. Sketches are dark strokes on a white
//! canvas, so geometric transforms fill uncovered areas with white.

use image::{imageops::FilterType, DynamicImage, ImageBuffer, Rgb, RgbImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Maximum rotation angle in degrees (applies ±)
const ROTATION_DEGREES: f32 = 30.0;
/// Maximum translation as a fraction of width/height (applies ±)
const TRANSLATE_FRACTION: f32 = 0.2;
/// Scale range for the affine variant
const SCALE_RANGE: (f32, f32) = (0.6, 1.4);

/// Fill color for pixels a geometric transform leaves uncovered
const FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Image augmenter producing normalized variant groups
#[derive(Clone, Debug)]
pub struct Augmenter {
    image_size: u32,
}

impl Augmenter {
    /// Create a new augmenter targeting the given square resolution
    pub fn new(image_size: u32) -> Self {
        Self { image_size }
    }

    /// Produce the 4-variant training/validation group for one image:
    /// identity, horizontal flip, random rotation, random translate/scale.
    /// Every variant is resized and normalized independently.
    pub fn variants(&self, img: &DynamicImage, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
        let rgb = img.to_rgb8();

        let angle = rng.gen_range(-ROTATION_DEGREES..=ROTATION_DEGREES);
        let (width, height) = rgb.dimensions();
        let dx = rng.gen_range(-TRANSLATE_FRACTION..=TRANSLATE_FRACTION) * width as f32;
        let dy = rng.gen_range(-TRANSLATE_FRACTION..=TRANSLATE_FRACTION) * height as f32;
        let scale = rng.gen_range(SCALE_RANGE.0..=SCALE_RANGE.1);

        vec![
            self.normalize_rgb(&rgb),
            self.normalize_rgb(&image::imageops::flip_horizontal(&rgb)),
            self.normalize_rgb(&rotate(&rgb, angle)),
            self.normalize_rgb(&affine(&rgb, dx, dy, scale)),
        ]
    }

    /// Produce the single identity variant used for test samples
    pub fn identity_variant(&self, img: &DynamicImage) -> Vec<f32> {
        self.normalize_rgb(&img.to_rgb8())
    }

    /// Resize to the working resolution, convert to CHW f32 in [0, 1],
    /// then normalize per channel with ImageNet mean/std.
    pub fn normalize_rgb(&self, img: &RgbImage) -> Vec<f32> {
        let resized = image::imageops::resize(
            img,
            self.image_size,
            self.image_size,
            FilterType::Triangle,
        );

        let (width, height) = (self.image_size as usize, self.image_size as usize);
        let num_pixels = width * height;
        let mut data = vec![0.0f32; 3 * num_pixels];

        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                data[c * num_pixels + i] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }

        data
    }

    /// Number of f32 values per variant
    pub fn variant_len(&self) -> usize {
        3 * self.image_size as usize * self.image_size as usize
    }
}

/// Rotate an image around its center by the given angle in degrees,
/// filling uncovered pixels with white.
pub fn rotate(img: &RgbImage, angle_degrees: f32) -> RgbImage {
    if angle_degrees.abs() < 0.01 {
        return img.clone();
    }

    let angle_rad = angle_degrees.to_radians();
    let (width, height) = img.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;

    let cos_a = angle_rad.cos();
    let sin_a = angle_rad.sin();

    let mut output = ImageBuffer::new(width, height);

    for y in 0..height {
        for x in 0..width {
            // Inverse-map each destination pixel into the source image.
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;

            let src_x = cx + dx * cos_a + dy * sin_a;
            let src_y = cy - dx * sin_a + dy * cos_a;

            output.put_pixel(x, y, bilinear_sample(img, src_x, src_y));
        }
    }

    output
}

/// Apply a translation (pixels) and uniform scale around the image center,
/// filling uncovered pixels with white.
pub fn affine(img: &RgbImage, dx: f32, dy: f32, scale: f32) -> RgbImage {
    let (width, height) = img.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;

    let mut output = ImageBuffer::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let src_x = cx + (x as f32 - cx - dx) / scale;
            let src_y = cy + (y as f32 - cy - dy) / scale;

            output.put_pixel(x, y, bilinear_sample(img, src_x, src_y));
        }
    }

    output
}

/// Sample a pixel with bilinear interpolation, white outside the image
fn bilinear_sample(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = img.dimensions();

    if x < 0.0 || y < 0.0 || x > width as f32 - 1.0 || y > height as f32 - 1.0 {
        return FILL;
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut result = [0u8; 3];
    for c in 0..3 {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;
        result[c] = v.round().clamp(0.0, 255.0) as u8;
    }

    Rgb(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_image() -> RgbImage {
        let mut img = ImageBuffer::from_pixel(32, 32, Rgb([255, 255, 255]));
        // A dark square stroke in the upper-left quadrant
        for y in 4..12 {
            for x in 4..12 {
                img.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }
        img
    }

    #[test]
    fn test_variants_count_and_len() {
        let aug = Augmenter::new(32);
        let img = DynamicImage::ImageRgb8(test_image());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let variants = aug.variants(&img, &mut rng);

        assert_eq!(variants.len(), 4);
        for v in &variants {
            assert_eq!(v.len(), 3 * 32 * 32);
        }
    }

    #[test]
    fn test_identity_variant_single() {
        let aug = Augmenter::new(32);
        let img = DynamicImage::ImageRgb8(test_image());

        let v = aug.identity_variant(&img);
        assert_eq!(v.len(), aug.variant_len());
    }

    #[test]
    fn test_normalization_values() {
        let aug = Augmenter::new(8);
        let white = ImageBuffer::from_pixel(8, 8, Rgb([255, 255, 255]));

        let data = aug.normalize_rgb(&white);

        // White pixel in channel 0: (1.0 - 0.485) / 0.229
        let expected_r = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        assert!((data[0] - expected_r).abs() < 1e-5);

        // Channel planes are contiguous (CHW)
        let num_pixels = 8 * 8;
        let expected_b = (1.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];
        assert!((data[2 * num_pixels] - expected_b).abs() < 1e-5);
    }

    #[test]
    fn test_rotation_fills_corners_white() {
        let img = test_image();
        let rotated = rotate(&img, 30.0);

        // A 30° rotation pulls the corners from outside the source image.
        assert_eq!(*rotated.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(rotated.dimensions(), img.dimensions());
    }

    #[test]
    fn test_affine_translation_moves_stroke() {
        let img = test_image();
        let shifted = affine(&img, 8.0, 8.0, 1.0);

        // The stroke at (8, 8) should now appear at (16, 16).
        assert_eq!(*shifted.get_pixel(16, 16), Rgb([10, 10, 10]));
        // The vacated top-left corner is filled white.
        assert_eq!(*shifted.get_pixel(4, 4), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_affine_identity_is_noop() {
        let img = test_image();
        let same = affine(&img, 0.0, 0.0, 1.0);
        assert_eq!(*same.get_pixel(8, 8), *img.get_pixel(8, 8));
        assert_eq!(*same.get_pixel(20, 20), *img.get_pixel(20, 20));
    }
}
