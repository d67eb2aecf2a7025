//! HSV colour-surface analysis of a leaf image

use crate::config::SurfaceColorTable;
use crate::models::SurfaceAnalysis;

/// Side length the leaf image is resized to before analysis
pub const ANALYSIS_SIZE: u32 = 224;

/// Fraction trimmed from each side before analysis
const CROP_MARGIN: f64 = 0.1;

/// Centre crop keeping the middle 80% on each axis, as `(x, y, width, height)`
pub fn center_crop_bounds(width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x0 = (width as f64 * CROP_MARGIN) as u32;
    let y0 = (height as f64 * CROP_MARGIN) as u32;
    let x1 = (width as f64 * (1.0 - CROP_MARGIN)) as u32;
    let y1 = (height as f64 * (1.0 - CROP_MARGIN)) as u32;
    (x0, y0, x1.saturating_sub(x0).max(1), y1.saturating_sub(y0).max(1))
}

/// Convert an 8-bit RGB pixel to HSV on the OpenCV scale (H 0-180, S and V 0-255)
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f64::from);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 359.x degrees rounds to 180, which is red again
    let h = (h / 2.0).round() as u32 % 180;
    [h as u8, s.round() as u8, v as u8]
}

/// Colour class of one pixel, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelClass {
    Green,
    Yellow,
    Brown,
    Dark,
}

/// Damage classes win over healthy ones so that the fractions never overlap
fn classify_pixel(hsv: [u8; 3], table: &SurfaceColorTable) -> Option<PixelClass> {
    if hsv[2] <= table.dark_max_value {
        Some(PixelClass::Dark)
    } else if table.brown.contains(hsv) {
        Some(PixelClass::Brown)
    } else if table.yellow.contains(hsv) {
        Some(PixelClass::Yellow)
    } else if table.green.contains(hsv) {
        Some(PixelClass::Green)
    } else {
        None
    }
}

/// `count / total` in thousandths, rounded half-up
fn thousandths(count: u64, total: u64) -> u64 {
    (count * 2000 + total) / (2 * total)
}

/// Green / yellow / brown / dark fractions of a set of RGB pixels.
///
/// Each pixel lands in at most one class, so the fractions sum to at most 1.
/// An empty image yields all zeros.
pub fn analyze_surface<I>(pixels: I, table: &SurfaceColorTable) -> SurfaceAnalysis
where
    I: IntoIterator<Item = [u8; 3]>,
{
    let mut counts = [0u64; 4];
    let mut total = 0u64;

    for rgb in pixels {
        total += 1;
        match classify_pixel(rgb_to_hsv(rgb), table) {
            Some(PixelClass::Green) => counts[0] += 1,
            Some(PixelClass::Yellow) => counts[1] += 1,
            Some(PixelClass::Brown) => counts[2] += 1,
            Some(PixelClass::Dark) => counts[3] += 1,
            None => {}
        }
    }

    if total == 0 {
        return SurfaceAnalysis::default();
    }

    let mut shares = counts.map(|count| thousandths(count, total));
    // Rounding up several classes can overshoot 1 by a few thousandths
    let excess = shares.iter().sum::<u64>().saturating_sub(1000);
    if excess > 0 {
        if let Some(largest) = shares.iter_mut().max() {
            *largest -= excess;
        }
    }

    let [green, yellow, brown, dark] = shares.map(|share| share as f64 / 1000.0);
    SurfaceAnalysis::new(green, yellow, brown, dark)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: [u8; 3] = [40, 160, 40];
    const YELLOW: [u8; 3] = [220, 200, 40];
    const BROWN: [u8; 3] = [140, 80, 30];
    const BLACK: [u8; 3] = [10, 10, 10];
    const WHITE: [u8; 3] = [250, 250, 250];

    fn table() -> SurfaceColorTable {
        SurfaceColorTable::default()
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn test_pixel_classes() {
        let t = table();
        assert_eq!(classify_pixel(rgb_to_hsv(GREEN), &t), Some(PixelClass::Green));
        assert_eq!(classify_pixel(rgb_to_hsv(YELLOW), &t), Some(PixelClass::Yellow));
        assert_eq!(classify_pixel(rgb_to_hsv(BROWN), &t), Some(PixelClass::Brown));
        assert_eq!(classify_pixel(rgb_to_hsv(BLACK), &t), Some(PixelClass::Dark));
        assert_eq!(classify_pixel(rgb_to_hsv(WHITE), &t), None);
    }

    #[test]
    fn test_analyze_mixed_leaf() {
        let mut pixels = vec![GREEN; 70];
        pixels.extend(vec![YELLOW; 10]);
        pixels.extend(vec![BROWN; 10]);
        pixels.extend(vec![BLACK; 5]);
        pixels.extend(vec![WHITE; 5]);

        let surface = analyze_surface(pixels, &table());
        assert_eq!(surface.green, 0.7);
        assert_eq!(surface.yellow, 0.1);
        assert_eq!(surface.brown, 0.1);
        assert_eq!(surface.dark, 0.05);
        assert!(surface.total() <= 1.0);
    }

    #[test]
    fn test_hue_wraps_near_red() {
        // 359.5 degrees
        assert_eq!(rgb_to_hsv([255, 0, 2])[0], 0);
        assert_eq!(rgb_to_hsv([255, 0, 10])[0], 179);
    }

    #[test]
    fn test_fractions_rounded() {
        let pixels = vec![GREEN, GREEN, WHITE];
        let surface = analyze_surface(pixels, &table());
        assert_eq!(surface.green, 0.667);
    }

    #[test]
    fn test_rounded_fractions_capped_at_one() {
        // Sixths round up to 0.167 in four classes at once
        let pixels = vec![GREEN, GREEN, GREEN, YELLOW, BROWN, BLACK];
        let surface = analyze_surface(pixels, &table());
        assert_eq!(surface.green, 0.499);
        assert_eq!(surface.yellow, 0.167);
        assert_eq!(surface.brown, 0.167);
        assert_eq!(surface.dark, 0.167);
        assert!(surface.total() <= 1.0 + 1e-9);
    }

    #[test]
    fn test_empty_image() {
        let surface = analyze_surface(Vec::<[u8; 3]>::new(), &table());
        assert_eq!(surface, SurfaceAnalysis::default());
    }

    #[test]
    fn test_center_crop() {
        assert_eq!(center_crop_bounds(100, 200), (10, 20, 80, 160));
        assert_eq!(center_crop_bounds(1, 1), (0, 0, 1, 1));
    }
}
