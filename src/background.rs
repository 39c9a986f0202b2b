//! Scrolling backdrop behind the grid.
//!
//! The animation state (offset, distortion, selected layer) advances once per
//! tick and travels in the render snapshot. The layer images themselves are
//! generated once and served separately.
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageResult, Rgb, RgbImage};
use rand::Rng;
use serde::Serialize;

pub const BG_ALPHA: u8 = 180;
pub const OVERLAY_ALPHA: u8 = 100;
pub const LAYER_COUNT: usize = 4;

const SCROLL_SPEED: f32 = 0.5;
const SCROLL_RATIO_Y: f32 = 0.7;
const DISTORTION_SPEED: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackgroundView {
    pub offset: [f32; 2],
    pub distortion: f32,
    pub layer: usize,
    pub alpha: u8,
    pub overlay_alpha: u8,
}

#[derive(Debug, Clone)]
pub struct Background {
    offset: [f32; 2],
    distortion: f32,
    layer: usize,
    screen: (u32, u32),
}

impl Background {
    pub fn new(width: u32, height: u32) -> Self {
        Background {
            offset: [0.0, 0.0],
            distortion: 0.0,
            layer: 0,
            screen: (width.max(1), height.max(1)),
        }
    }

    /// Scrolls diagonally and wraps the offset at the screen size.
    pub fn update(&mut self) {
        let (w, h) = (self.screen.0 as f32, self.screen.1 as f32);
        self.offset[0] += SCROLL_SPEED;
        self.offset[1] += SCROLL_SPEED * SCROLL_RATIO_Y;
        self.distortion += DISTORTION_SPEED;

        if self.offset[0] > w {
            self.offset[0] -= w;
        }
        if self.offset[1] > h {
            self.offset[1] -= h;
        }
    }

    pub fn cycle(&mut self) {
        self.layer = (self.layer + 1) % LAYER_COUNT;
    }

    pub fn view(&self) -> BackgroundView {
        BackgroundView {
            offset: self.offset,
            distortion: self.distortion,
            layer: self.layer,
            alpha: BG_ALPHA,
            overlay_alpha: OVERLAY_ALPHA,
        }
    }
}

/// Procedural layer `index` at screen size. Layer 0 is a speckled field;
/// the others are diagonal lattices of dots on a tinted base.
pub fn render_layer<R: Rng>(index: usize, width: u32, height: u32, rng: &mut R) -> RgbImage {
    if index == 0 {
        let mut img = RgbImage::from_pixel(width, height, Rgb([20, 10, 40]));
        for x in (0..width).step_by(5) {
            for y in (0..height).step_by(5) {
                let i: u8 = rng.gen_range(10..=30);
                img.put_pixel(x, y, Rgb([i, i / 2, i * 2]));
            }
        }
        return img;
    }

    let tint = (index - 1) as u8;
    let base = Rgb([10 + tint * 5, 20 - tint * 3, 30 + tint * 2]);
    let mut img = RgbImage::from_pixel(width, height, base);
    for x in (0..width).step_by(10) {
        for y in (0..height).step_by(10) {
            let on_lattice = (x + y) % 40 < 20 || x.abs_diff(y) % 40 < 20;
            if !on_lattice {
                continue;
            }
            let intensity = 50 + ((x + y) % 50) as i32;
            let color = Rgb([
                channel(intensity + rng.gen_range(-20..=20)),
                channel(intensity / 2 + rng.gen_range(-10..=10)),
                channel(intensity * 2 + rng.gen_range(-20..=20)),
            ]);
            let radius = 2 + (x as u64 * y as u64 % 3) as i32;
            fill_circle(&mut img, x as i32, y as i32, radius, color);
        }
    }
    img
}

pub fn render_layers<R: Rng>(width: u32, height: u32, rng: &mut R) -> Vec<RgbImage> {
    (0..LAYER_COUNT)
        .map(|i| render_layer(i, width, height, rng))
        .collect()
}

pub fn encode_png(img: &RgbImage) -> ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)?;
    Ok(bytes)
}

fn channel(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

fn fill_circle(img: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (x, y) = (cx + dx, cy + dy);
            if dx * dx + dy * dy <= radius * radius && (0..w).contains(&x) && (0..h).contains(&y) {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
