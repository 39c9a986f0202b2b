//! Electron shell layout around the nucleus.
//!
//! Shells here are layout tiers, not quantum shells: capacities follow the
//! period lengths and are stretched by grid activity.
use crate::element::ElementRecord;
use serde::Serialize;
use std::f64::consts::PI;

pub const SHELL_CAPACITIES: [u32; 6] = [2, 8, 8, 18, 18, 32];

pub const ELECTRON_COLORS: [[u8; 3]; 6] = [
    [255, 100, 100],
    [100, 255, 100],
    [100, 100, 255],
    [255, 255, 100],
    [255, 100, 255],
    [100, 255, 255],
];

const BASE_RADIUS: f64 = 30.0;
const SHELL_SPACING: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitalPosition {
    pub x: f32,
    pub y: f32,
    /// Zero-based shell index.
    pub shell: usize,
}

/// Shell capacities stretched by `grid_factor`, each at least 1.
pub fn scaled_capacities(grid_factor: f64) -> [u32; 6] {
    let scale = 1.0 + grid_factor * 0.5;
    SHELL_CAPACITIES.map(|c| ((c as f64 * scale).floor() as u32).max(1))
}

/// Unscaled ring radius for 1-indexed `shell`.
pub fn shell_radius(shell: usize) -> f64 {
    BASE_RADIUS + SHELL_SPACING * shell as f64
}

/// Positions of up to `atomic_number` electrons at `time` (ms), relative to
/// the nucleus and before zoom. Electrons beyond the last shell are not placed.
pub fn compute(atomic_number: u32, time: u64, grid_factor: f64) -> Vec<OrbitalPosition> {
    let seconds = time as f64 * 0.001;
    let spin_rate = time as f64 * 0.0005;
    let capacities = scaled_capacities(grid_factor);
    let placed: u32 = atomic_number.min(capacities.iter().sum());
    let mut positions = Vec::with_capacity(placed as usize);
    let mut remaining = placed;

    for (index, capacity) in capacities.into_iter().enumerate() {
        if remaining == 0 {
            break;
        }
        let shell = index + 1;
        let count = capacity.min(remaining);
        remaining -= count;

        let fluctuation = (seconds + shell as f64).sin() * 5.0 * grid_factor;
        let radius = shell_radius(shell) + fluctuation;
        let step = 2.0 * PI / count as f64;
        let spin = spin_rate * shell as f64;

        for i in 0..count {
            let angle = step * i as f64 + spin;
            positions.push(OrbitalPosition {
                x: (angle.cos() * radius) as f32,
                y: (angle.sin() * radius) as f32,
                shell: index,
            });
        }
    }

    positions
}

pub fn shell_color(shell: usize) -> [u8; 3] {
    ELECTRON_COLORS[shell % ELECTRON_COLORS.len()]
}

/// Marker radius for the electron at `index` in the layout. The inner half of
/// the electrons pulse; the rest are drawn at a fixed size.
pub fn electron_size(index: usize, shell: usize, atomic_number: u32, time: u64) -> f32 {
    if index < (atomic_number / 2) as usize {
        let pulse = 0.7 + 0.3 * (time as f64 * 0.01 + shell as f64).sin();
        (6.0 * pulse) as f32
    } else {
        4.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NucleusStyle {
    pub radius: f32,
    pub color: [u8; 3],
    pub pulse: f32,
    /// Ring radii for the orbit guides, one per shell.
    pub ring_radii: Vec<f32>,
    pub glow_radii: Vec<f32>,
    /// Interference rings drawn when the grid is busy.
    pub wave_radii: Vec<f32>,
}

/// Nucleus size and tint from the element's mass and electronegativity.
pub fn nucleus_style(element: &ElementRecord, time: u64, active_cells: usize) -> NucleusStyle {
    let mass = element.atomic_mass_or_default();
    let en = element.electronegativity_or_default();
    // ln of a sub-unit mass is negative; keep the radius from shrinking below 10
    let radius = 10.0 + (mass.ln() * 2.0).clamp(0.0, 20.0);
    let red = (en * 60.0).clamp(0.0, 255.0) as u8;
    let seconds = time as f64 * 0.001;

    let ring_radii: Vec<f32> = (1..=SHELL_CAPACITIES.len())
        .map(|s| shell_radius(s) as f32)
        .collect();
    let glow_radii = (1..=SHELL_CAPACITIES.len())
        .map(|s| (shell_radius(s) + (seconds + s as f64).sin() * 5.0) as f32)
        .collect();

    let wave_radii = if active_cells > 3 {
        (1..=3)
            .map(|i| (radius * 2.0 * i as f64 + (time as f64 * 0.002 + i as f64).sin() * 10.0) as f32)
            .collect()
    } else {
        Vec::new()
    };

    NucleusStyle {
        radius: radius as f32,
        color: [red, 50, 255 - red],
        pulse: (0.8 + 0.2 * (time as f64 * 0.005).sin()) as f32,
        ring_radii,
        glow_radii,
        wave_radii,
    }
}
