//! Progression unlock grid: a fixed lattice of cells that opens up as the
//! selected atomic number grows and pulses with the element's properties.
use crate::element::ElementRecord;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::f64::consts::PI;

pub const DEFAULT_WIDTH: u32 = 10;
pub const DEFAULT_HEIGHT: u32 = 8;
pub const GRID_ALPHA: u8 = 120;

const PULSE_SPEED: f64 = 0.05;

/// Base RGBA palette cells draw their color from.
pub const GRID_COLORS: [[u8; 4]; 4] = [
    [50, 50, 80, 100],
    [80, 50, 80, 120],
    [50, 80, 80, 120],
    [80, 80, 50, 120],
];

#[derive(Debug, Clone, Serialize)]
pub struct GridCell {
    pub x: u32,
    pub y: u32,
    pub color: [u8; 4],
    pub energy: f64,
    pub phase: f64,
    pub locked: bool,
    pub active: bool,
}

impl GridCell {
    /// Base color modulated by the grid pulse and the cell's energy.
    pub fn display_color(&self, pulse_phase: f64) -> [u8; 4] {
        let pulse = 0.8 + 0.2 * (pulse_phase + self.phase).sin();
        let scale = |c: u8| (c as f64 * pulse * self.energy).clamp(0.0, 255.0) as u8;
        [
            scale(self.color[0]),
            scale(self.color[1]),
            scale(self.color[2]),
            self.color[3],
        ]
    }
}

pub struct UnlockGrid {
    width: u32,
    height: u32,
    cells: Vec<GridCell>,
    active: BTreeSet<(u32, u32)>,
    unlocked_cells: usize,
    pulse_phase: f64,
    alpha: u8,
}

impl UnlockGrid {
    /// Builds the grid with randomized colors, energies and phases. Only the
    /// geometric center cell starts unlocked.
    pub fn with_rng<R: Rng>(width: u32, height: u32, rng: &mut R) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut cells = Vec::with_capacity((width * height) as usize);
        // x-major enumeration: index = x * height + y
        for x in 0..width {
            for y in 0..height {
                cells.push(GridCell {
                    x,
                    y,
                    color: GRID_COLORS[rng.gen_range(0..GRID_COLORS.len())],
                    energy: rng.gen_range(0.5..1.5),
                    phase: rng.gen_range(0.0..2.0 * PI),
                    locked: true,
                    active: false,
                });
            }
        }

        let center = ((width / 2) * height + height / 2) as usize;
        cells[center].locked = false;

        UnlockGrid {
            width,
            height,
            cells,
            active: BTreeSet::new(),
            unlocked_cells: 1,
            pulse_phase: 0.0,
            alpha: GRID_ALPHA,
        }
    }

    /// Recomputes lock state, energy, phase and activation for `time` (ms).
    pub fn update(&mut self, element: &ElementRecord, time: u64) {
        self.pulse_phase = (self.pulse_phase + PULSE_SPEED) % (2.0 * PI);

        let atomic_number = element.atomic_number;
        let total = self.cells.len();
        self.unlocked_cells = total.min(atomic_number as usize + 2);

        let phase_step = 0.01 * element.electronegativity_or_default();
        let seconds = time as f64 * 0.001;
        let tick = time / 100;

        for (i, cell) in self.cells.iter_mut().enumerate() {
            cell.locked = i >= self.unlocked_cells;
            if cell.locked {
                cell.active = false;
                self.active.remove(&(cell.x, cell.y));
                continue;
            }

            cell.phase += phase_step;
            cell.energy = 0.8 + 0.5 * (seconds + cell.phase).sin();

            // atomic number 0 would be a modulus by zero; leave activation as is
            if atomic_number == 0 {
                continue;
            }
            let key = cell.x as u64 + cell.y as u64 + tick;
            cell.active = key % atomic_number as u64 == 0;
            if cell.active {
                self.active.insert((cell.x, cell.y));
            } else {
                self.active.remove(&(cell.x, cell.y));
            }
        }
    }

    /// Fraction of all cells currently active, in `[0, 1]`.
    pub fn grid_factor(&self) -> f64 {
        self.active.len() as f64 / self.cells.len() as f64
    }

    pub fn active_cells(&self) -> &BTreeSet<(u32, u32)> {
        &self.active
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn unlocked_cells(&self) -> usize {
        self.unlocked_cells
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pulse_phase(&self) -> f64 {
        self.pulse_phase
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn toggle_overlay(&mut self) {
        self.alpha = if self.alpha > 0 { 0 } else { GRID_ALPHA };
    }
}
