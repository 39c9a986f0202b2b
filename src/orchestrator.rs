//! Per-tick driver tying the generative layers to one clock and one selected
//! element.
//!
//! Tick order: clock, background, grid, grid factor, orbital layout,
//! transition timer, particles. Element changes synthesize exactly one tone
//! and hand it to the [`ToneSink`] without waiting on playback.

use crate::background::{Background, BackgroundView};
use crate::catalog::ElementCatalog;
use crate::config::EngineConfig;
use crate::element::ElementRecord;
use crate::grid::UnlockGrid;
use crate::orbital::{self, NucleusStyle, OrbitalPosition};
use crate::particles::ParticleField;
use crate::tone::{ToneBuffer, ToneSynthesizer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;

/// Discrete user commands.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AdvanceNext,
    AdvancePrevious,
    ToggleInfo,
    ToggleOrbitals,
    ToggleElectrons,
    ToggleGridOverlay,
    CycleBackground,
    ResetView,
    Zoom { delta: f32 },
    Pan { dx: f32, dy: f32 },
}

/// Receives finished tones. Playback is the receiver's business.
pub trait ToneSink {
    fn play(&mut self, tone: ToneBuffer);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub show_info: bool,
    pub show_orbitals: bool,
    pub show_electrons: bool,
    pub zoom: f32,
    pub pan: [f32; 2],
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            show_info: true,
            show_orbitals: true,
            show_electrons: true,
            zoom: 1.0,
            pan: [0.0, 0.0],
        }
    }
}

impl ViewState {
    fn zoom_by(&mut self, delta: f32) {
        let factor = if delta > 0.0 {
            1.1
        } else if delta < 0.0 {
            0.9
        } else {
            return;
        };
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = [0.0, 0.0];
    }
}

/// Bounded overlay effect started on every element change.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    elapsed_ms: u64,
    duration_ms: u64,
    active: bool,
}

impl Transition {
    pub fn new(duration_ms: u64) -> Self {
        Transition {
            elapsed_ms: 0,
            duration_ms: duration_ms.max(1),
            active: false,
        }
    }

    pub fn start(&mut self) {
        self.elapsed_ms = 0;
        self.active = true;
    }

    pub fn update(&mut self, dt_ms: u64) {
        if self.active {
            self.elapsed_ms += dt_ms;
            if self.elapsed_ms >= self.duration_ms {
                self.active = false;
            }
        }
    }

    /// Progress in `[0, 1)` while running.
    pub fn progress(&self) -> Option<f32> {
        self.active
            .then(|| self.elapsed_ms as f32 / self.duration_ms as f32)
    }
}

/// Everything the orchestrator owns that is not a generative layer.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub clock_ms: u64,
    pub element_index: usize,
    /// Highest atomic number reached by stepping forward.
    pub progression: u32,
    pub view: ViewState,
    pub screen: (u32, u32),
}

pub struct Orchestrator<S: ToneSink> {
    catalog: ElementCatalog,
    ctx: SessionContext,
    background: Background,
    grid: UnlockGrid,
    particles: ParticleField,
    synth: ToneSynthesizer,
    sink: S,
    transition: Transition,
    orbitals: Vec<OrbitalPosition>,
    grid_factor: f64,
    tones_synthesized: u64,
    rng: StdRng,
}

impl<S: ToneSink> Orchestrator<S> {
    pub fn new(catalog: ElementCatalog, config: &EngineConfig, sink: S) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let grid = UnlockGrid::with_rng(config.grid_width, config.grid_height, &mut rng);
        let ctx = SessionContext {
            clock_ms: 0,
            element_index: catalog.hydrogen_index(),
            progression: 0,
            view: ViewState::default(),
            screen: (config.screen_width, config.screen_height),
        };
        Orchestrator {
            catalog,
            ctx,
            background: Background::new(config.screen_width, config.screen_height),
            grid,
            particles: ParticleField::new(config.spawn_interval_ms, config.spawn_batch),
            synth: ToneSynthesizer::new(config.sample_rate, config.volume),
            sink,
            transition: Transition::new(config.transition_ms),
            orbitals: Vec::new(),
            grid_factor: 0.0,
            tones_synthesized: 0,
            rng,
        }
    }

    /// Advances the clock by `dt_ms` and updates every layer once.
    pub fn tick(&mut self, dt_ms: u64) {
        self.ctx.clock_ms += dt_ms;
        let now = self.ctx.clock_ms;
        let center = self.center();
        let element = &self.catalog.records()[self.ctx.element_index];

        self.background.update();
        self.grid.update(element, now);
        self.grid_factor = self.grid.grid_factor();
        self.orbitals = orbital::compute(element.atomic_number, now, self.grid_factor);
        self.transition.update(dt_ms);

        self.particles.spawn_tick(now, center, element, &mut self.rng);
        self.particles.advance_all(&mut self.rng);
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::AdvanceNext => self.advance(Direction::Next),
            Command::AdvancePrevious => self.advance(Direction::Previous),
            Command::ToggleGridOverlay => self.grid.toggle_overlay(),
            Command::CycleBackground => self.background.cycle(),
            Command::ToggleInfo => self.ctx.view.show_info = !self.ctx.view.show_info,
            Command::ToggleOrbitals => self.ctx.view.show_orbitals = !self.ctx.view.show_orbitals,
            Command::ToggleElectrons => {
                self.ctx.view.show_electrons = !self.ctx.view.show_electrons
            }
            Command::ResetView => self.ctx.view.reset(),
            Command::Zoom { delta } => self.ctx.view.zoom_by(delta),
            Command::Pan { dx, dy } => {
                self.ctx.view.pan[0] += dx;
                self.ctx.view.pan[1] += dy;
            }
        }
    }

    /// Steps one element in `direction`, wrapping at both ends.
    pub fn advance(&mut self, direction: Direction) {
        let index = self.ctx.element_index;
        let next = match direction {
            Direction::Next => self.catalog.next_index(index),
            Direction::Previous => self.catalog.previous_index(index),
        };
        self.ctx.element_index = next;

        let element = &self.catalog.records()[next];
        if direction == Direction::Next {
            self.ctx.progression = self.ctx.progression.max(element.atomic_number);
        }
        log::info!(
            "Element {} ({}) selected",
            element.atomic_number,
            element.symbol
        );

        let tone = self.synth.synthesize(element);
        log::debug!(
            "Tone {:?} {:.1} Hz, {} frames",
            tone.spec.waveform,
            tone.spec.frequency,
            tone.frames.len()
        );
        self.tones_synthesized += 1;
        self.sink.play(tone);
        self.transition.start();
    }

    /// Visualization center in screen coordinates, including pan.
    pub fn center(&self) -> (f32, f32) {
        let (w, h) = self.ctx.screen;
        (
            (w / 2) as f32 + self.ctx.view.pan[0],
            (h / 2) as f32 + self.ctx.view.pan[1],
        )
    }

    pub fn current_element(&self) -> &ElementRecord {
        &self.catalog.records()[self.ctx.element_index]
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn grid(&self) -> &UnlockGrid {
        &self.grid
    }

    pub fn grid_factor(&self) -> f64 {
        self.grid_factor
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn tones_synthesized(&self) -> u64 {
        self.tones_synthesized
    }

    /// Share of the catalog unlocked so far by stepping forward.
    pub fn progress(&self) -> f32 {
        self.ctx.progression as f32 / self.catalog.max_atomic_number() as f32
    }

    pub fn status_line(&self) -> String {
        format!(
            "Element {} of {} | Quantum Grid: {}/{} active",
            self.current_element().atomic_number,
            self.catalog.len(),
            self.grid.active_cells().len(),
            self.grid.unlocked_cells()
        )
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let element = self.current_element();
        let now = self.ctx.clock_ms;
        let pulse = self.grid.pulse_phase();

        let cells = self
            .grid
            .cells()
            .iter()
            .filter(|c| !c.locked)
            .map(|c| CellView {
                x: c.x,
                y: c.y,
                color: c.display_color(pulse),
                active: c.active,
            })
            .collect();

        let electrons = self
            .orbitals
            .iter()
            .enumerate()
            .map(|(i, p)| ElectronView {
                x: p.x,
                y: p.y,
                shell: p.shell,
                color: orbital::shell_color(p.shell),
                size: orbital::electron_size(i, p.shell, element.atomic_number, now),
            })
            .collect();

        let particles = self
            .particles
            .particles()
            .iter()
            .map(|p| ParticleView {
                x: p.x,
                y: p.y,
                size: p.size,
                color: p.color,
                alpha: p.alpha(),
            })
            .collect();

        let (cx, cy) = self.center();
        RenderSnapshot {
            time: now,
            element: element.clone(),
            catalog_len: self.catalog.len(),
            progress: self.progress(),
            view: self.ctx.view,
            center: [cx, cy],
            screen: [self.ctx.screen.0, self.ctx.screen.1],
            background: self.background.view(),
            grid: GridView {
                width: self.grid.width(),
                height: self.grid.height(),
                alpha: self.grid.alpha(),
                unlocked_cells: self.grid.unlocked_cells(),
                total_cells: self.grid.total_cells(),
                active_cells: self.grid.active_cells().iter().copied().collect(),
                cells,
            },
            grid_factor: self.grid_factor,
            nucleus: orbital::nucleus_style(element, now, self.grid.active_cells().len()),
            electrons,
            particles,
            transition: self.transition.progress(),
            tones: self.tones_synthesized,
            status: self.status_line(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CellView {
    pub x: u32,
    pub y: u32,
    pub color: [u8; 4],
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridView {
    pub width: u32,
    pub height: u32,
    pub alpha: u8,
    pub unlocked_cells: usize,
    pub total_cells: usize,
    pub active_cells: Vec<(u32, u32)>,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElectronView {
    pub x: f32,
    pub y: f32,
    pub shell: usize,
    pub color: [u8; 3],
    pub size: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: [u8; 3],
    pub alpha: u8,
}

/// Owned, read-only copy of one frame's state for an external renderer.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub time: u64,
    pub element: ElementRecord,
    pub catalog_len: usize,
    pub progress: f32,
    pub view: ViewState,
    pub center: [f32; 2],
    pub screen: [u32; 2],
    pub background: BackgroundView,
    pub grid: GridView,
    pub grid_factor: f64,
    pub nucleus: NucleusStyle,
    pub electrons: Vec<ElectronView>,
    pub particles: Vec<ParticleView>,
    pub transition: Option<f32>,
    /// Element-change counter; a new value means a new tone is available.
    pub tones: u64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::{ToneSpec, Waveform};

    #[derive(Default)]
    struct RecordingSink {
        played: Vec<ToneSpec>,
    }

    impl ToneSink for RecordingSink {
        fn play(&mut self, tone: ToneBuffer) {
            self.played.push(tone.spec);
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            seed: Some(11),
            ..EngineConfig::default()
        }
    }

    fn catalog_of(n: u32) -> ElementCatalog {
        let records = (1..=n)
            .map(|z| ElementRecord::new(z, &format!("E{z}"), &format!("Element {z}")))
            .collect();
        ElementCatalog::from_records(records).unwrap()
    }

    fn orchestrator(n: u32) -> Orchestrator<RecordingSink> {
        Orchestrator::new(catalog_of(n), &config(), RecordingSink::default())
    }

    #[test]
    fn test_starts_on_hydrogen() {
        let o = Orchestrator::new(ElementCatalog::builtin(), &config(), RecordingSink::default());
        assert_eq!(o.current_element().atomic_number, 1);
        assert_eq!(o.tones_synthesized(), 0);
    }

    #[test]
    fn test_navigation_wraps_both_ways() {
        let mut o = orchestrator(5);
        o.apply(Command::AdvancePrevious);
        assert_eq!(o.current_element().atomic_number, 5);
        o.apply(Command::AdvanceNext);
        assert_eq!(o.current_element().atomic_number, 1);
        for _ in 0..4 {
            o.apply(Command::AdvanceNext);
        }
        assert_eq!(o.current_element().atomic_number, 5);
        o.apply(Command::AdvanceNext);
        assert_eq!(o.current_element().atomic_number, 1);
        assert_eq!(o.tones_synthesized(), 7);
        assert_eq!(o.sink.played.len(), 7);
    }

    #[test]
    fn test_hydrogen_only_catalog_self_wraps() {
        let mut o = Orchestrator::new(
            ElementCatalog::hydrogen_only(),
            &config(),
            RecordingSink::default(),
        );
        o.apply(Command::AdvanceNext);
        assert_eq!(o.current_element().atomic_number, 1);
        assert_eq!(o.sink.played.len(), 1);
        assert_eq!(o.sink.played[0].waveform, Waveform::Sine);

        o.tick(16);
        assert_eq!(o.grid().unlocked_cells(), o.grid().total_cells().min(3));
    }

    #[test]
    fn test_sparse_catalog_uses_sorted_order() {
        let records = vec![
            ElementRecord::new(8, "O", "Oxygen"),
            ElementRecord::hydrogen(),
            ElementRecord::new(26, "Fe", "Iron"),
        ];
        let catalog = ElementCatalog::from_records(records).unwrap();
        let mut o = Orchestrator::new(catalog, &config(), RecordingSink::default());
        o.apply(Command::AdvanceNext);
        assert_eq!(o.current_element().atomic_number, 8);
        o.apply(Command::AdvanceNext);
        assert_eq!(o.current_element().atomic_number, 26);
        o.apply(Command::AdvanceNext);
        assert_eq!(o.current_element().atomic_number, 1);
        let waves: Vec<Waveform> = o.sink.played.iter().map(|t| t.waveform).collect();
        assert_eq!(waves, vec![Waveform::Triangle, Waveform::Sawtooth, Waveform::Sine]);
    }

    #[test]
    fn test_ticks_do_not_synthesize() {
        let mut o = orchestrator(3);
        for _ in 0..120 {
            o.tick(16);
        }
        assert_eq!(o.tones_synthesized(), 0);
        assert_eq!(o.context().clock_ms, 1_920);
    }

    #[test]
    fn test_grid_factor_feeds_orbitals() {
        let mut o = orchestrator(3);
        o.tick(16);
        // hydrogen activates all three unlocked cells
        assert_eq!(o.grid().active_cells().len(), 3);
        assert_eq!(o.grid_factor(), 3.0 / 80.0);
        assert_eq!(o.orbitals.as_slice(), orbital::compute(1, 16, 3.0 / 80.0).as_slice());
    }

    #[test]
    fn test_grid_follows_element_changes() {
        let mut o = orchestrator(12);
        for _ in 0..9 {
            o.apply(Command::AdvanceNext);
        }
        o.tick(16);
        assert_eq!(o.grid().unlocked_cells(), 12);
        for _ in 0..7 {
            o.apply(Command::AdvancePrevious);
        }
        o.tick(16);
        assert_eq!(o.grid().unlocked_cells(), 5);
    }

    #[test]
    fn test_particles_spawn_on_ticks() {
        let mut o = orchestrator(2);
        o.tick(16);
        assert_eq!(o.particles().len(), 3);
        o.tick(16);
        assert_eq!(o.particles().len(), 3);
        o.tick(40);
        assert_eq!(o.particles().len(), 6);
    }

    #[test]
    fn test_view_commands() {
        let mut o = orchestrator(2);
        o.apply(Command::ToggleInfo);
        o.apply(Command::ToggleOrbitals);
        o.apply(Command::ToggleElectrons);
        let v = o.context().view;
        assert!(!v.show_info && !v.show_orbitals && !v.show_electrons);

        for _ in 0..20 {
            o.apply(Command::Zoom { delta: 1.0 });
        }
        assert_eq!(o.context().view.zoom, MAX_ZOOM);
        for _ in 0..20 {
            o.apply(Command::Zoom { delta: -3.0 });
        }
        assert_eq!(o.context().view.zoom, MIN_ZOOM);
        o.apply(Command::Zoom { delta: 0.0 });
        assert_eq!(o.context().view.zoom, MIN_ZOOM);

        o.apply(Command::Pan { dx: 5000.0, dy: -20.0 });
        o.apply(Command::Pan { dx: 1.0, dy: 1.0 });
        assert_eq!(o.context().view.pan, [5001.0, -19.0]);
        assert_eq!(o.center(), (512.0 + 5001.0, 384.0 - 19.0));

        o.apply(Command::ResetView);
        assert_eq!(o.context().view.zoom, 1.0);
        assert_eq!(o.context().view.pan, [0.0, 0.0]);
        assert!(!o.context().view.show_info);

        o.apply(Command::ToggleGridOverlay);
        assert_eq!(o.grid().alpha(), 0);
        assert_eq!(o.tones_synthesized(), 0);
    }

    #[test]
    fn test_transition_runs_after_element_change() {
        let mut o = orchestrator(2);
        assert_eq!(o.transition.progress(), None);
        o.apply(Command::AdvanceNext);
        assert_eq!(o.transition.progress(), Some(0.0));
        o.tick(500);
        assert_eq!(o.transition.progress(), Some(0.5));
        o.tick(500);
        assert_eq!(o.transition.progress(), None);
    }

    #[test]
    fn test_advance_directions() {
        let mut o = orchestrator(3);
        o.advance(Direction::Previous);
        assert_eq!(o.current_element().atomic_number, 3);
        assert_eq!(o.context().progression, 0);
        o.advance(Direction::Next);
        o.advance(Direction::Next);
        assert_eq!(o.current_element().atomic_number, 2);
        assert_eq!(o.context().progression, 2);
        assert_eq!(o.sink.played.len(), 3);
    }

    #[test]
    fn test_background_scrolls_and_cycles() {
        let mut o = orchestrator(2);
        o.tick(16);
        o.tick(16);
        let bg = o.snapshot().background;
        assert_eq!(bg.offset[0], 1.0);
        assert!((bg.offset[1] - 0.7).abs() < 1e-6);
        assert!((bg.distortion - 0.04).abs() < 1e-6);
        assert_eq!(bg.layer, 0);

        o.apply(Command::CycleBackground);
        assert_eq!(o.snapshot().background.layer, 1);
        assert_eq!(o.tones_synthesized(), 0);
    }

    #[test]
    fn test_progression_tracks_forward_steps() {
        let mut o = orchestrator(4);
        o.apply(Command::AdvanceNext);
        o.apply(Command::AdvanceNext);
        o.apply(Command::AdvancePrevious);
        assert_eq!(o.context().progression, 3);
        assert_eq!(o.progress(), 0.75);
        o.apply(Command::AdvancePrevious);
        o.apply(Command::AdvancePrevious);
        assert_eq!(o.context().progression, 3);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut o = Orchestrator::new(ElementCatalog::builtin(), &config(), RecordingSink::default());
        o.apply(Command::AdvanceNext);
        o.tick(16);
        let snap = o.snapshot();
        assert_eq!(snap.element.symbol, "He");
        assert_eq!(snap.electrons.len(), 2);
        assert_eq!(snap.grid.cells.len(), 4);
        assert_eq!(snap.grid.unlocked_cells, 4);
        assert_eq!(snap.particles.len(), 3);
        assert_eq!(snap.status, o.status_line());
        assert!(snap.status.starts_with("Element 2 of 20"));

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["view"]["zoom"], 1.0);
        assert!(json["grid"]["active_cells"].is_array());
    }

    #[test]
    fn test_command_json() {
        let cmd: Command = serde_json::from_str(r#"{"type":"advance_next"}"#).unwrap();
        assert_eq!(cmd, Command::AdvanceNext);
        let cmd: Command = serde_json::from_str(r#"{"type":"pan","dx":3,"dy":-4.5}"#).unwrap();
        assert_eq!(cmd, Command::Pan { dx: 3.0, dy: -4.5 });
        let cmd: Command = serde_json::from_str(r#"{"type":"cycle_background"}"#).unwrap();
        assert_eq!(cmd, Command::CycleBackground);
        assert!(serde_json::from_str::<Command>(r#"{"type":"explode"}"#).is_err());
    }
}
