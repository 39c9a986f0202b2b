use crate::element::ElementRecord;
use rand::Rng;
use serde::Serialize;
use std::f32::consts::PI;

pub const DEFAULT_SPAWN_INTERVAL_MS: u64 = 50;
pub const DEFAULT_BATCH_SIZE: usize = 3;
const MIN_SIZE: f32 = 1.0;
const LIFE_DECAY_CHANCE: f64 = 0.1;

#[derive(Debug, Clone, Serialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: [u8; 3],
    pub life: i32,
    pub velocity: [f32; 2],
    #[serde(skip)]
    phase: f32,
    #[serde(skip)]
    freq: f32,
}

impl Particle {
    pub fn spawn<R: Rng>(x: f32, y: f32, element: &ElementRecord, rng: &mut R) -> Self {
        Particle {
            x,
            y,
            size: rng.gen_range(2..=8) as f32,
            color: particle_color(element),
            life: rng.gen_range(50..=150),
            velocity: [rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0)],
            phase: rng.gen_range(0.0..2.0 * PI),
            freq: rng.gen_range(0.01..0.05),
        }
    }

    fn update<R: Rng>(&mut self, rng: &mut R) {
        self.phase += self.freq;
        let wobble = self.phase.sin() * 0.5 + 0.5;

        self.x += self.velocity[0] * (0.5 + wobble);
        self.y += self.velocity[1] * (0.5 + wobble);

        // uneven fade: life only drops on some ticks
        if rng.gen_bool(LIFE_DECAY_CHANCE) {
            self.life -= rng.gen_range(1..=3);
        }

        self.size = (self.size + (self.phase * 2.0).sin() * 0.3).max(MIN_SIZE);
    }

    /// Opacity for fade-out rendering.
    pub fn alpha(&self) -> u8 {
        (self.life.max(0) * 2).min(255) as u8
    }

    pub fn is_expired(&self) -> bool {
        self.life <= 0
    }
}

/// Particle color for `element`, fixed at spawn time.
pub fn particle_color(element: &ElementRecord) -> [u8; 3] {
    let en = element.electronegativity_or_default();
    let mass = element.atomic_mass_or_default();
    let r = en * 80.0;
    let g = 50.0 + (element.atomic_number % 10) as f64 * 20.0;
    let b = 100.0 + (mass % 100.0).floor();
    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

fn clamp_channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

pub struct ParticleField {
    particles: Vec<Particle>,
    last_spawn: Option<u64>,
    spawn_interval_ms: u64,
    batch_size: usize,
}

impl ParticleField {
    pub fn new(spawn_interval_ms: u64, batch_size: usize) -> Self {
        ParticleField {
            particles: Vec::new(),
            last_spawn: None,
            spawn_interval_ms,
            batch_size,
        }
    }

    /// Emits a batch around `center` once the spawn interval has elapsed.
    /// Returns the number of particles added.
    pub fn spawn_tick<R: Rng>(
        &mut self,
        now: u64,
        center: (f32, f32),
        element: &ElementRecord,
        rng: &mut R,
    ) -> usize {
        let due = match self.last_spawn {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.spawn_interval_ms,
        };
        if !due {
            return 0;
        }

        for _ in 0..self.batch_size {
            let angle = rng.gen_range(0.0..2.0 * PI);
            let radius = rng.gen_range(30..=100) as f32;
            let x = center.0 + angle.cos() * radius;
            let y = center.1 + angle.sin() * radius;
            self.particles.push(Particle::spawn(x, y, element, rng));
        }
        self.last_spawn = Some(now);
        self.batch_size
    }

    /// Advances every particle one tick and drops the expired ones.
    pub fn advance_all<R: Rng>(&mut self, rng: &mut R) {
        self.particles.retain_mut(|p| {
            p.update(rng);
            !p.is_expired()
        });
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_spawn_cadence() {
        let mut rng = rng();
        let mut field = ParticleField::new(DEFAULT_SPAWN_INTERVAL_MS, DEFAULT_BATCH_SIZE);
        let e = ElementRecord::hydrogen();
        assert_eq!(field.spawn_tick(0, (512.0, 384.0), &e, &mut rng), 3);
        assert_eq!(field.spawn_tick(49, (512.0, 384.0), &e, &mut rng), 0);
        assert_eq!(field.spawn_tick(50, (512.0, 384.0), &e, &mut rng), 3);
        assert_eq!(field.spawn_tick(60, (512.0, 384.0), &e, &mut rng), 0);
        assert_eq!(field.len(), 6);
    }

    #[test]
    fn test_spawn_ring_around_center() {
        let mut rng = rng();
        let mut field = ParticleField::new(50, 20);
        field.spawn_tick(0, (100.0, -50.0), &ElementRecord::hydrogen(), &mut rng);
        for p in field.particles() {
            let d = ((p.x - 100.0).powi(2) + (p.y + 50.0).powi(2)).sqrt();
            assert!((29.9..=100.1).contains(&d), "distance {d}");
            assert!((2.0..=8.0).contains(&p.size));
            assert!((50..=150).contains(&p.life));
            assert!(p.velocity.iter().all(|v| (-2.0..2.0).contains(v)));
        }
    }

    #[test]
    fn test_advance_on_empty_field() {
        let mut field = ParticleField::new(DEFAULT_SPAWN_INTERVAL_MS, DEFAULT_BATCH_SIZE);
        field.advance_all(&mut rng());
        assert_eq!(field.len(), 0);
    }

    #[test]
    fn test_life_is_non_increasing_and_expired_are_removed() {
        let mut rng = rng();
        let mut field = ParticleField::new(50, 1);
        field.spawn_tick(0, (0.0, 0.0), &ElementRecord::hydrogen(), &mut rng);
        field.particles[0].life = 2;

        let mut last_life = 2;
        for _ in 0..10_000 {
            field.advance_all(&mut rng);
            match field.particles().first() {
                Some(p) => {
                    assert!(p.life <= last_life);
                    assert!(p.life > 0);
                    last_life = p.life;
                }
                None => return,
            }
        }
        panic!("particle never expired");
    }

    #[test]
    fn test_size_stays_above_floor() {
        let mut rng = rng();
        let mut field = ParticleField::new(50, 10);
        field.spawn_tick(0, (0.0, 0.0), &ElementRecord::hydrogen(), &mut rng);
        for p in &mut field.particles {
            p.size = 1.0;
            p.life = i32::MAX;
        }
        for _ in 0..500 {
            field.advance_all(&mut rng);
            assert!(field.particles().iter().all(|p| p.size >= 1.0));
        }
    }

    #[test]
    fn test_color_from_element() {
        // Hydrogen: en 2.2 -> 176, 50 + 1*20 = 70, 100 + floor(1.008) = 101
        assert_eq!(particle_color(&ElementRecord::hydrogen()), [176, 70, 101]);

        let mut f = ElementRecord::new(9, "F", "Fluorine");
        f.electronegativity = Some(3.98);
        f.atomic_mass = Some(18.998);
        // 3.98 * 80 = 318.4 clamps to 255; 50 + 9*20 = 230; 100 + 18
        assert_eq!(particle_color(&f), [255, 230, 118]);
    }

    #[test]
    fn test_color_defaults_for_missing_properties() {
        let mut e = ElementRecord::new(18, "Ar", "Argon");
        e.atomic_mass = Some(-3.0);
        assert_eq!(particle_color(&e), [80, 210, 101]);

        let mut heavy = ElementRecord::new(80, "Hg", "Mercury");
        heavy.electronegativity = Some(2.0);
        heavy.atomic_mass = Some(200.59);
        assert_eq!(particle_color(&heavy), [160, 50, 100]);
    }

    #[test]
    fn test_color_fixed_at_spawn() {
        let mut rng = rng();
        let mut field = ParticleField::new(50, 1);
        field.spawn_tick(0, (0.0, 0.0), &ElementRecord::hydrogen(), &mut rng);
        let color = field.particles()[0].color;
        field.particles[0].life = i32::MAX;
        let mut other = ElementRecord::new(6, "C", "Carbon");
        other.electronegativity = Some(2.55);
        field.spawn_tick(100, (0.0, 0.0), &other, &mut rng);
        field.advance_all(&mut rng);
        assert_eq!(field.particles()[0].color, color);
        assert_ne!(field.particles()[1].color, color);
    }

    #[test]
    fn test_alpha_fades_with_life() {
        let mut p = Particle::spawn(0.0, 0.0, &ElementRecord::hydrogen(), &mut rng());
        p.life = 200;
        assert_eq!(p.alpha(), 255);
        p.life = 40;
        assert_eq!(p.alpha(), 80);
        p.life = -3;
        assert_eq!(p.alpha(), 0);
    }
}
