//! Element records as read from the periodic table data.
//!
//! Optional physical properties stay `None` when the source table has no
//! value (or an explicit `null`); the `*_or_default` resolvers are the only
//! place where fallbacks are substituted.
use serde::{Deserialize, Serialize};

pub const DEFAULT_ELECTRONEGATIVITY: f64 = 1.0;
pub const DEFAULT_ATOMIC_MASS: f64 = 1.0;
pub const DEFAULT_GYROMAGNETIC_RATIO: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmrData {
    #[serde(default)]
    pub spin: Option<String>,
    #[serde(default)]
    pub gyromagnetic_ratio: Option<f64>,
    #[serde(default)]
    pub chemical_shift: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub atomic_number: u32,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub atomic_mass: Option<f64>,
    #[serde(default)]
    pub electronegativity: Option<f64>,
    #[serde(default)]
    pub melting_point: Option<f64>,
    #[serde(default)]
    pub boiling_point: Option<f64>,
    #[serde(default)]
    pub density: Option<f64>,
    #[serde(default)]
    pub nmr_data: Option<NmrData>,
}

impl ElementRecord {
    /// Bare record with only the identifying fields set.
    pub fn new(atomic_number: u32, symbol: &str, name: &str) -> Self {
        ElementRecord {
            atomic_number,
            symbol: symbol.to_string(),
            name: name.to_string(),
            atomic_mass: None,
            electronegativity: None,
            melting_point: None,
            boiling_point: None,
            density: None,
            nmr_data: None,
        }
    }

    pub fn hydrogen() -> Self {
        ElementRecord {
            atomic_mass: Some(1.008),
            electronegativity: Some(2.20),
            melting_point: Some(14.01),
            boiling_point: Some(20.28),
            density: Some(0.00008988),
            nmr_data: Some(NmrData {
                spin: Some("1/2".to_string()),
                gyromagnetic_ratio: Some(26.752),
                chemical_shift: Some("0.0".to_string()),
            }),
            ..ElementRecord::new(1, "H", "Hydrogen")
        }
    }

    /// Electronegativity, or 1.0 when absent or non-positive.
    ///
    /// Non-positive values would stall the grid phase and zero the particle
    /// red channel, so they resolve to the default as well.
    pub fn electronegativity_or_default(&self) -> f64 {
        match self.electronegativity {
            Some(en) if en.is_finite() && en > 0.0 => en,
            _ => DEFAULT_ELECTRONEGATIVITY,
        }
    }

    /// Atomic mass, or 1.0 when absent or non-positive.
    pub fn atomic_mass_or_default(&self) -> f64 {
        match self.atomic_mass {
            Some(mass) if mass.is_finite() && mass > 0.0 => mass,
            _ => DEFAULT_ATOMIC_MASS,
        }
    }

    /// NMR gyromagnetic ratio, or 10.0 when the element has no NMR data.
    pub fn gyromagnetic_ratio_or_default(&self) -> f64 {
        self.nmr_data
            .as_ref()
            .and_then(|nmr| nmr.gyromagnetic_ratio)
            .filter(|g| g.is_finite())
            .unwrap_or(DEFAULT_GYROMAGNETIC_RATIO)
    }
}
