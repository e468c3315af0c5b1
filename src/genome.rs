//! Per-unit behavioural genome.
//!
//! The genome is the persisted record of traits that make one EMBER unit
//! behave differently from its siblings.  It changes only through explicit
//! operator commands (`set`, `mutate`, `randomize`), each followed by a
//! persist.  The control loop only ever reads it.
//!
//! | Gene               | Range          | Meaning                              |
//! |--------------------|----------------|--------------------------------------|
//! | `light_threshold`  | 0.01 – 1.0     | light needed before energy is gained |
//! | `efficiency`       | 0.5 – 2.0      | how well excess light becomes energy |
//! | `turn_sensitivity` | 50 – 2000      | steering gain while seeking light    |
//! | `base_speed`       | 50 – 255       | default wheel speed                  |

use core::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{GenomePort, RandomSource};
use crate::config::clamp_f32;

pub const LIGHT_THRESHOLD_RANGE: (f32, f32) = (0.01, 1.0);
pub const EFFICIENCY_RANGE: (f32, f32) = (0.5, 2.0);
pub const TURN_SENSITIVITY_RANGE: (f32, f32) = (50.0, 2000.0);
pub const BASE_SPEED_RANGE: (u8, u8) = (50, 255);

/// Largest single-step perturbation applied by [`Genome::mutate`].
pub const MUTATION_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub light_threshold: f32,
    pub efficiency: f32,
    pub turn_sensitivity: f32,
    pub base_speed: u8,
    /// Fleet number, 0–8.
    pub bot_id: u8,
    /// Incremented on every mutation; a full re-roll starts over at 0.
    pub generation: u32,
}

/// The genes reachable by name from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenomeField {
    LightThreshold,
    Efficiency,
    TurnSensitivity,
    BaseSpeed,
}

impl GenomeField {
    pub const ALL: [Self; 4] = [
        Self::LightThreshold,
        Self::Efficiency,
        Self::TurnSensitivity,
        Self::BaseSpeed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LightThreshold => "light_threshold",
            Self::Efficiency => "efficiency",
            Self::TurnSensitivity => "turn_sensitivity",
            Self::BaseSpeed => "base_speed",
        }
    }
}

impl FromStr for GenomeField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light_threshold" | "threshold" => Ok(Self::LightThreshold),
            "efficiency" => Ok(Self::Efficiency),
            "turn_sensitivity" | "sensitivity" => Ok(Self::TurnSensitivity),
            "base_speed" | "speed" => Ok(Self::BaseSpeed),
            _ => Err(()),
        }
    }
}

impl Genome {
    /// Roll a fresh genome for fleet member `bot_id`.
    pub fn random(rng: &mut impl RandomSource, bot_id: u8) -> Self {
        let mut g = Self {
            light_threshold: 0.0,
            efficiency: 0.0,
            turn_sensitivity: 0.0,
            base_speed: 0,
            bot_id,
            generation: 0,
        };
        g.reroll(rng);
        g
    }

    /// Copy with every gene clamped into its declared range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            light_threshold: clamp_f32(self.light_threshold, LIGHT_THRESHOLD_RANGE.0, LIGHT_THRESHOLD_RANGE.1),
            efficiency: clamp_f32(self.efficiency, EFFICIENCY_RANGE.0, EFFICIENCY_RANGE.1),
            turn_sensitivity: clamp_f32(
                self.turn_sensitivity,
                TURN_SENSITIVITY_RANGE.0,
                TURN_SENSITIVITY_RANGE.1,
            ),
            base_speed: self.base_speed.clamp(BASE_SPEED_RANGE.0, BASE_SPEED_RANGE.1),
            ..self
        }
    }

    /// Small random nudge of the energy genes, then `generation += 1`.
    pub fn mutate(&mut self, rng: &mut impl RandomSource) {
        self.light_threshold += perturbation(rng);
        self.efficiency += perturbation(rng);
        self.generation = self.generation.wrapping_add(1);
        *self = self.clamped();
    }

    /// Full re-roll of every gene.  Keeps the fleet number, resets the
    /// generation counter.
    pub fn randomize(&mut self, rng: &mut impl RandomSource) {
        self.reroll(rng);
        self.generation = 0;
    }

    fn reroll(&mut self, rng: &mut impl RandomSource) {
        self.light_threshold = rng.range_i32(10, 500) as f32 / 1000.0;
        self.efficiency = 0.75 + rng.range_i32(0, 100) as f32 / 100.0;
        self.turn_sensitivity = (200 + rng.range_i32(0, 600)) as f32;
        self.base_speed = (150 + rng.range_i32(0, 100)) as u8;
        *self = self.clamped();
    }

    pub fn get(&self, field: GenomeField) -> f32 {
        match field {
            GenomeField::LightThreshold => self.light_threshold,
            GenomeField::Efficiency => self.efficiency,
            GenomeField::TurnSensitivity => self.turn_sensitivity,
            GenomeField::BaseSpeed => f32::from(self.base_speed),
        }
    }

    /// Set one gene by name.  Out-of-range values land on the nearest bound.
    pub fn set(&mut self, field: GenomeField, value: f32) {
        match field {
            GenomeField::LightThreshold => self.light_threshold = value,
            GenomeField::Efficiency => self.efficiency = value,
            GenomeField::TurnSensitivity => self.turn_sensitivity = value,
            GenomeField::BaseSpeed => {
                let v = clamp_f32(value, f32::from(BASE_SPEED_RANGE.0), f32::from(BASE_SPEED_RANGE.1));
                self.base_speed = v.round() as u8;
            }
        }
        *self = self.clamped();
    }
}

/// Uniform step in `[-MUTATION_STEP, MUTATION_STEP)`.
fn perturbation(rng: &mut impl RandomSource) -> f32 {
    rng.range_i32(-100, 100) as f32 / 2000.0
}

/// Load the persisted genome or, if it is absent or unreadable, roll a new
/// one and persist it before returning.  Never fails: a storage fault only
/// means the fresh genome lives for this session.
pub fn load_or_create(
    store: &impl GenomePort,
    rng: &mut impl RandomSource,
    bot_id: u8,
) -> Genome {
    match store.load_genome() {
        Ok(Some(g)) => {
            let g = g.clamped();
            info!(
                "Genome loaded: bot={} gen={} thr={:.3} eff={:.2}",
                g.bot_id, g.generation, g.light_threshold, g.efficiency
            );
            return g;
        }
        Ok(None) => info!("No stored genome, rolling a new one"),
        Err(e) => warn!("Stored genome unreadable ({}), rolling a new one", e),
    }

    let g = Genome::random(rng, bot_id);
    if let Err(e) = store.save_genome(&g) {
        warn!("Failed to persist new genome: {}", e);
    }
    g
}
