//! Life simulation: energy balance and alive/dead transitions.
//!
//! ```text
//!   cost    = decay_rate · dt            (× movement_multiplier while moving)
//!   gain    = gain_rate · (light − threshold) · efficiency · dt   if light > threshold
//!   energy  = clamp(energy − cost + gain, 0, 100)
//! ```
//!
//! Death stops behaviour, not bookkeeping: a dead robot keeps decaying and
//! keeps absorbing light, and comes back the moment energy rises above
//! zero, with its alive timer restarted.

use crate::genome::Genome;

pub const MAX_ENERGY: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeParams {
    /// Energy lost per second at rest.
    pub decay_rate: f32,
    /// Cost multiplier while the wheels are turning.
    pub movement_multiplier: f32,
    /// Energy per second per unit of light above the threshold.
    pub gain_rate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyState {
    pub energy: f32,
    pub alive: bool,
    /// Uptime (ms) at which the current life began.
    pub alive_since_ms: u64,
}

impl EnergyState {
    pub fn alive_time_ms(&self, now_ms: u64) -> u64 {
        if self.alive {
            now_ms.saturating_sub(self.alive_since_ms)
        } else {
            0
        }
    }
}

/// What happened to the alive flag during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeTransition {
    Died,
    Revived,
}

pub struct LifeModel {
    state: EnergyState,
    params: LifeParams,
}

impl LifeModel {
    pub fn new(params: LifeParams, now_ms: u64) -> Self {
        Self {
            state: EnergyState {
                energy: MAX_ENERGY,
                alive: true,
                alive_since_ms: now_ms,
            },
            params,
        }
    }

    /// Advance the energy balance by `dt_secs`.
    ///
    /// Inputs are expected pre-clamped (`dt_secs ≥ 0`, light in [0, 1]).
    pub fn tick(
        &mut self,
        dt_secs: f32,
        ambient_light: f32,
        is_moving: bool,
        genome: &Genome,
        now_ms: u64,
    ) -> EnergyState {
        let mut cost = self.params.decay_rate * dt_secs;
        if is_moving {
            cost *= self.params.movement_multiplier;
        }
        let mut energy = self.state.energy - cost;

        if ambient_light > genome.light_threshold {
            energy += self.params.gain_rate
                * (ambient_light - genome.light_threshold)
                * genome.efficiency
                * dt_secs;
        }
        self.state.energy = energy.clamp(0.0, MAX_ENERGY);

        if self.state.alive && self.state.energy <= 0.0 {
            self.state.alive = false;
        } else if !self.state.alive && self.state.energy > 0.0 {
            self.state.alive = true;
            self.state.alive_since_ms = now_ms;
        }
        self.state
    }

    /// Like [`tick`](Self::tick) but also reports an alive flip.
    pub fn tick_with_transition(
        &mut self,
        dt_secs: f32,
        ambient_light: f32,
        is_moving: bool,
        genome: &Genome,
        now_ms: u64,
    ) -> (EnergyState, Option<LifeTransition>) {
        let was_alive = self.state.alive;
        let state = self.tick(dt_secs, ambient_light, is_moving, genome, now_ms);
        let transition = match (was_alive, state.alive) {
            (true, false) => Some(LifeTransition::Died),
            (false, true) => Some(LifeTransition::Revived),
            _ => None,
        };
        (state, transition)
    }

    /// Full energy, alive, timer restarted.
    pub fn reset(&mut self, now_ms: u64) {
        self.state = EnergyState {
            energy: MAX_ENERGY,
            alive: true,
            alive_since_ms: now_ms,
        };
    }

    pub fn set_params(&mut self, params: LifeParams) {
        self.params = params;
    }

    pub fn params(&self) -> &LifeParams {
        &self.params
    }

    pub fn state(&self) -> EnergyState {
        self.state
    }

    /// Overwrite the energy level directly.
    pub fn set_energy(&mut self, energy: f32) {
        self.state.energy = energy.clamp(0.0, MAX_ENERGY);
    }
}
