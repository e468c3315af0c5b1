//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the sensor filters, the life model, the arbiter's
//! inputs, the avoidance FSM and the motion ramp.  All I/O flows through
//! port traits injected at call sites, making the entire service testable
//! with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌─────────────────────────────────┐ ──▶ EventSink
//!                 │           AppService            │
//! ActuatorPort ◀──│ filters · life · arbiter · FSM  │ ◀── AppCommand
//!                 │          · motion ramp          │
//!                 └─────────────────────────────────┘
//! ```
//!
//! One [`tick`](AppService::tick) is one control cycle.  Sensors are read
//! before behaviour is decided and behaviour is decided before wheels are
//! commanded; nothing inside a tick blocks.

use log::{info, warn};

use crate::behavior::BehaviorState;
use crate::behavior::arbiter::{self, ArbiterInput, IdleReason, Selection};
use crate::behavior::seeking;
use crate::config::{self, RobotConfig};
use crate::control::motion::{MotionCommand, MotionController, MotionProfile, WheelCommand};
use crate::drivers::led_patterns::{self as led, LedPatternEngine, PatternId, Rgb};
use crate::error::{CommandError, Error, Result};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{AvoidPhase, Fsm};
use crate::genome::Genome;
use crate::life::{LifeModel, LifeParams, LifeTransition};
use crate::power::{BatteryMonitor, PowerMode};
use crate::sensors::SensorHub;
use crate::sensors::distance::DistanceLimits;

use super::commands::{AppCommand, Tunable};
use super::events::{AppEvent, CommandReply, StatusSnapshot};
use super::ports::{ActuatorPort, ConfigPort, EventSink, GenomePort, RandomSource, SensorPort, Side};

/// Quiet period after the last config edit before it is flushed to flash.
const AUTO_SAVE_DELAY_MS: u64 = 5_000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<R: RandomSource> {
    config: RobotConfig,
    genome: Genome,
    rng: R,

    sensors: SensorHub,
    life: LifeModel,
    /// Session-only decay rate (`set energy_decay`); never persisted.
    energy_decay: f32,
    battery: BatteryMonitor,

    fsm: Fsm,
    ctx: FsmContext,
    motion: MotionController,
    leds: LedPatternEngine,

    behavior: BehaviorState,
    override_idle: bool,
    /// End of the last avoidance maneuver, for the re-trigger cooldown.
    last_avoid_end_ms: Option<u64>,

    last_tick_ms: u64,
    last_telemetry_ms: u64,
    /// Last values pushed to the hardware, to skip redundant writes.
    last_wheels: Option<WheelCommand>,
    last_led: Option<Rgb>,

    tick_count: u64,
    config_dirty_since: Option<u64>,
}

impl<R: RandomSource> AppService<R> {
    /// Construct the service.  `config` is sanitized on the way in.
    ///
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: RobotConfig, genome: Genome, rng: R, now_ms: u64) -> Self {
        let config = config.sanitized();
        let energy_decay = config.energy_decay_per_s;
        let ctx = FsmContext::new(config.clone());
        let fsm = Fsm::new(build_state_table(), AvoidPhase::None);

        Self {
            sensors: SensorHub::new(DistanceLimits::from(&config)),
            life: LifeModel::new(config.life_params(), now_ms),
            energy_decay,
            battery: BatteryMonitor::new(config.battery_interval_ms),
            fsm,
            ctx,
            motion: MotionController::new(MotionProfile::from(&config)),
            leds: LedPatternEngine::new(),
            behavior: BehaviorState::Idle,
            override_idle: false,
            last_avoid_end_ms: None,
            last_tick_ms: now_ms,
            last_telemetry_ms: now_ms,
            last_wheels: None,
            last_led: None,
            tick_count: 0,
            config_dirty_since: None,
            config,
            genome: genome.clamped(),
            rng,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop the wheels, show the ready colour and announce the start.
    pub fn start(&mut self, now_ms: u64, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.ctx.now_ms = now_ms;
        self.fsm.start(&mut self.ctx);
        self.apply_fsm_motion();
        self.motion.emergency_stop();
        hw.stop_all_wheels();
        self.last_wheels = Some(WheelCommand::STOP);
        hw.set_status_color(led::COLOUR_READY.0, led::COLOUR_READY.1, led::COLOUR_READY.2);
        self.last_led = Some(led::COLOUR_READY);
        self.last_tick_ms = now_ms;
        self.last_telemetry_ms = now_ms;

        sink.emit(&AppEvent::Started {
            bot_id: self.genome.bot_id,
            generation: self.genome.generation,
        });
        info!(
            "AppService started: bot {} generation {}",
            self.genome.bot_id, self.genome.generation
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: battery → sensors → life → arbiter →
    /// behaviour → motion ramp → LED → telemetry.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], avoiding a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let dt_ms = now_ms.saturating_sub(self.last_tick_ms);
        self.last_tick_ms = now_ms;
        let dt_secs = dt_ms as f32 / 1000.0;

        // 1. Battery, on its own slower cadence
        if self.battery.is_due(now_ms) {
            let volts = hw.read_battery_voltage();
            if let Some((from, to)) = self.battery.update(now_ms, volts) {
                sink.emit(&AppEvent::PowerModeChanged { from, to, voltage: volts });
            }
        }
        let power_mode = self.battery.mode();

        // 2. Sensor filters, exactly once per cycle
        let raw_distance = hw.read_distance_cm();
        let light_left = hw.read_light(Side::Left);
        let light_right = hw.read_light(Side::Right);
        let snapshot = self.sensors.sample(raw_distance, light_left, light_right, now_ms);

        // 3. Energy balance
        let life_before = self.life.state();
        let (life, transition) = self.life.tick_with_transition(
            dt_secs,
            snapshot.light.ambient(),
            self.motion.is_moving(),
            &self.genome,
            now_ms,
        );
        match transition {
            Some(LifeTransition::Died) => {
                let alive_time_s = life_before.alive_time_ms(now_ms) / 1000;
                warn!("LIFE: energy depleted after {} s", alive_time_s);
                sink.emit(&AppEvent::Died { alive_time_s });
            }
            Some(LifeTransition::Revived) => {
                info!("LIFE: revived at {:.1} energy", life.energy);
                sink.emit(&AppEvent::Revived);
            }
            None => {}
        }

        // 4. Arbitration
        let selection = arbiter::select(&ArbiterInput {
            override_idle: self.override_idle,
            alive: life.alive,
            maneuver_active: self.fsm.current_state().is_active(),
            obstacle: snapshot.obstacle,
            in_cooldown: self.in_cooldown(now_ms),
            stuck: snapshot.stuck,
            power_mode,
            energy: life.energy,
            seek_threshold: self.config.seek_energy_threshold,
        });

        // 5. Execute the selected behaviour
        let mut behavior = selection.behavior();
        match selection {
            Selection::Idle(reason) => {
                self.cancel_maneuver(now_ms, sink);
                match reason {
                    // Manual drive owns the wheels while overridden.
                    IdleReason::Override => {}
                    IdleReason::Dead => self.motion.command(MotionCommand::Stop),
                    IdleReason::PowerConservation => self.motion.smooth_stop(),
                    IdleReason::Sated => {
                        if snapshot.obstacle_far {
                            self.motion.smooth(MotionCommand::Crawl);
                        } else {
                            let speed = seeking::cruise_speed(&self.genome, power_mode);
                            self.motion.smooth(MotionCommand::Forward(speed));
                        }
                    }
                }
            }
            Selection::SeekLight => {
                let cmd = seeking::steer(&snapshot.light, &self.genome, power_mode);
                self.motion.command(cmd);
            }
            Selection::Avoid(trigger) => {
                if trigger.is_some() {
                    self.ctx.trigger = trigger;
                }
                self.ctx.now_ms = now_ms;
                self.ctx.sensors = snapshot;
                self.ctx.energy = life.energy;
                self.ctx.power_mode = power_mode;
                self.ctx.coin_left = self.rng.coin();

                let from = self.fsm.current_state();
                if let Some(to) = self.fsm.tick(&mut self.ctx) {
                    sink.emit(&AppEvent::AvoidPhaseChanged { from, to });
                    if to == AvoidPhase::None {
                        // Released: hand control back for the next cycle.
                        self.last_avoid_end_ms = Some(now_ms);
                        behavior = BehaviorState::Idle;
                    }
                }
                self.apply_fsm_motion();
            }
        }

        if behavior != self.behavior {
            info!("STATE: {} -> {}", self.behavior, behavior);
            sink.emit(&AppEvent::BehaviorChanged { from: self.behavior, to: behavior });
            self.behavior = behavior;
        }

        // 6. Wheels, only when the output changed
        let wheels = self.motion.tick(now_ms);
        self.write_wheels(wheels, hw);

        // 7. Status LED
        self.update_led_patterns(selection, life.alive, power_mode);
        let rgb = self.leds.tick(dt_ms.min(u64::from(u32::MAX)) as u32);
        if self.last_led != Some(rgb) {
            hw.set_status_color(rgb.0, rgb.1, rgb.2);
            self.last_led = Some(rgb);
        }

        // 8. Periodic telemetry
        let interval_ms = u64::from(self.config.telemetry_interval_secs) * 1000;
        if interval_ms > 0 && now_ms.saturating_sub(self.last_telemetry_ms) >= interval_ms {
            self.last_telemetry_ms = now_ms;
            sink.emit(&AppEvent::Telemetry(self.status(now_ms)));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command from the console or the web surface.
    ///
    /// Genome edits are persisted immediately; distance thresholds are
    /// flushed by [`auto_save_if_needed`](Self::auto_save_if_needed) or an
    /// explicit `save`.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        store: &(impl GenomePort + ConfigPort),
        sink: &mut impl EventSink,
    ) -> Result<CommandReply> {
        match cmd {
            AppCommand::Status => Ok(CommandReply::Status(self.status(now_ms))),
            AppCommand::StatusJson => Ok(CommandReply::StatusJson(self.status(now_ms))),
            AppCommand::Help => Ok(CommandReply::Help),
            AppCommand::Get(t) => Ok(CommandReply::Value { name: t.name(), value: self.get(t) }),
            AppCommand::Set(t, value) => {
                self.set(t, value, now_ms, store, sink)?;
                Ok(CommandReply::Value { name: t.name(), value: self.get(t) })
            }
            AppCommand::Mutate => {
                self.genome.mutate(&mut self.rng);
                info!("Genome mutated to generation {}", self.genome.generation);
                self.genome_changed(store, sink)?;
                Ok(CommandReply::Genome(self.genome))
            }
            AppCommand::Randomize => {
                self.genome.randomize(&mut self.rng);
                self.life.reset(now_ms);
                info!("Genome re-rolled, life reset");
                self.genome_changed(store, sink)?;
                Ok(CommandReply::Genome(self.genome))
            }
            AppCommand::Reset => {
                self.life.reset(now_ms);
                info!("Life reset");
                Ok(CommandReply::Ok("life reset"))
            }
            AppCommand::Save => {
                store.save_genome(&self.genome)?;
                ConfigPort::save(store, &self.config)?;
                self.config_dirty_since = None;
                info!("Genome and config saved");
                Ok(CommandReply::Ok("saved"))
            }
            AppCommand::ForceIdle => {
                self.cancel_maneuver(now_ms, sink);
                self.motion.smooth_stop();
                self.set_override(true, sink);
                Ok(CommandReply::Ok("forced idle"))
            }
            AppCommand::ForceAuto => {
                self.set_override(false, sink);
                Ok(CommandReply::Ok("autonomous"))
            }
            AppCommand::EmergencyStop => {
                self.cancel_maneuver(now_ms, sink);
                self.motion.emergency_stop();
                hw.stop_all_wheels();
                self.last_wheels = Some(WheelCommand::STOP);
                self.set_override(true, sink);
                warn!("Emergency stop");
                sink.emit(&AppEvent::EmergencyStop);
                Ok(CommandReply::Ok("emergency stop, send 'force auto' to resume"))
            }
            AppCommand::Drive(drive) => {
                if !self.override_idle {
                    return Err(CommandError::AutonomousActive.into());
                }
                let motion = drive.to_motion(self.genome.base_speed);
                if drive.smooth {
                    self.motion.smooth(motion);
                } else {
                    self.motion.command(motion);
                }
                Ok(CommandReply::Ok("driving"))
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// The status object shared by console, dashboard and telemetry.
    pub fn status(&self, now_ms: u64) -> StatusSnapshot {
        let snap = self.sensors.snapshot();
        let life = self.life.state();
        let battery = self.battery.state();
        StatusSnapshot {
            bot_id: self.genome.bot_id,
            generation: self.genome.generation,
            alive: life.alive,
            energy: life.energy,
            light_level: snap.light.ambient(),
            light_left: snap.light.left,
            light_right: snap.light.right,
            distance_cm: snap.distance_cm,
            battery_v: battery.voltage,
            battery_pct: battery.percentage,
            power_mode: battery.mode as u8,
            alive_time_s: life.alive_time_ms(now_ms) / 1000,
            behavior: self.behavior,
            phase: self.fsm.current_state(),
            stuck: snap.stuck,
            override_idle: self.override_idle,
        }
    }

    pub fn get(&self, tunable: Tunable) -> f32 {
        match tunable {
            Tunable::Genome(field) => self.genome.get(field),
            Tunable::EnergyDecay => self.energy_decay,
            Tunable::StopDistance => f32::from(self.config.stop_distance_cm),
            Tunable::WarnDistance => f32::from(self.config.warn_distance_cm),
        }
    }

    pub fn behavior(&self) -> BehaviorState {
        self.behavior
    }

    pub fn avoid_phase(&self) -> AvoidPhase {
        self.fsm.current_state()
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn energy(&self) -> f32 {
        self.life.state().energy
    }

    pub fn is_alive(&self) -> bool {
        self.life.state().alive
    }

    pub fn power_mode(&self) -> PowerMode {
        self.battery.mode()
    }

    pub fn is_override_idle(&self) -> bool {
        self.override_idle
    }

    /// Wheel speeds as of the last tick.
    pub fn wheels(&self) -> WheelCommand {
        self.motion.output()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Configuration ─────────────────────────────────────────

    /// Replace the running configuration (e.g. after an NVS reload).
    pub fn update_config(&mut self, config: RobotConfig, now_ms: u64) {
        self.apply_config(config);
        self.mark_config_dirty(now_ms);
        info!("Configuration updated at runtime");
    }

    /// Flush edited thresholds once they have been quiet for a while.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, storage: &impl ConfigPort) -> bool {
        let Some(since) = self.config_dirty_since else {
            return false;
        };
        if now_ms.saturating_sub(since) < AUTO_SAVE_DELAY_MS {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty_since = None;
                info!("Config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty_since.is_some()
    }

    // ── Internal ──────────────────────────────────────────────

    fn set(
        &mut self,
        tunable: Tunable,
        value: f32,
        now_ms: u64,
        store: &impl GenomePort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match tunable {
            Tunable::Genome(field) => {
                self.genome.set(field, value);
                info!("Gene {} set to {}", field.name(), self.genome.get(field));
                self.genome_changed(store, sink)?;
            }
            Tunable::EnergyDecay => {
                let (lo, hi) = config::ENERGY_DECAY_RANGE;
                self.energy_decay = config::clamp_f32(value, lo, hi);
                let params = self.life_params();
                self.life.set_params(params);
                info!("Energy decay set to {} for this session", self.energy_decay);
            }
            Tunable::StopDistance | Tunable::WarnDistance => {
                let (lo, hi) = config::DISTANCE_THRESHOLD_RANGE;
                let cm = config::clamp_f32(value, f32::from(lo), f32::from(hi)).round() as u16;
                let mut next = self.config.clone();
                if tunable == Tunable::StopDistance {
                    next.stop_distance_cm = cm;
                } else {
                    next.warn_distance_cm = cm;
                }
                self.update_config(next, now_ms);
            }
        }
        Ok(())
    }

    fn apply_config(&mut self, config: RobotConfig) {
        let config = config.sanitized();
        self.sensors.distance.set_limits(DistanceLimits::from(&config));
        self.motion.set_profile(MotionProfile::from(&config));
        self.battery.set_interval(config.battery_interval_ms);
        self.ctx.config = config.clone();
        self.config = config;
        let params = self.life_params();
        self.life.set_params(params);
    }

    fn life_params(&self) -> LifeParams {
        LifeParams {
            decay_rate: self.energy_decay,
            ..self.config.life_params()
        }
    }

    fn mark_config_dirty(&mut self, now_ms: u64) {
        self.config_dirty_since = Some(now_ms);
    }

    fn genome_changed(&self, store: &impl GenomePort, sink: &mut impl EventSink) -> Result<()> {
        sink.emit(&AppEvent::GenomeChanged(self.genome));
        store.save_genome(&self.genome).map_err(Error::from)
    }

    fn set_override(&mut self, idle: bool, sink: &mut impl EventSink) {
        if self.override_idle != idle {
            self.override_idle = idle;
            info!("Manual override: {}", if idle { "force idle" } else { "auto" });
            sink.emit(&AppEvent::OverrideChanged { idle });
        }
    }

    fn in_cooldown(&self, now_ms: u64) -> bool {
        self.last_avoid_end_ms.is_some_and(|end| {
            now_ms.saturating_sub(end) < u64::from(self.config.avoid_cooldown_ms)
        })
    }

    /// Abort any running maneuver and stop its motion.
    fn cancel_maneuver(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let from = self.fsm.current_state();
        if !from.is_active() {
            return;
        }
        self.ctx.now_ms = now_ms;
        self.fsm.force_transition(AvoidPhase::None, &mut self.ctx);
        self.apply_fsm_motion();
        self.last_avoid_end_ms = Some(now_ms);
        sink.emit(&AppEvent::AvoidPhaseChanged { from, to: AvoidPhase::None });
    }

    fn apply_fsm_motion(&mut self) {
        if let Some(cmd) = self.ctx.motion.take() {
            self.motion.command(cmd);
        }
    }

    fn write_wheels(&mut self, wheels: WheelCommand, hw: &mut impl ActuatorPort) {
        if self.last_wheels == Some(wheels) {
            return;
        }
        if wheels.is_stopped() {
            hw.stop_all_wheels();
        } else {
            hw.set_wheel_speed(Side::Left, wheels.left.unsigned_abs() as u8, wheels.left >= 0);
            hw.set_wheel_speed(Side::Right, wheels.right.unsigned_abs() as u8, wheels.right >= 0);
        }
        self.last_wheels = Some(wheels);
    }

    fn update_led_patterns(&mut self, selection: Selection, alive: bool, mode: PowerMode) {
        let (colour, pattern) = if !alive {
            (led::COLOUR_DEAD, PatternId::Breathing)
        } else {
            match selection {
                Selection::Idle(IdleReason::Sated) => (led::COLOUR_EXPLORING, PatternId::Solid),
                Selection::Idle(_) => (led::COLOUR_READY, PatternId::Solid),
                Selection::SeekLight => (led::COLOUR_SEEKING, PatternId::Solid),
                Selection::Avoid(_) => (led::COLOUR_OBSTACLE, PatternId::Solid),
            }
        };
        self.leds.set_behavior_pattern(colour, pattern);
        self.leds
            .set_alert(self.fsm.current_state() == AvoidPhase::StuckEscape);
        self.leds.set_low_battery(matches!(
            mode,
            PowerMode::Low | PowerMode::Critical | PowerMode::Shutdown
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl RandomSource for Fixed {
        fn next_u32(&mut self) -> u32 {
            1
        }
    }

    fn genome() -> Genome {
        Genome {
            light_threshold: 0.3,
            efficiency: 1.0,
            turn_sensitivity: 400.0,
            base_speed: 150,
            bot_id: 2,
            generation: 4,
        }
    }

    #[test]
    fn status_reports_genome_and_defaults() {
        let app = AppService::new(RobotConfig::default(), genome(), Fixed, 0);
        let s = app.status(2500);
        assert_eq!(s.bot_id, 2);
        assert_eq!(s.generation, 4);
        assert!(s.alive);
        assert!((s.energy - 100.0).abs() < f32::EPSILON);
        assert_eq!(s.distance_cm, 400);
        assert_eq!(s.alive_time_s, 2);
        assert_eq!(s.phase, AvoidPhase::None);
    }

    #[test]
    fn get_reads_every_tunable() {
        let app = AppService::new(RobotConfig::default(), genome(), Fixed, 0);
        assert!((app.get(Tunable::StopDistance) - 20.0).abs() < f32::EPSILON);
        assert!((app.get(Tunable::WarnDistance) - 40.0).abs() < f32::EPSILON);
        assert!((app.get(Tunable::EnergyDecay) - 0.1).abs() < 1e-6);
        assert!((app.get(Tunable::Genome(crate::genome::GenomeField::BaseSpeed)) - 150.0).abs() < f32::EPSILON);
    }
}
