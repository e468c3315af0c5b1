//! Integration tests for the AppService → arbiter → FSM → wheels pipeline.
//!
//! These run on the host (x86_64) and drive the service tick by tick with
//! scripted sensor values, checking what reaches the actuators and the
//! event sink.

use crate::mock_hw::{ActuatorCall, MemStore, MockHardware, RecordingSink, ScriptedRandom};

use ember::app::commands::{AppCommand, DriveCommand, DriveVerb, Tunable};
use ember::app::events::{AppEvent, CommandReply};
use ember::app::ports::Side;
use ember::app::service::AppService;
use ember::behavior::BehaviorState;
use ember::config::RobotConfig;
use ember::control::motion::WheelCommand;
use ember::error::{CommandError, Error};
use ember::fsm::AvoidPhase;
use ember::genome::{Genome, GenomeField};
use ember::power::PowerMode;

const TICK_MS: u64 = 20;

struct Rig {
    app: AppService<ScriptedRandom>,
    hw: MockHardware,
    sink: RecordingSink,
    store: MemStore,
    now: u64,
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

fn rig() -> Rig {
    let mut r = Rig {
        app: AppService::new(RobotConfig::default(), genome(), ScriptedRandom::always_left(), 0),
        hw: MockHardware::new(),
        sink: RecordingSink::new(),
        store: MemStore::new(),
        now: 0,
    };
    r.app.start(0, &mut r.hw, &mut r.sink);
    r
}

/// A rig parked under a bright lamp so energy stays full.
fn sated_rig() -> Rig {
    let mut r = rig();
    r.hw.set_light(1.0, 1.0);
    r
}

impl Rig {
    fn tick(&mut self) {
        self.now += TICK_MS;
        self.app.tick(self.now, &mut self.hw, &mut self.sink);
    }

    fn run(&mut self, ms: u64) {
        for _ in 0..ms / TICK_MS {
            self.tick();
        }
    }

    /// Tick until `pred` holds or `max_ms` elapses.  Returns whether it held.
    fn run_until(&mut self, max_ms: u64, pred: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..max_ms / TICK_MS {
            self.tick();
            if pred(self) {
                return true;
            }
        }
        false
    }

    fn cmd(&mut self, cmd: AppCommand) -> ember::error::Result<CommandReply> {
        self.app
            .handle_command(cmd, self.now, &mut self.hw, &self.store, &mut self.sink)
    }

    fn phase_changes(&self) -> Vec<(AvoidPhase, AvoidPhase)> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match *e {
                AppEvent::AvoidPhaseChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }
}

// ── Start-up ─────────────────────────────────────────────────

#[test]
fn start_stops_wheels_and_shows_ready() {
    let r = rig();
    assert!(r.hw.calls.contains(&ActuatorCall::StopAll));
    assert_eq!(r.hw.last_led(), Some((0, 255, 0)));
    assert!(r.sink.contains(&AppEvent::Started { bot_id: 2, generation: 4 }));
    assert_eq!(r.app.behavior(), BehaviorState::Idle);
    assert_eq!(r.app.avoid_phase(), AvoidPhase::None);
}

// ── Exploration and seeking ──────────────────────────────────

#[test]
fn sated_robot_ramps_up_to_cruise_speed() {
    let mut r = sated_rig();
    r.tick();
    // The ramp starts from rest, one step per interval.
    assert_eq!(r.app.wheels(), WheelCommand::new(5, 5));

    r.run(1000);
    assert_eq!(r.app.wheels(), WheelCommand::new(150, 150));
    assert_eq!(r.hw.wheel_speed(Side::Left), 150);
    assert_eq!(r.hw.wheel_speed(Side::Right), 150);
    assert_eq!(r.app.behavior(), BehaviorState::Idle);
    assert!((r.app.energy() - 100.0).abs() < 1e-3);
}

#[test]
fn near_wall_slows_to_crawl() {
    let mut r = sated_rig();
    r.hw.distance_cm = 30;
    r.run(1000);
    let crawl = i16::from(RobotConfig::default().crawl_speed);
    assert_eq!(r.app.wheels(), WheelCommand::new(crawl, crawl));
}

#[test]
fn economy_mode_scales_cruise_speed() {
    let mut r = sated_rig();
    r.hw.battery_v = 7.5;
    r.run(1000);
    assert_eq!(r.app.power_mode(), PowerMode::Economy);
    assert_eq!(r.app.wheels(), WheelCommand::new(112, 112));
}

#[test]
fn hungry_robot_veers_toward_brighter_side() {
    let mut r = rig();
    r.cmd(AppCommand::Set(Tunable::EnergyDecay, 5.0)).unwrap();
    r.hw.set_light(0.8, 0.2);

    assert!(r.run_until(2000, |r| r.app.behavior() == BehaviorState::SeekingLight));
    r.tick();
    // Brighter left: the left wheel slows and the robot bends left.
    assert_eq!(r.app.wheels(), WheelCommand::new(50, 150));
    assert!(r.sink.contains(&AppEvent::BehaviorChanged {
        from: BehaviorState::Idle,
        to: BehaviorState::SeekingLight,
    }));
}

#[test]
fn balanced_light_seeks_straight() {
    let mut r = rig();
    r.cmd(AppCommand::Set(Tunable::EnergyDecay, 5.0)).unwrap();
    r.hw.set_light(0.5, 0.52);
    assert!(r.run_until(2000, |r| r.app.behavior() == BehaviorState::SeekingLight));
    r.tick();
    assert_eq!(r.app.wheels(), WheelCommand::new(150, 150));
}

// ── Life model ───────────────────────────────────────────────

#[test]
fn starving_robot_dies_stops_and_revives_in_light() {
    let mut r = rig();
    r.cmd(AppCommand::Set(Tunable::EnergyDecay, 5.0)).unwrap();

    assert!(r.run_until(60_000, |r| !r.app.is_alive()));
    assert_eq!(r.sink.count(|e| matches!(e, AppEvent::Died { .. })), 1);
    r.tick();
    assert_eq!(r.app.wheels(), WheelCommand::STOP);
    assert_eq!(r.hw.wheel_speed(Side::Left), 0);
    assert_eq!(r.app.behavior(), BehaviorState::Idle);

    r.cmd(AppCommand::Set(Tunable::EnergyDecay, 0.0)).unwrap();
    r.hw.set_light(1.0, 1.0);
    // The light average needs a few samples to climb past the threshold.
    assert!(r.run_until(200, |r| r.app.is_alive()));
    assert!(r.sink.contains(&AppEvent::Revived));
}

#[test]
fn reset_restores_full_energy() {
    let mut r = rig();
    r.cmd(AppCommand::Set(Tunable::EnergyDecay, 5.0)).unwrap();
    r.run(2000);
    assert!(r.app.energy() < 100.0);
    r.cmd(AppCommand::Reset).unwrap();
    assert!((r.app.energy() - 100.0).abs() < f32::EPSILON);
    assert!(r.app.is_alive());
}

// ── Power ────────────────────────────────────────────────────

#[test]
fn critical_battery_forces_idle() {
    let mut r = sated_rig();
    r.hw.battery_v = 6.5;
    r.run(1000);
    assert_eq!(r.app.power_mode(), PowerMode::Critical);
    assert_eq!(r.app.wheels(), WheelCommand::STOP);
    assert_eq!(r.app.behavior(), BehaviorState::Idle);
    assert!(r.sink.contains(&AppEvent::PowerModeChanged {
        from: PowerMode::Normal,
        to: PowerMode::Critical,
        voltage: 6.5,
    }));
}

// ── Obstacle avoidance ───────────────────────────────────────

#[test]
fn obstacle_starts_backup() {
    let mut r = sated_rig();
    r.run(500);
    r.hw.distance_cm = 10;

    assert!(r.run_until(200, |r| r.app.avoid_phase() == AvoidPhase::Backup));
    assert_eq!(r.app.behavior(), BehaviorState::AvoidingObstacle);
    let backup = -i16::from(RobotConfig::default().backup_speed);
    assert_eq!(r.app.wheels(), WheelCommand::new(backup, backup));
    assert_eq!(r.phase_changes(), vec![(AvoidPhase::None, AvoidPhase::Backup)]);
}

#[test]
fn maneuver_releases_once_path_is_clear() {
    let mut r = sated_rig();
    r.hw.distance_cm = 10;
    assert!(r.run_until(200, |r| r.app.avoid_phase() == AvoidPhase::Backup));
    r.hw.distance_cm = 400;

    assert!(r.run_until(5000, |r| r.app.avoid_phase() == AvoidPhase::None));
    assert_eq!(
        r.phase_changes(),
        vec![
            (AvoidPhase::None, AvoidPhase::Backup),
            (AvoidPhase::Backup, AvoidPhase::Turn),
            (AvoidPhase::Turn, AvoidPhase::Verify),
            (AvoidPhase::Verify, AvoidPhase::None),
        ]
    );
    assert_eq!(r.app.behavior(), BehaviorState::Idle);
    assert_eq!(r.app.wheels(), WheelCommand::STOP);

    // Exploration resumes on the following cycles.
    r.run(200);
    assert!(r.app.wheels().left > 0);
}

#[test]
fn persistent_obstacle_escalates_to_stuck_escape() {
    let mut r = sated_rig();
    r.hw.distance_cm = 10;

    assert!(r.run_until(15_000, |r| r.app.avoid_phase() == AvoidPhase::StuckEscape));
    let turns = r
        .phase_changes()
        .iter()
        .filter(|(_, to)| *to == AvoidPhase::Turn)
        .count();
    assert_eq!(turns, 3);
    assert_eq!(r.app.wheels(), WheelCommand::new(-255, -255));

    assert!(r.run_until(5000, |r| r.app.avoid_phase() == AvoidPhase::None));
    assert!(r.hw.led_history().any(|c| c == (255, 0, 0)), "escape shows the alert colour");
}

#[test]
fn cooldown_delays_retrigger() {
    let mut r = sated_rig();
    r.hw.distance_cm = 10;
    assert!(r.run_until(200, |r| r.app.avoid_phase() == AvoidPhase::Backup));

    // Cancel by forcing idle, then hand control back with the wall still there.
    r.cmd(AppCommand::ForceIdle).unwrap();
    assert_eq!(r.app.avoid_phase(), AvoidPhase::None);
    r.cmd(AppCommand::ForceAuto).unwrap();

    let cooldown = u64::from(RobotConfig::default().avoid_cooldown_ms);
    r.run(cooldown - 100);
    assert_eq!(r.app.avoid_phase(), AvoidPhase::None);
    assert!(r.run_until(200, |r| r.app.avoid_phase() == AvoidPhase::Backup));
}

// ── Operator commands ────────────────────────────────────────

#[test]
fn manual_drive_requires_forced_idle() {
    let mut r = sated_rig();
    let drive = AppCommand::Drive(DriveCommand {
        speed: Some(200),
        ..DriveCommand::immediate(DriveVerb::Forward)
    });

    assert_eq!(r.cmd(drive), Err(Error::Command(CommandError::AutonomousActive)));

    r.cmd(AppCommand::ForceIdle).unwrap();
    assert!(r.app.is_override_idle());
    r.cmd(drive).unwrap();
    r.tick();
    assert_eq!(r.app.wheels(), WheelCommand::new(200, 200));

    // Overridden: nothing autonomous touches the wheels.
    r.run(500);
    assert_eq!(r.app.wheels(), WheelCommand::new(200, 200));

    r.cmd(AppCommand::Drive(DriveCommand::immediate(DriveVerb::SpinCw))).unwrap();
    r.tick();
    assert_eq!(r.app.wheels(), WheelCommand::new(150, -150));
}

#[test]
fn emergency_stop_halts_and_latches_override() {
    let mut r = sated_rig();
    r.run(1000);
    assert!(r.app.wheels().left > 0);

    r.cmd(AppCommand::EmergencyStop).unwrap();
    assert_eq!(r.hw.calls.last(), Some(&ActuatorCall::StopAll));
    assert!(r.app.is_override_idle());
    assert!(r.sink.contains(&AppEvent::EmergencyStop));

    r.run(500);
    assert_eq!(r.app.wheels(), WheelCommand::STOP);

    r.cmd(AppCommand::ForceAuto).unwrap();
    r.run(500);
    assert!(r.app.wheels().left > 0);
}

#[test]
fn genome_edits_are_clamped_and_persisted() {
    let mut r = rig();
    let reply = r
        .cmd(AppCommand::Set(Tunable::Genome(GenomeField::BaseSpeed), 300.0))
        .unwrap();
    assert_eq!(reply, CommandReply::Value { name: "base_speed", value: 255.0 });
    assert_eq!(r.store.genome.borrow().map(|g| g.base_speed), Some(255));
    assert!(r.sink.events.iter().any(|e| matches!(e, AppEvent::GenomeChanged(_))));
}

#[test]
fn mutate_bumps_generation_and_randomize_restarts_it() {
    let mut r = rig();
    r.cmd(AppCommand::Mutate).unwrap();
    assert_eq!(r.app.genome().generation, 5);
    assert_eq!(r.store.genome.borrow().map(|g| g.generation), Some(5));

    r.cmd(AppCommand::Randomize).unwrap();
    assert_eq!(r.app.genome().generation, 0);
    assert_eq!(r.app.genome().bot_id, 2);
    assert_eq!(r.store.genome_saves.get(), 2);
}

#[test]
fn energy_decay_is_session_only() {
    let mut r = rig();
    r.cmd(AppCommand::Set(Tunable::EnergyDecay, 9.0)).unwrap();
    assert!((r.app.get(Tunable::EnergyDecay) - 5.0).abs() < f32::EPSILON);
    assert!(!r.app.is_config_dirty());
    assert_eq!(r.store.config_saves.get(), 0);
}

#[test]
fn distance_thresholds_auto_save_after_quiet_period() {
    let mut r = rig();
    r.cmd(AppCommand::Set(Tunable::StopDistance, 30.0)).unwrap();
    assert!(r.app.is_config_dirty());

    assert!(!r.app.auto_save_if_needed(r.now + 1000, &r.store));
    assert!(r.app.auto_save_if_needed(r.now + 5000, &r.store));
    assert!(!r.app.is_config_dirty());
    assert_eq!(
        r.store.config.borrow().as_ref().map(|c| c.stop_distance_cm),
        Some(30)
    );
}

#[test]
fn save_writes_genome_and_config() {
    let mut r = rig();
    assert_eq!(r.cmd(AppCommand::Save), Ok(CommandReply::Ok("saved")));
    assert_eq!(r.store.genome_saves.get(), 1);
    assert_eq!(r.store.config_saves.get(), 1);
}

#[test]
fn telemetry_is_periodic() {
    let mut r = sated_rig();
    r.run(25_000);
    let n = r.sink.count(|e| matches!(e, AppEvent::Telemetry(_)));
    assert_eq!(n, 2);
}

#[test]
fn status_json_has_dashboard_fields() {
    let mut r = sated_rig();
    r.run(200);
    let json = r.app.status(r.now).to_json();
    for key in ["\"bot_id\":2", "\"generation\":4", "\"alive\":true", "\"distance_cm\":400"] {
        assert!(json.contains(key), "{key} missing from {json}");
    }
}
