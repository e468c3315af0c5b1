//! Property tests for robustness of the core filters and policies.
//!
//! Runs on host (x86_64) only, proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use ember::app::cli::parse_line;
use ember::app::ports::RandomSource;
use ember::behavior::arbiter::{self, ArbiterInput, IdleReason, Selection};
use ember::config::RobotConfig;
use ember::genome::{
    BASE_SPEED_RANGE, EFFICIENCY_RANGE, Genome, LIGHT_THRESHOLD_RANGE, TURN_SENSITIVITY_RANGE,
};
use ember::life::{LifeModel, MAX_ENERGY};
use ember::power::PowerMode;
use ember::sensors::distance::{MAX_RANGE_CM, WINDOW, median};
use proptest::prelude::*;

struct Seq(u32);

impl RandomSource for Seq {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0
    }
}

fn power_mode() -> impl Strategy<Value = PowerMode> {
    prop_oneof![
        Just(PowerMode::Normal),
        Just(PowerMode::Economy),
        Just(PowerMode::Low),
        Just(PowerMode::Critical),
        Just(PowerMode::Shutdown),
        Just(PowerMode::UsbDebug),
    ]
}

fn genome_strategy() -> impl Strategy<Value = Genome> {
    (0.01f32..1.0, 0.5f32..2.0, 50f32..2000.0, 50u8..=255).prop_map(|(t, e, s, b)| Genome {
        light_threshold: t,
        efficiency: e,
        turn_sensitivity: s,
        base_speed: b,
        bot_id: 0,
        generation: 0,
    })
}

// ── Distance median ───────────────────────────────────────────

proptest! {
    /// The median is always one of the samples and bounded by min/max,
    /// so a single spike can never become the filtered value.
    #[test]
    fn median_is_a_member_and_bounded(samples in proptest::collection::vec(0u16..=MAX_RANGE_CM, 1..=WINDOW)) {
        let m = median(&samples);
        prop_assert!(samples.contains(&m));
        prop_assert!(m >= *samples.iter().min().unwrap());
        prop_assert!(m <= *samples.iter().max().unwrap());
    }

    #[test]
    fn median_rejects_single_spike(base in 5u16..300, spike in 0u16..=MAX_RANGE_CM) {
        let window = [base, base, spike, base, base];
        prop_assert_eq!(median(&window), base);
    }
}

// ── Energy model ──────────────────────────────────────────────

proptest! {
    /// Energy stays in [0, MAX_ENERGY] whatever the inputs, and the alive
    /// flag always agrees with it.
    #[test]
    fn energy_is_clamped(
        genome in genome_strategy(),
        steps in proptest::collection::vec((0.0f32..5.0, 0.0f32..=1.0, any::<bool>()), 1..200),
    ) {
        let mut life = LifeModel::new(RobotConfig::default().life_params(), 0);
        let mut now = 0u64;
        for (dt, light, moving) in steps {
            now += (dt * 1000.0) as u64;
            let s = life.tick(dt, light, moving, &genome, now);
            prop_assert!((0.0..=MAX_ENERGY).contains(&s.energy));
            prop_assert_eq!(s.alive, s.energy > 0.0);
        }
    }
}

// ── Arbiter ───────────────────────────────────────────────────

proptest! {
    /// Manual override wins over every other input.
    #[test]
    fn override_always_idles(
        alive: bool,
        maneuver_active: bool,
        obstacle: bool,
        in_cooldown: bool,
        stuck: bool,
        power_mode in power_mode(),
        energy in 0.0f32..=100.0,
    ) {
        let sel = arbiter::select(&ArbiterInput {
            override_idle: true,
            alive,
            maneuver_active,
            obstacle,
            in_cooldown,
            stuck,
            power_mode,
            energy,
            seek_threshold: 99.0,
        });
        prop_assert_eq!(sel, Selection::Idle(IdleReason::Override));
    }

    /// A dead robot never moves on its own.
    #[test]
    fn dead_never_explores(
        maneuver_active: bool,
        obstacle: bool,
        stuck: bool,
        power_mode in power_mode(),
    ) {
        let sel = arbiter::select(&ArbiterInput {
            override_idle: false,
            alive: false,
            maneuver_active,
            obstacle,
            in_cooldown: false,
            stuck,
            power_mode,
            energy: 0.0,
            seek_threshold: 99.0,
        });
        prop_assert_eq!(sel, Selection::Idle(IdleReason::Dead));
    }
}

// ── Genome ────────────────────────────────────────────────────

proptest! {
    /// Any number of mutations keeps every gene inside its range.
    #[test]
    fn mutation_stays_in_range(seed: u32, rounds in 1usize..200) {
        let mut rng = Seq(seed);
        let mut g = Genome::random(&mut rng, 3);
        for _ in 0..rounds {
            g.mutate(&mut rng);
        }
        prop_assert!((LIGHT_THRESHOLD_RANGE.0..=LIGHT_THRESHOLD_RANGE.1).contains(&g.light_threshold));
        prop_assert!((EFFICIENCY_RANGE.0..=EFFICIENCY_RANGE.1).contains(&g.efficiency));
        prop_assert!((TURN_SENSITIVITY_RANGE.0..=TURN_SENSITIVITY_RANGE.1).contains(&g.turn_sensitivity));
        prop_assert!((BASE_SPEED_RANGE.0..=BASE_SPEED_RANGE.1).contains(&g.base_speed));
        prop_assert_eq!(g.generation, rounds as u32);
    }
}

// ── Console parser ────────────────────────────────────────────

proptest! {
    /// Arbitrary console input never panics the parser.
    #[test]
    fn parser_never_panics(line in ".{0,64}") {
        let _ = parse_line(&line);
    }
}
