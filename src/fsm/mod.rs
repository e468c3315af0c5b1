//! Function-pointer finite state machine engine for obstacle avoidance.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌──────────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ AvoidPhase   │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├──────────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ None         │ fn(ctx)   │    -     │ fn(ctx)->Option<> │   │
//! │  │ Backup       │ fn(ctx)   │    -     │ fn(ctx)->Option<> │   │
//! │  │ Turn         │ fn(ctx)   │    -     │ fn(ctx)->Option<> │   │
//! │  │ Verify       │ fn(ctx)   │    -     │ fn(ctx)->Option<> │   │
//! │  │ StuckEscape  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  └──────────────┴───────────┴──────────┴───────────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase.
//! If it returns `Some(next)`, the engine runs `on_exit` for the current
//! phase, stamps `ctx.phase_entered_ms`, then runs `on_enter` for the
//! next.  Phase timing is wall-clock based: handlers compare
//! `ctx.now_ms` against the entry stamp and never block.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Phases of the avoidance maneuver.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AvoidPhase {
    None = 0,
    Backup = 1,
    Turn = 2,
    Verify = 3,
    StuckEscape = 4,
}

impl AvoidPhase {
    /// Total number of phases, used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to `AvoidPhase`.  Out-of-range indices assert
    /// in debug builds and fall back to `None` (wheels stopped) in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::None,
            1 => Self::Backup,
            2 => Self::Turn,
            3 => Self::Verify,
            4 => Self::StuckEscape,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::None
            }
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Backup => "BACKUP",
            Self::Turn => "TURN",
            Self::Verify => "VERIFY",
            Self::StuckEscape => "STUCK_ESCAPE",
        }
    }

    pub const fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<AvoidPhase>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
pub struct StateDescriptor {
    pub id: AvoidPhase,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `AvoidPhase as usize`.
    table: [StateDescriptor; AvoidPhase::COUNT],
    current: usize,
    tick_count: u64,
    /// Tick at which the current phase was entered.
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; AvoidPhase::COUNT], initial: AvoidPhase) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table rows out of phase order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting phase.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in phase: {}", self.table[self.current].name);
        ctx.phase_entered_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick.  Returns the new phase if a transition happened.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<AvoidPhase> {
        self.tick_count += 1;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
        next
    }

    /// Jump to `next` regardless of what `on_update` would return.
    /// Used to cancel a maneuver on death or emergency stop.
    pub fn force_transition(&mut self, next: AvoidPhase, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> AvoidPhase {
        AvoidPhase::from_index(self.current)
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: AvoidPhase, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {} after {} ticks",
            self.table[self.current].name,
            self.table[next_idx].name,
            self.ticks_in_current_state()
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.phase_entered_ms = ctx.now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::{FsmContext, LOW_ENERGY_PERCENT, TurnDirection};
    use super::*;
    use crate::behavior::arbiter::AvoidTrigger;
    use crate::config::RobotConfig;
    use crate::control::motion::MotionCommand;
    use crate::power::PowerMode;

    fn no_scan() -> RobotConfig {
        RobotConfig {
            scan_before_turn: false,
            ..RobotConfig::default()
        }
    }

    fn setup(config: RobotConfig) -> (Fsm, FsmContext) {
        let mut fsm = Fsm::new(states::build_state_table(), AvoidPhase::None);
        let mut ctx = FsmContext::new(config);
        ctx.sensors.distance_cm = 15;
        fsm.start(&mut ctx);
        ctx.motion = None;
        (fsm, ctx)
    }

    /// Tick every 20 ms until `until_ms` (inclusive).
    fn run_until(fsm: &mut Fsm, ctx: &mut FsmContext, until_ms: u64) {
        while ctx.now_ms < until_ms {
            ctx.now_ms += 20;
            fsm.tick(ctx);
        }
    }

    fn trigger(fsm: &mut Fsm, ctx: &mut FsmContext, t: AvoidTrigger) {
        ctx.trigger = Some(t);
        fsm.tick(ctx);
    }

    #[test]
    fn starts_inactive_and_stopped() {
        let mut fsm = Fsm::new(states::build_state_table(), AvoidPhase::None);
        let mut ctx = FsmContext::new(RobotConfig::default());
        fsm.start(&mut ctx);
        assert_eq!(fsm.current_state(), AvoidPhase::None);
        assert_eq!(ctx.motion, Some(MotionCommand::Stop));
    }

    #[test]
    fn stays_inactive_without_trigger() {
        let (mut fsm, mut ctx) = setup(no_scan());
        run_until(&mut fsm, &mut ctx, 1000);
        assert_eq!(fsm.current_state(), AvoidPhase::None);
    }

    #[test]
    fn obstacle_starts_backup() {
        let (mut fsm, mut ctx) = setup(no_scan());
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        assert_eq!(fsm.current_state(), AvoidPhase::Backup);
        assert_eq!(ctx.motion, Some(MotionCommand::Backward(180)));
        assert!(ctx.trigger.is_none());
    }

    #[test]
    fn backup_is_time_boxed() {
        let (mut fsm, mut ctx) = setup(no_scan());
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        ctx.sensors.distance_cm = 300;
        run_until(&mut fsm, &mut ctx, 580);
        assert_eq!(fsm.current_state(), AvoidPhase::Backup);
        run_until(&mut fsm, &mut ctx, 600);
        assert_eq!(fsm.current_state(), AvoidPhase::Turn);
    }

    #[test]
    fn backup_slows_on_low_energy_or_economy() {
        let (mut fsm, mut ctx) = setup(no_scan());
        ctx.energy = LOW_ENERGY_PERCENT - 1.0;
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        assert_eq!(ctx.motion, Some(MotionCommand::Backward(135)));

        let (mut fsm, mut ctx) = setup(no_scan());
        ctx.power_mode = PowerMode::Economy;
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        assert_eq!(ctx.motion, Some(MotionCommand::Backward(135)));
    }

    #[test]
    fn round_trip_to_none_when_clear() {
        let (mut fsm, mut ctx) = setup(no_scan());
        ctx.coin_left = false;
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        run_until(&mut fsm, &mut ctx, 600);
        assert_eq!(fsm.current_state(), AvoidPhase::Turn);
        assert_eq!(ctx.direction, TurnDirection::Right);
        assert_eq!(ctx.motion, Some(MotionCommand::SpinCw(200)));

        run_until(&mut fsm, &mut ctx, 1000);
        assert_eq!(fsm.current_state(), AvoidPhase::Verify);

        ctx.sensors.distance_cm = 26;
        run_until(&mut fsm, &mut ctx, 1200);
        assert_eq!(fsm.current_state(), AvoidPhase::None);
        assert_eq!(ctx.motion, Some(MotionCommand::Stop));
    }

    #[test]
    fn blocked_verify_returns_to_turn() {
        let (mut fsm, mut ctx) = setup(no_scan());
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        run_until(&mut fsm, &mut ctx, 1000);
        assert_eq!(fsm.current_state(), AvoidPhase::Verify);

        // Exactly stop + margin is still blocked.
        ctx.sensors.distance_cm = 25;
        run_until(&mut fsm, &mut ctx, 1180);
        assert_eq!(fsm.current_state(), AvoidPhase::Verify);
        run_until(&mut fsm, &mut ctx, 1200);
        assert_eq!(fsm.current_state(), AvoidPhase::Turn);
        assert_eq!(ctx.retries, 1);
    }

    #[test]
    fn repeated_failures_escalate_to_escape() {
        let (mut fsm, mut ctx) = setup(no_scan());
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        let mut saw_escape = false;
        for _ in 0..500 {
            ctx.now_ms += 20;
            fsm.tick(&mut ctx);
            if fsm.current_state() == AvoidPhase::StuckEscape {
                saw_escape = true;
                break;
            }
        }
        assert!(saw_escape);
        assert_eq!(ctx.retries, ctx.config.max_turn_retries);
    }

    #[test]
    fn stuck_goes_straight_to_escape_and_finishes() {
        let (mut fsm, mut ctx) = setup(no_scan());
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Stuck);
        assert_eq!(fsm.current_state(), AvoidPhase::StuckEscape);
        assert_eq!(ctx.motion, Some(MotionCommand::Backward(255)));

        let t0 = ctx.now_ms;
        run_until(&mut fsm, &mut ctx, t0 + 1000);
        assert_eq!(ctx.motion, Some(MotionCommand::Stop));
        run_until(&mut fsm, &mut ctx, t0 + 1200);
        assert_eq!(ctx.motion, Some(MotionCommand::SpinCw(255)));
        run_until(&mut fsm, &mut ctx, t0 + 2800);
        assert_eq!(ctx.motion, Some(MotionCommand::Stop));
        assert_eq!(fsm.current_state(), AvoidPhase::StuckEscape);
        run_until(&mut fsm, &mut ctx, t0 + 3000);
        assert_eq!(fsm.current_state(), AvoidPhase::None);
    }

    #[test]
    fn scan_commits_to_clearer_side() {
        let (mut fsm, mut ctx) = setup(RobotConfig::default());
        ctx.coin_left = true;
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        run_until(&mut fsm, &mut ctx, 600);
        assert_eq!(fsm.current_state(), AvoidPhase::Turn);
        assert_eq!(ctx.motion, Some(MotionCommand::SpinCcw(200)));

        // Looking left sees 30 cm.
        ctx.sensors.distance_cm = 30;
        run_until(&mut fsm, &mut ctx, 900);
        assert_eq!(ctx.scan_left_cm, 30);
        assert_eq!(ctx.motion, Some(MotionCommand::SpinCw(200)));

        // Looking right sees 120 cm.
        ctx.sensors.distance_cm = 120;
        run_until(&mut fsm, &mut ctx, 1500);
        assert_eq!(ctx.scan_right_cm, 120);

        run_until(&mut fsm, &mut ctx, 1800);
        assert_eq!(ctx.direction, TurnDirection::Right);
        assert_eq!(ctx.motion, Some(MotionCommand::SpinCw(200)));

        run_until(&mut fsm, &mut ctx, 2200);
        assert_eq!(fsm.current_state(), AvoidPhase::Verify);
    }

    #[test]
    fn scan_tie_uses_coin() {
        assert_eq!(states::pick_clearer(50, 50, true), TurnDirection::Left);
        assert_eq!(states::pick_clearer(50, 50, false), TurnDirection::Right);
        assert_eq!(states::pick_clearer(80, 50, false), TurnDirection::Left);
        assert_eq!(states::pick_clearer(20, 50, true), TurnDirection::Right);
    }

    #[test]
    fn force_transition_cancels_maneuver() {
        let (mut fsm, mut ctx) = setup(no_scan());
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        run_until(&mut fsm, &mut ctx, 700);
        ctx.retries = 2;
        fsm.force_transition(AvoidPhase::None, &mut ctx);
        assert_eq!(fsm.current_state(), AvoidPhase::None);
        assert_eq!(ctx.motion, Some(MotionCommand::Stop));
        assert_eq!(ctx.retries, 0);
    }

    #[test]
    fn transition_stamps_phase_entry() {
        let (mut fsm, mut ctx) = setup(no_scan());
        ctx.now_ms = 1234;
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        assert_eq!(ctx.phase_entered_ms, 1234);
        assert_eq!(fsm.ticks_in_current_state(), 0);
    }

    #[test]
    fn ticks_count_from_phase_entry() {
        let (mut fsm, mut ctx) = setup(no_scan());
        trigger(&mut fsm, &mut ctx, AvoidTrigger::Obstacle);
        run_until(&mut fsm, &mut ctx, 200);
        assert_eq!(fsm.current_state(), AvoidPhase::Backup);
        assert_eq!(fsm.ticks_in_current_state(), 10);
    }

    #[test]
    fn table_rows_match_phase_order() {
        let table = states::build_state_table();
        for (i, row) in table.iter().enumerate() {
            assert_eq!(row.id as usize, i, "row {}", row.name);
        }
    }

    #[test]
    fn phase_from_index_roundtrip() {
        for i in 0..AvoidPhase::COUNT {
            assert_eq!(AvoidPhase::from_index(i) as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn phase_from_invalid_index_is_none() {
        assert_eq!(AvoidPhase::from_index(99), AvoidPhase::None);
    }
}

#[cfg(test)]
mod proptests {
    use super::context::FsmContext;
    use super::*;
    use crate::behavior::arbiter::AvoidTrigger;
    use crate::config::RobotConfig;
    use proptest::prelude::*;

    fn arb_step() -> impl Strategy<Value = (u16, u8, bool, u64)> {
        (
            2u16..=400, // distance_cm
            0u8..4,     // 0 = obstacle, 1 = stuck, else none
            any::<bool>(),
            1u64..200, // ms elapsed
        )
    }

    proptest! {
        #[test]
        fn verify_never_releases_while_blocked(steps in proptest::collection::vec(arb_step(), 1..300)) {
            let mut fsm = Fsm::new(states::build_state_table(), AvoidPhase::None);
            let mut ctx = FsmContext::new(RobotConfig::default());
            fsm.start(&mut ctx);

            for (distance, trig, coin, dt) in steps {
                ctx.now_ms += dt;
                ctx.sensors.distance_cm = distance;
                ctx.coin_left = coin;
                ctx.trigger = match trig {
                    0 => Some(AvoidTrigger::Obstacle),
                    1 => Some(AvoidTrigger::Stuck),
                    _ => None,
                };
                let before = fsm.current_state();
                let after = fsm.tick(&mut ctx);
                if before == AvoidPhase::Verify && after == Some(AvoidPhase::None) {
                    prop_assert!(distance > ctx.clear_distance_cm());
                }
                if before == AvoidPhase::Backup {
                    prop_assert!(matches!(after, None | Some(AvoidPhase::Turn)));
                }
            }
        }

        #[test]
        fn blocked_maneuver_always_terminates(coins in proptest::collection::vec(any::<bool>(), 1..50)) {
            let mut fsm = Fsm::new(states::build_state_table(), AvoidPhase::None);
            let mut ctx = FsmContext::new(RobotConfig::default());
            fsm.start(&mut ctx);
            ctx.sensors.distance_cm = 10;
            ctx.trigger = Some(AvoidTrigger::Obstacle);
            fsm.tick(&mut ctx);

            // Fully enclosed: distance never clears.  Must fall back to
            // escape and then release within a bounded time.
            let mut released = false;
            for i in 0..2000usize {
                ctx.now_ms += 20;
                ctx.coin_left = coins[i % coins.len()];
                fsm.tick(&mut ctx);
                if fsm.current_state() == AvoidPhase::None {
                    released = true;
                    break;
                }
            }
            prop_assert!(released);
        }
    }
}
