//! Concrete phase handler functions and table builder.
//!
//! Each phase is three plain `fn` pointers, no closures and no heap.
//! Every duration is measured against `ctx.now_ms`; no handler blocks.
//!
//! ```text
//!  NONE ──[obstacle]──▶ BACKUP ──[backup_duration]──▶ TURN
//!    ▲                                                 │ [scan + turn_duration]
//!    │                                                 ▼
//!    ├────────────[clear > stop + margin]─────────── VERIFY
//!    │                                                 │ [blocked]
//!    │                         ┌──[retries < max]──────┤
//!    │                         ▼                       │ [retries = max]
//!    │                        TURN                     ▼
//!    └──────────────[sequence done]────────────── STUCK_ESCAPE ◀──[stuck]── NONE
//! ```

use super::context::{EscapeStep, FsmContext, ScanStep, TurnDirection};
use super::{AvoidPhase, StateDescriptor};
use crate::behavior::arbiter::AvoidTrigger;
use crate::control::motion::MotionCommand;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; AvoidPhase::COUNT] {
    [
        // Index 0, None
        StateDescriptor {
            id: AvoidPhase::None,
            name: "NONE",
            on_enter: Some(none_enter),
            on_exit: None,
            on_update: none_update,
        },
        // Index 1, Backup
        StateDescriptor {
            id: AvoidPhase::Backup,
            name: "BACKUP",
            on_enter: Some(backup_enter),
            on_exit: None,
            on_update: backup_update,
        },
        // Index 2, Turn
        StateDescriptor {
            id: AvoidPhase::Turn,
            name: "TURN",
            on_enter: Some(turn_enter),
            on_exit: None,
            on_update: turn_update,
        },
        // Index 3, Verify
        StateDescriptor {
            id: AvoidPhase::Verify,
            name: "VERIFY",
            on_enter: Some(verify_enter),
            on_exit: None,
            on_update: verify_update,
        },
        // Index 4, StuckEscape
        StateDescriptor {
            id: AvoidPhase::StuckEscape,
            name: "STUCK_ESCAPE",
            on_enter: Some(escape_enter),
            on_exit: Some(escape_exit),
            on_update: escape_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  NONE, inactive, waiting for a trigger
// ═══════════════════════════════════════════════════════════════════════════

fn none_enter(ctx: &mut FsmContext) {
    ctx.drive(MotionCommand::Stop);
    ctx.retries = 0;
    ctx.trigger = None;
}

fn none_update(ctx: &mut FsmContext) -> Option<AvoidPhase> {
    match ctx.trigger.take()? {
        AvoidTrigger::Obstacle => {
            info!("AVOID: obstacle at {} cm", ctx.sensors.distance_cm);
            Some(AvoidPhase::Backup)
        }
        AvoidTrigger::Stuck => {
            warn!("AVOID: stuck at {} cm", ctx.sensors.distance_cm);
            Some(AvoidPhase::StuckEscape)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  BACKUP, time-boxed reverse, no rear sensing
// ═══════════════════════════════════════════════════════════════════════════

fn backup_enter(ctx: &mut FsmContext) {
    let speed = ctx.backup_speed();
    ctx.drive(MotionCommand::Backward(speed));
}

fn backup_update(ctx: &mut FsmContext) -> Option<AvoidPhase> {
    if ctx.ms_in_phase() >= u64::from(ctx.config.backup_duration_ms) {
        return Some(AvoidPhase::Turn);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  TURN, optional scan, then a committed spin
// ═══════════════════════════════════════════════════════════════════════════

fn turn_enter(ctx: &mut FsmContext) {
    ctx.begin_step();
    if ctx.config.scan_before_turn {
        ctx.scan_step = ScanStep::LookLeft;
        ctx.drive(MotionCommand::SpinCcw(ctx.config.turn_speed));
    } else {
        ctx.direction = TurnDirection::from_coin(ctx.coin_left);
        commit_turn(ctx);
    }
}

fn turn_update(ctx: &mut FsmContext) -> Option<AvoidPhase> {
    let look = u64::from(ctx.config.scan_look_ms);
    let speed = ctx.config.turn_speed;
    match ctx.scan_step {
        ScanStep::LookLeft if ctx.ms_in_step() >= look => {
            ctx.scan_left_cm = ctx.sensors.distance_cm;
            ctx.scan_step = ScanStep::LookRight;
            ctx.begin_step();
            ctx.drive(MotionCommand::SpinCw(speed));
        }
        ScanStep::LookRight if ctx.ms_in_step() >= 2 * look => {
            ctx.scan_right_cm = ctx.sensors.distance_cm;
            ctx.scan_step = ScanStep::Center;
            ctx.begin_step();
            ctx.drive(MotionCommand::SpinCcw(speed));
        }
        ScanStep::Center if ctx.ms_in_step() >= look => {
            ctx.direction = pick_clearer(ctx.scan_left_cm, ctx.scan_right_cm, ctx.coin_left);
            info!(
                "AVOID: scan left={} cm right={} cm, turning {}",
                ctx.scan_left_cm,
                ctx.scan_right_cm,
                ctx.direction.as_str()
            );
            commit_turn(ctx);
        }
        ScanStep::Turning if ctx.ms_in_step() >= u64::from(ctx.config.turn_duration_ms) => {
            return Some(AvoidPhase::Verify);
        }
        _ => {}
    }
    None
}

fn commit_turn(ctx: &mut FsmContext) {
    ctx.scan_step = ScanStep::Turning;
    ctx.begin_step();
    let cmd = ctx.direction.spin(ctx.config.turn_speed);
    ctx.drive(cmd);
}

/// Side with more clearance; ties go to the coin.
pub fn pick_clearer(left_cm: u16, right_cm: u16, coin_left: bool) -> TurnDirection {
    match left_cm.cmp(&right_cm) {
        core::cmp::Ordering::Greater => TurnDirection::Left,
        core::cmp::Ordering::Less => TurnDirection::Right,
        core::cmp::Ordering::Equal => TurnDirection::from_coin(coin_left),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  VERIFY, settle, then re-measure
// ═══════════════════════════════════════════════════════════════════════════

fn verify_enter(ctx: &mut FsmContext) {
    ctx.drive(MotionCommand::Stop);
}

fn verify_update(ctx: &mut FsmContext) -> Option<AvoidPhase> {
    if ctx.ms_in_phase() < u64::from(ctx.config.verify_settle_ms) {
        return None;
    }

    let distance = ctx.sensors.distance_cm;
    if distance > ctx.clear_distance_cm() {
        info!("AVOID: clear at {} cm", distance);
        return Some(AvoidPhase::None);
    }

    ctx.retries = ctx.retries.saturating_add(1);
    if ctx.retries >= ctx.config.max_turn_retries {
        warn!(
            "AVOID: still blocked at {} cm after {} turns, escaping",
            distance, ctx.retries
        );
        return Some(AvoidPhase::StuckEscape);
    }
    info!("AVOID: still blocked at {} cm, turning again", distance);
    Some(AvoidPhase::Turn)
}

// ═══════════════════════════════════════════════════════════════════════════
//  STUCK_ESCAPE, hard reverse, pause, half-turn spin, pause
// ═══════════════════════════════════════════════════════════════════════════

fn escape_enter(ctx: &mut FsmContext) {
    ctx.escape_step = EscapeStep::Reverse;
    ctx.begin_step();
    ctx.drive(MotionCommand::Backward(ctx.config.max_speed));
}

fn escape_update(ctx: &mut FsmContext) -> Option<AvoidPhase> {
    let pause = u64::from(ctx.config.escape_pause_ms);
    match ctx.escape_step {
        EscapeStep::Reverse if ctx.ms_in_step() >= u64::from(ctx.config.escape_backup_ms) => {
            ctx.escape_step = EscapeStep::PauseAfterReverse;
            ctx.begin_step();
            ctx.drive(MotionCommand::Stop);
        }
        EscapeStep::PauseAfterReverse if ctx.ms_in_step() >= pause => {
            ctx.escape_step = EscapeStep::Spin;
            ctx.begin_step();
            ctx.drive(MotionCommand::SpinCw(ctx.config.max_speed));
        }
        EscapeStep::Spin if ctx.ms_in_step() >= u64::from(ctx.config.escape_spin_ms) => {
            ctx.escape_step = EscapeStep::PauseAfterSpin;
            ctx.begin_step();
            ctx.drive(MotionCommand::Stop);
        }
        EscapeStep::PauseAfterSpin if ctx.ms_in_step() >= pause => {
            info!("AVOID: escape complete");
            return Some(AvoidPhase::None);
        }
        _ => {}
    }
    None
}

fn escape_exit(ctx: &mut FsmContext) {
    ctx.escape_step = EscapeStep::Reverse;
}
