//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART in production, stderr on the host).  Each
//! line starts with a fixed tag so a serial capture can be grepped.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | {} | {} | energy={:.1} | light={:.2} (L {:.2} R {:.2}) | \
                     dist={}cm | batt={:.2}V {:.0}% | alive={}s",
                    t.behavior,
                    t.phase.as_str(),
                    t.energy,
                    t.light_level,
                    t.light_left,
                    t.light_right,
                    t.distance_cm,
                    t.battery_v,
                    t.battery_pct,
                    t.alive_time_s,
                );
            }
            AppEvent::BehaviorChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            AppEvent::AvoidPhaseChanged { from, to } => {
                info!("AVOID | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::Died { alive_time_s } => {
                warn!("LIFE | died after {}s", alive_time_s);
            }
            AppEvent::Revived => {
                info!("LIFE | revived");
            }
            AppEvent::PowerModeChanged { from, to, voltage } => {
                info!("POWER | {} -> {} ({:.2} V)", from.as_str(), to.as_str(), voltage);
            }
            AppEvent::OverrideChanged { idle } => {
                info!("STATE | override {}", if *idle { "IDLE" } else { "AUTO" });
            }
            AppEvent::EmergencyStop => {
                warn!("STATE | EMERGENCY STOP");
            }
            AppEvent::GenomeChanged(g) => {
                info!(
                    "LIFE | genome gen={} thr={:.3} eff={:.2} sens={:.0} speed={}",
                    g.generation, g.light_threshold, g.efficiency, g.turn_sensitivity, g.base_speed
                );
            }
            AppEvent::Started { bot_id, generation } => {
                info!("START | bot={} gen={}", bot_id, generation);
            }
        }
    }
}
