//! EMBER Firmware: Main Entry Point
//!
//! Hexagonal architecture with a fixed-rate, non-blocking control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter    WyRandSource   │
//! │  (Sensor+Actuator) (EventSink)    (Config+Genome) (Random)     │
//! │  Console (UART lines)             Esp32TimeAdapter             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  filters · life · arbiter · avoidance FSM · ramp       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{error, info, warn};

use ember::adapters::console::Console;
use ember::adapters::device_id;
use ember::adapters::hardware::HardwareAdapter;
use ember::adapters::log_sink::LogEventSink;
use ember::adapters::nvs::NvsAdapter;
use ember::adapters::rng::WyRandSource;
use ember::adapters::time::Esp32TimeAdapter;
use ember::app::cli;
use ember::app::ports::{ActuatorPort, ConfigPort};
use ember::app::service::AppService;
use ember::config::RobotConfig;
use ember::drivers::led_patterns::{COLOUR_BOOTING, COLOUR_FATAL};
use ember::error::{CommandError, Error};
use ember::genome;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  EMBER v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    let boot_config = RobotConfig::default();
    let mut hw = HardwareAdapter::new(&boot_config);
    if let Err(e) = ember::drivers::hw_init::init_peripherals() {
        // Nothing can move safely without the drivers; show the fault and halt.
        error!("HAL init failed: {}, halting", e);
        hw.set_status_color(COLOUR_FATAL.0, COLOUR_FATAL.1, COLOUR_FATAL.2);
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
    hw.stop_all_wheels();
    hw.set_status_color(COLOUR_BOOTING.0, COLOUR_BOOTING.1, COLOUR_BOOTING.2);

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new()
        .map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            RobotConfig::default()
        }
    };
    hw.apply_config(&config);

    // ── 4. Identity and genome ────────────────────────────────
    let mac = device_id::read_mac();
    let bot_id = device_id::bot_id(&mac);
    info!(
        "Device ID: {} (hostname: {}, bot {})",
        device_id::device_id(&mac),
        device_id::hostname(&mac),
        bot_id
    );

    let mut rng = WyRandSource::from_hardware();
    let genome = genome::load_or_create(&nvs, &mut rng, bot_id);

    // ── 5. Construct app service ──────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut log_sink = LogEventSink::new();
    let interval_ms = u64::from(config.control_loop_interval_ms);

    let mut app = AppService::new(config, genome, rng, clock.uptime_ms());
    app.start(clock.uptime_ms(), &mut hw, &mut log_sink);

    let console = Console::spawn()?;
    info!("System ready, type 'help' for commands.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        let now = clock.uptime_ms();
        app.tick(now, &mut hw, &mut log_sink);

        while let Some(line) = console.try_recv_line() {
            let reply = cli::parse_line(&line)
                .map_err(Error::from)
                .and_then(|cmd| app.handle_command(cmd, now, &mut hw, &nvs, &mut log_sink));
            match reply {
                Ok(reply) => println!("{}", cli::render_reply(&reply)),
                Err(Error::Command(CommandError::Empty)) => {}
                Err(e) => println!("ERR {}", e),
            }
        }

        app.auto_save_if_needed(now, &nvs);

        let spent = clock.uptime_ms().saturating_sub(now);
        // Always yield at least one FreeRTOS tick so the idle task runs.
        FreeRtos::delay_ms(interval_ms.saturating_sub(spent).max(1) as u32);
    }
}
