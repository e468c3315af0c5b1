//! Fuzz target: `parse_line`
//!
//! Feeds arbitrary console input to the command parser and renders
//! whatever it accepts.  Neither step may panic.
//!
//! cargo fuzz run fuzz_cli_parser

#![no_main]

use ember::app::cli::{parse_line, render_reply};
use ember::app::commands::AppCommand;
use ember::app::events::CommandReply;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = core::str::from_utf8(data) else {
        return;
    };

    match parse_line(line) {
        Ok(AppCommand::Set(tunable, value)) => {
            // Rendering a value reply must never panic, NaN included.
            let _ = render_reply(&CommandReply::Value { name: tunable.name(), value });
        }
        Ok(AppCommand::Drive(d)) => {
            let _ = d.to_motion(150);
        }
        Ok(_) | Err(_) => {}
    }
});
