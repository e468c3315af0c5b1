//! Text command parser and reply renderer.
//!
//! One line in, one [`AppCommand`] out.  Words and the single-key
//! shortcuts used at the serial monitor are both accepted:
//!
//! | Line                        | Command                     |
//! |-----------------------------|-----------------------------|
//! | `status`, `i`, `p`          | status snapshot             |
//! | `status json`, `j`          | status as a JSON object     |
//! | `help`, `h`, `?`            | help                        |
//! | `get <field>`               | read a tunable              |
//! | `set <field> <value>`       | write a tunable (clamped)   |
//! | `mutate`, `randomize`       | genome operations           |
//! | `reset`, `save`             | life reset, persist         |
//! | `force idle`, `force auto`  | manual override             |
//! | `stop`, `s`, `estop`, ` `   | emergency stop              |
//! | `f b l r > < c m [speed]`   | manual drive                |
//! | `w x q`                     | smooth forward/back/stop    |

use core::fmt::Write as _;

use crate::error::CommandError;

use super::commands::{AppCommand, DriveCommand, DriveVerb, Tunable};
use super::events::CommandReply;

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<AppCommand, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        // A bare space bar press is the panic button.
        return if line.contains(' ') {
            Ok(AppCommand::EmergencyStop)
        } else {
            Err(CommandError::Empty)
        };
    }

    let lowered = trimmed.to_ascii_lowercase();
    let mut words = lowered.split_whitespace();
    let head = words.next().ok_or(CommandError::Empty)?;
    let arg = words.next();

    let cmd = match head {
        "status" | "i" | "p" => match arg {
            None => AppCommand::Status,
            Some("json") => AppCommand::StatusJson,
            Some(_) => return Err(CommandError::UnknownCommand),
        },
        "json" | "j" => AppCommand::StatusJson,
        "help" | "h" | "?" => AppCommand::Help,
        "get" => AppCommand::Get(parse_tunable(arg)?),
        "set" => {
            let field = parse_tunable(arg)?;
            let value = words
                .next()
                .ok_or(CommandError::MissingArgument)?
                .parse::<f32>()
                .map_err(|_| CommandError::InvalidNumber)?;
            AppCommand::Set(field, value)
        }
        "mutate" => AppCommand::Mutate,
        "randomize" | "randomise" => AppCommand::Randomize,
        "reset" => AppCommand::Reset,
        "save" => AppCommand::Save,
        "force" => match arg {
            Some("idle") => AppCommand::ForceIdle,
            Some("auto") => AppCommand::ForceAuto,
            Some(_) => return Err(CommandError::UnknownCommand),
            None => return Err(CommandError::MissingArgument),
        },
        "idle" => AppCommand::ForceIdle,
        "auto" | "a" => AppCommand::ForceAuto,
        "stop" | "s" | "estop" => AppCommand::EmergencyStop,
        "smooth" => {
            let verb = match arg {
                Some("forward") => DriveVerb::Forward,
                Some("backward") => DriveVerb::Backward,
                Some("stop") => DriveVerb::Stop,
                Some(_) => return Err(CommandError::UnknownCommand),
                None => return Err(CommandError::MissingArgument),
            };
            let speed = parse_speed(words.next())?;
            AppCommand::Drive(DriveCommand { speed, ..DriveCommand::smooth(verb) })
        }
        "w" => AppCommand::Drive(DriveCommand { speed: parse_speed(arg)?, ..DriveCommand::smooth(DriveVerb::Forward) }),
        "x" => AppCommand::Drive(DriveCommand { speed: parse_speed(arg)?, ..DriveCommand::smooth(DriveVerb::Backward) }),
        "q" => AppCommand::Drive(DriveCommand::smooth(DriveVerb::Stop)),
        other => {
            let verb = drive_verb(other).ok_or(CommandError::UnknownCommand)?;
            AppCommand::Drive(DriveCommand {
                speed: parse_speed(arg)?,
                ..DriveCommand::immediate(verb)
            })
        }
    };
    Ok(cmd)
}

fn drive_verb(word: &str) -> Option<DriveVerb> {
    Some(match word {
        "forward" | "f" => DriveVerb::Forward,
        "backward" | "back" | "b" => DriveVerb::Backward,
        "left" | "l" => DriveVerb::Left,
        "right" | "r" => DriveVerb::Right,
        "cw" | ">" => DriveVerb::SpinCw,
        "ccw" | "<" => DriveVerb::SpinCcw,
        "crawl" | "c" => DriveVerb::Crawl,
        "run" | "m" => DriveVerb::Run,
        "halt" => DriveVerb::Stop,
        _ => return None,
    })
}

fn parse_tunable(word: Option<&str>) -> Result<Tunable, CommandError> {
    word.ok_or(CommandError::MissingArgument)?
        .parse::<Tunable>()
        .map_err(|()| CommandError::UnknownField)
}

/// Optional speed argument.  Values above 255 land on 255.
fn parse_speed(word: Option<&str>) -> Result<Option<u8>, CommandError> {
    word.map(|w| {
        w.parse::<u32>()
            .map(|v| v.min(255) as u8)
            .map_err(|_| CommandError::InvalidNumber)
    })
    .transpose()
}

pub const HELP_TEXT: &str = "\
commands:
  status [json] | help
  get <field> | set <field> <value>
  mutate | randomize | reset | save
  force idle | force auto | stop
  forward/backward/left/right/cw/ccw/crawl/run [speed]  (forced idle only)
  smooth forward|backward|stop [speed]
fields: light_threshold efficiency turn_sensitivity base_speed energy_decay stop_distance warn_distance";

/// Human-readable rendering of a command reply.
pub fn render_reply(reply: &CommandReply) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = match reply {
        CommandReply::Status(s) => write!(
            out,
            "bot {} gen {} | {} {} | energy {:.1} {} | dist {} cm{} | light L{:.2} R{:.2} | batt {:.2} V {:.0}% | {}",
            s.bot_id,
            s.generation,
            s.behavior,
            s.phase.as_str(),
            s.energy,
            if s.alive { "alive" } else { "DEAD" },
            s.distance_cm,
            if s.stuck { " STUCK" } else { "" },
            s.light_left,
            s.light_right,
            s.battery_v,
            s.battery_pct,
            if s.override_idle { "forced idle" } else { "auto" },
        ),
        CommandReply::StatusJson(s) => write!(out, "{}", s.to_json()),
        CommandReply::Help => write!(out, "{HELP_TEXT}"),
        CommandReply::Value { name, value } => write!(out, "{name} = {value}"),
        CommandReply::Genome(g) => write!(
            out,
            "genome bot {} gen {}: light_threshold={:.3} efficiency={:.2} turn_sensitivity={:.0} base_speed={}",
            g.bot_id, g.generation, g.light_threshold, g.efficiency, g.turn_sensitivity, g.base_speed
        ),
        CommandReply::Ok(msg) => write!(out, "ok: {msg}"),
    };
    out
}
