//! Console round trips: text line → parser → service → rendered reply.

use crate::mock_hw::{MemStore, MockHardware, RecordingSink, ScriptedRandom};

use ember::app::cli::{parse_line, render_reply};
use ember::app::service::AppService;
use ember::config::RobotConfig;
use ember::error::{CommandError, Error};
use ember::genome::Genome;

fn run_line(
    app: &mut AppService<ScriptedRandom>,
    hw: &mut MockHardware,
    store: &MemStore,
    line: &str,
) -> Result<String, Error> {
    let mut sink = RecordingSink::new();
    let cmd = parse_line(line)?;
    let reply = app.handle_command(cmd, 1000, hw, store, &mut sink)?;
    Ok(render_reply(&reply))
}

fn setup() -> (AppService<ScriptedRandom>, MockHardware, MemStore) {
    let genome = Genome {
        light_threshold: 0.25,
        efficiency: 1.5,
        turn_sensitivity: 500.0,
        base_speed: 180,
        bot_id: 6,
        generation: 11,
    };
    let app = AppService::new(RobotConfig::default(), genome, ScriptedRandom::always_left(), 0);
    (app, MockHardware::new(), MemStore::new())
}

#[test]
fn status_line_renders_summary() {
    let (mut app, mut hw, store) = setup();
    let out = run_line(&mut app, &mut hw, &store, "status").unwrap();
    assert!(out.starts_with("bot 6 gen 11"), "{out}");
    assert!(out.contains("IDLE"));
    assert!(out.contains("alive"));
}

#[test]
fn status_json_line_is_the_published_object() {
    let (mut app, mut hw, store) = setup();
    let out = run_line(&mut app, &mut hw, &store, "status json").unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["bot_id"], 6);
    assert_eq!(value["generation"], 11);
    assert_eq!(value["alive"], true);
    assert_eq!(value["distance_cm"], 400);
    assert!(value.get("behavior").is_none());
}

#[test]
fn get_and_set_echo_the_value() {
    let (mut app, mut hw, store) = setup();
    assert_eq!(
        run_line(&mut app, &mut hw, &store, "get base_speed").unwrap(),
        "base_speed = 180"
    );
    assert_eq!(
        run_line(&mut app, &mut hw, &store, "set warn_distance 55").unwrap(),
        "warn_distance = 55"
    );
    assert_eq!(app.config().warn_distance_cm, 55);
}

#[test]
fn help_lists_fields() {
    let (mut app, mut hw, store) = setup();
    let out = run_line(&mut app, &mut hw, &store, "?").unwrap();
    assert!(out.contains("light_threshold"));
    assert!(out.contains("force idle"));
}

#[test]
fn errors_surface_as_command_errors() {
    let (mut app, mut hw, store) = setup();
    assert_eq!(
        run_line(&mut app, &mut hw, &store, "dance"),
        Err(Error::Command(CommandError::UnknownCommand))
    );
    assert_eq!(
        run_line(&mut app, &mut hw, &store, "set speed fast"),
        Err(Error::Command(CommandError::InvalidNumber))
    );
    assert_eq!(
        run_line(&mut app, &mut hw, &store, "f"),
        Err(Error::Command(CommandError::AutonomousActive))
    );
}

#[test]
fn space_bar_stops_and_force_auto_resumes() {
    let (mut app, mut hw, store) = setup();
    let out = run_line(&mut app, &mut hw, &store, " ").unwrap();
    assert!(out.starts_with("ok: emergency stop"));
    assert!(app.is_override_idle());

    assert_eq!(run_line(&mut app, &mut hw, &store, "f 90").unwrap(), "ok: driving");
    assert_eq!(run_line(&mut app, &mut hw, &store, "force auto").unwrap(), "ok: autonomous");
    assert!(!app.is_override_idle());
}

#[test]
fn mutate_reports_new_genome() {
    let (mut app, mut hw, store) = setup();
    let out = run_line(&mut app, &mut hw, &store, "mutate").unwrap();
    assert!(out.starts_with("genome bot 6 gen 12"), "{out}");
}
