#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Protocol tests for the fishing session client.
//!
//! Decodes JSON fixtures shaped exactly like the game server's output, checks
//! lenient handling of missing and `null` fields, and verifies that every
//! outbound command encodes to the flat `type`-tagged object the server reads.

use fishing_session_client::codec::{decode, encode, Inbound};
use fishing_session_client::protocol::{ClientMessage, FishState, ServerMessage};
use fishing_session_client::session::{
    CastTelemetry, CatchOutcome, FightTelemetry, FishBehavior, HookedFish, Location,
};
use fishing_session_client::{Command, SessionError, SessionEvent};
use serde_json::{json, Value};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn event(text: &str) -> SessionEvent {
    match decode(text).expect("decode") {
        Inbound::Event(event) => event,
        Inbound::Unrecognized(kind) => panic!("unexpected unrecognized type {kind}"),
    }
}

fn encoded(command: Command) -> Value {
    serde_json::from_str(&encode(&command).expect("encode")).expect("valid JSON")
}

// ════════════════════════════════════════════════════════════════════
// Inbound fixtures (server output)
// ════════════════════════════════════════════════════════════════════

#[test]
fn connected_fixture() {
    let text = r#"{"type":"connected","message":"Connected to game server"}"#;
    assert_eq!(
        event(text),
        SessionEvent::Greeting {
            message: "Connected to game server".into()
        }
    );
}

#[test]
fn joined_fixture() {
    let text = r#"{
        "type": "joined",
        "session": {"location_id": 3, "location_name": "Silver Lake", "state": "idle"}
    }"#;
    assert_eq!(
        event(text),
        SessionEvent::Joined {
            location: Location {
                id: 3,
                name: "Silver Lake".into()
            }
        }
    );
}

#[test]
fn cast_result_fixture_accepts_integers() {
    let text = r#"{"type":"cast_result","distance":25,"depth":3.5}"#;
    assert_eq!(
        event(text),
        SessionEvent::CastResult(CastTelemetry {
            distance: 25.0,
            depth: 3.5
        })
    );
}

#[test]
fn bite_fixture() {
    let text = r#"{"type":"bite","fish":"Pike","intensity":0.82}"#;
    assert_eq!(
        event(text),
        SessionEvent::Bite {
            fish: "Pike".into(),
            intensity: 0.82
        }
    );
}

#[test]
fn bite_timeout_fixture() {
    let text = r#"{"type":"bite_timeout","message":"The fish got away"}"#;
    assert_eq!(
        event(text),
        SessionEvent::BiteTimeout {
            message: "The fish got away".into()
        }
    );
}

#[test]
fn fight_started_fixture() {
    let text = r#"{"type":"fight_started","fish":"Pike","weight":4.37}"#;
    assert_eq!(
        event(text),
        SessionEvent::FightStarted(HookedFish {
            name: "Pike".into(),
            weight: 4.37
        })
    );
}

#[test]
fn fight_update_fixture() {
    let text = r#"{
        "type": "fight_update",
        "state": {
            "fish_state": "rush",
            "fish_stamina": 64.2,
            "fish_distance": 18.0,
            "fish_direction": -35.5,
            "line_tension": 91.0,
            "line_health": 72.5,
            "drag_level": 0.6,
            "is_critical": true
        }
    }"#;
    assert_eq!(
        event(text),
        SessionEvent::FightUpdate(FightTelemetry {
            behavior: FishBehavior::Rush,
            fish_stamina: 64.2,
            fish_distance: 18.0,
            fish_direction: -35.5,
            line_tension: 91.0,
            line_health: 72.5,
            drag_level: 0.6,
            critical: true,
        })
    );
}

#[test]
fn catch_success_fixture() {
    let text = r#"{
        "type": "catch",
        "result": {
            "success": true,
            "fish_name": "Pike",
            "weight": 4.37,
            "price": 120,
            "experience": 45,
            "leveled_up": true,
            "new_level": 3,
            "achievements": ["First Pike"]
        }
    }"#;
    let SessionEvent::Catch(CatchOutcome::Landed(reward)) = event(text) else {
        panic!("expected landed catch");
    };
    assert_eq!(reward.fish_name, "Pike");
    assert_eq!(reward.price, 120);
    assert_eq!(reward.experience, 45);
    assert!(reward.leveled_up);
    assert_eq!(reward.new_level, Some(3));
    assert_eq!(reward.achievements, vec!["First Pike".to_string()]);
}

#[test]
fn catch_failure_fixture() {
    let text = r#"{"type":"catch","result":{"success":false,"reason":"line_break"}}"#;
    assert_eq!(
        event(text),
        SessionEvent::Catch(CatchOutcome::Lost {
            reason: "line_break".into()
        })
    );
}

#[test]
fn error_fixture() {
    let text = r#"{"type":"error","message":"Location not found"}"#;
    assert_eq!(
        event(text),
        SessionEvent::Error {
            message: "Location not found".into()
        }
    );
}

// ════════════════════════════════════════════════════════════════════
// Lenient decoding
// ════════════════════════════════════════════════════════════════════

#[test]
fn missing_fields_decode_to_zero_values() {
    assert_eq!(
        event(r#"{"type":"cast_result"}"#),
        SessionEvent::CastResult(CastTelemetry {
            distance: 0.0,
            depth: 0.0
        })
    );
    assert_eq!(
        event(r#"{"type":"fight_update"}"#),
        SessionEvent::FightUpdate(FightTelemetry::default())
    );
    assert_eq!(
        event(r#"{"type":"catch","result":{}}"#),
        SessionEvent::Catch(CatchOutcome::Lost {
            reason: String::new()
        })
    );
}

#[test]
fn null_fields_decode_to_zero_values() {
    assert_eq!(
        event(r#"{"type":"bite","fish":null,"intensity":null}"#),
        SessionEvent::Bite {
            fish: String::new(),
            intensity: 0.0
        }
    );
    assert_eq!(
        event(r#"{"type":"joined","session":null}"#),
        SessionEvent::Joined {
            location: Location {
                id: 0,
                name: String::new()
            }
        }
    );
    let SessionEvent::Catch(CatchOutcome::Landed(reward)) =
        event(r#"{"type":"catch","result":{"success":true,"new_level":null,"achievements":null}}"#)
    else {
        panic!("expected landed catch");
    };
    assert_eq!(reward.new_level, None);
    assert!(reward.achievements.is_empty());
}

#[test]
fn zero_new_level_means_not_reported() {
    let SessionEvent::Catch(CatchOutcome::Landed(reward)) =
        event(r#"{"type":"catch","result":{"success":true,"new_level":0}}"#)
    else {
        panic!("expected landed catch");
    };
    assert_eq!(reward.new_level, None);
}

#[test]
fn extra_fields_are_ignored() {
    assert_eq!(
        event(r#"{"type":"error","message":"x","code":42,"debug":{"a":1}}"#),
        SessionEvent::Error {
            message: "x".into()
        }
    );
}

#[test]
fn unknown_fish_state_maps_to_passive() {
    let state: FishState = serde_json::from_str(r#""thrashing""#).unwrap();
    assert_eq!(state, FishState::Unknown);
    let SessionEvent::FightUpdate(telemetry) =
        event(r#"{"type":"fight_update","state":{"fish_state":"thrashing"}}"#)
    else {
        panic!("expected fight_update");
    };
    assert_eq!(telemetry.behavior, FishBehavior::Passive);
}

// ════════════════════════════════════════════════════════════════════
// Unknown and malformed input
// ════════════════════════════════════════════════════════════════════

#[test]
fn unknown_type_is_reported_not_failed() {
    assert_eq!(
        decode(r#"{"type":"tournament_started","id":9}"#).unwrap(),
        Inbound::Unrecognized("tournament_started".into())
    );
    let raw: ServerMessage = serde_json::from_str(r#"{"type":"tournament_started"}"#).unwrap();
    assert_eq!(raw, ServerMessage::Unknown);
}

#[test]
fn malformed_input_is_a_serialization_error() {
    for text in [
        "",
        "not json",
        "42",
        r#""joined""#,
        "[]",
        r#"{"message":"no type"}"#,
        r#"{"type":null}"#,
        r#"{"type":"cast_result","distance":"far"}"#,
        r#"{"type":"joined","session":"Silver Lake"}"#,
    ] {
        assert!(
            matches!(decode(text), Err(SessionError::Serialization(_))),
            "expected serialization error for {text:?}"
        );
    }
}

// ════════════════════════════════════════════════════════════════════
// Outbound encoding
// ════════════════════════════════════════════════════════════════════

#[test]
fn commands_encode_as_flat_objects() {
    assert_eq!(
        encoded(Command::Join { location_id: 3 }),
        json!({"type": "join", "location_id": 3})
    );
    assert_eq!(
        encoded(Command::cast(0.75, 30.0)),
        json!({"type": "cast", "power": 0.75, "angle": 30.0})
    );
    assert_eq!(encoded(Command::Hook), json!({"type": "hook"}));
    assert_eq!(
        encoded(Command::reel(0.5)),
        json!({"type": "reel", "speed": 0.5})
    );
    assert_eq!(encoded(Command::Release), json!({"type": "release"}));
    assert_eq!(
        encoded(Command::set_drag(0.4)),
        json!({"type": "set_drag", "level": 0.4})
    );
    assert_eq!(encoded(Command::Hold), json!({"type": "hold"}));
}

#[test]
fn encoded_commands_are_clamped() {
    assert_eq!(
        encoded(Command::cast(2.0, 135.0)),
        json!({"type": "cast", "power": 1.0, "angle": 90.0})
    );
    assert_eq!(
        encoded(Command::set_drag(0.0)),
        json!({"type": "set_drag", "level": 0.1})
    );
    assert_eq!(
        encoded(Command::reel(-3.0)),
        json!({"type": "reel", "speed": 0.0})
    );
}

#[test]
fn client_messages_parse_back_from_server_shapes() {
    let msg: ClientMessage = serde_json::from_str(r#"{"type":"join","location_id":12}"#).unwrap();
    assert_eq!(msg, ClientMessage::Join { location_id: 12 });
    let msg: ClientMessage = serde_json::from_str(r#"{"type":"set_drag","level":0.3}"#).unwrap();
    assert_eq!(msg, ClientMessage::SetDrag { level: 0.3 });
}
