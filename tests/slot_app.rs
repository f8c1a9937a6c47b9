//! End-to-end tests: configuration file to published property state.

use slot_core::{
    PropertyEvent, PropertyState, PropertyValues, LABEL_PROPERTY, POSITION_FIELD,
    POSITION_PROPERTY,
};
use slot_daq::{AppConfig, SlotApp};
use std::io::Write;
use std::time::Duration;

fn load(contents: &str) -> AppConfig {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    AppConfig::load_from(file.path()).unwrap()
}

const REALISTIC: &str = r#"
[device]
name = "Imaging Wheel"
max = 5

[driver]
type = "mock_filter_wheel"

[driver.config]
slot_count = 5
mode = "realistic"
ms_per_slot = 3
settle_ms = 1
filter_names = ["L", "R", "G", "B", "Ha"]
"#;

#[tokio::test]
async fn test_select_sequence_publishes_every_transition() {
    let app = SlotApp::build(&load(REALISTIC)).await.unwrap();
    let mut events = app.registry().subscribe();

    for slot in [3, 5, 1] {
        assert_eq!(app.select(slot, Duration::from_secs(5)).await.unwrap(), slot);
    }

    let mut transitions = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let PropertyEvent::Updated(vector) = event {
            if vector.name() == POSITION_PROPERTY {
                let value = vector.number(POSITION_FIELD).unwrap() as i32;
                transitions.push((vector.state, value));
            }
        }
    }

    assert_eq!(
        transitions,
        vec![
            (PropertyState::Busy, 1),
            (PropertyState::Ok, 3),
            (PropertyState::Busy, 3),
            (PropertyState::Ok, 5),
            (PropertyState::Busy, 5),
            (PropertyState::Ok, 1),
        ]
    );
}

#[tokio::test]
async fn test_published_vectors_carry_protocol_shape() {
    let app = SlotApp::build(&load(REALISTIC)).await.unwrap();

    let position = app
        .registry()
        .get("Imaging Wheel", POSITION_PROPERTY)
        .unwrap();
    assert_eq!(position.state, PropertyState::Ok);
    assert_eq!(position.timeout_secs, 60);
    match &position.values {
        PropertyValues::Number(fields) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].name, POSITION_FIELD);
            assert_eq!((fields[0].min, fields[0].max, fields[0].step), (1.0, 5.0, 1.0));
            assert_eq!(fields[0].value, 1.0);
        }
        other => panic!("expected number vector, got {other:?}"),
    }

    let labels = app.registry().get("Imaging Wheel", LABEL_PROPERTY).unwrap();
    assert_eq!(labels.text("FILTER_SLOT_NAME_5"), Some("Ha"));
}

#[tokio::test]
async fn test_rename_then_snapshot() {
    let app = SlotApp::build(&load(REALISTIC)).await.unwrap();

    app.rename(&[(1, "Luminance".to_string())]).await.unwrap();
    let snapshot = app.snapshot();
    let labels = snapshot.labels.unwrap();
    assert_eq!(labels.label(0), Some("Luminance"));
    assert_eq!(labels.label(1), Some("R"));
    assert_eq!(labels.state(), PropertyState::Ok);

    let json = serde_json::to_value(app.snapshot()).unwrap();
    assert_eq!(json["position"]["value"], 1);
}

#[tokio::test]
async fn test_select_times_out_when_wheel_is_slow() {
    let app = SlotApp::build(&load(
        r#"
        [driver.config]
        mode = "realistic"
        ms_per_slot = 500
        "#,
    ))
    .await
    .unwrap();

    let err = app.select(6, Duration::from_millis(20)).await.unwrap_err();
    assert!(err.to_string().contains("not reached"));
    assert_eq!(app.snapshot().position.state(), PropertyState::Busy);
}
