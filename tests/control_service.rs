use std::sync::Arc;
use std::time::Duration;

use printer_control::ControlError;
use printer_control::channel::{ChannelMessage, RecordingChannel};
use printer_control::command::JobAction;
use printer_control::config::Config;
use printer_control::model::JobState;
use printer_control::preheat::{MonotonicClock, SimClock};
use printer_control::request::ControlRequest;
use printer_control::service::ControlService;
use tokio::sync::mpsc;

fn two_extruder_config() -> Config {
    let mut config = Config::default();
    config.printer.name = "bench".to_string();
    config.printer.extruders = 2;
    config
}

fn service_with(config: &Config, channel: Arc<RecordingChannel>) -> ControlService {
    ControlService::new(config, channel, Arc::new(SimClock::new()))
}

fn request(line: &str) -> ControlRequest {
    ControlRequest::parse(line).unwrap()
}

#[test]
fn requests_map_to_commands() {
    let channel = Arc::new(RecordingChannel::new());
    let mut service = service_with(&two_extruder_config(), channel.clone());

    for line in [
        r#"{"op": "set_bed_temperature", "temperature": 65}"#,
        r#"{"op": "set_hotend_temperature", "extruder": 1, "temperature": 205.5}"#,
        r#"{"op": "move_head", "x": 5, "speed": 1200}"#,
        r#"{"op": "home_bed"}"#,
    ] {
        assert_eq!(service.handle(request(line)), Ok(None));
    }

    assert_eq!(
        channel.lines(),
        [
            "M140 S65",
            "M104 S205.5 T1",
            "G91",
            "G0 X5 Y0 Z0 F1200",
            "G90",
            "G28 Z"
        ]
    );
}

#[test]
fn preheat_defaults_come_from_config() {
    let channel = Arc::new(RecordingChannel::new());
    let clock = Arc::new(SimClock::new());
    let mut service = ControlService::new(&two_extruder_config(), channel.clone(), clock.clone());

    service.handle(request(r#"{"op": "preheat_bed"}"#)).unwrap();
    service
        .handle(request(r#"{"op": "preheat_hotend", "extruder": 0, "duration": 120}"#))
        .unwrap();

    assert_eq!(channel.lines(), ["M140 S60", "M104 S200 T0"]);
    let status = service.status();
    assert!(status.bed_preheating);
    assert_eq!(status.bed_timer_remaining_secs, Some(900.0));
    assert_eq!(status.hotend_timer_remaining_secs, Some(120.0));
    assert!(status.hotends[0].preheating);
    assert!(status.hotends[0].armed);
    assert!(!status.hotends[1].armed);

    clock.advance(Duration::from_secs(120));
    assert_eq!(service.fire_expired(), 1);
    assert_eq!(service.status().hotend_timer_remaining_secs, None);
}

#[test]
fn rejected_requests_report_errors() {
    let channel = Arc::new(RecordingChannel::new());
    let mut service = service_with(&two_extruder_config(), channel.clone());

    assert!(matches!(
        service.handle(request(r#"{"op": "preheat_hotend", "extruder": 7, "temperature": 200}"#)),
        Err(ControlError::StaleExtruder { position: 7, extruder_count: 2 })
    ));
    assert!(matches!(
        service.handle(request(r#"{"op": "preheat_bed", "temperature": "lukewarm"}"#)),
        Err(ControlError::InvalidValue { .. })
    ));
    assert!(matches!(
        service.handle(request(r#"{"op": "set_job_state", "state": "bogus"}"#)),
        Err(ControlError::UnknownJobState(_))
    ));
    assert!(channel.is_empty());
}

#[test]
fn job_requests_update_the_workspace_job() {
    let channel = Arc::new(RecordingChannel::new());
    let mut service = service_with(&Config::default(), channel.clone());

    service
        .handle(request(r#"{"op": "set_job_state", "state": "pause"}"#))
        .unwrap();
    assert_eq!(service.workspace().job.state(), JobState::Paused);
    let status = service.handle(request(r#"{"op": "status"}"#)).unwrap().unwrap();
    assert_eq!(status.job_state, JobState::Paused);
    assert_eq!(channel.messages(), vec![ChannelMessage::Job(JobAction::Pause)]);
}

#[tokio::test(start_paused = true)]
async fn loop_fires_expiry_on_time() {
    let channel = Arc::new(RecordingChannel::new());
    let clock = Arc::new(MonotonicClock::new());
    let service = ControlService::new(&Config::default(), channel.clone(), clock);
    let (request_tx, request_rx) = mpsc::channel(8);
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(service.run(request_rx, status_tx));

    request_tx
        .send(request(r#"{"op": "preheat_bed", "temperature": 60, "duration": 10}"#))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(channel.lines(), ["M140 S60"]);

    request_tx.send(request(r#"{"op": "status"}"#)).await.unwrap();
    let status = status_rx.recv().await.unwrap();
    assert!(status.bed_preheating);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(channel.lines(), ["M140 S60", "M140 S0"]);

    drop(request_tx);
    let service = handle.await.unwrap();
    assert!(!service.workspace().printer.is_preheating());
}

#[tokio::test(start_paused = true)]
async fn loop_waits_for_armed_timers_after_input_closes() {
    let channel = Arc::new(RecordingChannel::new());
    let clock = Arc::new(MonotonicClock::new());
    let service = ControlService::new(&Config::default(), channel.clone(), clock);
    let (request_tx, request_rx) = mpsc::channel(8);
    let (status_tx, _status_rx) = mpsc::unbounded_channel();

    request_tx
        .send(request(
            r#"{"op": "preheat_hotend", "extruder": 0, "temperature": 200, "duration": 30}"#,
        ))
        .await
        .unwrap();
    drop(request_tx);

    let service = service.run(request_rx, status_tx).await;

    assert_eq!(channel.lines(), ["M104 S200 T0", "M104 S0 T0"]);
    assert!(!service.controller().scheduler().is_hotend_timer_armed());
}
