mod common;

use common::Rig;
use printer_control::ControlError;
use printer_control::model::Printer;

#[test]
fn preheat_sets_target_and_flag() {
    let mut rig = Rig::new(1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 60, 10).unwrap();

    assert_eq!(rig.channel.lines(), ["M140 S60"]);
    assert!(rig.printer.is_preheating());
    assert!(rig.scheduler.is_bed_armed());
    assert_eq!(rig.scheduler.bed_target(), Some(rig.printer.id()));
}

#[test]
fn preheat_rounds_float_values() {
    let mut rig = Rig::new(1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 59.6, 9.5).unwrap();
    assert_eq!(rig.channel.lines(), ["M140 S60"]);

    // 9.5 rounds to 10 (ties to even)
    assert_eq!(rig.advance(9), 0);
    assert_eq!(rig.advance(1), 1);
}

#[test]
fn expiry_reverts_to_zero_and_clears_flag() {
    let mut rig = Rig::new(1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 60, 10).unwrap();

    assert_eq!(rig.advance(9), 0);
    assert!(rig.printer.is_preheating());
    assert_eq!(rig.advance(1), 1);

    assert_eq!(rig.channel.lines(), ["M140 S60", "M140 S0"]);
    assert!(!rig.printer.is_preheating());
    assert!(!rig.scheduler.is_bed_armed());
    assert_eq!(rig.scheduler.next_deadline(), None);
}

#[test]
fn non_numeric_values_are_dropped() {
    let mut rig = Rig::new(1);

    let err = rig.scheduler.preheat_bed(rig.printer.clone(), "hot", 10).unwrap_err();
    assert!(matches!(err, ControlError::InvalidValue { field: "temperature", .. }));
    let err = rig.scheduler.preheat_bed(rig.printer.clone(), 60, f64::NAN).unwrap_err();
    assert!(matches!(err, ControlError::InvalidValue { field: "duration", .. }));
    assert!(rig.scheduler.preheat_bed(rig.printer.clone(), 60, -3).is_err());

    assert!(rig.channel.is_empty());
    assert!(!rig.printer.is_preheating());
    assert!(!rig.scheduler.is_bed_armed());
    assert_eq!(rig.scheduler.bed_target(), None);
}

#[test]
fn invalid_request_leaves_running_preheat_alone() {
    let mut rig = Rig::new(1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 60, 10).unwrap();
    assert!(rig.scheduler.preheat_bed(rig.printer.clone(), "warm", 30).is_err());

    assert_eq!(rig.channel.lines(), ["M140 S60"]);
    assert_eq!(rig.advance(10), 1);
    assert_eq!(rig.channel.lines(), ["M140 S60", "M140 S0"]);
}

#[test]
fn cancel_forces_zero_and_nothing_fires_later() {
    let mut rig = Rig::new(1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 60, 10).unwrap();
    rig.scheduler.cancel_preheat_bed(rig.printer.clone()).unwrap();

    assert_eq!(rig.channel.lines(), ["M140 S60", "M140 S0"]);
    assert!(!rig.printer.is_preheating());
    assert!(!rig.scheduler.is_bed_armed());

    // Neither the zero-length re-arm nor the first 10s deadline fires.
    assert_eq!(rig.advance(0), 0);
    assert_eq!(rig.advance(15), 0);
    assert_eq!(rig.channel.len(), 2);
}

#[test]
fn rearming_replaces_previous_deadline() {
    let mut rig = Rig::new(1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 60, 10).unwrap();
    rig.advance(5);
    rig.scheduler.preheat_bed(rig.printer.clone(), 80, 20).unwrap();

    // The first call's deadline (t=10) passes silently.
    assert_eq!(rig.advance(10), 0);
    assert_eq!(rig.advance(9), 0);
    assert!(rig.printer.is_preheating());
    // t=25 is 20s after the second call.
    assert_eq!(rig.advance(1), 1);
    assert_eq!(rig.advance(60), 0);

    assert_eq!(rig.channel.lines(), ["M140 S60", "M140 S80", "M140 S0"]);
    assert!(!rig.printer.is_preheating());
}

#[test]
fn last_printer_wins_the_bed_timer() {
    let mut rig = Rig::new(1);
    let (other, _) = printer_control::model::PrinterModel::with_extruders("other", 1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 60, 10).unwrap();
    rig.scheduler.preheat_bed(other.clone(), 70, 10).unwrap();

    assert_eq!(rig.scheduler.bed_target(), Some(other.id()));
    assert_eq!(rig.advance(10), 1);
    assert!(!other.is_preheating());
    // The replaced printer is not notified by the expiry.
    assert!(rig.printer.is_preheating());
}

#[test]
fn zero_duration_expires_on_next_poll() {
    let mut rig = Rig::new(1);
    rig.scheduler.preheat_bed(rig.printer.clone(), 60, 0).unwrap();
    assert!(rig.printer.is_preheating());

    assert_eq!(rig.scheduler.fire_expired(), 1);
    assert_eq!(rig.channel.lines(), ["M140 S60", "M140 S0"]);
    assert!(!rig.printer.is_preheating());
}
