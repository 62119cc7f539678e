use std::collections::VecDeque;

use bytes::Bytes;
use s3g::gcode::{BuildState, GcodeErrorKind, Interpreter, Profile};
use s3g::protocol::{Axis, ProtocolError, Value};
use s3g::transport::{self, TransportError, Writer};
use s3g::Error;

/// Device stand-in: records every payload, answers queries from a script.
#[derive(Default)]
struct Device {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
}

impl Writer for Device {
    fn send_action_payload(&mut self, payload: &[u8]) -> transport::Result<()> {
        self.sent.push(payload.to_vec());
        Ok(())
    }

    fn send_query_payload(&mut self, payload: &[u8]) -> transport::Result<Bytes> {
        self.sent.push(payload.to_vec());
        self.replies
            .pop_front()
            .map(Bytes::from)
            .ok_or(TransportError::Timeout { waited_ms: 0 })
    }
}

fn dual() -> Interpreter<Device> {
    Interpreter::new(Device::default(), Profile::replicator_dual())
}

fn sent(interpreter: &Interpreter<Device>) -> &[Vec<u8>] {
    &interpreter.machine().writer().sent
}

fn kind(result: s3g::Result<Option<Value>>) -> GcodeErrorKind {
    match result {
        Err(Error::Gcode(err)) => err.kind,
        other => panic!("expected a G-code error, got {other:?}"),
    }
}

fn i32_at(payload: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(payload[offset..offset + 4].try_into().unwrap())
}

fn u32_at(payload: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(payload[offset..offset + 4].try_into().unwrap())
}

/// Steps and rate carried by a `QUEUE_EXTENDED_POINT` payload
fn queued_point(payload: &[u8]) -> ([i32; 5], u32) {
    assert_eq!(payload[0], 139);
    assert_eq!(payload.len(), 25);
    let steps = std::array::from_fn(|i| i32_at(payload, 1 + 4 * i));
    (steps, u32_at(payload, 21))
}

#[test]
fn test_linear_move() {
    let mut interpreter = dual();
    assert_eq!(interpreter.execute_line("G1 X10 Y0 Z0 F1000").unwrap(), None);

    let spm = Profile::replicator_dual().steps_per_mm();
    let (steps, rate) = queued_point(&sent(&interpreter)[0]);
    assert_eq!(steps, [941, 0, 0, 0, 0]);
    let expected = (10.0 / 1000.0) * 60.0 * 1_000_000.0 / (10.0 * spm[0]);
    assert_eq!(rate, expected.round() as u32);

    let state = interpreter.state();
    assert_eq!(state.position.get(Axis::X), Some(10.0));
    assert_eq!(state.feedrate, Some(1000.0));
}

#[test]
fn test_feedrate_reused() {
    let mut interpreter = dual();
    interpreter.execute_line("G1 X1 F600").unwrap();
    interpreter.execute_line("G0 X2").unwrap();
    assert_eq!(sent(&interpreter).len(), 2);
    assert_eq!(interpreter.state().feedrate, Some(600.0));
}

#[test]
fn test_missing_feedrate() {
    let mut interpreter = dual();
    assert_eq!(
        kind(interpreter.execute_line("G1 X1")),
        GcodeErrorKind::MissingCode { letter: 'F' }
    );
    assert!(sent(&interpreter).is_empty());
}

#[test]
fn test_non_positive_feedrate_rejected_on_its_line() {
    let mut interpreter = dual();
    for (line, value) in [("G1 F-5", -5.0), ("G1 F0", 0.0), ("G0 X1 F-100", -100.0)] {
        assert_eq!(
            kind(interpreter.execute_line(line)),
            GcodeErrorKind::OutOfRange { letter: 'F', value },
            "{line}"
        );
    }
    assert_eq!(interpreter.state().feedrate, None);
    assert_eq!(interpreter.state().position.get(Axis::X), Some(0.0));
    assert!(sent(&interpreter).is_empty());

    assert_eq!(
        kind(interpreter.execute_line("G1 X1")),
        GcodeErrorKind::MissingCode { letter: 'F' }
    );
}

#[test]
fn test_zero_length_move_stores_feedrate() {
    let mut interpreter = dual();
    assert_eq!(interpreter.execute_line("G1 X0 F500").unwrap(), None);
    assert!(sent(&interpreter).is_empty());
    assert_eq!(interpreter.state().feedrate, Some(500.0));
}

#[test]
fn test_z_move_limited_to_axis_maximum() {
    let mut interpreter = dual();
    interpreter.execute_line("G1 Z5 F5000").unwrap();

    let spm = Profile::replicator_dual().steps_per_mm();
    let (steps, rate) = queued_point(&sent(&interpreter)[0]);
    assert_eq!(steps[2], 2000);
    let expected = (5.0 / 1170.0) * 60.0 * 1_000_000.0 / (5.0 * spm[2]);
    assert_eq!(rate, expected.round() as u32);
}

#[test]
fn test_extrusion_needs_tool() {
    let mut interpreter = dual();
    assert_eq!(
        kind(interpreter.execute_line("G1 X1 E5 F100")),
        GcodeErrorKind::NoToolIndex
    );
    assert!(sent(&interpreter).is_empty());
    assert_eq!(interpreter.state().position.get(Axis::X), Some(0.0));
}

#[test]
fn test_extrusion_alias_follows_tool() {
    let mut interpreter = dual();
    interpreter.execute_line("M135 T1").unwrap();
    assert_eq!(sent(&interpreter)[0], vec![134, 1]);
    assert_eq!(interpreter.state().active_tool, Some(1));

    interpreter.execute_line("G1 E5 F100").unwrap();
    let (steps, _) = queued_point(&sent(&interpreter)[1]);
    assert_eq!(steps, [0, 0, 0, 0, 481]);
    assert_eq!(interpreter.state().position.get(Axis::B), Some(5.0));

    interpreter.execute_line("M135 T0").unwrap();
    interpreter.execute_line("G1 E2").unwrap();
    let (steps, _) = queued_point(&sent(&interpreter)[3]);
    assert_eq!(steps[Axis::A.index()], 193);
}

#[test]
fn test_extrusion_conflicts() {
    let mut interpreter = dual();
    interpreter.execute_line("M135 T0").unwrap();
    for (line, codes) in [
        ("G1 E1 A1 F100", "AE"),
        ("G1 E1 B1 F100", "BE"),
        ("G1 E1 A1 B1 F100", "ABE"),
        ("G92 E0 A0", "AE"),
        ("G92 E0 A0 B0", "ABE"),
    ] {
        assert_eq!(
            kind(interpreter.execute_line(line)),
            GcodeErrorKind::ConflictingCodes {
                codes: codes.into()
            },
            "{line}"
        );
    }
    assert_eq!(sent(&interpreter).len(), 1);
}

#[test]
fn test_both_extruders_in_one_move() {
    let mut interpreter = dual();
    assert_eq!(
        kind(interpreter.execute_line("G1 A1 B1 F100")),
        GcodeErrorKind::ConflictingCodes { codes: "AB".into() }
    );
    interpreter.execute_line("G92 A1 B1").unwrap();
    assert_eq!(interpreter.state().position.get(Axis::B), Some(1.0));
}

#[test]
fn test_set_position() {
    let mut interpreter = dual();
    interpreter.execute_line("G92 X1 Z-2").unwrap();

    let payload = &sent(&interpreter)[0];
    assert_eq!(payload[0], 140);
    assert_eq!(payload.len(), 21);
    assert_eq!(i32_at(payload, 1), 94);
    assert_eq!(i32_at(payload, 5), 0);
    assert_eq!(i32_at(payload, 9), -800);
    assert_eq!(interpreter.state().position.get(Axis::Z), Some(-2.0));
}

#[test]
fn test_homing_invalidates_axes() {
    let mut interpreter = dual();
    interpreter.execute_line("G161 X Y F2500").unwrap();

    let payload = &sent(&interpreter)[0];
    let spm = Profile::replicator_dual().steps_per_mm();
    let rate = 60.0 * 1_000_000.0 / (2500.0 * spm[0]);
    assert_eq!(payload[..2], [131, 0x03]);
    assert_eq!(u32_at(payload, 2), rate.round() as u32);
    assert_eq!(payload[6..], [40, 0]);

    let position = interpreter.state().position;
    assert_eq!(position.get(Axis::X), None);
    assert_eq!(position.get(Axis::Y), None);
    assert_eq!(position.get(Axis::Z), Some(0.0));

    assert_eq!(
        kind(interpreter.execute_line("G1 Z1 F100")),
        GcodeErrorKind::UnknownPosition { axis: Axis::X }
    );
    assert_eq!(
        kind(interpreter.execute_line("G92 X0")),
        GcodeErrorKind::UnknownPosition { axis: Axis::Y }
    );

    interpreter.execute_line("G92 X0 Y0").unwrap();
    interpreter.execute_line("G1 Z1 F100").unwrap();
    assert_eq!(sent(&interpreter).len(), 3);
}

#[test]
fn test_move_needs_known_start_even_when_defining_every_axis() {
    let mut interpreter = dual();
    interpreter.execute_line("G161 X Y F2500").unwrap();

    assert_eq!(
        kind(interpreter.execute_line("G1 X0 Y0 Z1 F100")),
        GcodeErrorKind::UnknownPosition { axis: Axis::X }
    );
    assert_eq!(sent(&interpreter).len(), 1);
    assert_eq!(interpreter.state().position.get(Axis::X), None);

    // only G92 may define unknown axes
    interpreter.execute_line("G92 X0 Y0").unwrap();
    interpreter.execute_line("G1 X0 Y0 Z1 F100").unwrap();
    assert_eq!(interpreter.state().position.get(Axis::Z), Some(1.0));
}

#[test]
fn test_homing_maximums_uses_its_timeout() {
    let mut interpreter = dual();
    interpreter.execute_line("G162 Z F5000").unwrap();
    let payload = &sent(&interpreter)[0];
    assert_eq!(payload[..2], [132, 0x04]);
    assert_eq!(payload[6..], [60, 0]);
}

#[test]
fn test_homing_without_axes_sends_nothing() {
    let mut interpreter = dual();
    interpreter.execute_line("G161 F100").unwrap();
    assert!(sent(&interpreter).is_empty());
    assert_eq!(
        kind(interpreter.execute_line("G162 X")),
        GcodeErrorKind::MissingCode { letter: 'F' }
    );
}

#[test]
fn test_offsets() {
    let mut interpreter = dual();
    assert_eq!(
        kind(interpreter.execute_line("G10 P3 X1 Y1 Z1")),
        GcodeErrorKind::InvalidOffset { register: 3.0 }
    );
    assert_eq!(
        kind(interpreter.execute_line("G10 P1 X1 Y2")),
        GcodeErrorKind::MissingCode { letter: 'Z' }
    );
    assert_eq!(
        kind(interpreter.execute_line("G10 P0 X1")),
        GcodeErrorKind::InvalidOffset { register: 0.0 }
    );
    assert_eq!(
        kind(interpreter.execute_line("G10 X1 Y1 Z1")),
        GcodeErrorKind::MissingCode { letter: 'P' }
    );

    interpreter.execute_line("G10 P1 X1 Y2 Z3").unwrap();
    assert_eq!(interpreter.state().offset_registers[0], [1.0, 2.0, 3.0, 0.0, 0.0]);
    assert_eq!(interpreter.state().offset_registers[1], [0.0; 5]);
    assert!(sent(&interpreter).is_empty());

    interpreter.execute_line("G54").unwrap();
    interpreter.execute_line("G1 X1 F100").unwrap();
    let (steps, _) = queued_point(&sent(&interpreter)[0]);
    assert_eq!(steps, [188, 188, 1200, 0, 0]);
    assert_eq!(interpreter.state().position.get(Axis::X), Some(1.0));

    interpreter.execute_line("G55").unwrap();
    assert_eq!(interpreter.state().active_offset, Some(2));
}

#[test]
fn test_dwell() {
    let mut interpreter = dual();
    interpreter.execute_line("G4 P100").unwrap();
    assert_eq!(sent(&interpreter)[0], vec![133, 0xA0, 0x86, 0x01, 0x00]);
}

#[test]
fn test_potentiometers_in_axis_order() {
    let mut interpreter = dual();
    interpreter.execute_line("G130 Z40 X20").unwrap();
    assert_eq!(sent(&interpreter), &[vec![145, 0x01, 20], vec![145, 0x04, 40]]);

    assert_eq!(
        kind(interpreter.execute_line("G130 X20 Y300")),
        GcodeErrorKind::OutOfRange {
            letter: 'Y',
            value: 300.0
        }
    );
    assert_eq!(sent(&interpreter).len(), 2);
}

#[test]
fn test_axes_toggles() {
    let mut interpreter = dual();
    interpreter.execute_line("M17 X Y").unwrap();
    interpreter.execute_line("M18 A B").unwrap();
    assert_eq!(sent(&interpreter), &[vec![137, 0x83], vec![137, 0x18]]);
}

#[test]
fn test_home_positions() {
    let mut interpreter = dual();
    interpreter.execute_line("M131 X Y").unwrap();
    interpreter.execute_line("M132 X").unwrap();
    assert_eq!(sent(&interpreter), &[vec![143, 0x03], vec![144, 0x01]]);
    assert_eq!(interpreter.state().position.get(Axis::X), None);
    assert_eq!(interpreter.state().position.get(Axis::Y), Some(0.0));
}

#[test]
fn test_display_message() {
    let mut interpreter = dual();
    interpreter.execute_line("M70 P5 (hello)").unwrap();
    assert_eq!(
        sent(&interpreter)[0],
        vec![149, 0x02, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0]
    );
}

#[test]
fn test_song() {
    let mut interpreter = dual();
    interpreter.execute_line("M72 P1").unwrap();
    assert_eq!(sent(&interpreter)[0], vec![151, 1]);
}

#[test]
fn test_build_lifecycle() {
    let mut interpreter = dual();
    assert_eq!(
        kind(interpreter.execute_line("M73 P0")),
        GcodeErrorKind::NoBuildName
    );
    assert!(sent(&interpreter).is_empty());

    interpreter.set_build_name("part");
    interpreter.execute_line("M73 P0").unwrap();
    assert_eq!(
        sent(&interpreter),
        &[vec![153, 0, 0, 0, 0, b'p', b'a', b'r', b't', 0], vec![150, 0, 0]]
    );
    assert_eq!(interpreter.state().build, BuildState::Started);

    interpreter.execute_line("M73 P50").unwrap();
    assert_eq!(sent(&interpreter)[2], vec![150, 50, 0]);

    interpreter.execute_line("M73 P100").unwrap();
    assert_eq!(sent(&interpreter)[3..], [vec![150, 100, 0], vec![154, 0]]);
    assert_eq!(interpreter.state().build_name, None);
    assert_eq!(interpreter.state().build, BuildState::NoBuild);
}

#[test]
fn test_bad_percentage() {
    let mut interpreter = dual();
    for line in ["M73 P101", "M73 P-1"] {
        assert!(matches!(
            kind(interpreter.execute_line(line)),
            GcodeErrorKind::BadPercentage { .. }
        ));
    }
    assert!(sent(&interpreter).is_empty());
}

#[test]
fn test_temperatures_leave_active_tool() {
    let mut interpreter = dual();
    interpreter.execute_line("M104 S220 T1").unwrap();
    interpreter.execute_line("M109 S110 T0").unwrap();
    assert_eq!(
        sent(&interpreter),
        &[vec![136, 1, 3, 2, 220, 0], vec![136, 0, 31, 2, 110, 0]]
    );
    assert_eq!(interpreter.state().active_tool, None);

    assert_eq!(
        kind(interpreter.execute_line("M104 S220")),
        GcodeErrorKind::MissingCode { letter: 'T' }
    );
}

#[test]
fn test_get_temperature() {
    let mut interpreter = dual();
    interpreter
        .machine_mut()
        .writer_mut()
        .replies
        .push_back(vec![0x81, 0xDC, 0x00]);

    assert_eq!(
        interpreter.execute_line("M105 T0").unwrap(),
        Some(Value::Temperature(220))
    );
    assert_eq!(interpreter.execute_line("M105").unwrap(), None);
    assert_eq!(sent(&interpreter), &[vec![10, 0, 2]]);
}

#[test]
fn test_device_error_surfaces_unchanged() {
    let mut interpreter = dual();
    interpreter
        .machine_mut()
        .writer_mut()
        .replies
        .push_back(vec![0x85]);
    assert!(matches!(
        interpreter.execute_line("M105 T0"),
        Err(Error::Protocol(ProtocolError::CommandNotSupported))
    ));
}

#[test]
fn test_extra_output() {
    let mut interpreter = dual();
    interpreter.execute_line("M126 T0").unwrap();
    interpreter.execute_line("M127 T0").unwrap();
    assert_eq!(sent(&interpreter), &[vec![136, 0, 13, 1, 1], vec![136, 0, 13, 1, 0]]);
}

#[test]
fn test_wait_for_ready() {
    let mut interpreter = dual();
    interpreter.execute_line("M133 T0").unwrap();
    interpreter.execute_line("M133 T1 P5").unwrap();
    interpreter.execute_line("M134 T0").unwrap();
    assert_eq!(
        sent(&interpreter),
        &[
            vec![135, 0, 100, 0, 0x58, 0x02],
            vec![135, 1, 100, 0, 5, 0],
            vec![141, 0, 100, 0, 0x58, 0x02],
        ]
    );
}

#[test]
fn test_change_tool_bounds() {
    let mut interpreter = dual();
    assert_eq!(
        kind(interpreter.execute_line("M135 T2")),
        GcodeErrorKind::InvalidToolIndex { index: 2.0 }
    );
    let mut single = Interpreter::new(Device::default(), Profile::replicator_single());
    assert_eq!(
        kind(single.execute_line("M135 T1")),
        GcodeErrorKind::InvalidToolIndex { index: 1.0 }
    );
    assert!(sent(&interpreter).is_empty());
}

#[test]
fn test_deprecated_extruder_commands() {
    let mut interpreter = dual();
    for line in ["M101", "M102 T0", "M103"] {
        assert_eq!(interpreter.execute_line(line).unwrap(), None);
    }
    assert!(sent(&interpreter).is_empty());
}

#[test]
fn test_comments_and_blank_lines() {
    let mut interpreter = dual();
    assert_eq!(interpreter.execute_line("").unwrap(), None);
    assert_eq!(interpreter.execute_line("(only a comment)").unwrap(), None);
    assert_eq!(interpreter.execute_line("; also a comment\r\n").unwrap(), None);
    assert!(sent(&interpreter).is_empty());
    assert_eq!(interpreter.state().line_number, 3);
}

#[test]
fn test_syntax_errors() {
    let mut interpreter = dual();
    assert_eq!(
        kind(interpreter.execute_line("G1 X1 X2")),
        GcodeErrorKind::RepeatCode { letter: 'X' }
    );
    assert_eq!(
        kind(interpreter.execute_line("G1 X1 (open")),
        GcodeErrorKind::UnterminatedComment
    );
    assert_eq!(
        kind(interpreter.execute_line("M999")),
        GcodeErrorKind::UnrecognizedCommand {
            command: "M999".into()
        }
    );
    assert_eq!(
        kind(interpreter.execute_line(b"M105 \xC3\x28".as_slice())),
        GcodeErrorKind::ImproperEncoding
    );
}

#[test]
fn test_error_display_has_context() {
    let mut interpreter = dual();
    interpreter.execute_line("G92 X0").unwrap();
    let err = interpreter.execute_line("G4 P1 Q2").unwrap_err();
    assert_eq!(err.to_string(), "line 2 `G4 P1 Q2`: invalid codes: Q");
}

#[test]
fn test_print_sequences() {
    let mut interpreter = dual();
    interpreter.set_build_name("calibration");
    interpreter.execute_start_sequence().unwrap();

    let state = interpreter.state();
    assert_eq!(state.build, BuildState::Started);
    assert_eq!(state.active_tool, Some(0));
    assert_eq!(state.position.get(Axis::X), Some(-112.0));
    assert_eq!(state.position.get(Axis::Z), Some(150.0));

    interpreter.execute_line("G1 X0 Y0 Z0.3 F3000").unwrap();
    interpreter.execute_end_sequence().unwrap();

    let state = interpreter.state();
    assert_eq!(state.build, BuildState::NoBuild);
    assert_eq!(state.build_name, None);
    assert_eq!(state.position.get(Axis::Z), None);
    assert_eq!(sent(&interpreter).last().unwrap(), &vec![154, 0]);
}
