//! G-code interpreter
//!
//! [`Interpreter::execute_line`] tokenizes a line, finds its
//! [`Instruction`](super::Instruction), validates the codes and flags
//! against it and runs the handler. A handler checks everything it needs
//! and builds every [`ProtocolCall`] before sending the first one, and
//! updates [`InterpreterState`] only after the device accepted them, so a
//! rejected line leaves no trace.

use tracing::{debug, instrument, trace};

use super::dda::{calculate_dda_speed, homing_rate};
use super::error::{GcodeError, GcodeErrorKind};
use super::instructions::{Handler, lookup};
use super::parser::{ParsedLine, parse_line};
use super::profile::Profile;
use super::state::{BuildState, InterpreterState};
use crate::error::{Error, Result};
use crate::machine::Machine;
use crate::protocol::{
    Axis, AxisSet, DisplayOptions, MAX_TOOL_INDEX, ProtocolCall, ProtocolError, Value,
};
use crate::transport::Writer;

/// Why a handler stopped: a problem with the line, or with the device
enum Failure {
    Line(GcodeErrorKind),
    Device(Error),
}

impl From<GcodeErrorKind> for Failure {
    fn from(kind: GcodeErrorKind) -> Self {
        Self::Line(kind)
    }
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Self::Device(err)
    }
}

impl From<ProtocolError> for Failure {
    fn from(err: ProtocolError) -> Self {
        Self::Device(err.into())
    }
}

type Step<T> = std::result::Result<T, Failure>;

/// Turns G-code lines into device calls
#[derive(Debug)]
pub struct Interpreter<W> {
    machine: Machine<W>,
    profile: Profile,
    state: InterpreterState,
    command: String,
}

impl<W: Writer> Interpreter<W> {
    /// Interpreter for the device behind `writer`
    pub fn new(writer: W, profile: Profile) -> Self {
        Self {
            machine: Machine::new(writer),
            profile,
            state: InterpreterState::default(),
            command: String::new(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &InterpreterState {
        &self.state
    }

    /// Mutable state, for restoring a session
    pub const fn state_mut(&mut self) -> &mut InterpreterState {
        &mut self.state
    }

    /// Device profile
    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Device
    pub const fn machine(&self) -> &Machine<W> {
        &self.machine
    }

    /// Device, for calls that have no G-code
    pub const fn machine_mut(&mut self) -> &mut Machine<W> {
        &mut self.machine
    }

    /// Give the writer back
    pub fn into_writer(self) -> W {
        self.machine.into_writer()
    }

    /// Name announced by the next `M73 P0`
    pub fn set_build_name(&mut self, name: impl Into<String>) {
        self.state.build_name = Some(name.into());
    }

    /// Run the profile's print start sequence
    pub fn execute_start_sequence(&mut self) -> Result<()> {
        let lines = self.profile.print_start_sequence.clone();
        self.execute_lines(&lines)
    }

    /// Run the profile's print end sequence
    pub fn execute_end_sequence(&mut self) -> Result<()> {
        let lines = self.profile.print_end_sequence.clone();
        self.execute_lines(&lines)
    }

    fn execute_lines(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            self.execute_line(line)?;
        }
        Ok(())
    }

    /// Execute one line.
    ///
    /// Blank and comment-only lines do nothing. Only `M105 T<n>` returns a
    /// value.
    #[instrument(level = "debug", skip_all, fields(line = self.state.line_number + 1))]
    pub fn execute_line(&mut self, line: impl AsRef<[u8]>) -> Result<Option<Value>> {
        self.state.line_number += 1;
        let raw = line.as_ref();
        let Ok(text) = std::str::from_utf8(raw) else {
            self.command = String::from_utf8_lossy(raw).trim_end().to_owned();
            return Err(self.fail(GcodeErrorKind::ImproperEncoding));
        };
        self.command = text.trim_end_matches(['\r', '\n']).to_owned();

        let parsed = parse_line(text).map_err(|kind| self.fail(kind))?;
        if parsed.is_empty() {
            trace!("nothing to execute");
            return Ok(None);
        }
        let (letter, number) = parsed
            .command()
            .ok_or_else(|| self.fail(GcodeErrorKind::MissingCommand))?;
        let instruction = command_number(number)
            .and_then(|number| lookup(letter, number))
            .ok_or_else(|| {
                self.fail(GcodeErrorKind::UnrecognizedCommand {
                    command: format!("{letter}{number}"),
                })
            })?;
        instruction
            .validate(&parsed)
            .map_err(|kind| self.fail(kind))?;

        debug!(command = %self.command, handler = ?instruction.handler, "executing");
        match self.run(instruction.handler, &parsed) {
            Ok(value) => Ok(value),
            Err(Failure::Line(kind)) => Err(self.fail(kind)),
            Err(Failure::Device(err)) => Err(err),
        }
    }

    fn fail(&self, kind: GcodeErrorKind) -> Error {
        GcodeError::new(self.state.line_number, self.command.clone(), kind).into()
    }

    fn run(&mut self, handler: Handler, line: &ParsedLine) -> Step<Option<Value>> {
        match handler {
            Handler::LinearMove => self.linear_move(line),
            Handler::Dwell => self.dwell(line),
            Handler::StoreOffsets => self.store_offsets(line),
            Handler::UseOffsets(register) => {
                self.state.active_offset = Some(register);
                Ok(None)
            }
            Handler::SetPosition => self.set_position(line),
            Handler::SetPotentiometers => self.set_potentiometers(line),
            Handler::FindAxesMinimums => self.find_axes(line, false),
            Handler::FindAxesMaximums => self.find_axes(line, true),
            Handler::ToggleAxes(enable) => {
                self.send(&[ProtocolCall::toggle_axes(flagged_axes(line), enable)])
            }
            Handler::DisplayMessage => self.display_message(line),
            Handler::PlaySong => {
                let song = to_u8('P', required(line, 'P')?)?;
                self.send(&[ProtocolCall::queue_song(song)])
            }
            Handler::BuildPercent => self.build_percent(line),
            Handler::ExtruderNoop => {
                debug!("deprecated extruder command ignored");
                Ok(None)
            }
            Handler::SetToolheadTemperature => {
                let (tool, temperature) = tool_and_temperature(line)?;
                self.send(&[ProtocolCall::set_toolhead_temperature(tool, temperature)?])
            }
            Handler::GetTemperature => self.get_temperature(line),
            Handler::SetPlatformTemperature => {
                let (tool, temperature) = tool_and_temperature(line)?;
                self.send(&[ProtocolCall::set_platform_temperature(tool, temperature)?])
            }
            Handler::ExtraOutput(on) => {
                let tool = tool_index(required(line, 'T')?)?;
                self.send(&[ProtocolCall::toggle_extra_output(tool, on)?])
            }
            Handler::StoreHomePositions => {
                self.send(&[ProtocolCall::store_home_positions(flagged_axes(line))])
            }
            Handler::RecallHomePositions => self.recall_home_positions(line),
            Handler::WaitForToolReady => {
                let (tool, delay, timeout) = self.wait_arguments(line)?;
                self.send(&[ProtocolCall::wait_for_tool_ready(tool, delay, timeout)?])
            }
            Handler::WaitForPlatformReady => {
                let (tool, delay, timeout) = self.wait_arguments(line)?;
                self.send(&[ProtocolCall::wait_for_platform_ready(tool, delay, timeout)?])
            }
            Handler::ChangeTool => self.change_tool(line),
        }
    }

    fn send(&mut self, calls: &[ProtocolCall]) -> Step<Option<Value>> {
        for call in calls {
            self.machine.execute(call)?;
        }
        Ok(None)
    }

    /// Axis that `E` stands for with the active tool
    fn extrusion_axis(&self) -> std::result::Result<Axis, GcodeErrorKind> {
        match self.state.active_tool {
            Some(0) => Ok(Axis::A),
            Some(1) => Ok(Axis::B),
            _ => Err(GcodeErrorKind::NoToolIndex),
        }
    }

    /// Known position with the line's axis codes applied
    fn target(&self, line: &ParsedLine) -> Step<([f64; 5], [f64; 5])> {
        let extrusion = match line.code('E') {
            Some(value) => Some((self.extrusion_axis()?, value)),
            None => None,
        };
        let current = self
            .state
            .position
            .known()
            .map_err(|axis| GcodeErrorKind::UnknownPosition { axis })?;

        let mut target = current;
        for axis in Axis::ALL {
            if let Some(value) = line.code(axis.letter()) {
                target[axis.index()] = value;
            }
        }
        if let Some((axis, value)) = extrusion {
            target[axis.index()] = value;
        }
        Ok((current, target))
    }

    fn steps(&self, position: &[f64; 5]) -> std::result::Result<[i32; 5], GcodeErrorKind> {
        let offset = self.state.offset();
        let steps_per_mm = self.profile.steps_per_mm();
        let mut steps = [0i32; 5];
        for axis in Axis::ALL {
            let i = axis.index();
            steps[i] = to_i32(axis.letter(), (position[i] + offset[i]) * steps_per_mm[i])?;
        }
        Ok(steps)
    }

    fn linear_move(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        check_conflicts(line, false)?;
        let (current, target) = self.target(line)?;
        let feedrate = line
            .code('F')
            .or(self.state.feedrate)
            .ok_or(GcodeErrorKind::MissingCode { letter: 'F' })?;
        if feedrate <= 0.0 {
            return Err(GcodeErrorKind::OutOfRange {
                letter: 'F',
                value: feedrate,
            }
            .into());
        }

        if target == current {
            trace!(feedrate, "no displacement");
            self.state.feedrate = Some(feedrate);
            return Ok(None);
        }

        let dda = calculate_dda_speed(
            &current,
            &target,
            feedrate,
            &self.profile.max_feedrates(),
            &self.profile.steps_per_mm(),
        )?;
        let rate = to_u32('F', dda)?;
        let call = ProtocolCall::queue_extended_point(&self.steps(&target)?, rate)?;

        self.send(&[call])?;
        self.state.position = target.into();
        self.state.feedrate = Some(feedrate);
        Ok(None)
    }

    fn dwell(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let microseconds = to_u32('P', required(line, 'P')? * 1000.0)?;
        self.send(&[ProtocolCall::delay(microseconds)])
    }

    /// The register is checked before the coordinates
    fn store_offsets(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let register = required(line, 'P')?;
        let index = if register == 1.0 {
            0
        } else if register == 2.0 {
            1
        } else {
            return Err(GcodeErrorKind::InvalidOffset { register }.into());
        };
        let offsets = [
            required(line, 'X')?,
            required(line, 'Y')?,
            required(line, 'Z')?,
            0.0,
            0.0,
        ];
        self.state.offset_registers[index] = offsets;
        Ok(None)
    }

    fn set_position(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        check_conflicts(line, true)?;
        let extrusion = match line.code('E') {
            Some(value) => Some((self.extrusion_axis()?, value)),
            None => None,
        };

        let mut position = self.state.position;
        for axis in Axis::ALL {
            if let Some(value) = line.code(axis.letter()) {
                position.set(axis, value);
            }
        }
        if let Some((axis, value)) = extrusion {
            position.set(axis, value);
        }
        let known = position
            .known()
            .map_err(|axis| GcodeErrorKind::UnknownPosition { axis })?;

        let call = ProtocolCall::set_extended_position(&self.steps(&known)?)?;
        self.send(&[call])?;
        self.state.position = position;
        Ok(None)
    }

    fn set_potentiometers(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let calls = Axis::ALL
            .into_iter()
            .filter_map(|axis| line.code(axis.letter()).map(|value| (axis, value)))
            .map(|(axis, value)| {
                to_u8(axis.letter(), value).map(|value| ProtocolCall::set_potentiometer_value(axis, value))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.send(&calls)
    }

    fn find_axes(&mut self, line: &ParsedLine, maximums: bool) -> Step<Option<Value>> {
        let feedrate = required(line, 'F')?;
        let axes = flagged_axes(line);
        if axes.is_empty() {
            trace!("no axes to home");
            return Ok(None);
        }

        let rate = homing_rate(
            axes,
            feedrate,
            &self.profile.max_feedrates(),
            &self.profile.steps_per_mm(),
        )?;
        let rate = to_u32('F', rate)?;
        let call = if maximums {
            ProtocolCall::find_axes_maximums(axes, rate, self.profile.find_axis_maximum_timeout)
        } else {
            ProtocolCall::find_axes_minimums(axes, rate, self.profile.find_axis_minimum_timeout)
        };

        self.send(&[call])?;
        for axis in axes.iter() {
            self.state.position.invalidate(axis);
        }
        Ok(None)
    }

    fn display_message(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let timeout = to_u8('P', required(line, 'P')?)?;
        let options = DisplayOptions::new().with(DisplayOptions::LAST_IN_GROUP);
        let call = ProtocolCall::display_message(0, 0, &line.comment, timeout, options)?;
        self.send(&[call])
    }

    fn build_percent(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let percent = required(line, 'P')?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(GcodeErrorKind::BadPercentage { percent }.into());
        }
        let whole = to_u8('P', percent.trunc())?;

        match whole {
            0 => {
                let name = self
                    .state
                    .build_name
                    .as_deref()
                    .ok_or(GcodeErrorKind::NoBuildName)?;
                let calls = [
                    ProtocolCall::build_start_notification(name),
                    ProtocolCall::set_build_percent(0),
                ];
                self.send(&calls)?;
                self.state.build = BuildState::Started;
            }
            100 => {
                let calls = [
                    ProtocolCall::set_build_percent(100),
                    ProtocolCall::build_end_notification(),
                ];
                self.send(&calls)?;
                self.state.build_name = None;
                self.state.build = BuildState::NoBuild;
            }
            _ => {
                self.send(&[ProtocolCall::set_build_percent(whole)])?;
            }
        }
        Ok(None)
    }

    fn get_temperature(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let Some(tool) = line.code('T') else {
            return Ok(None);
        };
        let call = ProtocolCall::get_toolhead_temperature(tool_index(tool)?)?;
        Ok(Some(self.machine.execute(&call)?))
    }

    fn recall_home_positions(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let axes = flagged_axes(line);
        self.send(&[ProtocolCall::recall_home_positions(axes)])?;
        for axis in axes.iter() {
            self.state.position.invalidate(axis);
        }
        Ok(None)
    }

    fn wait_arguments(&self, line: &ParsedLine) -> Step<(u8, u16, u16)> {
        let tool = tool_index(required(line, 'T')?)?;
        let timeout = match line.code('P') {
            Some(seconds) => to_u16('P', seconds)?,
            None => self.profile.wait_for_ready_timeout,
        };
        Ok((tool, self.profile.wait_for_ready_packet_delay, timeout))
    }

    fn change_tool(&mut self, line: &ParsedLine) -> Step<Option<Value>> {
        let requested = required(line, 'T')?;
        let tool = tool_index(requested)?;
        if tool >= self.profile.tool_count {
            return Err(GcodeErrorKind::InvalidToolIndex { index: requested }.into());
        }
        self.send(&[ProtocolCall::change_tool(tool)?])?;
        self.state.active_tool = Some(tool);
        Ok(None)
    }
}

fn required(line: &ParsedLine, letter: char) -> std::result::Result<f64, GcodeErrorKind> {
    line.code(letter).ok_or(GcodeErrorKind::MissingCode { letter })
}

/// E together with A or B, or A together with B when not allowed
fn check_conflicts(line: &ParsedLine, allow_a_and_b: bool) -> std::result::Result<(), GcodeErrorKind> {
    let present: String = ['A', 'B', 'E']
        .into_iter()
        .filter(|&letter| line.has_code(letter))
        .collect();
    let conflict = match present.as_str() {
        "AE" | "BE" | "ABE" => true,
        "AB" => !allow_a_and_b,
        _ => false,
    };
    if conflict {
        Err(GcodeErrorKind::ConflictingCodes { codes: present })
    } else {
        Ok(())
    }
}

fn flagged_axes(line: &ParsedLine) -> AxisSet {
    line.flags.iter().filter_map(|&letter| Axis::from_letter(letter)).collect()
}

fn tool_and_temperature(line: &ParsedLine) -> std::result::Result<(u8, u16), GcodeErrorKind> {
    let tool = tool_index(required(line, 'T')?)?;
    let temperature = to_u16('S', required(line, 'S')?)?;
    Ok((tool, temperature))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tool_index(value: f64) -> std::result::Result<u8, GcodeErrorKind> {
    if value.fract() == 0.0 && (0.0..=f64::from(MAX_TOOL_INDEX)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(GcodeErrorKind::InvalidToolIndex { index: value })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn command_number(value: f64) -> Option<u16> {
    (value.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&value)).then_some(value as u16)
}

fn in_range(letter: char, value: f64, min: f64, max: f64) -> std::result::Result<f64, GcodeErrorKind> {
    let rounded = value.round();
    if (min..=max).contains(&rounded) {
        Ok(rounded)
    } else {
        Err(GcodeErrorKind::OutOfRange { letter, value })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(letter: char, value: f64) -> std::result::Result<u8, GcodeErrorKind> {
    in_range(letter, value, 0.0, f64::from(u8::MAX)).map(|v| v as u8)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u16(letter: char, value: f64) -> std::result::Result<u16, GcodeErrorKind> {
    in_range(letter, value, 0.0, f64::from(u16::MAX)).map(|v| v as u16)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u32(letter: char, value: f64) -> std::result::Result<u32, GcodeErrorKind> {
    in_range(letter, value, 0.0, f64::from(u32::MAX)).map(|v| v as u32)
}

#[allow(clippy::cast_possible_truncation)]
fn to_i32(letter: char, value: f64) -> std::result::Result<i32, GcodeErrorKind> {
    in_range(letter, value, f64::from(i32::MIN), f64::from(i32::MAX)).map(|v| v as i32)
}
