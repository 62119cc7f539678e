//! Interpreter state

use std::fmt;

use crate::protocol::Axis;

/// Logical position in millimetres; `None` for an axis whose position
/// is unknown after homing or recalling home offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position([Option<f64>; 5]);

impl Position {
    /// All axes at zero
    #[must_use]
    pub const fn zero() -> Self {
        Self([Some(0.0); 5])
    }

    /// All axes unknown
    #[must_use]
    pub const fn unknown() -> Self {
        Self([None; 5])
    }

    /// Position of one axis
    #[must_use]
    pub const fn get(&self, axis: Axis) -> Option<f64> {
        self.0[axis.index()]
    }

    /// Define one axis
    pub const fn set(&mut self, axis: Axis, value: f64) {
        self.0[axis.index()] = Some(value);
    }

    /// Forget one axis
    pub const fn invalidate(&mut self, axis: Axis) {
        self.0[axis.index()] = None;
    }

    /// Every axis, or the first unknown one
    pub fn known(&self) -> Result<[f64; 5], Axis> {
        let mut out = [0.0; 5];
        for axis in Axis::ALL {
            out[axis.index()] = self.get(axis).ok_or(axis)?;
        }
        Ok(out)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[f64; 5]> for Position {
    fn from(values: [f64; 5]) -> Self {
        Self(values.map(Some))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match self.get(axis) {
                Some(value) => write!(f, "{axis}{value}")?,
                None => write!(f, "{axis}?")?,
            }
        }
        Ok(())
    }
}

/// Build lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildState {
    /// No build announced
    #[default]
    NoBuild,
    /// Build start notification sent
    Started,
}

/// Everything the interpreter remembers between lines
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterState {
    /// Logical position, offsets not applied
    pub position: Position,
    /// Offset registers 1 and 2, in wire order
    pub offset_registers: [[f64; 5]; 2],
    /// Register selected by G54/G55
    pub active_offset: Option<u8>,
    /// Last feedrate, mm/min
    pub feedrate: Option<f64>,
    /// Tool selected by M135
    pub active_tool: Option<u8>,
    /// Name announced at build start
    pub build_name: Option<String>,
    /// Build lifecycle
    pub build: BuildState,
    /// Lines seen so far
    pub line_number: usize,
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self {
            position: Position::zero(),
            offset_registers: [[0.0; 5]; 2],
            active_offset: None,
            feedrate: None,
            active_tool: None,
            build_name: None,
            build: BuildState::NoBuild,
            line_number: 0,
        }
    }
}

impl InterpreterState {
    /// Offset to add before converting to steps
    #[must_use]
    pub fn offset(&self) -> [f64; 5] {
        match self.active_offset {
            Some(register @ 1..=2) => self.offset_registers[usize::from(register - 1)],
            _ => [0.0; 5],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state = InterpreterState::default();
        assert_eq!(state.position.known(), Ok([0.0; 5]));
        assert_eq!(state.offset(), [0.0; 5]);
        assert_eq!(state.build, BuildState::NoBuild);
    }

    #[test]
    fn test_unknown_axis_reported() {
        let mut position = Position::zero();
        position.invalidate(Axis::Y);
        position.invalidate(Axis::B);
        assert_eq!(position.known(), Err(Axis::Y));
        assert_eq!(position.to_string(), "X0 Y? Z0 A0 B?");
    }

    #[test]
    fn test_active_offset() {
        let mut state = InterpreterState::default();
        state.offset_registers[1] = [1.0, 2.0, 3.0, 0.0, 0.0];
        state.active_offset = Some(2);
        assert_eq!(state.offset(), [1.0, 2.0, 3.0, 0.0, 0.0]);
    }
}
