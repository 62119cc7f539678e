//! Device profiles
//!
//! A profile is the read-only machine description the interpreter is
//! built with: per-axis step and feedrate limits, homing and wait
//! timeouts, the toolhead count and the start/end G-code of a print.
//! Profiles load from JSON when the `serde` feature is on.

#[cfg(feature = "serde")]
use std::path::Path;

use crate::protocol::Axis;

/// Limits for one axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisProfile {
    /// Motor steps per millimetre
    pub steps_per_mm: f64,
    /// Fastest allowed feedrate, mm/min
    pub max_feedrate: f64,
}

/// Limits for all five axes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxesProfile {
    /// X
    pub x: AxisProfile,
    /// Y
    pub y: AxisProfile,
    /// Z
    pub z: AxisProfile,
    /// A
    pub a: AxisProfile,
    /// B
    pub b: AxisProfile,
}

impl AxesProfile {
    /// Limits for `axis`
    #[must_use]
    pub const fn get(&self, axis: Axis) -> &AxisProfile {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
            Axis::A => &self.a,
            Axis::B => &self.b,
        }
    }
}

/// Machine description
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Profile {
    /// Human-readable machine name
    pub name: String,
    /// Per-axis limits
    pub axes: AxesProfile,
    /// `FIND_AXES_MINIMUMS` timeout, seconds
    pub find_axis_minimum_timeout: u16,
    /// `FIND_AXES_MAXIMUMS` timeout, seconds
    pub find_axis_maximum_timeout: u16,
    /// Delay between ready polls, milliseconds
    pub wait_for_ready_packet_delay: u16,
    /// Default ready wait timeout, seconds
    pub wait_for_ready_timeout: u16,
    /// Number of toolheads
    pub tool_count: u8,
    /// G-code run before a print
    #[cfg_attr(feature = "serde", serde(default))]
    pub print_start_sequence: Vec<String>,
    /// G-code run after a print
    #[cfg_attr(feature = "serde", serde(default))]
    pub print_end_sequence: Vec<String>,
}

const XY: AxisProfile = AxisProfile {
    steps_per_mm: 94.139_704,
    max_feedrate: 18_000.0,
};

const Z: AxisProfile = AxisProfile {
    steps_per_mm: 400.0,
    max_feedrate: 1_170.0,
};

const EXTRUDER: AxisProfile = AxisProfile {
    steps_per_mm: 96.275_201_870_333_66,
    max_feedrate: 1_600.0,
};

fn lines(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|&line| line.to_owned()).collect()
}

impl Profile {
    /// Replicator with one extruder
    #[must_use]
    pub fn replicator_single() -> Self {
        Self {
            name: "The Replicator Single".into(),
            tool_count: 1,
            print_start_sequence: lines(&[
                "M73 P0 (enable build progress)",
                "G162 X Y F2500 (home XY axes maximum)",
                "G161 Z F1100 (home Z axis minimum)",
                "M132 X Y Z A B (recall stored home offsets)",
                "G92 X152 Y75 Z0 A0 B0 (define home position)",
                "G1 X-112 Y-73 Z150 F3300.0 (move to waiting position)",
                "G130 X20 Y20 Z20 A20 B20 (lower stepper vrefs while heating)",
                "M109 S110 T0 (set platform temperature)",
                "M104 S220 T0 (set extruder temperature)",
                "M134 T0 (wait for platform)",
                "M133 T0 (wait for extruder)",
                "G130 X127 Y127 Z40 A127 B127 (default stepper vrefs)",
                "M135 T0 (select extruder)",
            ]),
            print_end_sequence: lines(&[
                "M18 A B (turn off extruder steppers)",
                "M104 S0 T0 (cool extruder)",
                "M109 S0 T0 (cool platform)",
                "G162 Z F500 (send Z to the bottom)",
                "M18 X Y Z (disable axes)",
                "M72 P1 (play ta-da song)",
                "M73 P100 (end build progress)",
            ]),
            ..Self::replicator_dual()
        }
    }

    /// Replicator with two extruders
    #[must_use]
    pub fn replicator_dual() -> Self {
        Self {
            name: "The Replicator Dual".into(),
            axes: AxesProfile {
                x: XY,
                y: XY,
                z: Z,
                a: EXTRUDER,
                b: EXTRUDER,
            },
            find_axis_minimum_timeout: 40,
            find_axis_maximum_timeout: 60,
            wait_for_ready_packet_delay: 100,
            wait_for_ready_timeout: 600,
            tool_count: 2,
            print_start_sequence: lines(&[
                "M73 P0 (enable build progress)",
                "G162 X Y F2500 (home XY axes maximum)",
                "G161 Z F1100 (home Z axis minimum)",
                "M132 X Y Z A B (recall stored home offsets)",
                "G92 X152 Y75 Z0 A0 B0 (define home position)",
                "G1 X-112 Y-73 Z150 F3300.0 (move to waiting position)",
                "G130 X20 Y20 Z20 A20 B20 (lower stepper vrefs while heating)",
                "M109 S110 T0 (set platform temperature)",
                "M104 S220 T0 (set right extruder temperature)",
                "M104 S220 T1 (set left extruder temperature)",
                "M134 T0 (wait for platform)",
                "M133 T0 (wait for right extruder)",
                "M133 T1 (wait for left extruder)",
                "G130 X127 Y127 Z40 A127 B127 (default stepper vrefs)",
                "M135 T0 (select right extruder)",
            ]),
            print_end_sequence: lines(&[
                "M18 A B (turn off extruder steppers)",
                "M104 S0 T0 (cool right extruder)",
                "M104 S0 T1 (cool left extruder)",
                "M109 S0 T0 (cool platform)",
                "G162 Z F500 (send Z to the bottom)",
                "M18 X Y Z (disable axes)",
                "M72 P1 (play ta-da song)",
                "M73 P100 (end build progress)",
            ]),
        }
    }

    /// Steps per millimetre in wire order
    #[must_use]
    pub fn steps_per_mm(&self) -> [f64; 5] {
        Axis::ALL.map(|axis| self.axes.get(axis).steps_per_mm)
    }

    /// Maximum feedrates in wire order
    #[must_use]
    pub fn max_feedrates(&self) -> [f64; 5] {
        Axis::ALL.map(|axis| self.axes.get(axis).max_feedrate)
    }

    /// Parse a profile from JSON
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file
    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::replicator_dual()
    }
}
