// Shared setpoint/mode state mutated by bus messages and read by the bridge
//
// Every field lives behind one lock so that a snapshot is always a
// consistent copy, never a mix of old and new axis values.

use std::fmt;

use parking_lot::RwLock;

use crate::config::{DEFAULT_I_GAINS, DEFAULT_W_GAINS, HDD_ZERO_SPEED};

/// Operating mode last received on the mode topic
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperatingMode {
    #[default]
    Manual,
    Auto,
    Other(String),
}

impl From<&str> for OperatingMode {
    fn from(value: &str) -> Self {
        match value {
            "manual" => Self::Manual,
            "auto" => Self::Auto,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Auto => f.write_str("auto"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Which setpoint family drives the wheels
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Torque,
    Voltage,
    Speed,
    Other(String),
}

impl From<&str> for ControlMode {
    fn from(value: &str) -> Self {
        match value {
            "torque" => Self::Torque,
            "voltage" => Self::Voltage,
            "speed" => Self::Speed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Torque => f.write_str("torque"),
            Self::Voltage => f.write_str("voltage"),
            Self::Speed => f.write_str("speed"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Attitude reference in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl From<[f32; 3]> for Attitude {
    fn from([yaw, pitch, roll]: [f32; 3]) -> Self {
        Self { yaw, pitch, roll }
    }
}

/// Per-axis setpoint (speed in RPM, torque in N·m, voltage in V)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn splat(value: f32) -> Self {
        Self {
            x: value,
            y: value,
            z: value,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// PID-like gain slots
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GainTriple {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl From<[f32; 3]> for GainTriple {
    fn from([p, i, d]: [f32; 3]) -> Self {
        Self { p, i, d }
    }
}

impl GainTriple {
    pub fn as_array(&self) -> [f32; 3] {
        [self.p, self.i, self.d]
    }
}

/// Owned copy of every field, handed to the command grammar
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub mode: OperatingMode,
    pub control_mode: ControlMode,
    pub attitude: Attitude,
    pub speed: Vector3,
    pub torque: Vector3,
    pub voltage: Vector3,
    pub integral_gains: GainTriple,
    pub rate_gains: GainTriple,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            control_mode: ControlMode::default(),
            attitude: Attitude::default(),
            speed: Vector3::splat(HDD_ZERO_SPEED),
            torque: Vector3::default(),
            voltage: Vector3::default(),
            integral_gains: GainTriple::from(DEFAULT_I_GAINS),
            rate_gains: GainTriple::from(DEFAULT_W_GAINS),
        }
    }
}

impl StateSnapshot {
    pub fn setpoints(&self) -> Setpoints {
        Setpoints {
            speed: self.speed,
            torque: self.torque,
            voltage: self.voltage,
            attitude: self.attitude,
        }
    }
}

/// The live setpoints recorded with each packet and echoed back on the bus
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Setpoints {
    pub speed: Vector3,
    pub torque: Vector3,
    pub voltage: Vector3,
    pub attitude: Attitude,
}

/// Single in-memory copy of the session state.
///
/// Mutators are plain overwrites: no validation, no side effects, no failure.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: RwLock<StateSnapshot>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&self, mode: OperatingMode) {
        self.inner.write().mode = mode;
    }

    pub fn set_control_mode(&self, control_mode: ControlMode) {
        self.inner.write().control_mode = control_mode;
    }

    /// Replaces all three angles at once
    pub fn set_attitude(&self, attitude: Attitude) {
        self.inner.write().attitude = attitude;
    }

    pub fn set_speed(&self, axis: Axis, value: f32) {
        self.inner.write().speed.set(axis, value);
    }

    pub fn set_torque(&self, axis: Axis, value: f32) {
        self.inner.write().torque.set(axis, value);
    }

    pub fn set_voltage(&self, axis: Axis, value: f32) {
        self.inner.write().voltage.set(axis, value);
    }

    pub fn set_integral_gains(&self, gains: GainTriple) {
        self.inner.write().integral_gains = gains;
    }

    pub fn set_rate_gains(&self, gains: GainTriple) {
        self.inner.write().rate_gains = gains;
    }

    /// Copy of every field taken under one lock
    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.read().clone()
    }

    pub fn setpoints(&self) -> Setpoints {
        self.inner.read().setpoints()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_defaults() {
        let state = SharedState::new();
        let snap = state.snapshot();
        assert_eq!(snap.mode, OperatingMode::Manual);
        assert_eq!(snap.control_mode, ControlMode::Torque);
        assert_eq!(snap.attitude, Attitude::default());
        assert_eq!(snap.speed, Vector3::splat(HDD_ZERO_SPEED));
        assert_eq!(snap.torque, Vector3::default());
        assert_eq!(snap.voltage, Vector3::default());
        assert_eq!(snap.integral_gains.as_array(), [5.0, 10.0, 0.0]);
        assert_eq!(snap.rate_gains.as_array(), [15.0, 25.0, 0.0]);
    }

    #[test]
    fn test_axis_mutators_touch_one_axis() {
        let state = SharedState::new();
        state.set_speed(Axis::Y, 1500.0);
        state.set_torque(Axis::Z, -0.25);
        state.set_voltage(Axis::X, 3.3);

        let snap = state.snapshot();
        assert_eq!(snap.speed.as_array(), [HDD_ZERO_SPEED, 1500.0, HDD_ZERO_SPEED]);
        assert_eq!(snap.torque.as_array(), [0.0, 0.0, -0.25]);
        assert_eq!(snap.voltage.as_array(), [3.3, 0.0, 0.0]);
    }

    #[test]
    fn test_attitude_and_gains_overwrite_wholesale() {
        let state = SharedState::new();
        state.set_attitude(Attitude::from([10.0, 20.0, 30.0]));
        state.set_attitude(Attitude::from([45.0, 0.0, 0.0]));
        state.set_rate_gains(GainTriple::from([1.0, 2.0, 3.0]));

        let snap = state.snapshot();
        assert_eq!(snap.attitude, Attitude::from([45.0, 0.0, 0.0]));
        assert_eq!(snap.rate_gains.as_array(), [1.0, 2.0, 3.0]);
        assert_eq!(snap.integral_gains.as_array(), DEFAULT_I_GAINS);
    }

    #[test]
    fn test_unknown_modes_are_kept_verbatim() {
        let state = SharedState::new();
        state.set_mode(OperatingMode::from("calibration"));
        state.set_control_mode(ControlMode::from("speed"));

        let snap = state.snapshot();
        assert_eq!(snap.mode.to_string(), "calibration");
        assert_eq!(snap.control_mode, ControlMode::Speed);
    }

    #[test]
    fn test_snapshot_never_tears_under_concurrent_writes() {
        // Every write sets all three components to the same value in one
        // mutation, so any mix of old and new components is a torn read.
        let state = Arc::new(SharedState::new());
        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for i in 1..=5000 {
                    let v = i as f32;
                    state.set_attitude(Attitude::from([v, v, v]));
                }
            })
        };

        for _ in 0..5000 {
            let attitude = state.snapshot().attitude;
            assert!(
                attitude.yaw == attitude.pitch && attitude.pitch == attitude.roll,
                "torn read: {:?}",
                attitude
            );
        }
        writer.join().unwrap();
        assert_eq!(state.snapshot().attitude, Attitude::from([5000.0; 3]));
    }
}
