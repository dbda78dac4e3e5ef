// Command strings -> command codes for the wheel controller
//
// Code layout: [op, a, b, c]. The framer never sees CommandCode::REJECTED.

use crate::state::{Axis, ControlMode, OperatingMode, StateSnapshot, Vector3};

/// Opcodes understood by the controller firmware
pub const OP_STOP: i32 = 0;
pub const OP_SPEED: i32 = 1;
pub const OP_TORQUE: i32 = 2;
pub const OP_VOLTAGE: i32 = 3;
pub const OP_ATTITUDE: i32 = 4;
pub const OP_I_GAINS: i32 = 5;
pub const OP_W_GAINS: i32 = 6;
pub const OP_MODE: i32 = 7;

/// Torque and voltage travel as milli-units
const MILLI: f32 = 1000.0;

/// Largest magnitude a frame value can carry (16-bit integer part)
pub const FRAME_VALUE_LIMIT: f32 = 65535.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCode(pub [i32; 4]);

impl CommandCode {
    /// "No valid command"
    pub const REJECTED: Self = Self([-1, -1, -1, -1]);

    pub fn is_rejected(&self) -> bool {
        *self == Self::REJECTED
    }

    pub fn values(&self) -> [i32; 4] {
        self.0
    }
}

/// Turns a command string plus the current state into a command code.
///
/// Returns `CommandCode::REJECTED` for anything it does not understand.
pub trait CommandGrammar: Send + Sync {
    fn parse(&self, command: &str, state: &StateSnapshot) -> CommandCode;
}

/// Whitespace separated text commands, keywords case-insensitive:
///
/// | command                          | code                       |
/// |----------------------------------|----------------------------|
/// | `STOP`                           | `[0, 0, 0, 0]`             |
/// | `SPEED` / `TORQUE` / `VOLTAGE`   | `[1/2/3, x, y, z]`         |
/// | `SET_<QTY>_<AXIS> <value>`       | as above, one axis replaced|
/// | `ATTITUDE`                       | `[4, yaw, pitch, roll]`    |
/// | `IGAINS` / `WGAINS`              | `[5/6, p, i, d]`           |
/// | `MODE`                           | `[7, mode, control, 0]`    |
/// | `RUN`                            | attitude in auto mode, otherwise the active control mode's setpoint |
#[derive(Debug, Clone, Copy, Default)]
pub struct TextGrammar;

impl CommandGrammar for TextGrammar {
    fn parse(&self, command: &str, state: &StateSnapshot) -> CommandCode {
        let mut words = command.split_whitespace();
        let Some(keyword) = words.next() else {
            return CommandCode::REJECTED;
        };
        let argument = words.next();
        if words.next().is_some() {
            return CommandCode::REJECTED;
        }

        let keyword = keyword.to_ascii_uppercase();
        if let Some(target) = keyword.strip_prefix("SET_") {
            return match argument.map(str::parse::<f32>) {
                Some(Ok(value)) if value.is_finite() => parse_set(target, value, state),
                _ => CommandCode::REJECTED,
            };
        }
        if argument.is_some() {
            return CommandCode::REJECTED;
        }

        match keyword.as_str() {
            "STOP" => CommandCode([OP_STOP, 0, 0, 0]),
            "SPEED" => setpoint_code(OP_SPEED, state.speed),
            "TORQUE" => setpoint_code(OP_TORQUE, state.torque),
            "VOLTAGE" => setpoint_code(OP_VOLTAGE, state.voltage),
            "ATTITUDE" => attitude_code(state),
            "IGAINS" => triple_code(OP_I_GAINS, state.integral_gains.as_array(), 1.0),
            "WGAINS" => triple_code(OP_W_GAINS, state.rate_gains.as_array(), 1.0),
            "MODE" => mode_code(state),
            "RUN" => run_code(state),
            _ => CommandCode::REJECTED,
        }
    }
}

fn parse_set(target: &str, value: f32, state: &StateSnapshot) -> CommandCode {
    let Some((quantity, axis)) = target.rsplit_once('_') else {
        return CommandCode::REJECTED;
    };
    let axis = match axis {
        "X" => Axis::X,
        "Y" => Axis::Y,
        "Z" => Axis::Z,
        _ => return CommandCode::REJECTED,
    };
    let (op, mut vector) = match quantity {
        "SPEED" => (OP_SPEED, state.speed),
        "TORQUE" => (OP_TORQUE, state.torque),
        "VOLTAGE" => (OP_VOLTAGE, state.voltage),
        _ => return CommandCode::REJECTED,
    };
    vector.set(axis, value);
    setpoint_code(op, vector)
}

fn run_code(state: &StateSnapshot) -> CommandCode {
    match (&state.mode, &state.control_mode) {
        (OperatingMode::Auto, _) => attitude_code(state),
        (OperatingMode::Other(_), _) => CommandCode::REJECTED,
        (OperatingMode::Manual, ControlMode::Speed) => setpoint_code(OP_SPEED, state.speed),
        (OperatingMode::Manual, ControlMode::Torque) => setpoint_code(OP_TORQUE, state.torque),
        (OperatingMode::Manual, ControlMode::Voltage) => setpoint_code(OP_VOLTAGE, state.voltage),
        (OperatingMode::Manual, ControlMode::Other(_)) => CommandCode::REJECTED,
    }
}

fn setpoint_code(op: i32, vector: Vector3) -> CommandCode {
    let scale = if op == OP_SPEED { 1.0 } else { MILLI };
    triple_code(op, vector.as_array(), scale)
}

fn attitude_code(state: &StateSnapshot) -> CommandCode {
    let a = state.attitude;
    triple_code(OP_ATTITUDE, [a.yaw, a.pitch, a.roll], 1.0)
}

fn mode_code(state: &StateSnapshot) -> CommandCode {
    let mode = match state.mode {
        OperatingMode::Manual => 0,
        OperatingMode::Auto => 1,
        OperatingMode::Other(_) => return CommandCode::REJECTED,
    };
    let control = match state.control_mode {
        ControlMode::Torque => 0,
        ControlMode::Voltage => 1,
        ControlMode::Speed => 2,
        ControlMode::Other(_) => return CommandCode::REJECTED,
    };
    CommandCode([OP_MODE, mode, control, 0])
}

fn triple_code(op: i32, values: [f32; 3], scale: f32) -> CommandCode {
    let [a, b, c] = values.map(|v| to_frame_int(v * scale));
    CommandCode([op, a, b, c])
}

fn to_frame_int(value: f32) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(-FRAME_VALUE_LIMIT, FRAME_VALUE_LIMIT) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HDD_ZERO_SPEED;
    use crate::state::{Attitude, GainTriple};

    fn parse(command: &str, state: &StateSnapshot) -> CommandCode {
        TextGrammar.parse(command, state)
    }

    #[test]
    fn test_stop() {
        let state = StateSnapshot::default();
        assert_eq!(parse("STOP", &state), CommandCode([OP_STOP, 0, 0, 0]));
        assert_eq!(parse("stop", &state), CommandCode([OP_STOP, 0, 0, 0]));
    }

    #[test]
    fn test_set_speed_axis_keeps_other_axes() {
        let state = StateSnapshot::default();
        let zero = HDD_ZERO_SPEED as i32;
        assert_eq!(
            parse("SET_SPEED_X 1200", &state),
            CommandCode([OP_SPEED, 1200, zero, zero])
        );
        assert_eq!(
            parse("set_speed_z 1500.4", &state),
            CommandCode([OP_SPEED, zero, zero, 1500])
        );
    }

    #[test]
    fn test_torque_and_voltage_in_milli_units() {
        let mut state = StateSnapshot::default();
        state.torque.x = 0.012;
        state.voltage.y = -3.3;
        assert_eq!(parse("TORQUE", &state), CommandCode([OP_TORQUE, 12, 0, 0]));
        assert_eq!(parse("VOLTAGE", &state), CommandCode([OP_VOLTAGE, 0, -3300, 0]));
        assert_eq!(
            parse("SET_TORQUE_Y 0.5", &state),
            CommandCode([OP_TORQUE, 12, 500, 0])
        );
    }

    #[test]
    fn test_values_clamped_to_frame_range() {
        let mut state = StateSnapshot::default();
        state.voltage.x = 100.0; // 100000 mV
        assert_eq!(parse("VOLTAGE", &state), CommandCode([OP_VOLTAGE, 65535, 0, 0]));
    }

    #[test]
    fn test_run_follows_mode_and_control_mode() {
        let mut state = StateSnapshot::default();
        state.torque = Vector3::splat(0.001);
        assert_eq!(parse("RUN", &state), CommandCode([OP_TORQUE, 1, 1, 1]));

        state.control_mode = ControlMode::Speed;
        state.speed = Vector3::splat(2000.0);
        assert_eq!(parse("RUN", &state), CommandCode([OP_SPEED, 2000, 2000, 2000]));

        state.mode = OperatingMode::Auto;
        state.attitude = Attitude::from([30.0, -5.0, 0.0]);
        assert_eq!(parse("RUN", &state), CommandCode([OP_ATTITUDE, 30, -5, 0]));
    }

    #[test]
    fn test_gains_and_mode() {
        let mut state = StateSnapshot::default();
        assert_eq!(parse("IGAINS", &state), CommandCode([OP_I_GAINS, 5, 10, 0]));
        state.rate_gains = GainTriple::from([1.0, 2.0, 3.0]);
        assert_eq!(parse("WGAINS", &state), CommandCode([OP_W_GAINS, 1, 2, 3]));
        state.control_mode = ControlMode::Voltage;
        assert_eq!(parse("MODE", &state), CommandCode([OP_MODE, 0, 1, 0]));
    }

    #[test]
    fn test_rejections() {
        let state = StateSnapshot::default();
        for command in [
            "",
            "   ",
            "FLY",
            "STOP now",
            "SET_SPEED_X",
            "SET_SPEED_X fast",
            "SET_SPEED_W 10",
            "SET_POWER_X 10",
            "SET_SPEED_X 1 2",
            "SET_SPEED_X NaN",
        ] {
            assert!(parse(command, &state).is_rejected(), "{:?} accepted", command);
        }

        let mut state = StateSnapshot::default();
        state.control_mode = ControlMode::Other("pwm".into());
        assert!(parse("RUN", &state).is_rejected());
        assert!(parse("MODE", &state).is_rejected());
    }
}
