// Bus channels and payload decoding
//
// Text channels carry plain UTF-8, numeric channels carry JSON
// (a number, or a 3-element array for vectors).

use serde::de::DeserializeOwned;

use crate::config::{
    TOPIC_ATTITUDE, TOPIC_COMMAND, TOPIC_CONTROL_MODE, TOPIC_I_GAINS, TOPIC_MODE, TOPIC_RT_PREFIX,
    TOPIC_SPEED, TOPIC_TORQUE, TOPIC_VOLTAGE, TOPIC_W_GAINS,
};
use crate::state::{Attitude, Axis, ControlMode, GainTriple, OperatingMode};

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inbound subscription channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inbound {
    Command,
    Mode,
    ControlMode,
    Attitude,
    Speed(Axis),
    Torque(Axis),
    Voltage(Axis),
    IntegralGains,
    RateGains,
}

impl Inbound {
    pub const ALL: [Inbound; 15] = [
        Inbound::Command,
        Inbound::Mode,
        Inbound::ControlMode,
        Inbound::Attitude,
        Inbound::Speed(Axis::X),
        Inbound::Speed(Axis::Y),
        Inbound::Speed(Axis::Z),
        Inbound::Torque(Axis::X),
        Inbound::Torque(Axis::Y),
        Inbound::Torque(Axis::Z),
        Inbound::Voltage(Axis::X),
        Inbound::Voltage(Axis::Y),
        Inbound::Voltage(Axis::Z),
        Inbound::IntegralGains,
        Inbound::RateGains,
    ];

    pub fn topic(self) -> &'static str {
        match self {
            Inbound::Command => TOPIC_COMMAND,
            Inbound::Mode => TOPIC_MODE,
            Inbound::ControlMode => TOPIC_CONTROL_MODE,
            Inbound::Attitude => TOPIC_ATTITUDE,
            Inbound::Speed(axis) => TOPIC_SPEED[axis.index()],
            Inbound::Torque(axis) => TOPIC_TORQUE[axis.index()],
            Inbound::Voltage(axis) => TOPIC_VOLTAGE[axis.index()],
            Inbound::IntegralGains => TOPIC_I_GAINS,
            Inbound::RateGains => TOPIC_W_GAINS,
        }
    }

    /// Decode a raw payload received on this channel
    pub fn decode(self, payload: &[u8]) -> Result<InboundMessage, MessageError> {
        Ok(match self {
            Inbound::Command => InboundMessage::Command(text(payload)?.to_string()),
            Inbound::Mode => InboundMessage::Mode(OperatingMode::from(text(payload)?)),
            Inbound::ControlMode => InboundMessage::ControlMode(ControlMode::from(text(payload)?)),
            Inbound::Attitude => InboundMessage::Attitude(Attitude::from(json::<[f32; 3]>(payload)?)),
            Inbound::Speed(axis) => InboundMessage::Speed(axis, json(payload)?),
            Inbound::Torque(axis) => InboundMessage::Torque(axis, json(payload)?),
            Inbound::Voltage(axis) => InboundMessage::Voltage(axis, json(payload)?),
            Inbound::IntegralGains => {
                InboundMessage::IntegralGains(GainTriple::from(json::<[f32; 3]>(payload)?))
            }
            Inbound::RateGains => InboundMessage::RateGains(GainTriple::from(json::<[f32; 3]>(payload)?)),
        })
    }
}

fn text(payload: &[u8]) -> Result<&str, MessageError> {
    Ok(std::str::from_utf8(payload)?)
}

fn json<T: DeserializeOwned>(payload: &[u8]) -> Result<T, MessageError> {
    Ok(serde_json::from_slice(payload)?)
}

/// A decoded inbound message, ready for the bridge
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Command(String),
    Mode(OperatingMode),
    ControlMode(ControlMode),
    Attitude(Attitude),
    Speed(Axis, f32),
    Torque(Axis, f32),
    Voltage(Axis, f32),
    IntegralGains(GainTriple),
    RateGains(GainTriple),
}

/// Outbound telemetry channels, one scalar each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outbound {
    // Orientation/rate packet
    Time1,
    Wx,
    Wy,
    Wz,
    // Raw rate packet
    Time2,
    WxRaw,
    WyRaw,
    WzRaw,
    // Quaternion error, scalar first
    QE4,
    QE1,
    QE2,
    QE3,
    // Error-rate cross terms
    QDE1,
    QDE2,
    QDE3,
    // Commanded echo
    CmdYaw,
    CmdSpeedX,
    CmdTorqueX,
    CmdVoltageX,
}

impl Outbound {
    pub const ALL: [Outbound; 19] = [
        Outbound::Time1,
        Outbound::Wx,
        Outbound::Wy,
        Outbound::Wz,
        Outbound::Time2,
        Outbound::WxRaw,
        Outbound::WyRaw,
        Outbound::WzRaw,
        Outbound::QE4,
        Outbound::QE1,
        Outbound::QE2,
        Outbound::QE3,
        Outbound::QDE1,
        Outbound::QDE2,
        Outbound::QDE3,
        Outbound::CmdYaw,
        Outbound::CmdSpeedX,
        Outbound::CmdTorqueX,
        Outbound::CmdVoltageX,
    ];

    pub const ORIENTATION_RATE: [Outbound; 4] =
        [Outbound::Time1, Outbound::Wx, Outbound::Wy, Outbound::Wz];
    pub const RAW_RATE: [Outbound; 4] =
        [Outbound::Time2, Outbound::WxRaw, Outbound::WyRaw, Outbound::WzRaw];
    pub const QUATERNION: [Outbound; 4] =
        [Outbound::QE4, Outbound::QE1, Outbound::QE2, Outbound::QE3];
    pub const CROSS_TERMS: [Outbound; 3] = [Outbound::QDE1, Outbound::QDE2, Outbound::QDE3];

    pub fn name(self) -> &'static str {
        match self {
            Outbound::Time1 => "time1",
            Outbound::Wx => "wx",
            Outbound::Wy => "wy",
            Outbound::Wz => "wz",
            Outbound::Time2 => "time2",
            Outbound::WxRaw => "wx_raw",
            Outbound::WyRaw => "wy_raw",
            Outbound::WzRaw => "wz_raw",
            Outbound::QE4 => "qE4",
            Outbound::QE1 => "qE1",
            Outbound::QE2 => "qE2",
            Outbound::QE3 => "qE3",
            Outbound::QDE1 => "qDE1",
            Outbound::QDE2 => "qDE2",
            Outbound::QDE3 => "qDE3",
            Outbound::CmdYaw => "cmd_yaw",
            Outbound::CmdSpeedX => "cmd_speed_x",
            Outbound::CmdTorqueX => "cmd_torque_x",
            Outbound::CmdVoltageX => "cmd_voltage_x",
        }
    }

    pub fn topic(self) -> String {
        format!("{}/{}", TOPIC_RT_PREFIX, self.name())
    }
}
