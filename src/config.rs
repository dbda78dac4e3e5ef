// Topics, device constants, defaults and command-line settings
use clap::Parser;

// Poll loop frequency (attempts per second, most ticks find no data)
pub const DEFAULT_POLL_RATE_HZ: u32 = 5000;

// Session terminator received on the command topic
pub const TERMINATOR: &str = "end";

// Serial link to the wheel controller (bluetooth SPP)
pub const DEFAULT_PORT: &str = "/dev/rfcomm0";
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const SERIAL_TIMEOUT_MS: u64 = 50;

// Wheel ESC command that holds the rotor at rest
pub const HDD_ZERO_SPEED: f32 = 1000.0;

// Controller gains [P, I, D]
pub const DEFAULT_I_GAINS: [f32; 3] = [5.0, 10.0, 0.0];
pub const DEFAULT_W_GAINS: [f32; 3] = [15.0, 25.0, 0.0];

// Degree-to-radian factor applied to the reference yaw
pub const YAW_DEG_TO_RAD: f32 = 0.0174;

// Zenoh topics: inbound
pub const TOPIC_COMMAND: &str = "rwheel/cmd/command";
pub const TOPIC_MODE: &str = "rwheel/cmd/mode";
pub const TOPIC_CONTROL_MODE: &str = "rwheel/cmd/control_mode";
pub const TOPIC_ATTITUDE: &str = "rwheel/cmd/attitude";
pub const TOPIC_SPEED: [&str; 3] = ["rwheel/cmd/speed_x", "rwheel/cmd/speed_y", "rwheel/cmd/speed_z"];
pub const TOPIC_TORQUE: [&str; 3] = ["rwheel/cmd/torque_x", "rwheel/cmd/torque_y", "rwheel/cmd/torque_z"];
pub const TOPIC_VOLTAGE: [&str; 3] = [
    "rwheel/cmd/voltage_x",
    "rwheel/cmd/voltage_y",
    "rwheel/cmd/voltage_z",
];
pub const TOPIC_I_GAINS: &str = "rwheel/cmd/i_gains";
pub const TOPIC_W_GAINS: &str = "rwheel/cmd/w_gains";

// Zenoh topics: outbound telemetry
pub const TOPIC_RT_PREFIX: &str = "rwheel/rt";

/// Runtime settings, taken from the command line or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "rwheel-bridge", about = "Zenoh bridge for the reaction wheel controller")]
pub struct Settings {
    /// Serial device of the bluetooth link
    #[arg(long, env = "RWHEEL_PORT", default_value = DEFAULT_PORT)]
    pub port: String,

    /// Serial baudrate
    #[arg(long, env = "RWHEEL_BAUD", default_value_t = DEFAULT_BAUDRATE)]
    pub baud: u32,

    /// Telemetry poll rate in Hz
    #[arg(long, env = "RWHEEL_RATE", default_value_t = DEFAULT_POLL_RATE_HZ)]
    pub rate: u32,

    /// Directory for the session recording
    #[arg(long, env = "RWHEEL_LOG_DIR", default_value = ".")]
    pub log_dir: std::path::PathBuf,

    /// Session identifier (prompted for when omitted)
    #[arg(long)]
    pub session: Option<String>,
}
