// Zenoh bridge for the reaction wheel attitude controller
//
// Bus messages update the shared setpoint state or are turned into command
// frames for the controller; telemetry frames from the controller are decoded
// and republished on the bus.

pub mod attitude;
pub mod bridge;
pub mod config;
pub mod framing;
pub mod grammar;
pub mod link;
pub mod messages;
pub mod runtime;
pub mod state;
pub mod telemetry;
