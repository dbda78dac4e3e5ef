// State bridge: shared state, command submission and the telemetry poll loop
//
// Bus callbacks (any thread) mutate state and submit commands while one
// blocking task polls the link at a fixed rate. The link and the framer are
// shared between the two paths behind their own locks.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::attitude::AttitudeMath;
use crate::config::{TERMINATOR, YAW_DEG_TO_RAD};
use crate::framing::{FrameError, Framer};
use crate::grammar::{CommandCode, CommandGrammar};
use crate::link::{Link, LinkError};
use crate::messages::{InboundMessage, Outbound};
use crate::state::SharedState;
use crate::telemetry::{PacketKind, TelemetrySink};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(&'static str),
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const ENDED: u8 = 2;

/// Session run flag: Idle -> Running -> Ended, each step taken at most once
#[derive(Debug, Default)]
pub struct RunState(AtomicU8);

impl RunState {
    /// Idle -> Running. False if the session already ran.
    pub fn begin(&self) -> bool {
        self.0
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enter the terminal state. True if this call stopped a running session.
    pub fn end(&self) -> bool {
        self.0.swap(ENDED, Ordering::AcqRel) == RUNNING
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire) == RUNNING
    }

    pub fn has_ended(&self) -> bool {
        self.0.load(Ordering::Acquire) == ENDED
    }
}

/// Result of one command submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Frame written to the link
    Sent(CommandCode),
    /// The grammar did not recognise the command
    Rejected,
    /// Terminator received, session ending
    Terminated,
}

/// Result of one poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No frame available
    Idle,
    /// Frame decoded and published
    Published(PacketKind),
    /// Frame with an unknown type tag; only the commanded echo went out
    Dropped(u8),
}

pub struct StateBridge {
    state: SharedState,
    run_state: RunState,
    link: Mutex<Box<dyn Link>>,
    framer: Mutex<Box<dyn Framer>>,
    grammar: Box<dyn CommandGrammar>,
    math: Box<dyn AttitudeMath>,
}

impl StateBridge {
    pub fn new(
        link: Box<dyn Link>,
        framer: Box<dyn Framer>,
        grammar: Box<dyn CommandGrammar>,
        math: Box<dyn AttitudeMath>,
    ) -> Self {
        Self {
            state: SharedState::new(),
            run_state: RunState::default(),
            link: Mutex::new(link),
            framer: Mutex::new(framer),
            grammar,
            math,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Bring up the link
    pub fn initialize(&self) -> Result<(), BridgeError> {
        self.link.lock().initialize()?;
        Ok(())
    }

    /// Shut down the link and close the recording. Failures are logged only.
    pub fn shutdown(&self) {
        self.link.lock().stop();
        if let Err(e) = self.framer.lock().stop() {
            warn!("Failed to close session recording: {}", e);
        }
    }

    /// Route a decoded bus message to its mutator or to the command path
    pub fn dispatch(&self, message: InboundMessage) {
        match message {
            InboundMessage::Command(command) => {
                if let Err(e) = self.submit_command(&command) {
                    warn!("Command {:?} not delivered: {}", command, e);
                }
            }
            InboundMessage::Mode(mode) => self.state.set_mode(mode),
            InboundMessage::ControlMode(mode) => self.state.set_control_mode(mode),
            InboundMessage::Attitude(attitude) => self.state.set_attitude(attitude),
            InboundMessage::Speed(axis, value) => self.state.set_speed(axis, value),
            InboundMessage::Torque(axis, value) => self.state.set_torque(axis, value),
            InboundMessage::Voltage(axis, value) => self.state.set_voltage(axis, value),
            InboundMessage::IntegralGains(gains) => self.state.set_integral_gains(gains),
            InboundMessage::RateGains(gains) => self.state.set_rate_gains(gains),
        }
    }

    /// Translate one command string into a frame and send it.
    ///
    /// The terminator ends the session without touching the link.
    pub fn submit_command(&self, command: &str) -> Result<CommandOutcome, BridgeError> {
        info!("Command received: {}", command);
        if command == TERMINATOR {
            self.run_state.end();
            info!("Terminator received, ending session");
            return Ok(CommandOutcome::Terminated);
        }

        let snapshot = self.state.snapshot();
        let code = self.grammar.parse(command, &snapshot);
        if code.is_rejected() {
            warn!("Unknown command: {}", command);
            return Ok(CommandOutcome::Rejected);
        }

        let frame = self.framer.lock().encode(code);
        self.link.lock().write(&frame)?;
        debug!("Sent {:?} for {:?}", code, command);
        Ok(CommandOutcome::Sent(code))
    }

    /// One poll tick: receive at most one frame, decode it and publish.
    pub fn poll_once(&self, sink: &dyn TelemetrySink) -> Result<Tick, BridgeError> {
        let (packet, kind) = {
            let mut link = self.link.lock();
            if !link.read()? {
                return Ok(Tick::Idle);
            }
            let packet = link.packet().to_vec();
            let kind = PacketKind::of(&packet);
            if kind.is_recognized() {
                link.reset();
            }
            (packet, kind)
        };

        let tick = match kind {
            PacketKind::Unknown(tag) => {
                debug!("Dropping packet with unknown type {}", tag);
                Tick::Dropped(tag)
            }
            PacketKind::OrientationRate | PacketKind::RawRate => {
                let setpoints = self.state.setpoints();
                let values = {
                    let mut framer = self.framer.lock();
                    if let Err(e) = framer.save(&packet, &setpoints) {
                        warn!("Failed to record packet: {}", e);
                    }
                    framer.decode(&packet)?
                };

                if kind == PacketKind::OrientationRate {
                    self.publish_orientation(values, setpoints.attitude.yaw, sink);
                } else {
                    publish_all(sink, &Outbound::RAW_RATE, &values);
                }
                self.publish_commanded(sink);
                Tick::Published(kind)
            }
        };

        Ok(tick)
    }

    fn publish_orientation(&self, values: [f32; 4], yaw_deg: f32, sink: &dyn TelemetrySink) {
        publish_all(sink, &Outbound::ORIENTATION_RATE, &values);

        let q = self.math.quaternion_error(yaw_deg * YAW_DEG_TO_RAD, values);
        publish_all(sink, &Outbound::QUATERNION, &q);

        let cross = [q[1] * q[0], q[2] * q[0], q[3] * q[0]];
        publish_all(sink, &Outbound::CROSS_TERMS, &cross);
    }

    /// Echo the live setpoints next to the sensor data
    fn publish_commanded(&self, sink: &dyn TelemetrySink) {
        let setpoints = self.state.setpoints();
        sink.publish(Outbound::CmdYaw, setpoints.attitude.yaw);
        sink.publish(Outbound::CmdSpeedX, setpoints.speed.x);
        sink.publish(Outbound::CmdTorqueX, setpoints.torque.x);
        sink.publish(Outbound::CmdVoltageX, setpoints.voltage.x);
    }

    /// Poll at `rate_hz` until the session ends.
    ///
    /// Errors end the tick, never the loop.
    pub fn run_poll_loop(&self, rate_hz: u32, sink: &dyn TelemetrySink) {
        let period = Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64);
        info!("Poll loop started: {}Hz", rate_hz);

        let mut next_tick = Instant::now();
        let mut failures: u64 = 0;
        let mut packets: u64 = 0;

        while self.run_state.is_running() {
            match self.poll_once(sink) {
                Ok(tick) => {
                    if failures > 0 {
                        info!("Link recovered after {} failed ticks", failures);
                        failures = 0;
                    }
                    if matches!(tick, Tick::Published(_)) {
                        packets += 1;
                    }
                }
                Err(e) => {
                    failures += 1;
                    if failures == 1 {
                        warn!("Poll tick failed: {}", e);
                    } else {
                        debug!("Poll tick failed ({} in a row): {}", failures, e);
                    }
                }
            }

            next_tick += period;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                // Fell behind, don't try to catch up
                next_tick = now;
            }
        }

        info!("Poll loop stopped after {} packets", packets);
    }
}

fn publish_all(sink: &dyn TelemetrySink, channels: &[Outbound], values: &[f32]) {
    for (channel, value) in channels.iter().zip(values) {
        sink.publish(*channel, *value);
    }
}
