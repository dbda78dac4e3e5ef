// Device framing: command encoding, telemetry decoding and session recording
//
// Provides:
// - The `Framer` seam used by the bridge
// - The 14-byte wheel controller frame codec
// - CSV session recording

pub mod codec;
pub mod recorder;

use std::path::Path;

use tracing::debug;

use crate::grammar::CommandCode;
use crate::state::Setpoints;

pub use codec::{FRAME_LEN, decode_frame, encode_frame};
pub use recorder::SessionRecorder;

/// Error types for framing and recording
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    Checksum { expected: u8, actual: u8 },

    #[error("Recording error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Encodes commands, decodes telemetry and persists each exchange
pub trait Framer: Send {
    fn encode(&self, code: CommandCode) -> Vec<u8>;

    /// Four telemetry values carried by a received packet
    fn decode(&self, packet: &[u8]) -> Result<[f32; 4]>;

    /// Persist a received packet together with the live setpoints
    fn save(&mut self, packet: &[u8], setpoints: &Setpoints) -> Result<()>;

    fn stop(&mut self) -> Result<()>;
}

/// Framer for the wheel controller, recording to a CSV file per session
pub struct DeviceFramer {
    recorder: Option<SessionRecorder>,
}

impl DeviceFramer {
    pub fn create(log_dir: &Path, session: &str) -> Result<Self> {
        let recorder = SessionRecorder::create(log_dir, session)?;
        Ok(Self {
            recorder: Some(recorder),
        })
    }
}

impl Framer for DeviceFramer {
    fn encode(&self, code: CommandCode) -> Vec<u8> {
        let values = code.values().map(|v| v as f32);
        let frame = encode_frame(codec::COMMAND_FRAME_ID, values);
        debug!("Encoded command {:?} -> {:02X?}", code, frame);
        frame.to_vec()
    }

    fn decode(&self, packet: &[u8]) -> Result<[f32; 4]> {
        decode_frame(packet).map(|(_, values)| values)
    }

    fn save(&mut self, packet: &[u8], setpoints: &Setpoints) -> Result<()> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        let packet_type = packet.first().copied().unwrap_or_default();
        let values = decode_frame(packet).ok().map(|(_, values)| values);
        recorder.record(packet_type, values, setpoints)?;
        Ok(())
    }

    /// Flush and close the recording; later saves are ignored
    fn stop(&mut self) -> Result<()> {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Vector3;

    #[test]
    fn test_encode_command_frame() {
        let dir = tempfile::tempdir().unwrap();
        let framer = DeviceFramer::create(dir.path(), "encode").unwrap();
        let frame = framer.encode(CommandCode([1, 1200, -5, 0]));

        assert_eq!(frame.len(), FRAME_LEN);
        assert_eq!(frame[0], codec::COMMAND_FRAME_ID);
        let (_, values) = decode_frame(&frame).unwrap();
        assert_eq!(values, [1.0, 1200.0, -5.0, 0.0]);
    }

    #[test]
    fn test_decode_telemetry() {
        let dir = tempfile::tempdir().unwrap();
        let framer = DeviceFramer::create(dir.path(), "decode").unwrap();
        let frame = encode_frame(codec::RAW_RATE_ID, [0.5, -1.25, 2.0, 3.0]);
        assert_eq!(framer.decode(&frame).unwrap(), [0.5, -1.25, 2.0, 3.0]);
        assert!(framer.decode(&frame[..3]).is_err());
    }

    #[test]
    fn test_save_after_stop_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut framer = DeviceFramer::create(dir.path(), "stopped").unwrap();
        let frame = encode_frame(codec::ORIENTATION_RATE_ID, [1.0, 2.0, 3.0, 4.0]);
        let setpoints = Setpoints {
            speed: Vector3::splat(1000.0),
            ..Default::default()
        };

        framer.save(&frame, &setpoints).unwrap();
        framer.stop().unwrap();
        framer.save(&frame, &setpoints).unwrap();
        framer.stop().unwrap();

        let contents = std::fs::read_to_string(dir.path().join("stopped.csv")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
