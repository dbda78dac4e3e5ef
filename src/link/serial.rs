// Serial link: assembles fixed-size frames from whatever bytes are pending

use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

use super::{Link, LinkError, Result};
use crate::config::SERIAL_TIMEOUT_MS;
use crate::framing::FRAME_LEN;

pub struct SerialLink {
    port_name: String,
    baudrate: u32,
    port: Option<Box<dyn SerialPort>>,
    assembler: FrameAssembler,
}

impl SerialLink {
    pub fn new(port_name: &str, baudrate: u32) -> Self {
        Self {
            port_name: port_name.to_string(),
            baudrate,
            port: None,
            assembler: FrameAssembler::default(),
        }
    }
}

impl Link for SerialLink {
    fn initialize(&mut self) -> Result<()> {
        info!("Opening link on {} @ {} baud", self.port_name, self.baudrate);
        let port = serialport::new(self.port_name.as_str(), self.baudrate)
            .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open()?;
        self.port = Some(port);
        self.assembler.clear();
        Ok(())
    }

    fn write(&mut self, frame: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(LinkError::NotConnected)?;
        debug!("Sending frame {:02X?}", frame);
        port.write_all(frame)?;
        port.flush()?;
        Ok(())
    }

    fn read(&mut self) -> Result<bool> {
        let port = self.port.as_mut().ok_or(LinkError::NotConnected)?;
        let pending = port.bytes_to_read()? as usize;
        self.assembler.fill(pending, |buf| port.read_exact(buf))?;
        Ok(self.assembler.is_complete())
    }

    fn packet(&self) -> &[u8] {
        self.assembler.frame()
    }

    fn reset(&mut self) {
        self.assembler.clear();
    }

    fn stop(&mut self) {
        if self.port.take().is_some() {
            info!("Closed link on {}", self.port_name);
        }
    }
}

/// Fixed-size frame buffer.
///
/// A complete frame that was never cleared is shifted by one byte before new
/// data is appended, so an unconsumed frame resynchronises the stream.
#[derive(Debug, Default)]
struct FrameAssembler {
    buffer: [u8; FRAME_LEN],
    filled: usize,
}

impl FrameAssembler {
    fn fill<F>(&mut self, pending: usize, mut read: F) -> std::io::Result<()>
    where
        F: FnMut(&mut [u8]) -> std::io::Result<()>,
    {
        if self.is_complete() {
            self.buffer.copy_within(1.., 0);
            self.filled -= 1;
        }
        let count = pending.min(FRAME_LEN - self.filled);
        if count > 0 {
            read(&mut self.buffer[self.filled..self.filled + count])?;
            self.filled += count;
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.filled == FRAME_LEN
    }

    fn frame(&self) -> &[u8] {
        &self.buffer[..self.filled]
    }

    fn clear(&mut self) {
        self.filled = 0;
    }
}
