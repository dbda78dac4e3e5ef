// Byte-level link to the wheel controller
//
// Provides:
// - The `Link` seam used by the bridge
// - A serial (bluetooth SPP) implementation

mod serial;

pub use serial::SerialLink;

/// Error types for link communication
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Link not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Half-duplex frame transport.
///
/// `read` never blocks waiting for data: it returns `true` once a complete
/// frame is available through `packet`, which stays there until `reset`.
pub trait Link: Send {
    fn initialize(&mut self) -> Result<()>;

    fn write(&mut self, frame: &[u8]) -> Result<()>;

    fn read(&mut self) -> Result<bool>;

    /// Last received frame
    fn packet(&self) -> &[u8];

    /// Discard the current frame so the next read starts fresh
    fn reset(&mut self);

    fn stop(&mut self);
}
