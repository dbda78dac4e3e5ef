// CSV recording of every telemetry exchange in a session

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::state::Setpoints;

const HEADER: &str = "elapsed_s,type,v0,v1,v2,v3,\
speed_x,speed_y,speed_z,torque_x,torque_y,torque_z,\
voltage_x,voltage_y,voltage_z,yaw,pitch,roll";

pub struct SessionRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    started: Instant,
}

impl SessionRecorder {
    /// Create `<dir>/<session>.csv`, truncating a previous recording
    pub fn create(dir: &Path, session: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.csv", session));
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "{}", HEADER)?;
        info!("Recording session to {}", path.display());

        Ok(Self {
            path,
            writer,
            started: Instant::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line; `values` is None when the packet could not be decoded
    pub fn record(
        &mut self,
        packet_type: u8,
        values: Option<[f32; 4]>,
        setpoints: &Setpoints,
    ) -> std::io::Result<()> {
        let values = values.unwrap_or([f32::NAN; 4]);
        let a = setpoints.attitude;

        write!(
            self.writer,
            "{:.6},{}",
            self.started.elapsed().as_secs_f64(),
            packet_type
        )?;
        for v in values
            .iter()
            .chain(setpoints.speed.as_array().iter())
            .chain(setpoints.torque.as_array().iter())
            .chain(setpoints.voltage.as_array().iter())
            .chain([a.yaw, a.pitch, a.roll].iter())
        {
            write!(self.writer, ",{}", v)?;
        }
        writeln!(self.writer)
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
