//! Store, encoder and sink implementations for the rode counter.
//!
//! Simulated variants live alongside the GPIO-backed ones so the CLI and
//! tests run on any host; the `hardware` feature enables the real pins.
pub mod error;
#[cfg(feature = "hardware")]
pub mod gpio;

use error::HwError;
use rode_traits::{CountStore, EncoderInput, LengthSink, PhaseSample};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// File-backed count slot: a little-endian i32 at a fixed byte offset.
///
/// The write path flushes to disk (`sync_all`) before reporting success, so
/// a count the tracker believes persisted survives power loss.
pub struct FileStore {
    path: PathBuf,
    address: u64,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>, address: u64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            address,
        }
    }

    fn read_slot(&self) -> Result<i32, HwError> {
        let mut f = OpenOptions::new().read(true).open(&self.path)?;
        f.seek(SeekFrom::Start(self.address))?;
        let mut buf = [0u8; 4];
        f.read_exact(&mut buf)
            .map_err(|e| HwError::ShortSlot(format!("{} @ {}: {e}", self.path.display(), self.address)))?;
        Ok(i32::from_le_bytes(buf))
    }

    fn write_slot(&self, count: i32) -> Result<(), HwError> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        f.seek(SeekFrom::Start(self.address))?;
        f.write_all(&count.to_le_bytes())?;
        f.sync_all()?;
        tracing::debug!(count, address = self.address, "count slot written");
        Ok(())
    }
}

impl CountStore for FileStore {
    fn load(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_slot()?)
    }

    fn store(&mut self, count: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.write_slot(count)?)
    }
}

/// Scripted encoder input; repeats its final sample once the script ends.
pub struct SimulatedEncoder {
    script: VecDeque<PhaseSample>,
    last: PhaseSample,
}

impl SimulatedEncoder {
    pub fn new(script: impl IntoIterator<Item = PhaseSample>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: PhaseSample { a: false, b: false },
        }
    }

    /// Quadrature sequence that pays out `pulses` ticks from an idle line.
    pub fn deploying(pulses: usize) -> Self {
        Self::new(quadrature_script(pulses, true))
    }

    /// Quadrature sequence that retrieves `pulses` ticks.
    pub fn retrieving(pulses: usize) -> Self {
        Self::new(quadrature_script(pulses, false))
    }
}

/// Build a phase-line script producing `pulses` A-edges in one direction.
///
/// The first sample is the idle baseline (the decoder's first observation
/// never counts as a transition). Deploying keeps B equal to the new A level
/// at each A-edge; retrieving keeps it opposite. Matches the decoder's fixed
/// wiring convention.
pub fn quadrature_script(pulses: usize, deploying: bool) -> Vec<PhaseSample> {
    let mut script = Vec::with_capacity(pulses + 1);
    let mut a = false;
    script.push(PhaseSample { a, b: false });
    for _ in 0..pulses {
        a = !a;
        let b = if deploying { a } else { !a };
        script.push(PhaseSample { a, b });
    }
    script
}

impl EncoderInput for SimulatedEncoder {
    fn sample(&mut self) -> Result<PhaseSample, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(s) = self.script.pop_front() {
            self.last = s;
        }
        Ok(self.last)
    }
}

/// Sink that logs the deployed length instead of transmitting it.
/// Stands in for the telemetry transport at the publisher boundary.
pub struct LogSink {
    path: String,
    unit: String,
}

impl LogSink {
    pub fn new(path: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            unit: unit.into(),
        }
    }
}

impl LengthSink for LogSink {
    fn publish(&mut self, meters: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(path = %self.path, unit = %self.unit, meters, "length published");
        Ok(())
    }
}
