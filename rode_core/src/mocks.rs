//! Test and helper mocks for rode_core

use rode_traits::{CountStore, EncoderInput, LengthSink, PhaseSample};

/// An input that always errors on sample; useful when exercising wiring that
/// never reaches the decode step.
pub struct NoopInput;

impl EncoderInput for NoopInput {
    fn sample(&mut self) -> Result<PhaseSample, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop input")))
    }
}

/// A store that fails every operation; exercises degraded startup and the
/// flush retry path.
pub struct FailingStore;

impl CountStore for FailingStore {
    fn load(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("store unavailable")))
    }
    fn store(&mut self, _count: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("store unavailable")))
    }
}

/// A sink that accepts and drops every value.
pub struct NullSink;

impl LengthSink for NullSink {
    fn publish(&mut self, _meters: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
