pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Instantaneous levels of the two quadrature phase lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSample {
    pub a: bool,
    pub b: bool,
}

/// Digital input pair carrying the encoder phase lines.
/// One sample per tick; level debouncing, if needed, happens behind this trait.
pub trait EncoderInput {
    fn sample(&mut self) -> Result<PhaseSample, Box<dyn std::error::Error + Send + Sync>>;
}

/// Durable slot holding the last persisted pulse count.
/// Both operations are explicit; implementations must not autosave.
pub trait CountStore {
    fn load(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
    fn store(&mut self, count: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Telemetry boundary for the deployed length. The identifying path and unit
/// metadata are fixed when the sink is constructed.
pub trait LengthSink {
    fn publish(&mut self, meters: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: EncoderInput + ?Sized> EncoderInput for Box<T> {
    fn sample(&mut self) -> Result<PhaseSample, Box<dyn std::error::Error + Send + Sync>> {
        (**self).sample()
    }
}

impl<T: CountStore + ?Sized> CountStore for Box<T> {
    fn load(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).load()
    }
    fn store(&mut self, count: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).store(count)
    }
}

impl<T: LengthSink + ?Sized> LengthSink for Box<T> {
    fn publish(&mut self, meters: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).publish(meters)
    }
}
