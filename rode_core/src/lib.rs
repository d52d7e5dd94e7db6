#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core rode-counter logic (hardware-agnostic).
//!
//! This crate tracks the deployed length of an anchor chain from a two-phase
//! rotary encoder. All hardware interactions go through the
//! `rode_traits::EncoderInput`, `CountStore` and `LengthSink` traits.
//!
//! ## Architecture
//!
//! - **Decoding**: A-edge detection with a fixed direction convention
//!   (`decoder` module)
//! - **Derivation**: count to meters, never cached (`convert` module)
//! - **Persistence**: debounced flush scheduling (`persist` module)
//! - **Reset**: asynchronous zeroing via a channel consumed by the tick
//!   loop (`reset` module)
//! - **Orchestration**: paced tick loop (`runner` module)
//!
//! The signed pulse count is the single source of truth for position; the
//! deployed length is recomputed from it on demand.

pub mod convert;
pub mod decoder;
pub mod error;
pub mod mocks;
pub mod persist;
pub mod reset;
pub mod runner;

use crate::error::{BuildError, Result, TrackerError};
use crate::persist::FlushScheduler;
use crate::reset::ResetHandle;
use eyre::WrapErr;
use rode_traits::clock::{Clock, MonotonicClock};
use rode_traits::{CountStore, EncoderInput, LengthSink};
use std::sync::Arc;
use std::time::Instant;

pub use decoder::{Direction, QuadratureDecoder};

// For typed hardware error mapping
#[cfg(feature = "hardware-errors")]
use rode_hardware::error::HwError;

/// Encoder geometry, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct EncoderCfg {
    /// Encoder pulses per meter of chain deployed.
    pub ticks_per_meter: u32,
    /// Total chain on the drum (meters), for capacity reporting.
    pub chain_length_m: f32,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            ticks_per_meter: 106,
            chain_length_m: 50.0,
        }
    }
}

impl From<&rode_config::EncoderCfg> for EncoderCfg {
    fn from(c: &rode_config::EncoderCfg) -> Self {
        Self {
            ticks_per_meter: c.ticks_per_meter,
            chain_length_m: c.chain_length_m,
        }
    }
}

/// Persistence scheduling knobs.
#[derive(Debug, Clone, Copy)]
pub struct PersistCfg {
    /// Quiet time after the last transition before a flush is due (ms).
    pub quiescence_ms: u64,
}

impl Default for PersistCfg {
    fn default() -> Self {
        Self { quiescence_ms: 5000 }
    }
}

impl From<&rode_config::PersistenceCfg> for PersistCfg {
    fn from(c: &rode_config::PersistenceCfg) -> Self {
        Self {
            quiescence_ms: c.quiescence_ms,
        }
    }
}

/// Public outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStatus {
    /// Pulse detected this tick, if any.
    pub movement: Option<Direction>,
    /// Deployed length after this tick (meters).
    pub deployed_m: f32,
    /// The sink was notified this tick.
    pub published: bool,
    /// The count was durably persisted this tick.
    pub flushed: bool,
    /// A reset request was consumed this tick.
    pub reset: bool,
}

/// Owned aggregate of all tracker state: count, decoder baseline, flush
/// scheduling and the reset mailbox. One instance per encoder; all mutation
/// happens on the thread calling `tick`.
pub struct ChainTracker<I: EncoderInput, S: CountStore, P: LengthSink> {
    input: I,
    store: S,
    sink: P,
    encoder: EncoderCfg,
    decoder: QuadratureDecoder,
    scheduler: FlushScheduler,
    // Signed net pulse count since the last reset; the source of truth.
    count: i32,
    // Count equivalent of the configured chain length.
    capacity_ticks: i32,
    // Unified clock for deterministic time in tests
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    // Epoch Instant for computing monotonic milliseconds
    epoch: Instant,
    reset_rx: crossbeam_channel::Receiver<()>,
    reset_handle: ResetHandle,
    started: bool,
    last_published: Option<f32>,
    // Warn once per capacity excursion, not per pulse.
    over_capacity: bool,
}

impl<I: EncoderInput, S: CountStore, P: LengthSink> core::fmt::Debug for ChainTracker<I, S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChainTracker")
            .field("count", &self.count)
            .field("deployed_m", &self.deployed_m())
            .field("pending_write", &self.scheduler.pending())
            .finish()
    }
}

impl<I: EncoderInput, S: CountStore, P: LengthSink> ChainTracker<I, S, P> {
    /// Handle for asynchronous reset requests; safe to clone into watcher
    /// threads and signal handlers.
    pub fn reset_handle(&self) -> ResetHandle {
        self.reset_handle.clone()
    }

    /// Shared clock, for callers that pace the tick loop.
    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    /// Net pulse count since the last reset.
    pub fn count(&self) -> i32 {
        self.count
    }

    /// Deployed length in meters, derived from the count.
    pub fn deployed_m(&self) -> f32 {
        convert::ticks_to_meters(self.count, self.encoder.ticks_per_meter)
    }

    /// Configured total chain length in meters.
    pub fn capacity_m(&self) -> f32 {
        self.encoder.chain_length_m
    }

    /// True while the last count change has not been durably persisted.
    pub fn pending_write(&self) -> bool {
        self.scheduler.pending()
    }

    /// Recover the persisted count and perform the startup publish. A store
    /// read failure degrades to a zero count; the monitor must still start.
    /// Idempotent: later calls are no-ops.
    pub fn init(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        match self.store.load() {
            Ok(n) => {
                self.count = n;
                tracing::info!(
                    count = n,
                    deployed_m = self.deployed_m(),
                    "recovered persisted count"
                );
            }
            Err(e) => {
                self.count = 0;
                tracing::warn!(error = %e, "no usable persisted count; starting from zero");
            }
        }
        self.started = true;
        let m = self.deployed_m();
        self.publish_if_changed(m);
        Ok(())
    }

    /// One iteration of the tick loop: consume any reset, decode one sample,
    /// publish on change, flush if due.
    pub fn tick(&mut self) -> Result<TickStatus> {
        if !self.started {
            return Err(eyre::Report::new(TrackerError::State(
                "tick before init".into(),
            )));
        }
        let now = self.clock.ms_since(self.epoch);
        let mut status = TickStatus {
            movement: None,
            deployed_m: self.deployed_m(),
            published: false,
            flushed: false,
            reset: false,
        };

        // Reset first: its zeroing must land before this tick's decode, and
        // it supersedes any flush pending for the pre-reset value.
        if self.take_reset() {
            self.count = 0;
            self.scheduler.force();
            // Downstream must see the reset acknowledged even when the
            // length was already zero.
            self.last_published = None;
            status.reset = true;
            tracing::info!("reset consumed; count zeroed");
        }

        let sample = self
            .input
            .sample()
            .map_err(|e| eyre::Report::new(map_hw_error_dyn(&*e)))
            .wrap_err("sampling phase lines")?;

        if let Some(dir) = self.decoder.update(sample) {
            self.count = self.count.saturating_add(dir.delta());
            self.scheduler.mark_change(now);
            status.movement = Some(dir);
            tracing::debug!(count = self.count, direction = ?dir, "encoder transition");
            if self.count > self.capacity_ticks {
                if !self.over_capacity {
                    self.over_capacity = true;
                    tracing::warn!(
                        deployed_m = self.deployed_m(),
                        capacity_m = self.encoder.chain_length_m,
                        "deployed length exceeds configured chain length"
                    );
                }
            } else {
                self.over_capacity = false;
            }
        }

        let m = self.deployed_m();
        status.deployed_m = m;
        if status.movement.is_some() || status.reset {
            status.published = self.publish_if_changed(m);
        }

        if self.scheduler.due(now) {
            match self.store.store(self.count) {
                Ok(()) => {
                    self.scheduler.settle();
                    status.flushed = true;
                    tracing::debug!(count = self.count, "count persisted");
                }
                Err(e) => {
                    // Pending stays set; retried on the next eligible tick.
                    tracing::warn!(error = %e, count = self.count, "persist failed; will retry");
                }
            }
        }

        Ok(status)
    }

    /// Force a write of the current count, e.g. on shutdown.
    pub fn flush_now(&mut self) -> Result<()> {
        self.store
            .store(self.count)
            .map_err(|e| eyre::Report::new(map_hw_error_dyn(&*e)))
            .wrap_err("persisting count")?;
        self.scheduler.settle();
        Ok(())
    }

    fn take_reset(&mut self) -> bool {
        let mut requested = false;
        while self.reset_rx.try_recv().is_ok() {
            requested = true;
        }
        requested
    }

    fn publish_if_changed(&mut self, meters: f32) -> bool {
        if self.last_published == Some(meters) {
            return false;
        }
        match self.sink.publish(meters) {
            Ok(()) => {
                self.last_published = Some(meters);
                true
            }
            Err(e) => {
                // Non-fatal: the publisher boundary must never stop the tracker.
                tracing::warn!(error = %e, meters, "publish failed");
                false
            }
        }
    }
}

// Map any error to a typed TrackerError, with special handling for hardware errors.
fn map_hw_error_dyn(e: &(dyn std::error::Error + 'static)) -> TrackerError {
    #[cfg(feature = "hardware-errors")]
    if let Some(hw) = e.downcast_ref::<HwError>() {
        return match hw {
            HwError::Gpio(m) => TrackerError::Input(m.clone()),
            other => TrackerError::Storage(other.to_string()),
        };
    }
    TrackerError::Hardware(e.to_string())
}

/// Boxed tracker built through the type-state builder.
pub type Tracker =
    ChainTracker<Box<dyn EncoderInput>, Box<dyn CountStore>, Box<dyn LengthSink>>;

impl Tracker {
    /// Start building a Tracker.
    pub fn builder() -> TrackerBuilder<Missing, Missing, Missing> {
        TrackerBuilder::default()
    }
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

use std::marker::PhantomData;

/// Builder for `Tracker`. All fields are validated on `build()`.
pub struct TrackerBuilder<I, S, P> {
    input: Option<Box<dyn EncoderInput>>,
    store: Option<Box<dyn CountStore>>,
    sink: Option<Box<dyn LengthSink>>,
    encoder: Option<EncoderCfg>,
    persist: Option<PersistCfg>,
    // Optional clock for tests (accept Box here)
    clock: Option<Box<dyn Clock + Send + Sync>>,
    // Type-state markers
    _i: PhantomData<I>,
    _s: PhantomData<S>,
    _p: PhantomData<P>,
}

impl Default for TrackerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            input: None,
            store: None,
            sink: None,
            encoder: None,
            persist: None,
            clock: None,
            _i: PhantomData,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<I, S, P> TrackerBuilder<I, S, P> {
    /// Fallible build available in any type-state; returns detailed BuildError for missing pieces.
    pub fn try_build(self) -> Result<Tracker> {
        let TrackerBuilder {
            input,
            store,
            sink,
            encoder,
            persist,
            clock,
            _i: _,
            _s: _,
            _p: _,
        } = self;

        let input = input.ok_or_else(|| eyre::Report::new(BuildError::MissingInput))?;
        let store = store.ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let sink = sink.ok_or_else(|| eyre::Report::new(BuildError::MissingSink))?;

        let encoder = encoder.unwrap_or_default();
        let persist = persist.unwrap_or_default();
        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        if encoder.ticks_per_meter == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "ticks_per_meter must be > 0",
            )));
        }
        if !encoder.chain_length_m.is_finite() || encoder.chain_length_m <= 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "chain_length_m must be finite and > 0",
            )));
        }

        let capacity_ticks =
            convert::meters_to_ticks(encoder.chain_length_m, encoder.ticks_per_meter);
        let epoch = clock.now();
        let (reset_handle, reset_rx) = reset::channel();

        Ok(ChainTracker {
            input,
            store,
            sink,
            scheduler: FlushScheduler::new(persist.quiescence_ms),
            encoder,
            decoder: QuadratureDecoder::new(),
            count: 0,
            capacity_ticks,
            clock,
            epoch,
            reset_rx,
            reset_handle,
            started: false,
            last_published: None,
            over_capacity: false,
        })
    }
}

/// Chainable setters that do not affect type-state
impl<I, S, P> TrackerBuilder<I, S, P> {
    pub fn with_encoder_cfg(mut self, encoder: EncoderCfg) -> Self {
        self.encoder = Some(encoder);
        self
    }
    pub fn with_persist_cfg(mut self, persist: PersistCfg) -> Self {
        self.persist = Some(persist);
        self
    }
    /// Provide a custom clock implementation; defaults to MonotonicClock when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state when providing mandatory collaborators
impl<S, P> TrackerBuilder<Missing, S, P> {
    pub fn with_input(self, input: impl EncoderInput + 'static) -> TrackerBuilder<Set, S, P> {
        let TrackerBuilder {
            input: _,
            store,
            sink,
            encoder,
            persist,
            clock,
            _i: _,
            _s: _,
            _p: _,
        } = self;
        TrackerBuilder {
            input: Some(Box::new(input)),
            store,
            sink,
            encoder,
            persist,
            clock,
            _i: PhantomData,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<I, P> TrackerBuilder<I, Missing, P> {
    pub fn with_store(self, store: impl CountStore + 'static) -> TrackerBuilder<I, Set, P> {
        let TrackerBuilder {
            input,
            store: _,
            sink,
            encoder,
            persist,
            clock,
            _i: _,
            _s: _,
            _p: _,
        } = self;
        TrackerBuilder {
            input,
            store: Some(Box::new(store)),
            sink,
            encoder,
            persist,
            clock,
            _i: PhantomData,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<I, S> TrackerBuilder<I, S, Missing> {
    pub fn with_sink(self, sink: impl LengthSink + 'static) -> TrackerBuilder<I, S, Set> {
        let TrackerBuilder {
            input,
            store,
            sink: _,
            encoder,
            persist,
            clock,
            _i: _,
            _s: _,
            _p: _,
        } = self;
        TrackerBuilder {
            input,
            store,
            sink: Some(Box::new(sink)),
            encoder,
            persist,
            clock,
            _i: PhantomData,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl TrackerBuilder<Set, Set, Set> {
    /// Validate and build the Tracker. Only available when input, store and sink are set.
    pub fn build(self) -> Result<Tracker> {
        self.try_build()
    }
}
