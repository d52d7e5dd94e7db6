use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rode_core::runner::{self, RunParams};
use rstest::rstest;
use rode_core::{Direction, EncoderCfg, PersistCfg, Tracker};
use rode_traits::{Clock, CountStore, EncoderInput, LengthSink, PhaseSample};

/// Encoder input replaying a fixed phase-line script, then holding the
/// last sample.
struct ScriptedInput {
    script: Vec<PhaseSample>,
    idx: usize,
}

impl ScriptedInput {
    fn new(script: impl Into<Vec<PhaseSample>>) -> Self {
        Self {
            script: script.into(),
            idx: 0,
        }
    }

    /// Idle baseline followed by `pulses` A-edges in one direction.
    fn pulses(pulses: usize, deploying: bool) -> Self {
        let mut script = vec![PhaseSample { a: false, b: false }];
        let mut a = false;
        for _ in 0..pulses {
            a = !a;
            let b = if deploying { a } else { !a };
            script.push(PhaseSample { a, b });
        }
        Self::new(script)
    }
}

impl EncoderInput for ScriptedInput {
    fn sample(&mut self) -> Result<PhaseSample, Box<dyn Error + Send + Sync>> {
        let i = self.idx.min(self.script.len().saturating_sub(1));
        self.idx += 1;
        Ok(self.script[i])
    }
}

/// In-memory store spy recording every write.
#[derive(Clone, Default)]
struct SpyStore {
    slot: Arc<Mutex<Option<i32>>>,
    writes: Arc<Mutex<Vec<i32>>>,
}

impl CountStore for SpyStore {
    fn load(&mut self) -> Result<i32, Box<dyn Error + Send + Sync>> {
        self.slot
            .lock()
            .unwrap()
            .ok_or_else(|| "empty slot".into())
    }

    fn store(&mut self, count: i32) -> Result<(), Box<dyn Error + Send + Sync>> {
        *self.slot.lock().unwrap() = Some(count);
        self.writes.lock().unwrap().push(count);
        Ok(())
    }
}

/// Sink spy recording every published length.
#[derive(Clone, Default)]
struct SpySink {
    published: Arc<Mutex<Vec<f32>>>,
}

impl LengthSink for SpySink {
    fn publish(&mut self, meters: f32) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.published.lock().unwrap().push(meters);
        Ok(())
    }
}

/// Manually advanced clock; `ms_since` ignores the epoch and reports the
/// fake elapsed time directly.
#[derive(Clone, Default)]
struct TestClock {
    now_ms: Arc<AtomicU64>,
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
    fn sleep(&self, _d: Duration) {}
    fn ms_since(&self, _epoch: Instant) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

fn tracker(input: ScriptedInput, store: SpyStore, sink: SpySink, clock: TestClock) -> Tracker {
    Tracker::builder()
        .with_input(input)
        .with_store(store)
        .with_sink(sink)
        .with_encoder_cfg(EncoderCfg {
            ticks_per_meter: 106,
            chain_length_m: 50.0,
        })
        .with_persist_cfg(PersistCfg { quiescence_ms: 5000 })
        .with_clock(Box::new(clock))
        .build()
        .expect("build tracker")
}

#[test]
fn startup_publishes_recovered_length_exactly_once() {
    let store = SpyStore::default();
    *store.slot.lock().unwrap() = Some(212); // 2 m at 106 ticks/m
    let sink = SpySink::default();
    let mut t = tracker(
        ScriptedInput::new([PhaseSample { a: false, b: false }]),
        store,
        sink.clone(),
        TestClock::default(),
    );

    t.init().expect("init");
    t.init().expect("second init is a no-op");
    assert_eq!(t.count(), 212);

    // Idle ticks must not republish the unchanged value.
    for _ in 0..5 {
        t.tick().expect("tick");
    }
    assert_eq!(*sink.published.lock().unwrap(), vec![2.0]);
}

#[test]
fn load_failure_degrades_to_zero() {
    let store = SpyStore::default(); // empty slot -> load error
    let sink = SpySink::default();
    let mut t = tracker(
        ScriptedInput::new([PhaseSample { a: false, b: false }]),
        store,
        sink.clone(),
        TestClock::default(),
    );

    t.init().expect("init survives a load failure");
    assert_eq!(t.count(), 0);
    assert_eq!(*sink.published.lock().unwrap(), vec![0.0]);
}

#[test]
fn deploy_then_retrieve_returns_to_start() {
    let mut script = vec![PhaseSample { a: false, b: false }];
    let mut a = false;
    for _ in 0..6 {
        a = !a;
        script.push(PhaseSample { a, b: a }); // deploying
    }
    for _ in 0..6 {
        a = !a;
        script.push(PhaseSample { a, b: !a }); // retrieving
    }
    let sink = SpySink::default();
    let mut t = tracker(
        ScriptedInput::new(script),
        SpyStore::default(),
        sink.clone(),
        TestClock::default(),
    );
    t.init().expect("init");

    let mut deployed = 0;
    let mut retrieved = 0;
    for _ in 0..13 {
        match t.tick().expect("tick").movement {
            Some(Direction::Deploying) => deployed += 1,
            Some(Direction::Retrieving) => retrieved += 1,
            None => {}
        }
    }
    assert_eq!((deployed, retrieved), (6, 6));
    assert_eq!(t.count(), 0);
    assert_eq!(t.deployed_m(), 0.0);
    // Every intermediate change was published, ending back at zero.
    assert_eq!(sink.published.lock().unwrap().last(), Some(&0.0));
}

#[test]
fn b_line_noise_without_a_edge_is_ignored() {
    // A stays low while B flaps: no pulses, no publishes beyond startup.
    let script = [
        PhaseSample { a: false, b: false },
        PhaseSample { a: false, b: true },
        PhaseSample { a: false, b: false },
        PhaseSample { a: false, b: true },
    ];
    let sink = SpySink::default();
    let mut t = tracker(
        ScriptedInput::new(script),
        SpyStore::default(),
        sink.clone(),
        TestClock::default(),
    );
    t.init().expect("init");
    for _ in 0..4 {
        let status = t.tick().expect("tick");
        assert!(status.movement.is_none());
    }
    assert_eq!(t.count(), 0);
    assert_eq!(sink.published.lock().unwrap().len(), 1);
}

#[rstest]
#[case(53, 0.5)]
#[case(106, 1.0)]
#[case(212, 2.0)]
fn deployed_length_is_exact_at_whole_and_half_meters(#[case] pulses: usize, #[case] expect_m: f32) {
    let mut t = tracker(
        ScriptedInput::pulses(pulses, true),
        SpyStore::default(),
        SpySink::default(),
        TestClock::default(),
    );
    t.init().expect("init");
    for _ in 0..=pulses {
        t.tick().expect("tick");
    }
    assert_eq!(t.count(), pulses as i32);
    assert_eq!(t.deployed_m(), expect_m);
    assert_eq!(t.capacity_m(), 50.0);
}

#[test]
fn runner_flushes_pending_count_on_exit() {
    let store = SpyStore::default();
    *store.slot.lock().unwrap() = Some(0);
    let sink = SpySink::default();
    let clock = TestClock::default();
    let mut t = tracker(ScriptedInput::pulses(4, true), store.clone(), sink, clock);

    let shutdown = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let params = RunParams {
        rate_hz: 100,
        max_ticks: Some(10),
    };
    // Quiescence never elapses on the frozen clock, so the final flush is
    // the runner's doing.
    let final_m = runner::run(&mut t, params, &shutdown).expect("run");
    assert!((final_m - 4.0 / 106.0).abs() < 1e-6);
    assert_eq!(*store.slot.lock().unwrap(), Some(4));
    assert_eq!(store.writes.lock().unwrap().len(), 1);
    assert!(!t.pending_write());
}
