//! Simulation controller: owns the periodic tick task.
//!
//! The engine sits behind a single mutex together with the run state. A tick
//! holds the lock for its whole duration, so quote updates land strictly
//! between ticks and a `stop()` that returns guarantees no later tick touches
//! the engine. Each `start()` opens a new run generation; a tick task that
//! wakes up after its generation ended exits without ticking.

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use parking_lot::Mutex;
use rand::Rng;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::SimulationConfig;
use crate::engine::MarketEngine;
use crate::quote::QuoteRequest;
use crate::snapshot::{MarketSnapshot, SimulationStatus};

struct RunState<R> {
    engine: MarketEngine<R>,
    status: SimulationStatus,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl<R: Rng> RunState<R> {
    fn snapshot(&self) -> Arc<MarketSnapshot> {
        Arc::new(self.engine.snapshot(self.status))
    }
}

/// Start/stop control over a [`MarketEngine`], ticking on a tokio interval.
///
/// # Example
/// ```
/// # use quotebook::{Simulation, SimulationConfig, SimulationStatus};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> eyre::Result<()> {
/// let sim = Simulation::new(SimulationConfig { seed: Some(1), ..Default::default() })?;
/// sim.start()?;
/// assert_eq!(sim.status(), SimulationStatus::Running);
/// sim.stop();
/// assert_eq!(sim.snapshot().status, SimulationStatus::Stopped);
/// # Ok(())
/// # }
/// ```
pub struct Simulation<R = rand::rngs::StdRng> {
    state: Arc<Mutex<RunState<R>>>,
    period: Duration,
    snapshots: watch::Sender<Arc<MarketSnapshot>>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> eyre::Result<Self> {
        let period = config.tick_interval();
        Self::from_engine(MarketEngine::new(config)?, period)
    }
}

impl<R: Rng + Send + 'static> Simulation<R> {
    /// Drive an existing engine, ticking every `period`.
    pub fn from_engine(engine: MarketEngine<R>, period: Duration) -> eyre::Result<Self> {
        if period.is_zero() {
            return Err(eyre::eyre!("Tick period must be greater than zero"));
        }

        let state = RunState {
            engine,
            status: SimulationStatus::Stopped,
            generation: 0,
            task: None,
        };
        let (snapshots, _) = watch::channel(state.snapshot());

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            period,
            snapshots,
        })
    }

    /// Begin ticking every period. Does nothing if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> eyre::Result<()> {
        let runtime = Handle::try_current().wrap_err("Simulation must be started inside a tokio runtime")?;

        let mut state = self.state.lock();
        if state.status == SimulationStatus::Running {
            return Ok(());
        }

        state.status = SimulationStatus::Running;
        state.generation += 1;
        let generation = state.generation;

        let task = runtime.spawn(run_ticks(
            Arc::clone(&self.state),
            self.snapshots.clone(),
            generation,
            self.period,
        ));
        state.task = Some(task);

        log::info!(
            "simulation started (run {generation}, every {:?})",
            self.period
        );
        self.snapshots.send_replace(state.snapshot());

        Ok(())
    }

    /// Stop ticking. Does nothing if already stopped.
    ///
    /// Once this returns no further tick can run, even one whose timer
    /// already fired.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.status == SimulationStatus::Stopped {
            return;
        }

        state.status = SimulationStatus::Stopped;
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }

        log::info!("simulation stopped after {} ticks", state.engine.ticks());
        self.snapshots.send_replace(state.snapshot());
    }

    /// Replace the user's quote atomically. Accepted in either state.
    pub fn set_user_quote(&self, request: QuoteRequest) -> eyre::Result<()> {
        let mut state = self.state.lock();
        state.engine.set_user_quote(request)?;
        self.snapshots.send_replace(state.snapshot());
        Ok(())
    }

    pub fn status(&self) -> SimulationStatus {
        self.state.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == SimulationStatus::Running
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<MarketSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MarketSnapshot>> {
        self.snapshots.subscribe()
    }
}

impl<R> Drop for Simulation<R> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}

async fn run_ticks<R: Rng>(
    state: Arc<Mutex<RunState<R>>>,
    snapshots: watch::Sender<Arc<MarketSnapshot>>,
    generation: u64,
    period: Duration,
) {
    // First tick one full period after start; a restart never replays missed ticks
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let mut guard = state.lock();
        if guard.generation != generation || guard.status != SimulationStatus::Running {
            log::trace!("tick task for run {generation} exiting");
            return;
        }

        guard.engine.tick();
        snapshots.send_replace(guard.snapshot());
    }
}
