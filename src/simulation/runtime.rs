//! Background tick loop
//!
//! The simulation lives behind one mutex. The tick thread holds it for the
//! whole of each `advance_tick`, so readers never see a partial tick.

use anyhow::{anyhow, Result};
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::signals::PhaseDurations;
use super::types::EdgeId;
use super::world::{Simulation, SimulationSnapshot};

/// Shortest wall-clock period between ticks
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(10);

pub struct SimulationRuntime {
    simulation: Arc<Mutex<Simulation>>,
    stop: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
    thread: Option<JoinHandle<()>>,
}

impl SimulationRuntime {
    /// Start ticking once per simulated tick duration of wall-clock time
    pub fn start(simulation: Simulation) -> Self {
        let seconds = simulation.engine().config().tick_duration;
        let period = Duration::try_from_secs_f32(seconds).unwrap_or(MIN_TICK_PERIOD);
        Self::start_with_period(simulation, period)
    }

    pub fn start_with_period(simulation: Simulation, period: Duration) -> Self {
        let period = period.max(MIN_TICK_PERIOD);
        let simulation = Arc::new(Mutex::new(simulation));
        let stop = Arc::new(AtomicBool::new(false));
        let last_error = Arc::new(Mutex::new(None));

        let thread = {
            let simulation = Arc::clone(&simulation);
            let stop = Arc::clone(&stop);
            let last_error = Arc::clone(&last_error);
            thread::spawn(move || run_loop(simulation, stop, last_error, period))
        };

        info!("Simulation runtime started ({:?} per tick)", period);
        Self {
            simulation,
            stop,
            last_error,
            thread: Some(thread),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Simulation>> {
        self.simulation
            .lock()
            .map_err(|_| anyhow!("simulation lock poisoned"))
    }

    /// Run `f` with exclusive access between ticks
    pub fn with_simulation<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> Result<R> {
        let mut simulation = self.lock()?;
        Ok(f(&mut simulation))
    }

    pub fn snapshot(&self) -> Result<SimulationSnapshot> {
        self.with_simulation(|simulation| simulation.snapshot())
    }

    pub fn toggle_edge_closure(&self, edge: EdgeId) -> Result<bool> {
        self.with_simulation(|simulation| simulation.toggle_edge_closure(edge))
    }

    pub fn update_signal_timings(&self, north_south: f32, east_west: f32) -> Result<PhaseDurations> {
        self.with_simulation(|simulation| simulation.update_signal_timings(north_south, east_west))
    }

    pub fn update_spawn_interval(&self, interval: u32) -> Result<u32> {
        self.with_simulation(|simulation| simulation.update_spawn_interval(interval))
    }

    /// False once shut down or halted by a failing tick
    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Acquire)
    }

    /// The error that halted the tick loop, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    /// Stop the tick loop and wait for the thread to finish
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Simulation thread panicked");
            }
        }
    }
}

impl Drop for SimulationRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(
    simulation: Arc<Mutex<Simulation>>,
    stop: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
    period: Duration,
) {
    while !stop.load(Ordering::Acquire) {
        thread::sleep(period);
        if stop.load(Ordering::Acquire) {
            break;
        }

        let result = match simulation.lock() {
            Ok(mut simulation) => simulation.advance_tick(),
            Err(_) => Err(anyhow!("simulation lock poisoned")),
        };

        if let Err(err) = result {
            error!("Tick loop halted: {:#}", err);
            if let Ok(mut slot) = last_error.lock() {
                *slot = Some(format!("{:#}", err));
            }
            stop.store(true, Ordering::Release);
        }
    }
}
