//! Tick scheduler
//!
//! Agents are named callbacks with a start tick and an interval. On every
//! tick the engine runs the agents due at that tick in registration order,
//! each against the shared `SimulationState`, then advances the clock.

use anyhow::Result;
use log::debug;
use std::collections::{BTreeMap, HashSet};

use super::config::SimulationConfig;
use super::fleet::FleetManager;
use super::road_network::RoadNetwork;
use super::signals::SignalController;
use super::types::EdgeId;

/// Name the signal controller registers under with the engine
pub const SIGNALS_AGENT: &str = "signals";

/// State visible to every agent within a tick
///
/// Agents read and write fields directly; nothing isolates one agent's
/// changes from the next agent in the same tick.
#[derive(Debug)]
pub struct SimulationState {
    pub network: RoadNetwork,
    pub fleet: FleetManager,
    /// `None` when the run has no traffic lights
    pub signals: Option<SignalController>,
    /// Edges currently disabled by the host
    pub closed_edges: HashSet<EdgeId>,
}

impl SimulationState {
    pub fn new(network: RoadNetwork, fleet: FleetManager) -> Self {
        Self {
            network,
            fleet,
            signals: None,
            closed_edges: HashSet::new(),
        }
    }

    pub fn with_signals(mut self, signals: SignalController) -> Self {
        self.signals = Some(signals);
        self
    }
}

pub type AgentCallback = Box<dyn FnMut(&mut SimulationState, u64) -> Result<()> + Send>;

struct RegisteredAgent {
    name: String,
    callback: AgentCallback,
    interval: u64,
}

pub struct Engine {
    config: SimulationConfig,
    pub state: SimulationState,
    tick: u64,
    /// Registration order is the index into this list
    agents: Vec<RegisteredAgent>,
    schedule: BTreeMap<u64, Vec<usize>>,
}

impl Engine {
    pub fn new(config: SimulationConfig, state: SimulationState) -> Self {
        Self {
            config,
            state,
            tick: 0,
            agents: Vec::new(),
            schedule: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The tick that will run on the next `advance_tick`
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn agent_names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|agent| agent.name.as_str())
    }

    /// Register an agent and schedule its first run
    ///
    /// `interval` is clamped to at least 1, and a `start_tick` already in the
    /// past runs on the current tick. Registering a name again replaces the
    /// earlier callback and its pending schedule.
    pub fn register_agent<F>(
        &mut self,
        name: impl Into<String>,
        callback: F,
        start_tick: u64,
        interval: u64,
    ) where
        F: FnMut(&mut SimulationState, u64) -> Result<()> + Send + 'static,
    {
        let name = name.into();
        let agent = RegisteredAgent {
            name,
            callback: Box::new(callback),
            interval: interval.max(1),
        };

        let index = match self.agents.iter().position(|a| a.name == agent.name) {
            Some(index) => {
                for due in self.schedule.values_mut() {
                    due.retain(|i| *i != index);
                }
                self.agents[index] = agent;
                index
            }
            None => {
                self.agents.push(agent);
                self.agents.len() - 1
            }
        };

        self.schedule
            .entry(start_tick.max(self.tick))
            .or_default()
            .push(index);
    }

    /// Run every agent due this tick, then advance the clock
    ///
    /// A failing agent aborts the tick: the error is returned, the clock stays
    /// put and the failed agent plus those after it remain scheduled for this
    /// tick.
    pub fn advance_tick(&mut self) -> Result<()> {
        let mut due = self.schedule.remove(&self.tick).unwrap_or_default();
        due.sort_unstable();
        due.dedup();

        for (position, index) in due.iter().enumerate() {
            let agent = &mut self.agents[*index];
            if let Err(err) = (agent.callback)(&mut self.state, self.tick) {
                let name = agent.name.clone();
                self.schedule
                    .entry(self.tick)
                    .or_default()
                    .extend_from_slice(&due[position..]);
                return Err(err.context(format!("agent '{}' failed at tick {}", name, self.tick)));
            }
            let next = self.tick + agent.interval;
            self.schedule.entry(next).or_default().push(*index);
        }

        self.tick += 1;
        Ok(())
    }

    /// Advance until the tick counter reaches `max_ticks`
    pub fn run(&mut self, max_ticks: u64) -> Result<()> {
        debug!("Running from tick {} to {}", self.tick, max_ticks);
        while self.tick < max_ticks {
            self.advance_tick()?;
        }
        Ok(())
    }

    /// Run up to the configured `max_ticks`
    pub fn run_to_limit(&mut self) -> Result<()> {
        self.run(self.config.max_ticks)
    }

    /// Register the signal controller's tick, if the state has one
    pub fn register_signals(&mut self) {
        let dt = self.config.tick_duration;
        self.register_agent(
            SIGNALS_AGENT,
            move |state: &mut SimulationState, _tick| {
                if let Some(signals) = state.signals.as_mut() {
                    signals.tick(dt);
                }
                Ok(())
            },
            0,
            1,
        );
    }

    pub fn register_fleet(&mut self) {
        FleetManager::register(self);
    }
}
