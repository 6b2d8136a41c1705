use anyhow::Result;
use clap::Parser;
use log::info;

use traffic_flow::simulation::{
    EdgeId, FleetConfig, GridConfig, Phase, PhaseDurations, SignalConfig, Simulation,
    SimulationConfig,
};

#[derive(Parser)]
#[command(name = "traffic_flow")]
#[command(about = "Headless tick-driven traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "600")]
    ticks: u64,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "1.0")]
    delta: f32,

    /// Grid rows
    #[arg(long, default_value = "3")]
    rows: u32,

    /// Grid columns
    #[arg(long, default_value = "3")]
    cols: u32,

    /// Distance between adjacent intersections
    #[arg(long, default_value = "100.0")]
    block_length: f32,

    /// Speed limit on every road
    #[arg(long, default_value = "13.9")]
    speed_limit: f32,

    /// Maximum number of live vehicles
    #[arg(long, default_value = "200")]
    max_vehicles: usize,

    /// Spawn one vehicle every N ticks
    #[arg(long, default_value = "2")]
    spawn_interval: u32,

    /// Seed for map generation and spawning
    #[arg(long)]
    seed: Option<u64>,

    /// North/south green time in seconds
    #[arg(long, default_value = "30.0")]
    ns: f32,

    /// East/west green time in seconds
    #[arg(long, default_value = "30.0")]
    ew: f32,

    /// Run without traffic lights
    #[arg(long)]
    no_signals: bool,

    /// Log a summary every N ticks (0 disables)
    #[arg(long, default_value = "60")]
    report_every: u64,

    /// Edge IDs to close before the run starts
    #[arg(long = "close-edge")]
    closed_edges: Vec<usize>,
}

impl Cli {
    fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            tick_duration: self.delta,
            max_ticks: self.ticks,
            grid: GridConfig {
                rows: self.rows,
                cols: self.cols,
                block_length: self.block_length,
                speed_limit: self.speed_limit,
                seed: self.seed,
                ..GridConfig::default()
            },
            fleet: FleetConfig {
                max_vehicles: self.max_vehicles,
                spawn_interval: self.spawn_interval,
                seed: self.seed,
                ..FleetConfig::default()
            },
            signals: (!self.no_signals).then(|| SignalConfig {
                phase_durations: PhaseDurations::new(self.ns, self.ew),
                start_phase: Phase::NorthSouth,
            }),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.simulation_config();

    info!("Running traffic simulation in headless mode...");
    info!(
        "Ticks: {}, Delta: {}s, Grid: {}x{}",
        config.max_ticks, config.tick_duration, config.grid.rows, config.grid.cols
    );

    let mut simulation = Simulation::new(config)?;
    for edge in &cli.closed_edges {
        simulation.toggle_edge_closure(EdgeId(*edge));
    }

    while simulation.tick() < cli.ticks {
        simulation.advance_tick()?;

        let tick = simulation.tick();
        if cli.report_every > 0 && tick % cli.report_every == 0 && tick < cli.ticks {
            info!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * cli.delta
            );
            simulation.print_summary();
        }
    }

    info!("=== SIMULATION COMPLETE ===");
    simulation.print_summary();
    Ok(())
}
