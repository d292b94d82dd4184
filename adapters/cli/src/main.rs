#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for Botscope: the robot diagnostics shell, the trail
//! viewer and a one-shot status report.

mod config;
mod net;
mod shell;
mod simulate;
mod store;

use std::{
    io,
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use botscope_core::SnapshotBuffer;
use botscope_rendering::{
    Color, FieldPresentation, Presentation, RenderingBackend, Scene, TrailLayer,
};
use botscope_rendering_macroquad::MacroquadBackend;
use botscope_system_diagnostics::{config_table, stats_table, StatusBoard};
use clap::{Parser, Subcommand};
use glam::Vec2;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::BotscopeConfig,
    net::{Multicast, UdpPrimitiveSender},
    shell::Shell,
    simulate::Simulation,
    store::FileStore,
};

#[derive(Debug, Parser)]
#[command(name = "botscope", version)]
#[command(about = "Diagnostics shell and trail viewer for soccer robots")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "botscope.toml")]
    config: PathBuf,

    /// Log filter, for example `debug` or `botscope=trace`; defaults to `RUST_LOG` or `info`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Network interface the robots are reachable on.
    #[arg(long, global = true)]
    interface: Option<String>,

    /// Robot multicast channel.
    #[arg(long, global = true)]
    channel: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive shell sending manual commands to a robot.
    Shell,
    /// Window showing recent positions of every robot on the team.
    Trails {
        /// Drive the view from a simulated team instead of the network.
        #[arg(long)]
        simulate: bool,

        /// Number of simulated robots.
        #[arg(long, default_value_t = 6)]
        robots: usize,

        /// Seed of the simulated team.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Log frame timing once per second.
        #[arg(long)]
        show_fps: bool,
    },
    /// Prints the latest robot status and the stored robot configuration.
    Status {
        /// How long to listen for robot statuses before printing, in milliseconds.
        #[arg(long, default_value_t = 1_000)]
        wait_ms: u64,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut BotscopeConfig) {
        if let Some(interface) = &self.interface {
            config.network.interface.clone_from(interface);
        }
        if let Some(channel) = self.channel {
            config.network.channel = channel;
        }
    }
}

/// Entry point for the Botscope command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let mut config = BotscopeConfig::load(&cli.config)?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Command::Shell => run_shell(config),
        Command::Trails {
            simulate,
            robots,
            seed,
            show_fps,
        } => run_trails(config, simulate.then_some((robots, seed)), show_fps),
        Command::Status { wait_ms } => run_status(&config, Duration::from_millis(wait_ms)),
    }
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("invalid log level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow!(error))
}

fn run_shell(config: BotscopeConfig) -> Result<()> {
    let network = &config.network;
    let multicast = Multicast::resolve(network.channel_id(), &network.interface)?;
    let sender = UdpPrimitiveSender::for_multicast(&multicast, network.primitive_port)?;
    let board = Arc::new(StatusBoard::new());
    net::spawn_status_listener(&multicast, network.status_port, Arc::clone(&board))?;

    let lines = shell::spawn_stdin_reader()?;
    let mut shell = Shell::new(sender, board, FileStore::new(config.store))
        .with_refresh_interval(config.display.refresh_interval())
        .with_restart_command(config.robot.restart_command);

    shell.run(&lines, &mut io::stdout().lock())
}

fn run_trails(
    config: BotscopeConfig,
    simulation: Option<(usize, u64)>,
    show_fps: bool,
) -> Result<()> {
    let refresh_interval = config.display.refresh_interval();
    let buffer = SnapshotBuffer::new(config.network.snapshot_buffer_size);
    let field = FieldPresentation::new(
        FieldPresentation::DEFAULT_LENGTH,
        FieldPresentation::DEFAULT_WIDTH,
        Color::from_rgb_u8(235, 235, 235),
    )?;

    match simulation {
        Some((robots, seed)) => {
            let half_extents = Vec2::new(field.length, field.width) * 0.5;
            simulate::spawn(
                Simulation::new(robots, seed, half_extents),
                buffer.publisher(),
                refresh_interval,
            )?;
        }
        None => {
            let network = &config.network;
            let multicast = Multicast::resolve(network.channel_id(), &network.interface)?;
            net::spawn_snapshot_listener(&multicast, network.snapshot_port, buffer.publisher())?;
        }
    }

    let presentation = Presentation::new(
        "Botscope Trails",
        Color::from_rgb_u8(24, 88, 44),
        Scene::new(field),
    );
    let mut layer = TrailLayer::new("Trails", buffer, config.display.trail_length);
    let mut since_refresh = refresh_interval;

    info!(trail_length = layer.cycle().trail_length(), "opening trail viewer");
    MacroquadBackend::new()
        .with_vsync(true)
        .with_show_fps(show_fps)
        .run(presentation, move |dt, scene| {
            since_refresh += dt;
            if since_refresh >= refresh_interval {
                since_refresh = Duration::ZERO;
                let _ = layer.refresh(scene);
            }
        })
}

fn run_status(config: &BotscopeConfig, wait: Duration) -> Result<()> {
    let board = Arc::new(StatusBoard::new());
    let network = &config.network;
    let listening = Multicast::resolve(network.channel_id(), &network.interface)
        .and_then(|multicast| {
            net::spawn_status_listener(&multicast, network.status_port, Arc::clone(&board))
        });
    match listening {
        Ok(()) => thread::sleep(wait),
        Err(error) => warn!(error = %format!("{error:#}"), "not listening for robot status"),
    }

    let store = FileStore::new(config.store.clone());
    println!("{}", stats_table(board.latest().as_deref(), Instant::now()));
    println!("{}", config_table(&store));
    Ok(())
}
