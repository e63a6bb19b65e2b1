#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots the Neuroflight simulator.

mod feed;
mod layout_transfer;
mod scene;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use neuroflight_assets::{load_city, AssetLoader, Catalog, CityLoad, GltfBoundsLoader};
use neuroflight_core::{Collider, Command, Event, InputMode, PlacementCategory};
use neuroflight_rendering::{Presentation, RenderingBackend, SurfaceSize};
use neuroflight_rendering_macroquad::MacroquadBackend;
use neuroflight_system_worldgen::CityGenerator;
use neuroflight_world::{apply, query, toggled, Simulation, SimulationConfig, TICK};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::layout_transfer::CityLayoutSnapshot;

const WINDOW_TITLE: &str = "Neuroflight";
const WINDOW_SIZE: (u32, u32) = (1280, 720);

#[derive(Debug, Parser)]
#[command(name = "neuroflight", about = "Fly a drone through a procedurally generated city")]
struct CliArgs {
    #[command(subcommand)]
    command: Option<CliCommand>,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Generates the city without opening a window and prints a summary.
    Layout(LayoutArgs),
    /// Prints the model catalog in effect as TOML, ready to edit.
    Catalog(SourceArgs),
}

/// Where the catalog, models and tuning come from.
#[derive(Debug, Args)]
struct SourceArgs {
    /// Directory holding the model files.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
    /// Model catalog; defaults to `<assets>/catalog.toml`, then the stock city.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// TOML file overriding simulation tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Tracing filter such as `info` or `neuroflight_system_flight=debug`.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    sources: SourceArgs,
    /// Input source that drives the drone at start.
    #[arg(long, value_enum)]
    input: Option<InputArg>,
    /// Read JSON commands from stdin even when starting in keyboard mode.
    #[arg(long)]
    stdin_feed: bool,
    /// Run this many fixed ticks without a window, then exit.
    #[arg(long, value_name = "N")]
    headless_ticks: Option<u32>,
    /// Log frame timing once per second.
    #[arg(long)]
    show_fps: bool,
    /// Render as fast as possible instead of waiting for the display.
    #[arg(long)]
    no_vsync: bool,
}

#[derive(Debug, Args)]
struct LayoutArgs {
    #[command(flatten)]
    sources: SourceArgs,
    /// Also print the encoded placement snapshot.
    #[arg(long)]
    snapshot: bool,
    /// Fail unless the generated city matches this encoded snapshot.
    #[arg(long, value_name = "SNAPSHOT")]
    compare: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputArg {
    Keyboard,
    External,
}

impl From<InputArg> for InputMode {
    fn from(value: InputArg) -> Self {
        match value {
            InputArg::Keyboard => Self::Keyboard,
            InputArg::External => Self::External,
        }
    }
}

/// Entry point for the Neuroflight command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    match args.command {
        Some(CliCommand::Layout(layout)) => {
            init_tracing(layout.sources.log_level.as_deref())?;
            print_layout(&layout)
        }
        Some(CliCommand::Catalog(sources)) => {
            init_tracing(sources.log_level.as_deref())?;
            print_catalog(&sources)
        }
        None => {
            init_tracing(args.run.sources.log_level.as_deref())?;
            run(args.run)
        }
    }
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log level `{level}`"))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("failed to install the tracing subscriber")
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    SimulationConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn load_catalog(sources: &SourceArgs) -> Result<Catalog> {
    let path = match &sources.catalog {
        Some(path) => path.clone(),
        None => {
            let conventional = sources.assets.join("catalog.toml");
            if !conventional.exists() {
                tracing::info!(
                    path = %conventional.display(),
                    "no catalog found, using the stock city"
                );
                return Ok(Catalog::default_city());
            }
            conventional
        }
    };
    Catalog::from_path(&path).with_context(|| format!("failed to load catalog {}", path.display()))
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.sources.config.as_deref())?;
    if let Some(input) = args.input {
        config.input_mode = input.into();
    }
    let catalog = load_catalog(&args.sources)?;

    let simulation = Simulation::new(config.clone());
    let feed_active = args.stdin_feed || config.input_mode == InputMode::External;
    if feed_active {
        feed::spawn_stdin(simulation.command_slot());
    }

    let generator = CityGenerator::new(config.layout.clone());
    match args.headless_ticks {
        Some(ticks) => {
            let load = load_city(&catalog, &args.sources.assets, &GltfBoundsLoader, &generator);
            run_headless(simulation, &load, ticks, feed_active);
            Ok(())
        }
        None => {
            let handle =
                AssetLoader::spawn(catalog, args.sources.assets.clone(), GltfBoundsLoader, generator);
            run_windowed(simulation, &config, handle, &args)
        }
    }
}

fn install_city(simulation: &mut Simulation, load: &CityLoad, events: &mut Vec<Event>) {
    let colliders: Arc<[Collider]> = Arc::from(load.city.colliders.as_slice());
    apply(simulation, Command::InstallColliders { colliders }, events);
    if let Some(height) = load.drone_ground_contact {
        apply(simulation, Command::SetGroundContact { height }, events);
    }
}

fn drain_events(events: &mut Vec<Event>) {
    for event in events.drain(..) {
        match event {
            Event::TimeAdvanced { .. } => {}
            Event::Bounced { height } => tracing::debug!(height, "drone bounced"),
            other => tracing::debug!(event = ?other, "simulation event"),
        }
    }
}

fn run_headless(mut simulation: Simulation, load: &CityLoad, ticks: u32, paced: bool) {
    let mut events = Vec::new();
    install_city(&mut simulation, load, &mut events);

    for _ in 0..ticks {
        apply(&mut simulation, Command::Tick { dt: TICK }, &mut events);
        drain_events(&mut events);
        if paced {
            thread::sleep(TICK);
        }
    }

    let drone = query::drone(&simulation);
    println!(
        "ticks={} phase={:?} position=({:.3}, {:.3}, {:.3}) heading={:.3} colliders={}",
        query::tick_index(&simulation),
        query::flight_phase(&simulation),
        drone.position.x,
        drone.position.y,
        drone.position.z,
        drone.heading,
        query::collider_count(&simulation),
    );
}

fn run_windowed(
    simulation: Simulation,
    config: &SimulationConfig,
    mut handle: neuroflight_assets::LoadHandle,
    args: &RunArgs,
) -> Result<()> {
    let surface = SurfaceSize::new(WINDOW_SIZE.0, WINDOW_SIZE.1)?;
    let initial = scene::initial_scene(&simulation, &config.layout);
    let presentation = Presentation::new(WINDOW_TITLE, scene::SKY, surface, initial);
    let backend = MacroquadBackend::new()
        .with_vsync(!args.no_vsync)
        .with_show_fps(args.show_fps);

    let mut simulation = simulation;
    let mut events = Vec::new();
    backend.run(presentation, move |dt, input, scene| {
        if input.quit {
            tracing::info!("quit requested");
            return;
        }

        if let Some(load) = handle.try_take() {
            install_city(&mut simulation, &load, &mut events);
            scene::set_city(scene, &load.city);
        }
        if input.mode_toggle {
            let mode = toggled(query::input_mode(&simulation));
            apply(&mut simulation, Command::SetInputMode { mode }, &mut events);
        }
        if input.collider_toggle {
            scene.show_colliders = !scene.show_colliders;
        }

        apply(
            &mut simulation,
            Command::SetKeyboard {
                state: input.keyboard,
            },
            &mut events,
        );
        apply(&mut simulation, Command::Tick { dt }, &mut events);
        drain_events(&mut events);
        scene::sync_scene(scene, &simulation);
    })
}

fn print_catalog(sources: &SourceArgs) -> Result<()> {
    let catalog = load_catalog(sources)?;
    print!(
        "{}",
        catalog
            .to_toml_string()
            .context("failed to write the catalog")?
    );
    Ok(())
}

fn print_layout(args: &LayoutArgs) -> Result<()> {
    let config = load_config(args.sources.config.as_deref())?;
    let catalog = load_catalog(&args.sources)?;
    let generator = CityGenerator::new(config.layout);
    let load = load_city(&catalog, &args.sources.assets, &GltfBoundsLoader, &generator);
    let snapshot = CityLayoutSnapshot {
        placements: load.city.placements.clone(),
    };

    for category in [
        PlacementCategory::Building,
        PlacementCategory::Car,
        PlacementCategory::Bench,
        PlacementCategory::Prop,
    ] {
        println!("{category:?}: {}", load.city.count(category));
    }
    for failure in &load.failures {
        println!("skipped {}: {}", failure.name, failure.error);
    }
    println!("fingerprint: {:016x}", snapshot.fingerprint());
    if args.snapshot {
        println!("{}", snapshot.encode().context("failed to encode the layout")?);
    }

    if let Some(expected) = &args.compare {
        let expected =
            CityLayoutSnapshot::decode(expected).context("failed to read the snapshot to compare")?;
        if expected != snapshot {
            bail!(
                "layout differs: expected {:016x} with {} placements, generated {:016x} with {}",
                expected.fingerprint(),
                expected.placements.len(),
                snapshot.fingerprint(),
                snapshot.placements.len()
            );
        }
        println!("layout matches the snapshot");
    }
    Ok(())
}
