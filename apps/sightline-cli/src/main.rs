use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sightline_common::{Coordinate, Direction, ObjectId, VisibilityFlags};
use sightline_kernel::{ObjectSpec, World};
use sightline_net::{FrameSink, NetworkWorker, encode_frame};
use sightline_server::{GameInstance, InstanceConfig, InstanceRunner, InstanceStats};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sightline-cli", about = "CLI tool for sightline operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Run a headless random-walk simulation and report what observers were sent
    Simulate {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "100")]
        ticks: u64,
        /// Number of wandering objects
        #[arg(short, long, default_value = "50")]
        walkers: usize,
        /// Number of walkers that get an observer
        #[arg(short, long, default_value = "2")]
        observers: usize,
        /// RNG seed for a reproducible walk
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Instance config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write a JSON summary here
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Run the instance and network threads for a while
    Run {
        /// Wall-clock seconds to run
        #[arg(long, default_value = "3")]
        seconds: u64,
        /// Number of wandering objects
        #[arg(short, long, default_value = "50")]
        walkers: usize,
        /// RNG seed for a reproducible walk
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Instance config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the observer's frames here instead of discarding them
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("sightline-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: tick={}", World::new(Coordinate::new(1, 1, 1))?.tick());
            println!("stream: {}", sightline_stream::crate_info());
            println!("view: {}", sightline_view::crate_info());
            println!("net: {}", sightline_net::crate_info());
            println!("server: {}", sightline_server::crate_info());
        }
        Commands::Simulate {
            ticks,
            walkers,
            observers,
            seed,
            config,
            dump,
        } => {
            let config = load_config(config.as_deref())?;
            let summary = simulate(config, ticks, walkers, observers, seed)?;
            println!(
                "Simulated {} ticks: objects={}, diffs={}",
                summary.instance.ticks, summary.instance.objects, summary.instance.diffs_recorded
            );
            for observer in &summary.observers {
                println!(
                    "  {}: messages={} bytes={} tiles={} diffs={} shifts={} anomalies={}",
                    observer.observer,
                    observer.messages,
                    observer.bytes,
                    observer.tiles_sent,
                    observer.diffs_sent,
                    observer.shifts,
                    observer.anomalies
                );
            }
            if let Some(path) = dump {
                let json = serde_json::to_string_pretty(&summary)?;
                std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                println!("Summary written to {}", path.display());
            }
        }
        Commands::Run {
            seconds,
            walkers,
            seed,
            config,
            out,
        } => {
            let config = load_config(config.as_deref())?;
            run(config, Duration::from_secs(seconds), walkers, seed, out.as_deref())?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<InstanceConfig> {
    let Some(path) = path else {
        return Ok(InstanceConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: InstanceConfig =
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[derive(Serialize)]
struct Summary {
    seed: u64,
    instance: InstanceStats,
    observers: Vec<ObserverSummary>,
}

#[derive(Serialize)]
struct ObserverSummary {
    observer: String,
    messages: u64,
    bytes: u64,
    updates: u64,
    tiles_sent: u64,
    diffs_sent: u64,
    shifts: u64,
    anomalies: u64,
}

fn simulate(
    config: InstanceConfig,
    ticks: u64,
    walkers: usize,
    observers: usize,
    seed: u64,
) -> anyhow::Result<Summary> {
    let interval = config.tick_interval();
    let mut instance = GameInstance::new(config)?;
    let mut rng = Rng(seed);
    let ids = populate(instance.world_mut(), walkers, &mut rng)?;

    let mut sessions = Vec::new();
    for id in ids.iter().take(observers) {
        let (observer, rx) = instance.join(*id, VisibilityFlags::NONE)?;
        sessions.push((observer, rx, 0u64));
    }

    for _ in 0..ticks {
        let plan = plan_moves(&ids, instance.world().size(), &mut rng);
        instance.tick(interval, |world| apply_moves(world, plan));
        for (_, rx, bytes) in sessions.iter_mut() {
            for message in rx.poll() {
                *bytes += encode_frame(&message)?.len() as u64;
            }
        }
    }

    let observers = sessions
        .iter()
        .filter_map(|(observer, _, bytes)| {
            let session = instance.session(*observer)?;
            let stats = session.view().stats();
            Some(ObserverSummary {
                observer: observer.to_string(),
                messages: session.messages_sent(),
                bytes: *bytes,
                updates: stats.updates,
                tiles_sent: stats.tiles_sent,
                diffs_sent: stats.diffs_sent,
                shifts: stats.shifts,
                anomalies: stats.synthesis.anomalies,
            })
        })
        .collect();
    Ok(Summary {
        seed,
        instance: instance.stats(),
        observers,
    })
}

fn run(
    config: InstanceConfig,
    duration: Duration,
    walkers: usize,
    seed: u64,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let interval = config.tick_interval();
    let tick_rate = config.tick_rate_hz;
    let mut instance = GameInstance::new(config)?;
    let mut rng = Rng(seed);
    let ids = populate(instance.world_mut(), walkers, &mut rng)?;
    let size = instance.world().size();
    let Some(&controlled) = ids.first() else {
        anyhow::bail!("need at least one walker to observe");
    };

    let runner = InstanceRunner::spawn(instance, tick_rate)?;
    let worker = NetworkWorker::spawn(Duration::from_millis(5))?;
    let (observer, receiver) = runner.join(controlled, VisibilityFlags::NONE)?;
    let sink: FrameSink = match out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::sink()),
    };
    worker.attach(observer, receiver, sink)?;
    tracing::info!(%observer, %controlled, seconds = duration.as_secs(), "running");

    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        let plan = plan_moves(&ids, size, &mut rng);
        runner.mutate(move |world| apply_moves(world, plan))?;
        std::thread::sleep(interval);
    }

    let stats = runner.stats()?;
    runner.leave(observer)?;
    runner.shutdown()?;
    let written = worker.shutdown()?;
    println!(
        "Ran {} ticks with {} objects; wrote {} frames ({} bytes)",
        stats.ticks, stats.objects, written.frames_written, written.bytes_written
    );
    Ok(())
}

fn populate(world: &mut World, walkers: usize, rng: &mut Rng) -> anyhow::Result<Vec<ObjectId>> {
    let size = world.size();
    let mut ids = Vec::with_capacity(walkers);
    for i in 0..walkers {
        let at = rng.coordinate(size);
        let spec = if i > 0 && i % 10 == 0 {
            ObjectSpec::new("ghost", at).invisible(VisibilityFlags(1))
        } else {
            ObjectSpec::new("walker", at)
        };
        ids.push(world.spawn(spec)?);
    }
    Ok(ids)
}

enum Step {
    Walk(ObjectId, Direction),
    Teleport(ObjectId, Coordinate),
}

fn plan_moves(ids: &[ObjectId], size: Coordinate, rng: &mut Rng) -> Vec<Step> {
    ids.iter()
        .filter_map(|&id| match rng.below(30) {
            0 => Some(Step::Teleport(id, rng.coordinate(size))),
            1..=5 => None,
            _ => Some(Step::Walk(id, rng.direction())),
        })
        .collect()
}

fn apply_moves(world: &mut World, plan: Vec<Step>) {
    for step in plan {
        // Walkers bump into the world's edge; that is not worth reporting.
        let _ = match step {
            Step::Walk(id, direction) => world.move_object(id, direction).map(|_| ()),
            Step::Teleport(id, to) => world.relocate(id, to),
        };
    }
}

/// splitmix64, so a seed always produces the same walk.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    fn direction(&mut self) -> Direction {
        Direction::PLANAR[self.below(Direction::PLANAR.len() as u64) as usize]
    }

    fn coordinate(&mut self, size: Coordinate) -> Coordinate {
        Coordinate::new(
            self.below(size.x as u64) as i32,
            self.below(size.y as u64) as i32,
            self.below(size.z as u64) as i32,
        )
    }
}
