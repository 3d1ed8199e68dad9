//! Cadence CLI
//!
//! Simulate tweens and kinetic flings headlessly and print the frames a
//! target would see.

use anyhow::Result;
use cadence_animation::{AnimationScheduler, Easing, NAMED_EASINGS};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod simulate;

use simulate::{FlingParams, FlingReport, TweenParams, TweenReport};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cadence animation simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Animation config file (cadence.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a tween between two values
    Tween {
        /// Start value
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        from: f64,

        /// End value
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        to: f64,

        /// Length in milliseconds (defaults to the config)
        #[arg(short, long)]
        length: Option<u32>,

        /// Easing name (see `cadence easings`)
        #[arg(short, long, default_value = "linear")]
        easing: String,

        /// Simulated tick in milliseconds (defaults to the config rate)
        #[arg(short, long)]
        step: Option<u64>,
    },

    /// Simulate a kinetic fling
    Fling {
        /// Initial velocity in units per ms
        #[arg(long, allow_negative_numbers = true)]
        velocity: f64,

        /// Deceleration in units per ms²
        #[arg(long, default_value = "0.005")]
        drag: f64,

        /// Simulated tick in milliseconds (defaults to the config rate)
        #[arg(short, long)]
        step: Option<u64>,

        /// Stop the simulation after this much simulated time
        #[arg(long, default_value = "10000")]
        max_ms: u64,
    },

    /// List named easings, sampled across [0, 1]
    Easings {
        /// Number of samples per curve
        #[arg(short, long, default_value = "5")]
        samples: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load(cli.config.as_deref())?;
    let scheduler = AnimationScheduler::with_config(config);

    match cli.command {
        Commands::Tween {
            from,
            to,
            length,
            easing,
            step,
        } => cmd_tween(&scheduler, from, to, length, &easing, step, cli.json),

        Commands::Fling {
            velocity,
            drag,
            step,
            max_ms,
        } => cmd_fling(&scheduler, velocity, drag, step, max_ms, cli.json),

        Commands::Easings { samples } => cmd_easings(samples, cli.json),
    }
}

fn parse_easing(name: &str) -> Result<Easing> {
    Easing::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = NAMED_EASINGS.iter().map(|(name, _)| *name).collect();
        anyhow::anyhow!("Unknown easing '{}'. Known: {}", name, known.join(", "))
    })
}

fn cmd_tween(
    scheduler: &AnimationScheduler,
    from: f64,
    to: f64,
    length_ms: Option<u32>,
    easing: &str,
    step_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let params = TweenParams {
        from,
        to,
        length_ms,
        step_ms,
        easing: parse_easing(easing)?,
        easing_name: easing.to_string(),
    };
    info!("Simulating tween {} -> {} ({})", from, to, easing);

    let report = simulate::simulate_tween(scheduler, &params)?;
    if json {
        return print_json(&report);
    }
    print_tween(&report);
    Ok(())
}

fn cmd_fling(
    scheduler: &AnimationScheduler,
    velocity: f64,
    drag: f64,
    step_ms: Option<u64>,
    max_ms: u64,
    json: bool,
) -> Result<()> {
    let params = FlingParams {
        velocity,
        drag,
        step_ms,
        max_ms,
    };
    info!("Simulating fling at {} units/ms, drag {}", velocity, drag);

    let report = simulate::simulate_fling(scheduler, &params)?;
    if json {
        return print_json(&report);
    }
    print_fling(&report);
    Ok(())
}

#[derive(Serialize)]
struct EasingSamples {
    name: &'static str,
    samples: Vec<f64>,
}

fn cmd_easings(samples: usize, json: bool) -> Result<()> {
    let samples = samples.max(2);
    let curves: Vec<EasingSamples> = NAMED_EASINGS
        .iter()
        .map(|&(name, easing)| EasingSamples {
            name,
            samples: (0..samples)
                .map(|i| easing.apply(i as f64 / (samples - 1) as f64))
                .collect(),
        })
        .collect();

    if json {
        return print_json(&curves);
    }

    for curve in &curves {
        let values: Vec<String> = curve.samples.iter().map(|v| format!("{:7.3}", v)).collect();
        println!("{:<18} {}", curve.name, values.join(" "));
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_tween(report: &TweenReport) {
    println!(
        "tween: {} over {}ms, {}ms steps",
        report.easing, report.length_ms, report.step_ms
    );
    for frame in &report.frames {
        println!("{:>8} ms  {:>12.4}", frame.time_ms, frame.value);
    }
    println!(
        "{} frames, {} batches, {}",
        report.frames.len(),
        report.batches,
        if report.completed { "completed" } else { "aborted" }
    );
}

fn print_fling(report: &FlingReport) {
    println!(
        "fling: velocity {} drag {}, {}ms steps",
        report.velocity, report.drag, report.step_ms
    );
    for frame in &report.frames {
        println!(
            "{:>8} ms  {:>12.4}  {:>12.4}  {:>10.5}",
            frame.time_ms, frame.delta, frame.position, frame.speed
        );
    }
    println!(
        "{} frames, distance {:.4}, {}",
        report.frames.len(),
        report.distance,
        if report.settled { "settled" } else { "cut off" }
    );
}
