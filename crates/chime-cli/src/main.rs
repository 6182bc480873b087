//! chime - arm a timer from the command line
//!
//! Arms a one-shot timeout or a repeating interval on the production
//! Tokio driver and logs firings. While running:
//! - SIGUSR1 pauses the timer
//! - SIGUSR2 resumes it
//! - Ctrl-C clears it and exits

use anyhow::{Context, Result};
use chime_core::{create_interval, create_timeout, Interval, Schedule, Timeout, TimerState};
use chime_driver::TokioDriver;
use chime_util::{format_duration, parse_duration};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// chime - drift-corrected timers on the command line
#[derive(Parser, Debug)]
#[command(name = "chime")]
#[command(about = "Drift-corrected, pausable timers", long_about = None)]
struct Args {
    /// Log filter (or set CHIME_LOG)
    #[arg(short, long, default_value = "info", env = "CHIME_LOG")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fire once after a delay
    Timeout {
        /// Delay, e.g. `90s`, `1h30m`, `2d` or bare milliseconds
        delay: String,
    },
    /// Fire repeatedly
    Interval {
        /// Interval length between firings
        every: String,

        /// Initial delay before the first firing
        #[arg(short, long)]
        delay: Option<String>,
    },
}

enum AnyTimer {
    Timeout(Timeout),
    Interval(Interval),
}

impl AnyTimer {
    fn state(&self) -> TimerState {
        match self {
            AnyTimer::Timeout(t) => t.state(),
            AnyTimer::Interval(t) => t.state(),
        }
    }

    fn pause(&self) {
        match self {
            AnyTimer::Timeout(t) => {
                t.pause();
            }
            AnyTimer::Interval(t) => {
                t.pause();
            }
        }
    }

    fn resume(&self) {
        match self {
            AnyTimer::Timeout(t) => {
                t.resume();
            }
            AnyTimer::Interval(t) => {
                t.resume();
            }
        }
    }

    fn clear(&self) {
        match self {
            AnyTimer::Timeout(t) => t.clear(),
            AnyTimer::Interval(t) => t.clear(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log)
                .with_context(|| format!("Invalid log filter {:?}", args.log))?,
        )
        .init();

    let driver = Arc::new(TokioDriver::new());
    let (fire_tx, mut fire_rx) = mpsc::unbounded_channel::<usize>();

    let timer = match &args.command {
        Command::Timeout { delay } => {
            let delay = parse_duration(delay)
                .with_context(|| format!("Bad delay {delay:?}"))?;
            info!(delay = %format_duration(delay), "arming timeout");

            let tx = fire_tx.clone();
            AnyTimer::Timeout(create_timeout(
                driver.clone(),
                move || {
                    let _ = tx.send(1);
                },
                delay,
            ))
        }
        Command::Interval { every, delay } => {
            let every = parse_duration(every)
                .with_context(|| format!("Bad interval {every:?}"))?;
            let delay = match delay {
                Some(d) => parse_duration(d).with_context(|| format!("Bad delay {d:?}"))?,
                None => Duration::ZERO,
            };
            info!(
                every = %format_duration(every),
                delay = %format_duration(delay),
                "arming interval"
            );

            let tx = fire_tx.clone();
            let mut fired = 0usize;
            AnyTimer::Interval(create_interval(
                driver.clone(),
                move || {
                    fired += 1;
                    let _ = tx.send(fired);
                },
                every,
                Schedule::from(delay),
            ))
        }
    };

    let mut sigusr1 =
        signal(SignalKind::user_defined1()).context("Failed to create SIGUSR1 handler")?;
    let mut sigusr2 =
        signal(SignalKind::user_defined2()).context("Failed to create SIGUSR2 handler")?;

    loop {
        tokio::select! {
            fired = fire_rx.recv() => {
                match fired {
                    Some(count) => {
                        info!(count, "fired");
                        if matches!(timer.state(), TimerState::Completed) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = sigusr1.recv() => {
                timer.pause();
                info!(state = %timer.state(), "pause requested");
            }
            _ = sigusr2.recv() => {
                timer.resume();
                info!(state = %timer.state(), "resume requested");
            }
            _ = tokio::signal::ctrl_c() => {
                timer.clear();
                info!("cleared, exiting");
                break;
            }
        }
    }

    Ok(())
}
