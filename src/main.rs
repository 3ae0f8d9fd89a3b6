//! osi-replay command line.
//!
//! Records live traffic, replays captures onto an interface, rewrites
//! addresses in captures and drops blocklisted traffic.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use osi_replay::capture::list_interfaces;
use osi_replay::config::{transform_blocklist, CaptureConfig, PolicyFile};
use osi_replay::container::DEFAULT_SNAPLEN;
use osi_replay::pipeline::{capture_to_file, replay_file, rewrite_file, transform_file};
use osi_replay::sanitizer::FilterPolicy;

#[derive(Parser)]
#[command(name = "osi-replay")]
#[command(about = "Capture, replay, rewrite and sanitize pcap files")]
#[command(version)]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record live traffic from an interface into a pcap file
    Capture {
        /// Network interface to capture from
        #[arg(short, long)]
        interface: String,

        /// Output pcap file
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum bytes kept per frame
        #[arg(long, default_value_t = DEFAULT_SNAPLEN)]
        snaplen: u32,

        /// Do not put the interface in promiscuous mode
        #[arg(long)]
        no_promisc: bool,
    },

    /// Send the frames of a pcap file out of an interface
    Replay {
        /// Network interface to send on
        #[arg(short, long)]
        interface: String,

        /// Input pcap file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Rewrite MAC and IP addresses in a pcap file
    Rewrite {
        /// Input pcap file
        #[arg(long = "in")]
        input: PathBuf,

        /// Output pcap file
        #[arg(long = "out")]
        output: PathBuf,

        /// Address mapping file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Worker threads (1 processes frames on the main thread)
        #[arg(short, long, default_value_t = 1)]
        workers: usize,
    },

    /// Drop frames to or from blocklisted addresses
    Transform {
        /// Input pcap file
        #[arg(long = "in")]
        input: PathBuf,

        /// Output pcap file
        #[arg(long = "out")]
        output: PathBuf,

        /// Address to drop; may be repeated (10.0.0.1 when neither this nor
        /// --config is given)
        #[arg(long = "block", value_name = "IP")]
        block: Vec<String>,

        /// Policy file whose [filter] blocked_ips are added to --block
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Worker threads (1 processes frames on the main thread)
        #[arg(short, long, default_value_t = 1)]
        workers: usize,
    },

    /// List available network interfaces
    Interfaces,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    match cli.command {
        Commands::Capture {
            interface,
            output,
            snaplen,
            no_promisc,
        } => {
            let config = CaptureConfig::new(interface)
                .with_snap_len(snaplen)
                .with_promiscuous(!no_promisc);
            capture_to_file(&config, &output, running)
                .with_context(|| format!("Capture on {} failed", config.interface))?;
        }

        Commands::Replay { interface, file } => {
            let config = CaptureConfig::new(interface);
            replay_file(&config, &file, &running)
                .with_context(|| format!("Replay of {} failed", file.display()))?;
        }

        Commands::Rewrite {
            input,
            output,
            config,
            workers,
        } => {
            let policy = PolicyFile::load(&config)
                .and_then(|file| file.rewrite_policy())
                .with_context(|| format!("Invalid mapping file {}", config.display()))?;
            if policy.is_empty() {
                tracing::warn!("Mapping file has no entries, frames will be copied unchanged");
            }
            rewrite_file(&input, &output, policy, workers, &running)
                .with_context(|| format!("Rewrite of {} failed", input.display()))?;
        }

        Commands::Transform {
            input,
            output,
            block,
            config,
            workers,
        } => {
            let file = config
                .as_deref()
                .map(|path| {
                    PolicyFile::load(path)
                        .with_context(|| format!("Invalid policy file {}", path.display()))
                })
                .transpose()?;
            let blocked = transform_blocklist(block.iter().map(String::as_str), file.as_ref())
                .context("Invalid blocklist")?;
            transform_file(&input, &output, FilterPolicy::new(blocked), workers, &running)
                .with_context(|| format!("Transform of {} failed", input.display()))?;
        }

        Commands::Interfaces => {
            println!("Available interfaces:");
            for iface in list_interfaces() {
                println!("  {}", iface);
            }
        }
    }

    Ok(())
}
