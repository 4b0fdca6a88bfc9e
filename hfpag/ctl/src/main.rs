//! hfpagctl - BlueALSA HFP-AG Call Session Tool
//!
//! Lists the PCMs a BlueALSA daemon serves and holds an HFP-AG call session
//! open from the command line, the same way an audio stream hook would.
//!
//! # Usage
//!
//! ```bash
//! # List every PCM of the default daemon
//! hfpagctl list
//!
//! # Transfer the call of the most recent HFP-AG device, terminate on Enter
//! hfpagctl call
//!
//! # A specific device, capture side, another daemon instance
//! hfpagctl --service org.bluealsa.sink call --device AA:BB:CC:DD:EE:FF --stream capture
//!
//! # Verbose logging
//! RUST_LOG=debug hfpagctl call
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use hfpag_core::bus::system::SystemBus;
use hfpag_core::{enumerate, load_config, BluetoothAddress, BusContext, HfpagHook, StreamDirection};

/// hfpagctl - BlueALSA HFP-AG call session tool
#[derive(Parser, Debug)]
#[command(name = "hfpagctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// BlueALSA service name
    #[arg(short = 's', long, env = "HFPAG_SERVICE", value_name = "NAME")]
    service: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "HFPAG_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "HFPAG_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the PCMs served by the daemon
    List,

    /// Hold a call session open until Enter is pressed
    Call {
        /// Remote device address, default is the most recently connected
        #[arg(short = 'd', long, value_name = "ADDR")]
        device: Option<BluetoothAddress>,

        /// Stream direction to attach to
        #[arg(long, value_enum, default_value_t = Stream::Playback)]
        stream: Stream,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Stream {
    Playback,
    Capture,
}

impl From<Stream> for StreamDirection {
    fn from(stream: Stream) -> Self {
        match stream {
            Stream::Playback => Self::Playback,
            Stream::Capture => Self::Capture,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("hfpagctl={level},hfpag_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn list(bus: SystemBus, service: &str) -> Result<()> {
    let ctx = BusContext::new(bus, service);
    let pcms = enumerate(&ctx).with_context(|| format!("Failed to enumerate PCMs of {service}"))?;

    for pcm in &pcms {
        let direction = pcm.direction.map_or("-", |d| d.as_str());
        println!(
            "{}  {:<11} {:<6} seq={:<4} {}",
            pcm.device_address, pcm.transport_kind, direction, pcm.sequence, pcm.path
        );
    }
    info!(count = pcms.len(), "Listed PCMs");
    Ok(())
}

fn call(bus: SystemBus, config: &hfpag_core::HookConfig, stream: StreamDirection) -> Result<()> {
    let mut hook = HfpagHook::install(bus, config, stream)
        .with_context(|| format!("No {stream} SCO PCM for {}", config.device))?;
    println!("{}", hook.pcm().path);
    if hook.session().is_none() {
        anyhow::bail!(
            "PCM {} uses transport {}, no call to signal",
            hook.pcm().path,
            hook.pcm().transport_kind
        );
    }

    hook.hw_params();
    if !hook.is_started() {
        anyhow::bail!("Call session did not start, see log for details");
    }

    println!("Call session active, press Enter to end it");
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    hook.hw_free();
    hook.close();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(service) = args.service {
        config.service = service;
    }

    let bus = SystemBus::connect().context("Failed to connect to the system bus")?;

    match args.command {
        Command::List => list(bus, &config.service),
        Command::Call { device, stream } => {
            if let Some(device) = device {
                config.device = device;
            }
            call(bus, &config, stream.into())
        }
    }
}
