mod error;
mod link;
mod waveform;

use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use e3k_lib::E3K;
use e3k_lib::transport::{Duplex, IoSink};
use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc::{channel, unbounded_channel};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::link::{FRAME_QUEUE_DEPTH, QueueSink, QueueSource, read_stdin, serve_wireless};
use crate::waveform::{Generator, Waveform};

/// Runs an emulated E3K acquisition module.
///
/// Control words are read from stdin and from the wireless host; wired
/// frames are written raw to stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to accept the wireless host on, e.g. 127.0.0.1:7878.
    #[arg(short, long)]
    listen: Option<SocketAddr>,
    /// Waveform fed to the six channels.
    #[arg(short, long, value_enum, default_value_t = Waveform::Sine)]
    waveform: Waveform,
    /// Control word to apply before the first tick.
    #[arg(short = 'c', long)]
    word: Option<u16>,
    /// Stop after this many ticks.
    #[arg(short, long)]
    ticks: Option<u64>,
    /// Optional path to a file to write logs to, in addition to stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn setup_logging(
    log_file_path: Option<PathBuf>,
    verbosity: &Verbosity<InfoLevel>,
) -> Result<Option<WorkerGuard>> {
    // stdout carries the wired frames
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path)
            .with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.clone(), &cli.verbose)?;

    tokio::select! {
        res = run(cli) => {
            res.inspect_err(|e| error!("Emulator failed: {:?}", e))?;
        }
        _ = signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down.");
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let (wired_tx, wired_rx) = unbounded_channel();
    tokio::spawn(async move {
        if let Err(e) = read_stdin(wired_tx).await {
            error!("Wired input failed: {}", e);
        }
    });

    let listener = match cli.listen {
        Some(addr) => Some(
            TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to listen on {}", addr))?,
        ),
        None => None,
    };
    let (control_tx, control_rx) = unbounded_channel();
    let (frames_tx, frames_rx) = channel(FRAME_QUEUE_DEPTH);
    tokio::spawn(async move {
        if let Err(e) = serve_wireless(listener, frames_rx, control_tx).await {
            error!("Wireless link failed: {}", e);
        }
    });

    let wired = Duplex::new(QueueSource::new(wired_rx, "wired"), IoSink(std::io::stdout()));
    let wireless = Duplex::new(
        QueueSource::new(control_rx, "wireless"),
        QueueSink::new(frames_tx, "wireless"),
    );
    let mut device = E3K::new(Generator::new(cli.waveform), wired, wireless);

    if let Some(word) = cli.word {
        let config = device.apply_control_word(word);
        info!("Initial configuration: {}", config);
    }

    let mut rate = device.config().rate;
    let mut ticker = interval(rate.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(waveform = ?cli.waveform, %rate, "Sampling");

    loop {
        ticker.tick().await;
        let report = device.tick().context("Tick failed")?;

        if report.reconfigured {
            info!("Configuration: {}", device.config());
        }
        if let Some(link) = report.sent {
            trace!(%link, frame = %hex::encode(report.frame.as_bytes()), "Sent frame");
        }

        if device.config().rate != rate {
            rate = device.config().rate;
            ticker = interval(rate.period());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(%rate, "Tick period changed");
        }

        if cli.ticks.is_some_and(|limit| device.ticks() >= limit) {
            info!(ticks = device.ticks(), "Tick limit reached");
            break;
        }
    }

    Ok(())
}
