use clap::Parser;
use e3k_lib::host::{command_bytes, stop_command};
use e3k_lib::{ChannelMask, DeviceConfig, FrameDecoder, SampleRate, TransportMode};
use std::error::Error;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream samples from an E3K over its wireless link")]
struct Args {
    /// Address of the device's wireless link
    #[arg(short = 'a', long, default_value = "127.0.0.1:7878")]
    connect: String,

    /// Sample rate in Hz (10, 100, 500 or 1000)
    #[arg(short, long, default_value_t = 100)]
    rate: u32,

    /// Active channels: "all", "none" or a list such as 0,2,5
    #[arg(short, long, default_value = "all")]
    channels: ChannelMask,

    /// Number of frames to read before stopping the device
    #[arg(short = 'n', long, default_value_t = 10)]
    count: u64,

    /// Print one JSON object per frame
    #[arg(long)]
    json: bool,

    /// Also print each frame's bytes as hex
    #[arg(long)]
    raw: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

const READ_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = DeviceConfig {
        run_state: true,
        transport: TransportMode::Wireless,
        rate: SampleRate::from_hz(args.rate)?,
        channels: args.channels,
    };
    let word = config.encode();

    let mut stream = TcpStream::connect(&args.connect).await?;
    info!("Connected to {}", args.connect);
    stream.write_all(&command_bytes(word)).await?;
    info!("Sent control word {} ({})", word, config);

    let mut decoder = FrameDecoder::for_config(&config);
    if decoder.frame_length() == 0 {
        warn!("No channels selected, the device will send empty frames");
    }

    let mut buf = [0u8; 1024];
    let mut received = 0u64;
    while received < args.count && decoder.frame_length() > 0 {
        let n = match timeout(READ_TIMEOUT, stream.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => {
                warn!("No data for {:?}", READ_TIMEOUT);
                break;
            }
        };
        if n == 0 {
            warn!("Device closed the connection");
            break;
        }
        decoder.push(&buf[..n]);
        while let Some((frame, set)) = decoder.next_frame() {
            received += 1;
            if args.raw {
                println!("[{}] raw: {}", received, hex::encode(&frame));
            }
            if args.json {
                println!("{}", serde_json::to_string(&set)?);
            } else {
                println!("[{}] {}", received, set);
            }
            if received >= args.count {
                break;
            }
        }
    }

    stream.write_all(&stop_command()).await?;
    info!("Stopped streaming after {} frames", received);
    Ok(())
}
