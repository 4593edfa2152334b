use clap::{Parser, Subcommand};
use e3k_lib::{ChannelMask, DeviceConfig, FrameDecoder, SampleRate, TransportMode, frame_length, parse_word};
use std::error::Error;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Host-side tools for the E3K acquisition module.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a control word
    Word {
        /// Start streaming
        #[arg(short, long)]
        run: bool,
        /// Transport: wired, wireless, reserved or a code 0-3
        #[arg(short, long, default_value = "wired")]
        mode: TransportMode,
        /// Sample rate in Hz: 10, 100, 500 or 1000
        #[arg(long, default_value_t = 100, value_parser = parse_rate)]
        rate: u32,
        /// Active channels: "all", "none" or a list such as 0,2,5
        #[arg(short, long, default_value = "all")]
        channels: ChannelMask,
    },
    /// Decode a control word (decimal, 0x hex or 0b binary)
    Inspect {
        #[arg(value_parser = parse_word)]
        word: u16,
    },
    /// Decode a captured frame stream
    Decode {
        /// Control word the stream was recorded under
        #[arg(short, long, value_parser = parse_word)]
        word: u16,
        /// Capture file, stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Print one JSON object per frame
        #[arg(long)]
        json: bool,
        /// ADC reference voltage; prints volts instead of raw counts
        #[arg(long)]
        vref: Option<f64>,
        /// Also print each frame's bytes as hex
        #[arg(long)]
        raw: bool,
    },
}

fn parse_rate(s: &str) -> Result<u32, String> {
    let hz: u32 = s.parse().map_err(|e| format!("{}", e))?;
    SampleRate::from_hz(hz).map(|rate| rate.as_hz()).map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Word {
            run,
            mode,
            rate,
            channels,
        } => {
            let config = DeviceConfig {
                run_state: run,
                transport: mode,
                rate: SampleRate::from_hz(rate)?,
                channels,
            };
            let word = config.encode();
            debug!("{}", config);
            println!("{}", word);
            println!("  hex: {:#06x}", word);
            println!("  bin: {:#018b}", word);
        }
        Command::Inspect { word } => inspect(word),
        Command::Decode {
            word,
            input,
            json,
            vref,
            raw,
        } => decode(word, input, json, vref, raw)?,
    }
    Ok(())
}

fn inspect(word: u16) {
    let config = DeviceConfig::decode(word);
    println!("Control word {} ({:#06x}, {:#018b})", word, word, word);
    println!("  Streaming: {}", if config.run_state { "on" } else { "off" });
    println!("  Transport: {} (frames go out on the {} link)", config.transport, config.link());
    println!("  Rate:      {} ({:?} per tick)", config.rate, config.rate.period());
    println!("  Channels:  {} -> {:?}", config.channels, config.channels.active_channels().collect::<Vec<_>>());
    println!("  Frame:     {} bytes", frame_length(config.channels.count()));
    if config.transport.is_fallback() {
        println!("  Note: transport mode {} is not implemented, the device uses the wired link", config.transport);
    }
}

fn raw_line(index: u64, frame: &[u8]) -> String {
    format!("[{}] raw: {}", index, hex::encode(frame))
}

fn decode(
    word: u16,
    input: Option<PathBuf>,
    json: bool,
    vref: Option<f64>,
    raw: bool,
) -> Result<(), Box<dyn Error>> {
    let config = DeviceConfig::decode(word);
    let mut decoder = FrameDecoder::for_config(&config);
    if decoder.frame_length() == 0 {
        warn!("No channels active under {}, frames are empty", word);
        return Ok(());
    }

    let mut reader: Box<dyn Read> = match input {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };

    let mut buf = [0u8; 4096];
    let mut frames = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        decoder.push(&buf[..n]);
        while let Some((frame, set)) = decoder.next_frame() {
            frames += 1;
            if raw {
                println!("{}", raw_line(frames, &frame));
            }
            if json {
                println!("{}", serde_json::to_string(&set)?);
            } else if let Some(vref) = vref {
                let volts: Vec<String> = config
                    .channels
                    .active_channels()
                    .filter_map(|channel| set.volts(channel, vref))
                    .map(|v| format!("{:.3} V", v))
                    .collect();
                println!("[{}] {}", frames, volts.join("  "));
            } else {
                println!("[{}] {}", frames, set);
            }
        }
    }

    if decoder.pending() > 0 {
        warn!("{} trailing bytes do not form a whole frame", decoder.pending());
    }
    debug!("Decoded {} frames", frames);
    Ok(())
}
