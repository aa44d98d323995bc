//! CLI for xoshirodev — a read-only xoshiro256+ device on a named pipe.

mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xoshirodev")]
#[command(about = "xoshirodev — a single-reader xoshiro256+ byte-stream device")]
#[command(version = xoshirodev_core::VERSION)]
struct Cli {
    #[command(flatten)]
    device: DeviceArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Device settings shared by every command. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// JSON config file (name, buffer_words, byte_order)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Device name
    #[arg(long, global = true)]
    name: Option<String>,

    /// Buffer size in 64-bit generator words
    #[arg(long, global = true)]
    buffer_words: Option<usize>,

    /// Byte order of each word in the stream
    #[arg(long, global = true, value_parser = ["native", "little", "big"])]
    byte_order: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a FIFO that serves the device to one reader at a time
    Device {
        /// Directory in which to create the FIFO (named after the device)
        #[arg(long, default_value = "/tmp")]
        dir: String,

        /// Bytes handed to the reader per read call
        #[arg(long, default_value = "4096")]
        chunk: usize,
    },

    /// Open one session and stream bytes to stdout (pipe-friendly)
    Stream {
        /// Output format
        #[arg(long, default_value = "raw", value_parser = ["raw", "hex"])]
        format: String,

        /// Total bytes (0 = until the pipe closes)
        #[arg(long, default_value = "0")]
        bytes: usize,
    },

    /// Print the first generator words after seeding
    Words {
        /// Number of words
        #[arg(long, default_value = "8")]
        count: usize,
    },

    /// Run the statistical test battery over the stream
    Report {
        /// Number of bytes to test
        #[arg(long, default_value = "100000")]
        samples: usize,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective device configuration as JSON
    Config,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = commands::load_config(&cli.device);

    match cli.command {
        Commands::Device { dir, chunk } => commands::device::run(config, &dir, chunk),
        Commands::Stream { format, bytes } => commands::stream::run(config, &format, bytes),
        Commands::Words { count } => commands::words::run(config, count),
        Commands::Report { samples, json } => commands::report::run(config, samples, json),
        Commands::Config => commands::config::run(&config),
    }
}
