//! respreader - RESP Reply Stream Decoder
//!
//! Reads a captured stream of RESP replies from a file or stdin, feeds it to
//! the incremental reader in fixed-size chunks and prints every reply the
//! way `redis-cli` would.

use anyhow::Context;
use respreader::protocol::{Charset, EncodingPolicy, ReaderConfig, ReplyReader};
use respreader::stream::ReplyStream;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command-line configuration
struct Config {
    /// File to read; stdin when absent
    input: Option<PathBuf>,
    /// Bytes fed to the reader per read
    chunk_size: usize,
    /// Bulk string decoding
    encoding: EncodingPolicy,
    /// Maximum array nesting depth
    max_depth: usize,
    /// Log at debug level unless RUST_LOG says otherwise
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        let reader = ReaderConfig::default();
        Self {
            input: None,
            chunk_size: respreader::stream::DEFAULT_READ_SIZE,
            encoding: reader.encoding,
            max_depth: reader.max_depth,
            verbose: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--chunk-size" | "-c" => {
                    config.chunk_size = value_of(&args, i)
                        .parse()
                        .ok()
                        .filter(|&n: &usize| n > 0)
                        .unwrap_or_else(|| fail("invalid chunk size"));
                    i += 2;
                }
                "--encoding" | "-e" => {
                    let charset: Charset = value_of(&args, i)
                        .parse()
                        .unwrap_or_else(|e| fail(&format!("{}", e)));
                    config.encoding = EncodingPolicy::Text(charset);
                    i += 2;
                }
                "--raw" | "-r" => {
                    config.encoding = EncodingPolicy::Raw;
                    i += 1;
                }
                "--max-depth" => {
                    config.max_depth = value_of(&args, i)
                        .parse()
                        .unwrap_or_else(|_| fail("invalid max depth"));
                    i += 2;
                }
                "--verbose" => {
                    config.verbose = true;
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-V" => {
                    println!("respreader version {}", respreader::VERSION);
                    std::process::exit(0);
                }
                arg if arg.starts_with('-') && arg != "-" => {
                    eprintln!("Unknown argument: {}", arg);
                    print_help();
                    std::process::exit(1);
                }
                path => {
                    if config.input.is_some() {
                        fail("only one input file may be given");
                    }
                    if path != "-" {
                        config.input = Some(PathBuf::from(path));
                    }
                    i += 1;
                }
            }
        }

        config
    }

    fn reader_config(&self) -> ReaderConfig {
        ReaderConfig::default()
            .with_encoding(self.encoding)
            .with_max_depth(self.max_depth)
    }
}

/// Returns the value following the flag at `i`, exiting if there is none.
fn value_of(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(v) => v.as_str(),
        None => fail(&format!("{} requires a value", args[i])),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn print_help() {
    println!(
        r#"
respreader - Decode a stream of RESP replies

USAGE:
    respreader [OPTIONS] [FILE]

Reads from stdin when FILE is absent or "-".

OPTIONS:
    -c, --chunk-size <N>    Bytes fed to the parser per read (default: 4096)
    -e, --encoding <NAME>   Decode bulk strings as utf-8, latin1 or ascii (default: utf-8)
    -r, --raw               Keep bulk strings as raw bytes
        --max-depth <N>     Maximum array nesting depth (default: 32)
        --verbose           Debug logging (RUST_LOG overrides)
    -V, --version           Print version information
    -h, --help              Print this help message

EXAMPLES:
    printf '*2\r\n$5\r\nhello\r\n:1\r\n' | respreader
    respreader --chunk-size 1 capture.resp
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging on stderr so stdout only carries replies
    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let source: Box<dyn AsyncRead + Unpin + Send> = match &config.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    debug!(
        chunk_size = config.chunk_size,
        encoding = ?config.encoding,
        max_depth = config.max_depth,
        "Starting reply decoder"
    );

    let reader = ReplyReader::with_config(config.reader_config());
    let mut stream = ReplyStream::with_reader(source, reader, config.chunk_size);

    while let Some(reply) = stream
        .next_reply()
        .await
        .context("failed to decode reply stream")?
    {
        println!("{}", reply);
    }

    let stats = stream.stats();
    info!(
        replies = stats.replies_parsed,
        bytes = stats.bytes_read,
        reads = stats.reads,
        "Done"
    );
    Ok(())
}
