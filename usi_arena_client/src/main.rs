// CLI entry point for the arena engine client.
//
// Usage:
//   arena-client [OPTIONS]
//     -c, --config <FILE>   Client config JSON (default: ./client.json)
//     -i, --ip <HOST>       Server host (default: localhost)
//     -p, --port <PORT>     Server port (default: 8000)
//     -v, --verbose         Log every USI line exchanged with the engine

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use usi_arena_client::{ClientConfig, run};

#[derive(Parser, Debug)]
#[command(author, version, about = "Connect a USI engine to the match arena", long_about = None)]
struct Args {
    /// Client config JSON
    #[arg(short, long, default_value = "./client.json")]
    config: PathBuf,

    /// Server host
    #[arg(short, long, default_value = "localhost")]
    ip: String,

    /// Server port
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level),
    );

    let config = ClientConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let addr = format!("{}:{}", args.ip, args.port);
    let outcome = run(&config, &addr).with_context(|| format!("playing on {addr}"))?;
    log::info!("finished: {outcome:?}");
    Ok(())
}
