// CLI entry point for the pixel office relay.
//
// Starts a standalone relay that office clients connect to. See `server.rs`
// for the networking architecture and `rooms.rs` for room state.
//
// Usage:
//   relay [OPTIONS]
//     --bind <HOST>               Listen address (default: 127.0.0.1)
//     --port <PORT>               Listen port (default: 7878)
//     --max-players <N>           Players per room (default: 16)
//     --max-rooms <N>             Concurrent rooms (default: 256)
//     --snapshot-interval-ms <N>  Roster broadcast period (default: 5000)
//     --idle-timeout-ms <N>       Evict silent players after (default: 60000)
//
// Log verbosity follows `RUST_LOG` (default `info`).

use std::time::{SystemTime, UNIX_EPOCH};

use pixel_office_relay::{RelayConfig, start_relay};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = parse_args();

    let (handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to start relay");
            std::process::exit(1);
        }
    };

    info!(%addr, "relay ready, Ctrl+C to stop");
    // The process exits on SIGINT; the relay thread runs until then.
    handle.wait();
}

/// Parse command-line arguments into a `RelayConfig`. Plain
/// `std::env::args()` matching, no clap dependency.
fn parse_args() -> RelayConfig {
    let mut config = RelayConfig {
        seed: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0),
        ..RelayConfig::default()
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                i += 1;
                config.host = args.get(i).cloned().unwrap_or_else(|| fail("--bind requires a host"));
            }
            "--port" => {
                i += 1;
                config.port = parse_value(&args, i, "--port");
            }
            "--max-players" => {
                i += 1;
                config.max_players = parse_value(&args, i, "--max-players");
            }
            "--max-rooms" => {
                i += 1;
                config.max_rooms = parse_value(&args, i, "--max-rooms");
            }
            "--snapshot-interval-ms" => {
                i += 1;
                config.snapshot_interval_ms = parse_value(&args, i, "--snapshot-interval-ms");
            }
            "--idle-timeout-ms" => {
                i += 1;
                config.idle_timeout_ms = parse_value(&args, i, "--idle-timeout-ms");
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    args.get(i)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| fail(&format!("{flag} requires a valid number")))
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --bind <HOST>               Listen address (default: 127.0.0.1)");
    println!("  --port <PORT>               Listen port (default: 7878)");
    println!("  --max-players <N>           Players per room (default: 16)");
    println!("  --max-rooms <N>             Concurrent rooms (default: 256)");
    println!("  --snapshot-interval-ms <N>  Roster broadcast period (default: 5000)");
    println!("  --idle-timeout-ms <N>       Evict silent players after (default: 60000)");
    println!("  --help, -h                  Show this help");
}
