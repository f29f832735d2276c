mod servo;

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use irmp_link::platform::{serve, PlatformController};
use servo::SimulatedServos;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "irmp-platform", about = "Simulated IRMP platform controller")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Seconds between state dumps, 0 disables them
    #[arg(long, default_value_t = 5)]
    status_secs: u64,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let listener = TcpListener::bind(&args.bind).with_context(|| format!("binding {}", args.bind))?;
    info!("Platform listening on {}", listener.local_addr()?);

    let servos = Box::new(SimulatedServos::default());
    let controller = Arc::new(Mutex::new(PlatformController::new(servos)));

    let server_controller = Arc::clone(&controller);
    let server = thread::Builder::new()
        .name("server".into())
        .spawn(move || serve(listener, server_controller))?;

    if args.status_secs == 0 {
        let _ = server.join();
        return Ok(());
    }

    loop {
        thread::sleep(Duration::from_secs(args.status_secs));
        let snapshot = match controller.lock() {
            Ok(locked) => locked.snapshot(),
            Err(_) => anyhow::bail!("controller lock poisoned"),
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!("state {}", json),
            Err(e) => warn!("JSON serialization error: {}", e),
        }
    }
}
