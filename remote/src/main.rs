mod console;

#[cfg(feature = "gpio")]
mod adc;
#[cfg(feature = "gpio")]
mod buttons;
#[cfg(feature = "gpio")]
mod gpio;

use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use irmp_link::{ChannelManager, InputSurface, LinkConfig, Session, SessionEvent, WsTransport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "irmp-remote", about = "Operator remote for the IRMP rescue platform")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Platform WebSocket URL, e.g. ws://192.168.4.1/ws
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    reconnect_ms: Option<u64>,

    /// Write the resolved config to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Read the pad and sliders from GPIO instead of stdin
    #[cfg(feature = "gpio")]
    #[arg(long)]
    gpio: bool,
}

fn resolve_config(args: &Args) -> Result<LinkConfig> {
    let mut config = LinkConfig::resolve(args.config.as_deref()).context("loading config")?;
    if let Some(url) = &args.url {
        config.url = url.clone();
    }
    if let Some(ms) = args.reconnect_ms {
        config.reconnect_delay_ms = ms;
    }
    Ok(config)
}

/// Delivers `Shutdown` when a frontend thread ends, also when it panics, so
/// held buttons are released and the session does not outlive its input.
struct ShutdownGuard(Sender<SessionEvent>);

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let _ = self.0.send(SessionEvent::Shutdown);
    }
}

#[cfg(feature = "gpio")]
fn spawn_gpio(args: &Args, events: Sender<SessionEvent>) -> Result<Option<Sender<SessionEvent>>> {
    if !args.gpio {
        return Ok(Some(events));
    }
    thread::Builder::new().name("gpio".into()).spawn(move || {
        let _guard = ShutdownGuard(events.clone());
        if let Err(e) = gpio::gpio_thread(events) {
            tracing::error!("GPIO frontend failed: {:#}", e);
        }
    })?;
    Ok(None)
}

#[cfg(not(feature = "gpio"))]
fn spawn_gpio(_args: &Args, events: Sender<SessionEvent>) -> Result<Option<Sender<SessionEvent>>> {
    Ok(Some(events))
}

/// Starts the GPIO frontend when requested, the console otherwise.
fn spawn_frontend(args: &Args, events: Sender<SessionEvent>) -> Result<()> {
    if let Some(events) = spawn_gpio(args, events)? {
        thread::Builder::new().name("console".into()).spawn(move || {
            let _guard = ShutdownGuard(events.clone());
            console::console_thread(events);
        })?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    if let Some(path) = &args.write_config {
        config
            .save(path)
            .with_context(|| format!("writing config to {}", path.display()))?;
        info!("Config written to {}", path.display());
        return Ok(());
    }

    info!("Starting IRMP remote, platform at {}", config.url);

    let (tx, rx) = mpsc::channel();
    let transport = WsTransport::new(config.url.clone(), tx.clone());
    let manager = ChannelManager::new(transport, config.reconnect_delay());
    let session = Session::new(InputSurface::new(config.slider_default), manager);

    spawn_frontend(&args, tx)?;
    session.run(rx);
    Ok(())
}
