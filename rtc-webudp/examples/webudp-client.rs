//! webudp-client connects to a WebUDP host, sends a few text datagrams once
//! the channel opens and prints everything the host sends back.

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use rtc_webudp::{IceServer, Socket, SocketConfigBuilder, SocketEvent};
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "webudp-client")]
#[command(version = "0.1.0")]
#[command(about = "An example WebUDP client", long_about = None)]
struct Cli {
    #[arg(short, long)]
    debug: bool,
    #[arg(long, default_value_t = format!("http://127.0.0.1:9555"))]
    address: String,
    #[arg(long, default_value_t = format!("hello from rtc-webudp"))]
    message: String,
    #[arg(long, default_value_t = 5)]
    count: usize,
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    #[arg(long)]
    stun: Option<String>,
    #[arg(long, default_value_t = format!("INFO"))]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = log::LevelFilter::from_str(&cli.log_level)?;
    if cli.debug {
        env_logger::Builder::new()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{}:{} [{}] - {}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.level(),
                    record.args()
                )
            })
            .filter(None, log_level)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut builder = SocketConfigBuilder::new();
    if let Some(stun) = cli.stun {
        builder = builder.with_ice_servers(vec![IceServer::new(stun)]);
    }
    let socket = Socket::new(builder.build());
    let mut events = socket.subscribe();

    info!("connecting to {}", cli.address);
    socket.connect(cli.address.clone())?;

    let mut sent = 0usize;
    let mut ticker = tokio::time::interval(Duration::from_millis(cli.interval_ms));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SocketEvent::Open) => info!("channel open"),
                Ok(SocketEvent::Message(message)) => match message.as_text() {
                    Some(text) if message.is_string => println!("< {text}"),
                    _ => println!("< {} bytes", message.len()),
                },
                Ok(SocketEvent::Close) => {
                    info!("channel closed");
                    break;
                }
                Ok(SocketEvent::Failed(err)) => {
                    error!("connection failed: {}", err);
                    return Err(err.into());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("fell behind, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick(), if socket.is_open() => {
                if sent < cli.count {
                    sent += 1;
                    let text = format!("{} #{}", cli.message, sent);
                    println!("> {text}");
                    socket.send_text(text).await?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                if socket.state().is_connecting() {
                    socket.close()?;
                } else {
                    break;
                }
            }
        }
    }

    Ok(())
}
