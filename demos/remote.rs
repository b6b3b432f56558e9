//! Example: Discover an AirPlay device, pair if needed, and play a URL
//!
//! Usage: `cargo run --example remote -- <url> [start-seconds]`

use std::sync::Arc;

use airplay_remote::prelude::*;
use tokio::io::{self, AsyncBufReadExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "http://example.com/sample.mp4".to_string());
    let offset: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0);

    let store = FileCredentialStore::new("airplay-remote-credentials.json");
    let credentials = Credentials::load_or_generate(&store).await?;

    println!("Searching for devices...");
    let client = AirPlayClient::find(
        AirPlayConfig::default(),
        credentials,
        Arc::new(StdinPin::default()),
    )
    .await?;
    println!("Found: {:?}", client.device().name);

    client.connect().await?;

    let mut playback = client.playback_events();
    tokio::spawn(async move {
        while let Some(event) = playback.recv().await {
            match event {
                ClientEvent::StateChanged { new, .. } => println!("State: {new:?}"),
                ClientEvent::PositionChanged { new, .. } => println!("Position: {new}s"),
                _ => {}
            }
        }
    });

    println!("Playing: {url}");
    client.play(&url, offset).await?;

    println!("\nCommands: p = pause, r = resume, s <secs> = seek, q = stop and quit");
    let mut lines = io::BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let result = match (parts.next(), parts.next()) {
            (Some("p"), _) => client.pause().await,
            (Some("r"), _) => client.resume().await,
            (Some("s"), Some(secs)) => match secs.parse() {
                Ok(secs) => client.seek(secs).await,
                Err(_) => {
                    println!("Not a number: {secs}");
                    continue;
                }
            },
            (Some("q"), _) => break,
            _ => continue,
        };
        if let Err(e) = result {
            println!("Command failed: {e}");
        }
    }

    client.stop().await?;
    client.disconnect().await;
    Ok(())
}
