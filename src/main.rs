use std::io::{self, Write};

use clap::Parser;
use rwheel_zenoh_bridge::config::Settings;
use tracing_subscriber::EnvFilter;

/// Ask for the session name the recording is stored under
fn prompt_session() -> io::Result<String> {
    print!("test_name: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let settings = Settings::parse();
    let session = match settings.session.clone() {
        Some(session) => session,
        None => match prompt_session() {
            Ok(session) if !session.is_empty() => session,
            Ok(_) => {
                eprintln!("A session name is required");
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Failed to read session name: {}", e);
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = rwheel_zenoh_bridge::runtime::run(settings, &session).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
