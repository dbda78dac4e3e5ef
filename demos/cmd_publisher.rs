// Keyboard console for the wheel bridge
// W/S speed X +/-, R run, SPACE stop, M mode, C control mode, E end session, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use rwheel_zenoh_bridge::config::{
    HDD_ZERO_SPEED, TERMINATOR, TOPIC_COMMAND, TOPIC_CONTROL_MODE, TOPIC_MODE, TOPIC_SPEED,
};
use std::time::Duration;
use tracing::info;

const SPEED_STEP: f32 = 100.0; // RPM
const CONTROL_MODES: [&str; 3] = ["torque", "voltage", "speed"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Controls: W/S=speed X, R=run, SPACE=stop, M=mode, C=control mode, E=end, Q=quit");

    enable_raw_mode()?;
    let result = run_console(&session).await;
    disable_raw_mode()?;

    session.close().await?;
    result
}

async fn run_console(session: &zenoh::Session) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let command = session.declare_publisher(TOPIC_COMMAND).await?;
    let mode = session.declare_publisher(TOPIC_MODE).await?;
    let control_mode = session.declare_publisher(TOPIC_CONTROL_MODE).await?;
    let speed_x = session.declare_publisher(TOPIC_SPEED[0]).await?;

    let mut speed = HDD_ZERO_SPEED;
    let mut auto = false;
    let mut control_idx: usize = 0;

    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }

        match code {
            KeyCode::Char('w') | KeyCode::Char('s') => {
                speed += if code == KeyCode::Char('w') { SPEED_STEP } else { -SPEED_STEP };
                speed_x.put(serde_json::to_string(&speed)?).await?;
                info!("Speed X: {} RPM", speed);
            }
            KeyCode::Char('r') => {
                command.put("RUN").await?;
                info!("RUN");
            }
            KeyCode::Char(' ') => {
                command.put("STOP").await?;
                info!("STOP");
            }
            KeyCode::Char('m') => {
                auto = !auto;
                let label = if auto { "auto" } else { "manual" };
                mode.put(label).await?;
                info!("Mode: {}", label);
            }
            KeyCode::Char('c') => {
                control_idx = (control_idx + 1) % CONTROL_MODES.len();
                control_mode.put(CONTROL_MODES[control_idx]).await?;
                info!("Control mode: {}", CONTROL_MODES[control_idx]);
            }
            KeyCode::Char('e') => {
                command.put(TERMINATOR).await?;
                info!("Session end requested");
            }
            KeyCode::Char('q') | KeyCode::Esc => break,
            _ => {}
        }
    }

    Ok(())
}
