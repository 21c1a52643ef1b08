use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uhid_gamepad::device::uhid::UhidTransport;
use uhid_gamepad::state::{AXIS_MAX, AXIS_MIN};
use uhid_gamepad::{AppConfig, DemoConfig, Gamepad, JoystickMove};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = AppConfig::default_path();
    info!("Loading config from {}", config_path.display());
    let config = AppConfig::load_or_create(&config_path).await?;

    let transport = UhidTransport::new(&config.uhid_path);
    let mut gamepad = Gamepad::new(config.device.clone(), transport);

    // The library waits forever; the timeout is ours to impose.
    match config.ready_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), gamepad.open())
            .await
            .map_err(|_| eyre!("Host did not start the device within {} seconds", secs))??,
        None => gamepad.open().await?,
    }

    gamepad.reset_all()?;

    if config.demo.enabled {
        run_demo(&mut gamepad, &config.demo).await?;
    }

    info!(
        "Holding device for {} seconds, press Ctrl-C to stop",
        config.demo.hold_secs
    );
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = tokio::time::sleep(Duration::from_secs(config.demo.hold_secs)) => {
            debug!("Hold time elapsed")
        }
    }

    gamepad.reset_all()?;
    gamepad.close()?;
    info!("Done");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

// Clicks each button in turn, then sweeps every axis through min, max and center.
async fn run_demo(gamepad: &mut Gamepad<UhidTransport>, demo: &DemoConfig) -> Result<()> {
    let step = Duration::from_millis(demo.step_ms);
    let button_count = demo.button_count.min(32);
    if button_count != demo.button_count {
        warn!("Demo button count {} capped at 32", demo.button_count);
    }

    info!("Demo: clicking buttons 1 to {}", button_count);
    for button in 1..=button_count {
        gamepad.press_buttons(&[button])?;
        tokio::time::sleep(step).await;
        gamepad.release_buttons(&[button])?;
        tokio::time::sleep(step).await;
    }

    info!("Demo: sweeping joysticks");
    let axes: [fn(i16) -> JoystickMove; 4] = [
        |v| JoystickMove {
            x: Some(v),
            ..Default::default()
        },
        |v| JoystickMove {
            y: Some(v),
            ..Default::default()
        },
        |v| JoystickMove {
            z: Some(v),
            ..Default::default()
        },
        |v| JoystickMove {
            r_z: Some(v),
            ..Default::default()
        },
    ];
    for axis in axes {
        for value in [AXIS_MIN, AXIS_MAX, 0] {
            gamepad.move_joysticks(axis(value))?;
            tokio::time::sleep(step).await;
        }
    }

    gamepad.reset_all()?;
    info!("Demo finished");
    Ok(())
}
