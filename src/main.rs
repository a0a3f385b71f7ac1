use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use smartlight_rs::config::LightConfig;
use smartlight_rs::console::{self, Command};
use smartlight_rs::controller::{ControlEvent, Flow, LightController};
use smartlight_rs::gpio_input::MotionSensor;

// Usage:
//  smartlight-rs [config.json]
//
//  r 40      → red channel to 40% duty
//  toggle    → flip the indicator light, mirrored to the remote store
//  read      → print the remote state
//  sync      → drive the light to the remote state
//  quit      → stop all channels and exit
//
//  The motion sensor toggles the light on each new detection.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Starting SmartLight...");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = LightConfig::load(config_path.as_deref()).context("loading configuration")?;

    let mut controller =
        LightController::from_config(&config).context("initializing light controller")?;
    let mut sensor =
        MotionSensor::with_pin(config.motion_sensor_pin).context("initializing motion sensor")?;

    println!("GPIO initialized:");
    println!("  Indicator LED: GPIO {}", config.sensor_led_pin);
    println!("  Motion sensor: GPIO {}", config.motion_sensor_pin);
    println!(
        "  RGB:           GPIO {} / {} / {} @ {} Hz",
        config.red_pin, config.green_pin, config.blue_pin, config.pwm_frequency_hz
    );
    println!("  Remote:        {}", config.endpoint);

    match controller.sync_remote() {
        Ok(state) => println!("Remote state: {}", state),
        Err(e) => log::warn!("Remote state not applied: {}", e),
    }

    // Console input in a separate thread so the poll loop never blocks on stdin.
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("\n{}\n", console::HELP);

    let mut sensor_fault_reported = false;

    // Main control loop
    'control: loop {
        match sensor.update() {
            Ok(true) => {
                if let Err(e) = controller.handle_event(ControlEvent::Toggle) {
                    log::error!("Sensor toggle failed: {}", e);
                }
            }
            Ok(false) => sensor_fault_reported = false,
            Err(e) => {
                if !sensor_fault_reported {
                    log::error!("Motion sensor: {}", e);
                    sensor_fault_reported = true;
                }
            }
        }

        for line in rx.try_iter() {
            let command = match console::parse_command(&line) {
                Ok(command) => command,
                Err(console::ParseError::Empty) => continue,
                Err(e) => {
                    println!("⚠ {}", e);
                    continue;
                }
            };

            match command {
                Command::Event(event) => match controller.handle_event(event) {
                    Ok(Flow::Exit) => break 'control,
                    Ok(Flow::Continue) => {}
                    Err(e) => println!("⚠ {}", e),
                },
                Command::ReadRemote => match controller.read_remote() {
                    Ok(state) => println!("Remote state: {}", state),
                    Err(e) => println!("⚠ {}", e),
                },
                Command::SyncRemote => match controller.sync_remote() {
                    Ok(state) => println!("Light: {}", state),
                    Err(e) => println!("⚠ {}", e),
                },
                Command::Status => {
                    println!("\n[Status]");
                    match controller.light_state() {
                        Ok(state) => println!("  Light: {}", state),
                        Err(e) => println!("  Light: {}", e),
                    }
                    for (color, state) in controller.channel_states() {
                        println!(
                            "  {:<5} {:>3}%  {:?}",
                            color.name(),
                            controller.channel(color).duty().percent(),
                            state
                        );
                    }
                    let mirror = controller.mirror();
                    println!(
                        "  Mirror: {} delivered, {} dropped",
                        mirror.delivered(),
                        mirror.dropped()
                    );
                    println!();
                }
                Command::Help => println!("{}", console::HELP),
            }
        }

        // Debounce delay
        thread::sleep(config.poll_interval());
    }

    println!("Shutting down...");
    sensor.dispose();
    controller.stop();
    Ok(())
}
