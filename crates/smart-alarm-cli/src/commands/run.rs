//! Foreground alarm loop.
//!
//! Ticks once per second. While running, type `s` + Enter to snooze and
//! `d` + Enter to dismiss. Ctrl-C stops the loop and silences the hardware.
//! Alarms are re-read from the store at each minute boundary, so edits made
//! with `alarm ...` in another shell apply from the next minute.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use smart_alarm_core::hardware::HardwareController;
use smart_alarm_core::{device, AlarmDriver, AlarmStore, Config, DeviceHub, Event};
use tracing::{error, info, warn};

use super::{load_context, CliResult};

const TICK: Duration = Duration::from_secs(1);

enum Command {
    Snooze,
    Dismiss,
}

/// Set `flag` when Ctrl-C arrives. The signal listener gets its own runtime
/// so the tick loop stays free to make blocking HTTP calls.
fn watch_ctrl_c(flag: Arc<AtomicBool>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("interrupt received, shutting down"),
                    Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
                }
            });
            flag.store(true, Ordering::SeqCst);
        })?;
    Ok(())
}

fn watch_stdin() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let command = match line.trim() {
                    "s" | "snooze" => Command::Snooze,
                    "d" | "dismiss" => Command::Dismiss,
                    "" => continue,
                    other => {
                        warn!(input = other, "unknown command (use 's' or 'd')");
                        continue;
                    }
                };
                if tx.send(command).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "keyboard controls unavailable");
    }
    rx
}

/// Replace the driver's alarms with the stored ones. A failed read keeps the
/// current alarms.
fn reload_alarms(store: &AlarmStore, driver: &mut AlarmDriver) {
    match store.load_registry() {
        Ok(registry) => *driver.context_mut().registry_mut() = registry,
        Err(e) => warn!(error = %e, "failed to reload alarms, keeping previous set"),
    }
}

fn minute_of<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    now.timestamp().div_euclid(60)
}

fn emit(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => error!(error = %e, "failed to encode event"),
    }
}

pub fn run() -> CliResult {
    let config = Config::load_or_default();
    let device_id = device::get_or_create_device_id()?;
    let store = AlarmStore::open()?;
    let ctx = load_context(&config)?;
    let hardware = HardwareController::from_config(&config.alarm, &config.hardware);

    let mut hub = DeviceHub::new();
    hub.insert(device_id.clone(), AlarmDriver::new(ctx, Box::new(hardware)));
    let driver = hub.get(&device_id)?;

    let stop = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(stop.clone())?;
    let commands = watch_stdin();
    info!(%device_id, "alarm loop started");

    let mut loaded_minute = minute_of(&Local::now());
    while !stop.load(Ordering::SeqCst) {
        let now = Local::now();
        if minute_of(&now) != loaded_minute {
            loaded_minute = minute_of(&now);
            let mut driver = driver.lock().map_err(|_| "device state poisoned")?;
            reload_alarms(&store, &mut driver);
        }

        for (_, event) in hub.tick_all(&now) {
            emit(&event);
        }

        loop {
            let command = match commands.try_recv() {
                Ok(c) => c,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            let mut driver = driver.lock().map_err(|_| "device state poisoned")?;
            let now = Utc::now();
            let event = match command {
                Command::Snooze => driver.snooze(now),
                Command::Dismiss => driver.dismiss(now),
            };
            match event {
                Some(event) => emit(&event),
                None => info!("nothing is ringing"),
            }
        }

        std::thread::sleep(TICK);
    }

    if let Ok(mut driver) = driver.lock() {
        driver.shutdown();
    }
    info!("alarm loop stopped");
    Ok(())
}
