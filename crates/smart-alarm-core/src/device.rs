//! Device identity and per-device alarm state.
//!
//! Each device is identified by a short hex id persisted in
//! `device_id.json` (`{"device_id": "1a2b3c4d"}`). A [`DeviceHub`] keeps one
//! independently locked [`AlarmDriver`] per device so ticks for different
//! devices never share mutable state.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::driver::AlarmDriver;
use crate::error::{DeviceIdError, NotFoundError};
use crate::events::Event;

const DEVICE_ID_FILE: &str = "device_id.json";
const DEVICE_ID_LEN: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
struct DeviceIdFile {
    device_id: String,
}

fn is_valid_id(id: &str) -> bool {
    id.len() == DEVICE_ID_LEN && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Get or create the device id stored in `dir`.
/// Creates the directory and file if they don't exist.
pub fn get_or_create_device_id_at(dir: &Path) -> Result<String, DeviceIdError> {
    let path = dir.join(DEVICE_ID_FILE);

    if path.exists() {
        let content = fs::read_to_string(&path)?;
        let file: DeviceIdFile = serde_json::from_str(&content)?;
        if !is_valid_id(&file.device_id) {
            return Err(DeviceIdError::InvalidFormat(file.device_id));
        }
        return Ok(file.device_id);
    }

    let device_id: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(DEVICE_ID_LEN)
        .collect();

    fs::create_dir_all(dir)?;
    let body = serde_json::to_string(&DeviceIdFile {
        device_id: device_id.clone(),
    })?;
    fs::write(&path, body)?;
    info!(%device_id, "created device id");
    Ok(device_id)
}

/// Get or create the device id in the default data directory.
pub fn get_or_create_device_id() -> Result<String, DeviceIdError> {
    let dir = crate::storage::data_dir()?;
    get_or_create_device_id_at(&dir)
}

/// Alarm drivers keyed by device id.
#[derive(Default)]
pub struct DeviceHub {
    devices: HashMap<String, Arc<Mutex<AlarmDriver>>>,
}

impl DeviceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, replacing any previous driver for the same id.
    pub fn insert(&mut self, device_id: impl Into<String>, driver: AlarmDriver) {
        let device_id = device_id.into();
        info!(%device_id, "registered device");
        self.devices
            .insert(device_id, Arc::new(Mutex::new(driver)));
    }

    pub fn remove(&mut self, device_id: &str) -> Result<(), NotFoundError> {
        self.devices
            .remove(device_id)
            .map(|_| ())
            .ok_or_else(|| NotFoundError::Device(device_id.to_string()))
    }

    pub fn get(&self, device_id: &str) -> Result<Arc<Mutex<AlarmDriver>>, NotFoundError> {
        self.devices
            .get(device_id)
            .cloned()
            .ok_or_else(|| NotFoundError::Device(device_id.to_string()))
    }

    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.devices.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Tick every device at `now`, each on its own scoped thread.
    ///
    /// Returns the events produced, keyed by device id, sorted by id. A
    /// device whose lock is poisoned is logged and skipped.
    pub fn tick_all<Tz>(&self, now: &DateTime<Tz>) -> Vec<(String, Event)>
    where
        Tz: TimeZone + Sync,
        Tz::Offset: Sync,
    {
        let mut events: Vec<(String, Event)> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .devices
                .iter()
                .map(|(id, driver)| {
                    scope.spawn(move || {
                        let mut driver = match driver.lock() {
                            Ok(d) => d,
                            Err(_) => {
                                error!(device_id = %id, "device state poisoned, skipping");
                                return None;
                            }
                        };
                        driver.tick(now).map(|e| (id.clone(), e))
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().ok().flatten())
                .collect()
        });
        events.sort_by(|a, b| a.0.cmp(&b.0));
        events
    }
}
