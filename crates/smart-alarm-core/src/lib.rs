//! # Smart Alarm Core Library
//!
//! This library provides the core logic for a bedside smart alarm: deciding
//! once per tick whether anything should ring, and driving sound and light
//! when it does. The `smart-alarm` CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Evaluator**: Per-device context that matches manual alarms and calendar
//!   reminders against the current minute
//! - **Refresh Cache**: TTL-gated memoization in front of slow, failing fetches
//! - **Sources**: Google Calendar and weatherapi.com clients behind traits
//! - **Driver**: Tick-driven state machine (idle, ringing, snoozed) that talks
//!   to the hardware
//! - **Storage**: SQLite alarm store and TOML configuration
//!
//! ## Key Components
//!
//! - [`AlarmContext`]: Trigger evaluation for one device
//! - [`RefreshCache`]: Keyed cache with per-call TTL
//! - [`AlarmRegistry`]: In-memory alarm CRUD
//! - [`AlarmDriver`]: Rings, snoozes and dismisses
//! - [`Config`]: Application configuration management

pub mod alarm;
pub mod cache;
pub mod calendar;
pub mod device;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod hardware;
pub mod sources;
pub mod storage;
pub mod weather;

pub use alarm::{AlarmDefinition, AlarmRegistry, AlarmStore, DayName, Recurrence, TimeOfDay, UndatedOneShot};
pub use cache::RefreshCache;
pub use calendar::{CalendarFeed, SyncOutcome};
pub use device::DeviceHub;
pub use driver::{AlarmDriver, DriverState};
pub use error::{ConfigError, CoreError, DeviceIdError, FetchError, NotFoundError, StorageError, ValidationError};
pub use evaluator::{AlarmContext, AlarmFireConfig, FireReason, UpcomingItem, UpcomingKind};
pub use events::Event;
pub use hardware::{HardwareController, HardwareSink};
pub use sources::{CalendarEvent, CalendarSource, EventStart, WeatherSource};
pub use storage::{AlarmSettings, CalendarConfig, Config, HardwareConfig, TimeFormat, WeatherConfig};
pub use weather::WeatherService;
