mod definition;
mod registry;
mod store;

pub use definition::{AlarmDefinition, DayName, Recurrence, TimeOfDay, UndatedOneShot};
pub use registry::AlarmRegistry;
pub use store::AlarmStore;
