use clap::Subcommand;
use smart_alarm_core::device;

#[derive(Subcommand)]
pub enum DeviceAction {
    /// Print this device's id, creating it on first use
    Id,
}

pub fn run(action: DeviceAction) -> super::CliResult {
    match action {
        DeviceAction::Id => {
            let id = device::get_or_create_device_id()?;
            println!("{id}");
        }
    }
    Ok(())
}
