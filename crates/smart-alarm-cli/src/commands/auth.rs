use clap::Subcommand;
use smart_alarm_core::sources::credentials;
use smart_alarm_core::sources::google::ACCESS_TOKEN_KEY;

use super::CliResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a Google Calendar access token in the OS keyring
    SetToken {
        token: String,
    },
    /// Remove the stored token
    ClearToken,
    /// Report whether a token is stored
    Status,
}

pub fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::SetToken { token } => {
            credentials::set(ACCESS_TOKEN_KEY, &token)?;
            println!("token stored");
        }
        AuthAction::ClearToken => {
            credentials::delete(ACCESS_TOKEN_KEY)?;
            println!("token removed");
        }
        AuthAction::Status => {
            let stored = credentials::get(ACCESS_TOKEN_KEY)?.is_some();
            println!("{}", serde_json::json!({ "google": stored }));
        }
    }
    Ok(())
}
