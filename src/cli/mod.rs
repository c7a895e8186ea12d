//! Operator CLI for scheduled sweeps and configuration checks.

pub mod commands;
pub mod display;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, ConfigCommands};

/// Report a failed command in the selected output mode and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
