//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, HuntArgs};

use crate::domain::errors::HuntError;

/// Report a command failure and exit non-zero.
///
/// An ambiguous-resume error gets a dedicated hint because it is the one
/// failure the user resolves with a flag rather than an investigation.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let payload = serde_json::json!({
            "success": false,
            "error": err.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else if let Some(HuntError::AmbiguousResume { run_id }) = err.downcast_ref::<HuntError>() {
        eprintln!(
            "Error: an incomplete run ({run_id}) exists.\n\
             Rerun with --resume to continue it, or --fresh to abandon it."
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
