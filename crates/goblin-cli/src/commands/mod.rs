pub mod completions;
pub mod man_pages;
pub mod sync;

use goblin_core::PackageState;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn colorize_state(state: PackageState) -> String {
    use console::Style;
    let text = state.to_string();
    match state {
        PackageState::Installed => Style::new().green().bold().apply_to(text).to_string(),
        PackageState::UpToDate => Style::new().green().apply_to(text).to_string(),
        PackageState::CheckMismatch => Style::new().yellow().bold().apply_to(text).to_string(),
        PackageState::ResolveFailed | PackageState::InstallFailed => {
            Style::new().red().bold().apply_to(text).to_string()
        }
        PackageState::Pending | PackageState::Resolved | PackageState::NeedsInstall => {
            Style::new().dim().apply_to(text).to_string()
        }
    }
}

/// Exit code for an error message that reached the top of the CLI.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("manifest ") || msg.starts_with("failed to read manifest") {
        EXIT_MANIFEST_ERROR
    } else {
        EXIT_FAILURE
    }
}
