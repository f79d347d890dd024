//! Extraction of package metadata from goblin install scripts.
//!
//! The scripts carry no machine-readable header. They define a shell
//! function opened by a `start() {` line and closed by a line beginning with
//! `}`, and assign `version='...'` (and sometimes `bin='...'`) inside it.
//! Only assignments inside that block are honored. The shape is a convention
//! of the published scripts rather than a contract, so extraction never
//! fails: anything unrecognized yields `None`.

/// Line that opens the block holding the assignments.
pub const START_MARKER: &str = "start() {";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptInfo {
    pub version: Option<String>,
    pub bin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Outside,
    InStart,
}

pub fn extract_script_info(content: &str) -> ScriptInfo {
    let mut info = ScriptInfo::default();
    let mut state = BlockState::Outside;

    for line in content.lines() {
        match state {
            BlockState::Outside => {
                if line.starts_with(START_MARKER) {
                    state = BlockState::InStart;
                }
            }
            BlockState::InStart => {
                if line.starts_with('}') {
                    state = BlockState::Outside;
                    continue;
                }
                let line = line.trim();
                if let Some(value) = assigned_value(line, "version") {
                    info.version = Some(value);
                } else if let Some(value) = assigned_value(line, "bin") {
                    info.bin = Some(value);
                }
            }
        }
    }

    info
}

/// Value of a `key=value` line with surrounding quotes removed. Empty values
/// count as no assignment.
fn assigned_value(line: &str, key: &str) -> Option<String> {
    let value = line.strip_prefix(key)?.strip_prefix('=')?;
    let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}
