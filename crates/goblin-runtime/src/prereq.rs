use crate::installer::SHELL_PATH;
use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn shell_works() -> bool {
    Command::new(SHELL_PATH)
        .args(["-c", "exit 0"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the host tools install scripts need: a working `/bin/sh` and a
/// downloader (`curl` or `wget`). Empty list means all prerequisites are met.
pub fn check_install_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !shell_works() {
        missing.push(MissingPrereq {
            name: SHELL_PATH,
            purpose: "running install scripts",
            install_hint: "any POSIX shell linked at /bin/sh (dash, bash, busybox)",
        });
    }

    if !command_exists("curl") && !command_exists("wget") {
        missing.push(MissingPrereq {
            name: "curl or wget",
            purpose: "downloading release binaries from install scripts",
            install_hint:
                "zypper install curl | apt install curl | dnf install curl | pacman -S curl",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\ngoblin needs these tools to run install scripts.");
    msg
}
