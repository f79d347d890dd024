//! CLI subprocess integration tests.
//!
//! These tests invoke the `goblin` binary as a subprocess against a local
//! HTTP server serving install scripts, and verify exit codes, the lock file,
//! and JSON output.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

/// Script that resolves to `version` and installs an empty file.
fn install_script(version: &str) -> String {
    format!(
        "#!/bin/sh\nset -e\n\nstart() {{\n  version='{version}'\n}}\n\nstart\n: > \"$PREFIX/$OUT\"\n"
    )
}

/// Minimal HTTP server: fixed bodies by path, 404 otherwise.
fn serve(routes: HashMap<String, String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    let routes = Arc::new(routes);
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let routes = Arc::clone(&routes);
            std::thread::spawn(move || {
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    return;
                }
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_owned();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                        break;
                    }
                }
                let (status, body) = match routes.get(&path) {
                    Some(body) => ("200 OK", body.clone()),
                    None => ("404 Not Found", String::new()),
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            });
        }
    });
    addr
}

fn goblin_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_goblin"));
    // Tests run without curl/wget; the scripts here download nothing.
    cmd.env("GOBLIN_SKIP_PREREQS", "1");
    cmd.env("HOME", home);
    cmd.env_remove("GOBLIN_LOG");
    for var in ["http_proxy", "HTTP_PROXY", "https_proxy", "HTTPS_PROXY", "all_proxy", "ALL_PROXY"] {
        cmd.env_remove(var);
    }
    cmd
}

fn run_in(project: &Path, args: &[&str]) -> Output {
    goblin_bin(project)
        .arg("-C")
        .arg(project)
        .args(args)
        .output()
        .unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_manifest(dir: &Path, body: &str) {
    std::fs::write(dir.join(".goblin"), body).unwrap();
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = goblin_bin(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success(), "goblin --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("goblin"),
        "version output must contain 'goblin': {stdout}"
    );
}

#[test]
fn cli_help_lists_flags_and_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = goblin_bin(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--check"));
    assert!(stdout.contains("--no-fetch"));
    assert!(stdout.contains("completions"));
}

#[test]
fn cli_missing_manifest_exits_two() {
    let project = tempfile::tempdir().unwrap();
    let output = run_in(project.path(), &[]);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("manifest not found"));
    assert!(!project.path().join(".goblin.lock").exists());
}

/// `goblin_bin` with the prerequisite check enabled and no tools on `PATH`.
fn run_without_tools(project: &Path, empty_path: &Path) -> Output {
    goblin_bin(project)
        .env_remove("GOBLIN_SKIP_PREREQS")
        .env("PATH", empty_path)
        .arg("-C")
        .arg(project)
        .output()
        .unwrap()
}

#[test]
fn cli_missing_tools_do_not_block_up_to_date_apply() {
    let project = tempfile::tempdir().unwrap();
    let empty_path = tempfile::tempdir().unwrap();
    write_manifest(
        project.path(),
        "PREFIX=bin\nhttp://127.0.0.1:9/pkg/foo/bar@1.2.3\n",
    );
    let lock = "pkg/foo/bar\t1.2.3\t1.2.3\n";
    std::fs::write(project.path().join(".goblin.lock"), lock).unwrap();
    std::fs::create_dir_all(project.path().join("bin")).unwrap();
    std::fs::write(project.path().join("bin/bar"), "").unwrap();

    let output = run_without_tools(project.path(), empty_path.path());

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("missing prerequisites"));
    assert_eq!(
        std::fs::read_to_string(project.path().join(".goblin.lock")).unwrap(),
        lock
    );
}

#[test]
fn cli_missing_tools_keep_manifest_exit_code() {
    let project = tempfile::tempdir().unwrap();
    let empty_path = tempfile::tempdir().unwrap();

    let output = run_without_tools(project.path(), empty_path.path());

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("manifest not found"));
}

#[test]
fn cli_apply_then_check_passes() {
    let server = serve(HashMap::from([(
        "/pkg/foo/bar".to_owned(),
        install_script("1.2.3"),
    )]));
    let project = tempfile::tempdir().unwrap();
    write_manifest(project.path(), &format!("PREFIX=bin\n{server}/pkg/foo/bar\n"));

    let apply = run_in(project.path(), &[]);
    assert!(apply.status.success(), "apply failed: {}", stderr(&apply));
    assert!(project.path().join("bin/bar").exists());
    assert_eq!(
        std::fs::read_to_string(project.path().join(".goblin.lock")).unwrap(),
        "pkg/foo/bar\tlatest\t1.2.3\n"
    );

    let check = run_in(project.path(), &["--check"]);
    assert!(check.status.success(), "check failed: {}", stderr(&check));
}

#[test]
fn cli_check_mismatch_exits_one_and_keeps_lock() {
    let project = tempfile::tempdir().unwrap();
    write_manifest(
        project.path(),
        "PREFIX=bin\nhttp://127.0.0.1:9/pkg/foo/bar@1.2.3\n",
    );
    let lock = "pkg/foo/bar\t1.0.0\t1.0.0\n";
    std::fs::write(project.path().join(".goblin.lock"), lock).unwrap();

    let output = run_in(project.path(), &["--check"]);

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));
    assert_eq!(
        std::fs::read_to_string(project.path().join(".goblin.lock")).unwrap(),
        lock
    );
    assert!(!project.path().join("bin").exists());
}

#[test]
fn cli_check_without_fetch_needs_no_network() {
    let project = tempfile::tempdir().unwrap();
    // Nothing listens on the discard port; a fetch would fail the package.
    write_manifest(project.path(), "PREFIX=bin\nhttp://127.0.0.1:9/pkg/foo/bar\n");
    std::fs::write(
        project.path().join(".goblin.lock"),
        "pkg/foo/bar\tlatest\t1.2.3\n",
    )
    .unwrap();
    std::fs::create_dir_all(project.path().join("bin")).unwrap();
    std::fs::write(project.path().join("bin/bar"), "").unwrap();

    let output = run_in(project.path(), &["--check", "--no-fetch"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn cli_apply_json_output_is_stable() {
    let server = serve(HashMap::from([(
        "/github.com/rakyll/hey".to_owned(),
        install_script("v0.1.4"),
    )]));
    let project = tempfile::tempdir().unwrap();
    write_manifest(
        project.path(),
        &format!("PREFIX=bin\n{server}/github.com/rakyll/hey\n"),
    );

    let output = run_in(project.path(), &["--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("--json must produce valid JSON: {e}\nstdout: {stdout}"));
    assert_eq!(json["mode"], "apply");
    assert_eq!(json["lock_written"], true);
    assert_eq!(json["packages"][0]["name"], "github.com/rakyll/hey");
    assert_eq!(json["packages"][0]["state"], "installed");
    assert_eq!(json["packages"][0]["resolved"], "v0.1.4");
}

#[test]
fn cli_apply_with_failed_fetch_still_exits_zero() {
    let server = serve(HashMap::from([(
        "/pkg/foo/baz".to_owned(),
        install_script("2.0.0"),
    )]));
    let project = tempfile::tempdir().unwrap();
    write_manifest(
        project.path(),
        &format!("PREFIX=bin\n{server}/pkg/foo/bar\n{server}/pkg/foo/baz\n"),
    );

    let output = run_in(project.path(), &["--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(json["packages"][0]["state"], "resolve_failed");
    assert_eq!(json["packages"][1]["state"], "installed");
    assert_eq!(
        std::fs::read_to_string(project.path().join(".goblin.lock")).unwrap(),
        "pkg/foo/baz\tlatest\t2.0.0\n"
    );
}

#[test]
fn cli_failing_script_is_reported_not_locked() {
    let server = serve(HashMap::from([(
        "/pkg/foo/bar".to_owned(),
        "start() {\n  version='1.0.0'\n}\nexit 7\n".to_owned(),
    )]));
    let project = tempfile::tempdir().unwrap();
    write_manifest(project.path(), &format!("PREFIX=bin\n{server}/pkg/foo/bar\n"));

    let output = run_in(project.path(), &["--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(json["packages"][0]["state"], "install_failed");
    assert_eq!(
        std::fs::read_to_string(project.path().join(".goblin.lock")).unwrap(),
        ""
    );
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = goblin_bin(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("goblin"));
}

#[test]
fn cli_man_pages_written() {
    let home = tempfile::tempdir().unwrap();
    let out = home.path().join("man");
    let output = goblin_bin(home.path())
        .arg("man-pages")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.join("goblin.1").exists());
    assert!(out.join("goblin-completions.1").exists());
}
