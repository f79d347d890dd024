use super::{colorize_state, json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use console::style;
use goblin_core::{Engine, Mode, ReconcileOptions, ReconcileReport};
use goblin_remote::{FetchConfig, HttpFetcher};
use goblin_runtime::ShellInstaller;
use std::path::Path;

/// Build an engine wired to the network and `/bin/sh`.
pub fn default_engine() -> Engine {
    let config = FetchConfig::load_default().unwrap_or_else(|e| {
        tracing::warn!("ignoring fetch config: {e}");
        FetchConfig::default()
    });
    Engine::new(
        Box::new(HttpFetcher::new(config)),
        Box::new(ShellInstaller::new()),
    )
}

pub fn run(
    engine: &Engine,
    manifest: &Path,
    options: ReconcileOptions,
    json: bool,
) -> Result<u8, String> {
    let report = engine
        .reconcile(manifest, options)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.passed() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}

fn print_report(report: &ReconcileReport) {
    for (key, value) in &report.env {
        if key == goblin_schema::ENV_PREFIX {
            println!("\t{key}={}", report.prefix.display());
        } else {
            println!("\t{key}={value}");
        }
    }

    for pkg in &report.packages {
        let version = match &pkg.resolved {
            Some(v) if *v != pkg.requested => format!("{} -> {v}", pkg.requested),
            _ => pkg.requested.to_string(),
        };
        print!(
            "[{}] {} {}",
            pkg.label,
            colorize_state(pkg.state),
            style(version).dim()
        );
        match &pkg.detail {
            Some(detail) => println!(": {detail}"),
            None => println!(),
        }
    }

    for issue in &report.issues {
        println!("{} {issue}", style("skipped").yellow());
    }

    let summary = format!(
        "{} packages: {} installed, {} up to date, {} failed",
        report.packages.len(),
        report.installed_count(),
        report.up_to_date_count(),
        report.failed_count()
    );
    match report.mode {
        Mode::Apply => {
            println!("{summary}");
            if report.lock_written {
                println!("lock file written to {}", report.lock_file.display());
            }
        }
        Mode::Check if report.passed() => {
            println!("{summary}");
            println!("{}", style("check passed").green());
        }
        Mode::Check => {
            println!("{summary}");
            println!("{}", style("check failed").red().bold());
        }
    }
}
